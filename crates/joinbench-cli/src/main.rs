//! joinbench - scaling benchmark driver for a hash-join test executable
//!
//! Generates input CSVs of growing size, runs the join executable on each,
//! and files the inputs and join outputs under one directory per size.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "joinbench")]
#[command(about = "Scaling benchmark driver for a hash-join test executable")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./joinbench.toml or ~/.config/joinbench/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the size schedule: generate inputs, join, collect outputs
    Run(cmd::run::RunArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = joinbench_core::ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug  (spinners show activity)
    //   non-TTY: info unless --debug          (logs are the only progress indicator)
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    joinbench_core::init_logging(quiet, cli.debug, multi);

    if let Err(e) = joinbench_core::install_signal_handlers() {
        log::warn!("Could not install signal handlers: {e}");
    }

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Config => {
            use comfy_table::{
                modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            let sizes: Vec<String> = config
                .schedule
                .sizes
                .iter()
                .map(|&n| joinbench_core::fmt_num(n))
                .collect();
            table.add_row(vec!["Sizes", &sizes.join(", ")]);
            table.add_row(vec!["Columns", &config.schedule.columns.to_string()]);
            table.add_row(vec![
                "Key duplication ratio",
                &config.schedule.key_duplication_ratio.to_string(),
            ]);
            table.add_row(vec![
                "Output root",
                &config.paths.output_root.display().to_string(),
            ]);
            let inputs: Vec<String> = config
                .paths
                .inputs
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            table.add_row(vec!["Inputs", &inputs.join(", ")]);
            table.add_row(vec![
                "Join outputs",
                &match config.join_output_dir() {
                    Ok(dir) => dir.display().to_string(),
                    Err(_) => "(home directory unknown)".to_string(),
                },
            ]);
            table.add_row(vec![
                "Generator",
                &format!(
                    "{} {}",
                    config.generator.program.display(),
                    config.generator.args.join(" ")
                ),
            ]);
            table.add_row(vec![
                "Join executable",
                &config.join_executable().display().to_string(),
            ]);
            table.add_row(vec!["Output prefixes", &config.join.prefixes.join(", ")]);
            table.add_row(vec![
                "Mode",
                if config.strict { "strict" } else { "lenient" },
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
