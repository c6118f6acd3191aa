//! `joinbench run` - generate, join and collect every configured size

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use joinbench_core::{fmt_duration, fmt_num, ProgressContext};
use joinbench_harness::{HarnessConfig, RunSummary, SizePlan};

use crate::config::Config;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Comma-separated row counts (overrides schedule.sizes)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Option<Vec<u64>>,

    /// Columns per generated CSV
    #[arg(long)]
    pub columns: Option<u32>,

    /// Output root, recreated on every run
    #[arg(short, long)]
    pub output_root: Option<PathBuf>,

    /// Hash-join test executable
    #[arg(long)]
    pub join_exec: Option<PathBuf>,

    /// Warn and continue on failed subprocesses and missing outputs
    #[arg(long)]
    pub lenient: bool,

    /// Print the per-size commands without executing
    #[arg(long)]
    pub dry_run: bool,
}

/// Config file values with command-line overrides applied.
fn resolve(args: &RunArgs, config: &Config) -> Result<HarnessConfig> {
    let mut harness = config.harness_config()?;
    if let Some(sizes) = &args.sizes {
        harness.sizes = sizes.clone();
    }
    if let Some(columns) = args.columns {
        harness.columns = columns;
    }
    if let Some(root) = &args.output_root {
        harness.output_root = root.clone();
    }
    if let Some(exec) = &args.join_exec {
        harness.join.executable = exec.clone();
    }
    if args.lenient {
        harness.strict = false;
    }
    harness.validate()?;
    Ok(harness)
}

fn print_plan(harness: &HarnessConfig, plans: &[SizePlan]) {
    println!("=== Join Benchmark Plan ===");
    println!("{:<14} {:<12} {:<10}", "Rows", "Key range", "Files");
    println!("{}", "-".repeat(38));
    for plan in plans {
        println!(
            "{:<14} {:<12} {:<10}",
            fmt_num(plan.rows),
            format!("0..={}", plan.key_upper),
            plan.artifacts.len()
        );
    }
    println!();
    println!("output root:  {}", harness.output_root.display());
    println!("join outputs: {}", harness.join.output_dir.display());
    println!(
        "mode:         {}",
        if harness.strict { "strict" } else { "lenient" }
    );
    println!();
}

/// Shell-like listing of what each size would execute.
fn format_commands(harness: &HarnessConfig, plans: &[SizePlan]) -> String {
    let mut out = String::new();
    for plan in plans {
        out.push_str(&format!("[{}]\n", plan.rows));
        for (_, argv) in &plan.generate {
            let args: Vec<_> = argv.iter().map(|a| a.to_string_lossy()).collect();
            out.push_str(&format!(
                "  {} {}\n",
                harness.generator.program.display(),
                args.join(" ")
            ));
        }
        out.push_str(&format!("  {}\n", harness.join.executable.display()));
        out.push_str(&format!(
            "  move {} files -> {}\n",
            plan.artifacts.len(),
            plan.dir.display()
        ));
    }
    out
}

fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Rows").fg(Color::Cyan),
            Cell::new("Keys").fg(Color::Cyan),
            Cell::new("Generate").fg(Color::Cyan),
            Cell::new("Join").fg(Color::Cyan),
            Cell::new("Files").fg(Color::Cyan),
            Cell::new("Missing").fg(Color::Cyan),
        ]);

    for report in &summary.sizes {
        let missing = Cell::new(report.missing.len());
        table.add_row(vec![
            Cell::new(fmt_num(report.rows)),
            Cell::new(format!("0..={}", report.key_upper)),
            Cell::new(fmt_duration(report.generate_time)),
            Cell::new(fmt_duration(report.join_time)),
            Cell::new(report.relocated),
            if report.missing.is_empty() {
                missing
            } else {
                missing.fg(Color::Red)
            },
        ]);
    }

    println!("{table}");
    println!(
        "Total: {} sizes in {} -> {}",
        summary.sizes.len(),
        fmt_duration(summary.elapsed),
        summary.output_root.display()
    );
}

pub fn run(args: RunArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let harness = resolve(&args, config)?;
    let plans = joinbench_harness::plan(&harness);

    print_plan(&harness, &plans);

    if args.dry_run {
        println!("{}", format_commands(&harness, &plans));
        println!("(dry-run mode, no execution)");
        return Ok(());
    }

    let summary = joinbench_harness::run(&harness, progress)?;
    print_summary(&summary);

    let unclean = summary.sizes.iter().filter(|r| !r.is_clean()).count();
    if unclean > 0 {
        log::warn!("{unclean} size(s) finished with failed steps or missing outputs");
    }
    Ok(())
}
