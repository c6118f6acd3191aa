//! joinbench-harness: scaling benchmark driver for an external hash-join test
//!
//! For each dataset size the harness generates two input CSVs with an external
//! generator, runs the join test executable once, and moves the inputs plus
//! every join output into `{output_root}/{rows}/`.
//!
//! Everything is sequential: the generator, the executable and the relocation
//! all share fixed paths, so two sizes can never be in flight at once.

pub mod config;
pub mod error;
pub mod process;
pub mod relocate;

pub use config::{key_range_upper, GeneratorCommand, HarnessConfig, JoinCommand, JoinKind};
pub use error::{Step, StepError};

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use joinbench_core::{fmt_duration, fmt_num, is_shutdown_requested, ProgressContext};

/// What will happen for one dataset size.
#[derive(Debug, Clone)]
pub struct SizePlan {
    pub rows: u64,
    pub key_upper: u64,
    /// `{output_root}/{rows}`
    pub dir: PathBuf,
    /// Generator argument vector per input CSV, in input order.
    pub generate: Vec<(PathBuf, Vec<OsString>)>,
    /// Inputs first, then the join outputs.
    pub artifacts: Vec<PathBuf>,
}

/// Outcome of one dataset size.
#[derive(Debug, Clone)]
pub struct SizeReport {
    pub rows: u64,
    pub key_upper: u64,
    pub dir: PathBuf,
    pub generate_time: Duration,
    pub join_time: Duration,
    pub relocated: usize,
    /// Expected files that were absent (lenient mode only).
    pub missing: Vec<PathBuf>,
    /// Subprocess failures stepped over (lenient mode only).
    pub failed_steps: usize,
}

impl SizeReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.failed_steps == 0
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub output_root: PathBuf,
    pub sizes: Vec<SizeReport>,
    pub elapsed: Duration,
}

/// Expand the schedule into per-size steps without touching anything.
pub fn plan(config: &HarnessConfig) -> Vec<SizePlan> {
    let outputs = config.expected_outputs();
    config
        .sizes
        .iter()
        .map(|&rows| {
            let key_upper = config.key_upper(rows);
            let generate = config
                .inputs
                .iter()
                .map(|input| {
                    let argv = config
                        .generator
                        .argv(input, rows, config.columns, key_upper);
                    (input.clone(), argv)
                })
                .collect();
            let artifacts = config
                .inputs
                .iter()
                .cloned()
                .chain(outputs.iter().cloned())
                .collect();
            SizePlan {
                rows,
                key_upper,
                dir: config.size_dir(rows),
                generate,
                artifacts,
            }
        })
        .collect()
}

/// Run the whole schedule.
///
/// The output root is recreated first; each size then gets a fresh directory.
/// Stops between sizes if a shutdown was requested. There is no cleanup on
/// failure: whatever was generated stays where it is.
pub fn run(config: &HarnessConfig, progress: &ProgressContext) -> Result<RunSummary> {
    config.validate()?;
    if config.strict {
        process::preflight(config)?;
    }

    let started = Instant::now();
    relocate::recreate_dir(&config.output_root)
        .with_context(|| format!("failed to recreate {}", config.output_root.display()))?;
    log::info!("output root: {}", config.output_root.display());

    let plans = plan(config);
    let schedule = progress.schedule_bar(plans.len() as u64);
    let mut sizes = Vec::with_capacity(plans.len());

    for size in &plans {
        if is_shutdown_requested() {
            schedule.abandon();
            bail!(
                "interrupted after {} of {} sizes",
                sizes.len(),
                plans.len()
            );
        }

        let report = run_size(config, size, progress)
            .with_context(|| format!("size {} failed", size.rows))?;

        progress.println(format!(
            "size {} done: {} files in {} (generate {}, join {})",
            fmt_num(report.rows),
            report.relocated,
            report.dir.display(),
            fmt_duration(report.generate_time),
            fmt_duration(report.join_time),
        ));
        sizes.push(report);
        schedule.inc(1);
    }
    schedule.finish_and_clear();

    Ok(RunSummary {
        output_root: config.output_root.clone(),
        sizes,
        elapsed: started.elapsed(),
    })
}

/// Let lenient mode step over failures that do not poison later sizes.
///
/// A terminal Ctrl-C reaches the child too (same process group), so a failed
/// step while a shutdown is pending is reported as an interruption.
fn tolerate(
    config: &HarnessConfig,
    rows: u64,
    result: Result<(), StepError>,
) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if is_shutdown_requested() => {
            log::debug!("{rows}: {e}");
            bail!("interrupted while processing size {rows}");
        }
        Err(e) if !config.strict && e.is_tolerable() => {
            log::warn!("{rows}: {e}");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_size(
    config: &HarnessConfig,
    size: &SizePlan,
    progress: &ProgressContext,
) -> Result<SizeReport> {
    let line = progress.size_line(size.rows);
    let mut failed_steps = 0;

    relocate::recreate_dir(&size.dir)?;

    let generator_sink = |line: &str| log::debug!("[{}] {line}", Step::Generate);
    let join_sink = |line: &str| progress.println(format!("  {} | {line}", size.rows));

    let generate_started = Instant::now();
    for (i, (input, argv)) in size.generate.iter().enumerate() {
        line.set_message(format!(
            "generating {} ({}/{})",
            input.display(),
            i + 1,
            size.generate.len()
        ));
        log::info!(
            "{}: generating {} (keys 0..={})",
            size.rows,
            input.display(),
            size.key_upper
        );
        let generated = process::run_generator(&config.generator, argv, &generator_sink);
        if !tolerate(config, size.rows, generated)? {
            failed_steps += 1;
        }
    }
    let generate_time = generate_started.elapsed();

    // A leftover output from an earlier run would hide one the executable failed to write.
    for stale in config.expected_outputs() {
        if stale.exists() {
            log::warn!("{}: removing stale {}", size.rows, stale.display());
            std::fs::remove_file(&stale).map_err(|e| StepError::io(&stale, e))?;
        }
    }

    line.set_message("running join");
    log::info!("{}: running {}", size.rows, config.join.executable.display());
    let join_started = Instant::now();
    if !tolerate(config, size.rows, process::run_join(&config.join, &join_sink))? {
        failed_steps += 1;
    }
    let join_time = join_started.elapsed();

    line.set_message("relocating");
    let mut relocated = 0;
    let mut missing = Vec::new();
    for artifact in &size.artifacts {
        match relocate::relocate(artifact, &size.dir) {
            Ok(dest) => {
                log::debug!(
                    "{}: moved {} -> {}",
                    size.rows,
                    artifact.display(),
                    dest.display()
                );
                relocated += 1;
            }
            Err(e) if !config.strict && e.is_missing_artifact() => {
                log::warn!("{}: {e}", size.rows);
                missing.push(artifact.clone());
            }
            Err(e) => return Err(e.into()),
        }
    }
    line.finish_and_clear();

    Ok(SizeReport {
        rows: size.rows,
        key_upper: size.key_upper,
        dir: size.dir.clone(),
        generate_time,
        join_time,
        relocated,
        missing,
        failed_steps,
    })
}
