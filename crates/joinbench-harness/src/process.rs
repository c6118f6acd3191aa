//! Subprocess invocation of the CSV generator and the join executable

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Result};

use crate::config::{GeneratorCommand, HarnessConfig, JoinCommand};
use crate::error::{Step, StepError};

/// Lines of stderr kept in an [`StepError::Exit`] message.
const STDERR_TAIL_LINES: usize = 5;

/// Locate a program the way the shell would.
///
/// Names with a path separator are checked as given (relative to the current
/// directory); bare names are looked up on `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Make sure both collaborators can be started before anything is deleted.
pub fn preflight(config: &HarnessConfig) -> Result<()> {
    let mut missing = Vec::new();
    for (step, program) in [
        (Step::Generate, &config.generator.program),
        (Step::Join, &config.join.executable),
    ] {
        match resolve_program(program) {
            Some(found) => log::debug!("{step}: {}", found.display()),
            None => missing.push(format!("{step} not found: {}", program.display())),
        }
    }
    if !missing.is_empty() {
        bail!("{}", missing.join("; "));
    }
    Ok(())
}

/// Receives every non-blank output line of a running step as it arrives.
pub type LineSink<'a> = &'a (dyn Fn(&str) + Sync);

/// Forward each line of `reader` to `sink`, keeping the last few in `tail`.
fn forward_lines(reader: impl Read, sink: LineSink<'_>, mut tail: Option<&mut VecDeque<String>>) {
    for line in BufReader::new(reader).split(b'\n') {
        let Ok(line) = line else { break };
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        sink(line);
        if let Some(tail) = tail.as_deref_mut() {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }
    }
}

/// Run `program args..` to completion with stdin closed.
///
/// Stdout and stderr are streamed to `sink` line by line; only the last
/// [`STDERR_TAIL_LINES`] stderr lines are held for the error message.
fn run_to_completion(
    step: Step,
    program: &Path,
    args: &[OsString],
    sink: LineSink<'_>,
) -> Result<(), StepError> {
    log::debug!("{step}: {} {:?}", program.display(), args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| StepError::Spawn {
            step,
            program: program.to_path_buf(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let tail = std::thread::scope(|scope| {
        if let Some(stdout) = stdout {
            scope.spawn(move || forward_lines(stdout, sink, None));
        }
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = stderr {
            forward_lines(stderr, sink, Some(&mut tail));
        }
        tail
    });

    let status = child.wait().map_err(|e| StepError::io(program, e))?;
    if !status.success() {
        return Err(StepError::Exit {
            step,
            program: program.to_path_buf(),
            status,
            stderr: Vec::from(tail).join(" | "),
        });
    }
    Ok(())
}

/// Write one input CSV of `rows` rows with keys drawn from `[0, key_upper]`.
pub fn generate_csv(
    generator: &GeneratorCommand,
    output: &Path,
    rows: u64,
    columns: u32,
    key_upper: u64,
    sink: LineSink<'_>,
) -> Result<(), StepError> {
    run_generator(
        generator,
        &generator.argv(output, rows, columns, key_upper),
        sink,
    )
}

/// Run the generator with a prepared argument vector (see [`GeneratorCommand::argv`]).
pub fn run_generator(
    generator: &GeneratorCommand,
    argv: &[OsString],
    sink: LineSink<'_>,
) -> Result<(), StepError> {
    run_to_completion(Step::Generate, &generator.program, argv, sink)
}

/// Run the join executable with no arguments.
pub fn run_join(join: &JoinCommand, sink: LineSink<'_>) -> Result<(), StepError> {
    run_to_completion(Step::Join, &join.executable, &[], sink)
}
