//! Failures of a single harness step

use std::path::PathBuf;
use std::process::ExitStatus;

/// Which external collaborator a process error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Generate,
    Join,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => f.write_str("csv generator"),
            Self::Join => f.write_str("join executable"),
        }
    }
}

/// Error from one step of a dataset size (generate, join, relocate).
#[derive(Debug)]
pub enum StepError {
    /// The program could not be started at all.
    Spawn {
        step: Step,
        program: PathBuf,
        source: std::io::Error,
    },
    /// The program ran but exited unsuccessfully.
    Exit {
        step: Step,
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    /// A file that should have been produced is not there.
    MissingArtifact { path: PathBuf },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn {
                step,
                program,
                source,
            } => write!(f, "failed to start {step} {}: {source}", program.display()),
            Self::Exit {
                step,
                program,
                status,
                stderr,
            } => {
                write!(f, "{step} {} exited with {status}", program.display())?;
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            Self::MissingArtifact { path } => write!(f, "expected file missing: {}", path.display()),
            Self::Io { path, source } => write!(f, "IO on {}: {source}", path.display()),
        }
    }
}

/// The inner error is part of the message, so it is not also exposed as a
/// source; an `anyhow` chain would print it twice.
impl std::error::Error for StepError {}

impl StepError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, Self::MissingArtifact { .. })
    }

    /// Errors that lenient mode logs and steps over.
    ///
    /// A program that cannot be started will fail the same way for every
    /// size, so it is never tolerated.
    pub fn is_tolerable(&self) -> bool {
        matches!(self, Self::Exit { .. } | Self::MissingArtifact { .. })
    }
}
