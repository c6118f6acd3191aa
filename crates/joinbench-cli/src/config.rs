//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use joinbench_harness::config::{
    DEFAULT_COLUMNS, DEFAULT_GENERATOR_PROGRAM, DEFAULT_GENERATOR_SCRIPT, DEFAULT_INPUTS,
    DEFAULT_JOIN_EXECUTABLE, DEFAULT_KEY_DUPLICATION_RATIO, DEFAULT_OUTPUT_ROOT, DEFAULT_PREFIXES,
    DEFAULT_SIZES,
};
use joinbench_harness::{GeneratorCommand, HarnessConfig, JoinCommand};
use serde::Deserialize;

/// Global configuration for joinbench
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub paths: PathsConfig,
    pub generator: GeneratorConfig,
    pub join: JoinConfig,
    /// Fail on the first failed subprocess or missing file.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            paths: PathsConfig::default(),
            generator: GeneratorConfig::default(),
            join: JoinConfig::default(),
            strict: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub sizes: Vec<u64>,
    pub columns: u32,
    pub key_duplication_ratio: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_vec(),
            columns: DEFAULT_COLUMNS,
            key_duplication_ratio: DEFAULT_KEY_DUPLICATION_RATIO,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_root: PathBuf,
    pub inputs: Vec<PathBuf>,
    /// Where the join executable drops its outputs. Defaults to the home directory.
    #[serde(deserialize_with = "deserialize_env_var")]
    pub join_output_dir: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            inputs: DEFAULT_INPUTS.iter().map(PathBuf::from).collect(),
            join_output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_GENERATOR_PROGRAM),
            args: vec![DEFAULT_GENERATOR_SCRIPT.to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub executable: Option<String>,
    pub prefixes: Vec<String>,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            executable: None,
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .context("Could not determine the home directory; set paths.join_output_dir")
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./joinbench.toml (current directory)
    /// 2. ~/.config/joinbench/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("joinbench.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "joinbench") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Join output directory, falling back to `$HOME`.
    pub fn join_output_dir(&self) -> Result<PathBuf> {
        match &self.paths.join_output_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => home_dir(),
        }
    }

    pub fn join_executable(&self) -> PathBuf {
        PathBuf::from(
            self.join
                .executable
                .as_deref()
                .unwrap_or(DEFAULT_JOIN_EXECUTABLE),
        )
    }

    /// Build the harness configuration this file describes.
    pub fn harness_config(&self) -> Result<HarnessConfig> {
        let inputs: [PathBuf; 2] = self.paths.inputs.clone().try_into().map_err(|v: Vec<_>| {
            anyhow::anyhow!("paths.inputs needs exactly 2 entries, got {}", v.len())
        })?;

        Ok(HarnessConfig {
            sizes: self.schedule.sizes.clone(),
            columns: self.schedule.columns,
            key_duplication_ratio: self.schedule.key_duplication_ratio,
            output_root: self.paths.output_root.clone(),
            inputs,
            generator: GeneratorCommand {
                program: self.generator.program.clone(),
                args: self.generator.args.clone(),
            },
            join: JoinCommand {
                executable: self.join_executable(),
                output_dir: self.join_output_dir()?,
                prefixes: self.join.prefixes.clone(),
            },
            strict: self.strict,
        })
    }
}
