use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Row counts run when nothing else is configured.
pub const DEFAULT_SIZES: [u64; 5] = [10_000, 100_000, 1_000_000, 10_000_000, 100_000_000];
pub const DEFAULT_COLUMNS: u32 = 4;
/// On average `1 / ratio` rows share a key.
pub const DEFAULT_KEY_DUPLICATION_RATIO: f64 = 0.1;
pub const DEFAULT_OUTPUT_ROOT: &str = "/tmp/twx_join_test";
pub const DEFAULT_INPUTS: [&str; 2] = ["/tmp/csv1.csv", "/tmp/csv2.csv"];
pub const DEFAULT_JOIN_EXECUTABLE: &str = "../../../../build/bin/table_api_test_hash";
pub const DEFAULT_GENERATOR_PROGRAM: &str = "python";
pub const DEFAULT_GENERATOR_SCRIPT: &str = "./generate_csv.py";
/// `h` = hash join outputs, `s` = sort join outputs.
pub const DEFAULT_PREFIXES: [&str; 2] = ["h", "s"];

/// Upper bound of the generated key range for a dataset of `rows` rows.
pub fn key_range_upper(rows: u64, ratio: f64) -> u64 {
    (rows as f64 * ratio).floor() as u64
}

/// Absolute, `.`/`..`-free form of `path`, with symlinks resolved as far as
/// the path exists on disk.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut normal = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other.as_os_str()),
        }
    }

    for existing in normal.ancestors() {
        if let Ok(canonical) = existing.canonicalize() {
            return match normal.strip_prefix(existing) {
                Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
                _ => canonical,
            };
        }
    }
    normal
}

/// Join flavour written by the test executable, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Right,
    Left,
    Inner,
    Outer,
}

impl JoinKind {
    pub const ALL: [JoinKind; 4] = [Self::Right, Self::Left, Self::Inner, Self::Outer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Left => "left",
            Self::Inner => "inner",
            Self::Outer => "outer",
        }
    }

    /// `{prefix}_out_{kind}.csv`
    pub fn output_file_name(self, prefix: &str) -> String {
        format!("{prefix}_out_{}.csv", self.as_str())
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CSV generator subprocess: `{program} {args..} -o PATH -r ROWS -c COLS --krange 0 MAX`.
#[derive(Debug, Clone)]
pub struct GeneratorCommand {
    pub program: PathBuf,
    /// Leading arguments, typically the generator script.
    pub args: Vec<String>,
}

impl GeneratorCommand {
    /// Full argument vector (excluding the program) for one input file.
    pub fn argv(&self, output: &Path, rows: u64, columns: u32, key_upper: u64) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        argv.push("-o".into());
        argv.push(output.as_os_str().to_owned());
        argv.push("-r".into());
        argv.push(rows.to_string().into());
        argv.push("-c".into());
        argv.push(columns.to_string().into());
        argv.push("--krange".into());
        argv.push("0".into());
        argv.push(key_upper.to_string().into());
        argv
    }
}

impl Default for GeneratorCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_GENERATOR_PROGRAM),
            args: vec![DEFAULT_GENERATOR_SCRIPT.to_string()],
        }
    }
}

/// Hash-join test executable and where it leaves its outputs.
#[derive(Debug, Clone)]
pub struct JoinCommand {
    pub executable: PathBuf,
    /// Directory the executable writes into (the user's home directory).
    pub output_dir: PathBuf,
    pub prefixes: Vec<String>,
}

impl JoinCommand {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_JOIN_EXECUTABLE),
            output_dir,
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Every file the executable is expected to produce: per kind, each prefix.
    pub fn expected_outputs(&self) -> Vec<PathBuf> {
        JoinKind::ALL
            .iter()
            .flat_map(|kind| {
                self.prefixes
                    .iter()
                    .map(move |prefix| self.output_dir.join(kind.output_file_name(prefix)))
            })
            .collect()
    }
}

/// Everything one harness run needs.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Row counts, processed in order.
    pub sizes: Vec<u64>,
    pub columns: u32,
    pub key_duplication_ratio: f64,
    /// Recreated at the start of every run.
    pub output_root: PathBuf,
    /// Fixed paths the generator writes and the join executable reads.
    pub inputs: [PathBuf; 2],
    pub generator: GeneratorCommand,
    pub join: JoinCommand,
    /// Abort on failed subprocesses and missing files; otherwise warn and go on.
    pub strict: bool,
}

impl HarnessConfig {
    /// Defaults with the join outputs expected in `home`.
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_vec(),
            columns: DEFAULT_COLUMNS,
            key_duplication_ratio: DEFAULT_KEY_DUPLICATION_RATIO,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            inputs: DEFAULT_INPUTS.map(PathBuf::from),
            generator: GeneratorCommand::default(),
            join: JoinCommand::new(home),
            strict: true,
        }
    }

    /// `{output_root}/{rows}`
    pub fn size_dir(&self, rows: u64) -> PathBuf {
        self.output_root.join(rows.to_string())
    }

    pub fn key_upper(&self, rows: u64) -> u64 {
        key_range_upper(rows, self.key_duplication_ratio)
    }

    pub fn expected_outputs(&self) -> Vec<PathBuf> {
        self.join.expected_outputs()
    }

    /// Reject configurations that cannot run or whose recreate step would wipe
    /// the inputs or the join output directory.
    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            bail!("no dataset sizes configured");
        }
        if let Some(zero) = self.sizes.iter().position(|&n| n == 0) {
            bail!("dataset size #{} is zero", zero + 1);
        }
        if self.columns == 0 {
            bail!("column count must be at least 1");
        }
        if !(self.key_duplication_ratio > 0.0 && self.key_duplication_ratio <= 1.0) {
            bail!(
                "key_duplication_ratio must be in (0, 1], got {}",
                self.key_duplication_ratio
            );
        }
        if self.join.prefixes.is_empty() {
            bail!("at least one join output prefix is required");
        }
        if self.output_root.as_os_str().is_empty() {
            bail!("output root is empty");
        }
        if self.inputs[0] == self.inputs[1] {
            bail!("both input CSVs point at {}", self.inputs[0].display());
        }

        // Compare resolved paths: `.`, `..` and relative roots must not slip past.
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        let root = resolve_path(&self.output_root, &cwd);
        if root.parent().is_none() {
            bail!(
                "refusing to use {} ({}) as output root",
                self.output_root.display(),
                root.display()
            );
        }
        for input in &self.inputs {
            if resolve_path(input, &cwd).starts_with(&root) {
                bail!(
                    "input {} lies inside output root {}",
                    input.display(),
                    root.display()
                );
            }
        }
        if resolve_path(&self.join.output_dir, &cwd).starts_with(&root) {
            bail!(
                "join output dir {} lies inside output root {}",
                self.join.output_dir.display(),
                root.display()
            );
        }
        if resolve_path(&cwd, &cwd).starts_with(&root) {
            bail!(
                "output root {} ({}) contains the current directory",
                self.output_root.display(),
                root.display()
            );
        }
        Ok(())
    }
}
