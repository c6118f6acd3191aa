#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use joinbench_harness::{GeneratorCommand, HarnessConfig, JoinCommand, JoinKind};
use tempfile::TempDir;

/// Scripts are written then executed; serializing tests keeps another
/// thread's fork from holding a write fd open (ETXTBSY).
pub fn serial() -> MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Temp layout standing in for /tmp, $HOME and the two external programs.
pub struct Sandbox {
    pub dir: TempDir,
    pub home: PathBuf,
    pub inputs: [PathBuf; 2],
    pub output_root: PathBuf,
    pub generator: PathBuf,
    pub join: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let tmp = dir.path().join("tmp");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::create_dir_all(&tmp).unwrap();

        // Records its own arguments as the CSV body: -o PATH -r N -c C --krange 0 MAX
        let generator = dir.path().join("generate_csv.sh");
        write_script(&generator, "echo \"$@\" > \"$2\"\n");

        let sandbox = Self {
            inputs: [tmp.join("csv1.csv"), tmp.join("csv2.csv")],
            output_root: tmp.join("join_test"),
            join: dir.path().join("table_api_test_hash"),
            generator,
            home,
            dir,
        };
        sandbox.write_join(&[]);
        sandbox
    }

    /// Fake join executable: checks both inputs exist and writes every
    /// `{h,s}_out_{kind}.csv` except the names in `skip`.
    pub fn write_join(&self, skip: &[&str]) {
        self.write_join_after("", skip);
    }

    /// Like [`Sandbox::write_join`], running `prelude` once the inputs are checked.
    pub fn write_join_after(&self, prelude: &str, skip: &[&str]) {
        let mut body = format!(
            "cat \"{}\" \"{}\" > /dev/null || exit 1\n{prelude}",
            self.inputs[0].display(),
            self.inputs[1].display()
        );
        for kind in JoinKind::ALL {
            for prefix in ["h", "s"] {
                let name = kind.output_file_name(prefix);
                if skip.contains(&name.as_str()) {
                    continue;
                }
                body.push_str(&format!(
                    "echo {kind} > \"{}\"\n",
                    self.home.join(&name).display()
                ));
            }
        }
        write_script(&self.join, &body);
    }

    /// Fake join executable that fails outright.
    pub fn write_failing_join(&self) {
        write_script(&self.join, "echo 'segfault during hash build' >&2\nexit 1\n");
    }

    pub fn config(&self, sizes: &[u64]) -> HarnessConfig {
        HarnessConfig {
            sizes: sizes.to_vec(),
            output_root: self.output_root.clone(),
            inputs: self.inputs.clone(),
            generator: GeneratorCommand {
                program: self.generator.clone(),
                args: Vec::new(),
            },
            join: JoinCommand {
                executable: self.join.clone(),
                ..JoinCommand::new(self.home.clone())
            },
            ..HarnessConfig::with_home(self.home.clone())
        }
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
