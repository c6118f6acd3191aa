//! End-to-end runs against shell-script stand-ins for the generator and the
//! join executable.
#![cfg(unix)]

mod common;

use std::sync::Mutex;

use common::{file_names, serial, Sandbox};
use joinbench_core::ProgressContext;
use joinbench_harness::{process, StepError};

#[test]
fn every_size_gets_ten_files() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    let config = sandbox.config(&[10_000, 100_000]);

    let summary = joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.sizes.len(), 2);
    assert_eq!(file_names(&sandbox.output_root), ["10000", "100000"]);
    for report in &summary.sizes {
        assert!(report.is_clean());
        assert_eq!(report.relocated, 10);
        let names = file_names(&report.dir);
        assert_eq!(names.len(), 10);
        assert!(names.contains(&"csv1.csv".to_string()));
        assert!(names.contains(&"h_out_outer.csv".to_string()));
        assert!(names.contains(&"s_out_right.csv".to_string()));
    }

    // Nothing left behind in the shared locations
    assert!(file_names(&sandbox.home).is_empty());
    assert!(!sandbox.inputs[0].exists());
    assert!(!sandbox.inputs[1].exists());
}

#[test]
fn generator_gets_tenth_of_rows_as_key_bound() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    let config = sandbox.config(&[10_000, 100_000]);

    joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap();

    for (rows, bound) in [(10_000, 1_000), (100_000, 10_000)] {
        let dir = sandbox.output_root.join(rows.to_string());
        for input in ["csv1.csv", "csv2.csv"] {
            let args = std::fs::read_to_string(dir.join(input)).unwrap();
            assert!(
                args.trim_end()
                    .ends_with(&format!("-r {rows} -c 4 --krange 0 {bound}")),
                "unexpected generator args: {args}"
            );
        }
    }
}

#[test]
fn rerun_recreates_output_root() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    std::fs::create_dir_all(sandbox.output_root.join("42")).unwrap();
    std::fs::write(sandbox.output_root.join("notes.txt"), "old run").unwrap();

    let config = sandbox.config(&[1_000]);
    joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap();
    assert_eq!(file_names(&sandbox.output_root), ["1000"]);

    let config = sandbox.config(&[2_000]);
    joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap();
    assert_eq!(file_names(&sandbox.output_root), ["2000"]);
}

#[test]
fn strict_run_stops_on_missing_output() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    sandbox.write_join(&["s_out_outer.csv"]);
    let config = sandbox.config(&[1_000, 2_000]);

    let err = joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap_err();

    let step = err
        .chain()
        .find_map(|e| e.downcast_ref::<StepError>())
        .expect("step error in chain");
    assert!(step.is_missing_artifact());
    assert!(step.to_string().contains("s_out_outer.csv"));
    // The second size never started
    assert_eq!(file_names(&sandbox.output_root), ["1000"]);
}

#[test]
fn lenient_run_counts_missing_output() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    sandbox.write_join(&["h_out_left.csv"]);
    let mut config = sandbox.config(&[1_000, 2_000]);
    config.strict = false;

    let summary = joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.sizes.len(), 2);
    for report in &summary.sizes {
        assert_eq!(report.relocated, 9);
        assert_eq!(report.missing, [sandbox.home.join("h_out_left.csv")]);
        assert!(!report.is_clean());
    }
}

#[test]
fn strict_run_stops_on_join_failure() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    sandbox.write_failing_join();
    let config = sandbox.config(&[1_000]);

    let err = joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("join executable"), "{msg}");
    assert!(msg.contains("segfault during hash build"), "{msg}");
    // Inputs stay behind; there is no cleanup on failure
    assert!(sandbox.inputs[0].exists());
}

#[test]
fn stale_outputs_are_not_relocated() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.home.join("h_out_inner.csv"), "stale").unwrap();
    sandbox.write_join(&["h_out_inner.csv"]);
    let mut config = sandbox.config(&[1_000]);
    config.strict = false;

    let summary = joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.sizes[0].missing.len(), 1);
    assert!(!sandbox.home.join("h_out_inner.csv").exists());
}

#[test]
fn preflight_leaves_output_root_alone() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    std::fs::create_dir_all(&sandbox.output_root).unwrap();
    std::fs::write(sandbox.output_root.join("keep.txt"), "previous").unwrap();
    let mut config = sandbox.config(&[1_000]);
    config.join.executable = sandbox.dir.path().join("missing_binary");

    let err = joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap_err();

    assert!(err.to_string().contains("join executable not found"), "{err}");
    assert_eq!(file_names(&sandbox.output_root), ["keep.txt"]);
}

#[test]
fn join_output_is_streamed_on_success() {
    let _guard = serial();
    let sandbox = Sandbox::new();
    sandbox.write_join_after(
        "echo 'Operation took : 42 ms' >&2\necho 'joined 1000 rows'\n",
        &[],
    );
    let config = sandbox.config(&[1_000]);
    for input in &sandbox.inputs {
        std::fs::write(input, "k,v\n").unwrap();
    }

    let seen = Mutex::new(Vec::new());
    let sink = |line: &str| seen.lock().unwrap().push(line.to_string());
    process::run_join(&config.join, &sink).unwrap();

    let seen = seen.into_inner().unwrap();
    assert!(seen.contains(&"Operation took : 42 ms".to_string()), "{seen:?}");
    assert!(seen.contains(&"joined 1000 rows".to_string()), "{seen:?}");
    assert_eq!(file_names(&sandbox.home).len(), 8);

    // The same executable passes through a full run
    joinbench_harness::run(&config, &ProgressContext::hidden()).unwrap();
    assert_eq!(file_names(&sandbox.output_root.join("1000")).len(), 10);
}
