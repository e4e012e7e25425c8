//! End-to-end runs of the built `mjc` binary on real source files.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::PathBuf;
use std::process::Command;

const FACTORIAL: &str = "
class Factorial {
    public static void main(String[] a) {
        Fac f;
        f = new Fac();
        System.out.println(f.compute(10));
    }
}
class Fac {
    public int compute(int num) {
        int rv;
        if (num < 1) { rv = 1; } else { rv = num * (this.compute(num - 1)); }
        return rv;
    }
}
";

/// Fresh per-test directory under the system temp dir. Cleared up front
/// so a stale output from an earlier run cannot satisfy an assertion.
fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mjc-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn mjc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mjc"))
}

#[test]
fn compiles_a_unit_next_to_its_source() {
    let dir = scratch_dir("compile");
    let src = dir.join("Factorial.java");
    fs::write(&src, FACTORIAL).unwrap();

    let output = mjc().arg(&src).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "To view field and method offsets for each class rerun with --offsets\n"
    );

    let ir = fs::read_to_string(dir.join("Factorial.ll")).unwrap();
    assert!(ir.starts_with(
        ";for each class, declare a global vTable containing a pointer for each method\n"
    ));
    assert!(ir.contains("@.Factorial_vtable = global [0 x i8*] []"));
    assert!(ir.contains(
        "@.Fac_vtable = global [1 x i8*] [i8* bitcast (i32 (i8*, i32)* @Fac.compute to i8*)]"
    ));
    assert!(ir.contains("define i32 @main() {"));
    assert!(ir.contains("\t%_9 = call i32 %_8(i8* %_3, i32 10)"));
    assert!(ir.contains(";Fac.compute\ndefine i32 @Fac.compute(i8* %this, i32 %.num) {"));
    assert!(ir.ends_with("\tret i32 %_12\n}\n\n"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn offsets_flag_prints_the_report_instead_of_the_hint() {
    let dir = scratch_dir("offsets");
    let src = dir.join("Factorial.java");
    fs::write(&src, FACTORIAL).unwrap();

    let output = mjc().arg("--offsets").arg(&src).output().unwrap();
    assert!(output.status.success());

    let report = String::from_utf8(output.stdout).unwrap();
    assert!(report.starts_with("Offsets\n-------\n"));
    assert!(report.contains("Class: Fac\n"));
    assert!(report.contains("\t\tFac.compute: 0\n"));
    assert!(!report.contains("rerun with --offsets"));

    assert!(dir.join("Factorial.ll").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn a_failing_unit_is_reported_and_leaves_no_output() {
    let dir = scratch_dir("failing");
    let bad = dir.join("Broken.java");
    fs::write(
        &bad,
        "class Main { public static void main(String[] a) { System.out.println(1) } }",
    )
    .unwrap();
    let good = dir.join("Fine.java");
    fs::write(
        &good,
        "class Main { public static void main(String[] a) { System.out.println(5); } }",
    )
    .unwrap();

    let output = mjc().arg(&bad).arg(&good).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Broken.java: line 1: expected"));
    assert!(!dir.join("Broken.ll").exists());
    assert!(dir.join("Fine.ll").exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn no_inputs_prints_usage_and_fails() {
    let output = mjc().output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Usage: mjc [--offsets] <file.java>..."));
}

#[test]
fn unknown_flags_are_rejected_up_front() {
    let output = mjc()
        .args(["--frobnicate", "Factorial.java"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Unknown flag: --frobnicate"));
    assert!(stderr.contains("Usage: mjc [--offsets] <file.java>..."));
}
