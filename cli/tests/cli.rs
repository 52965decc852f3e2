use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

fn write_file(path: &Path, contents: &[u8]) {
    fs::write(path, contents).expect("write test file");
}

#[test]
fn reformats_compact_by_default() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("input.json");
    write_file(&input, b"{ \"name\" : \"Ada\", \"tags\" : [ 1 , 2.50 ] }");

    cargo_bin_cmd!("pooljson")
        .arg(&input)
        .assert()
        .success()
        .stdout("{\"name\":\"Ada\",\"tags\":[1,2.50]}\n");
}

#[test]
fn indents_from_stdin() {
    cargo_bin_cmd!("pooljson")
        .args(["--indent", "2"])
        .write_stdin(r#"{"a":[true]}"#)
        .assert()
        .success()
        .stdout("{\n  \"a\":[\n    true\n  ]\n}\n");
}

#[test]
fn validate_reports_errors_with_position() {
    cargo_bin_cmd!("pooljson")
        .arg("--validate")
        .write_stdin("{} [] 3")
        .assert()
        .success()
        .stdout("valid\n");

    cargo_bin_cmd!("pooljson")
        .arg("--validate")
        .write_stdin("[1,]")
        .assert()
        .failure()
        .stderr(contains("ERROR").and(contains("line 1")));
}

#[test]
fn comments_need_the_flag() {
    let text = "[1, /* two */ 2] // done\n";
    cargo_bin_cmd!("pooljson")
        .write_stdin(text)
        .assert()
        .failure()
        .stderr(contains("ERROR"));

    cargo_bin_cmd!("pooljson")
        .arg("--comments")
        .write_stdin(text)
        .assert()
        .success()
        .stdout("[1,2]\n");
}

#[test]
fn max_depth_limits_nesting() {
    cargo_bin_cmd!("pooljson")
        .args(["--max-depth", "2"])
        .write_stdin("[[[1]]]")
        .assert()
        .failure()
        .stderr(contains("nesting exceeds the limit of 2 levels"));
}

#[test]
fn wire_round_trip_through_files() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("input.json");
    let frame = dir.path().join("frame.bin");
    let back = dir.path().join("back.json");
    write_file(&input, br#"{"abc":1,"def":[1,2]}"#);

    cargo_bin_cmd!("pooljson")
        .arg(&input)
        .arg("--to-wire")
        .args(["-o", frame.to_str().expect("frame path")])
        .assert()
        .success()
        .stdout("");

    let bytes = fs::read(&frame).expect("read frame");
    assert_eq!(bytes.len(), 24);
    assert_eq!(&bytes[..4], &[0, 0, 0, 20]);

    cargo_bin_cmd!("pooljson")
        .arg(&frame)
        .arg("--from-wire")
        .args(["-o", back.to_str().expect("back path")])
        .assert()
        .success();

    let contents = fs::read_to_string(&back).expect("read output");
    assert_eq!(contents, "{\"abc\":1,\"def\":[1,2]}\n");
}

#[test]
fn truncated_wire_frame_fails() {
    cargo_bin_cmd!("pooljson")
        .arg("--from-wire")
        .write_stdin(vec![0u8, 0, 0, 9, b'Z'])
        .assert()
        .failure()
        .stderr(contains("wire frame truncated"));
}

#[test]
fn missing_input_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    cargo_bin_cmd!("pooljson")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(contains("no such file"));
}
