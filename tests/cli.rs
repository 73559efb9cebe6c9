use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn bdiff() -> Command {
    Command::cargo_bin("bdiff").unwrap()
}

fn bpatch() -> Command {
    Command::cargo_bin("bpatch").unwrap()
}

fn sample(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ (i >> 7) as u8)
        .collect()
}

fn write(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn binary_patch(old: &Path, new: &Path) -> Vec<u8> {
    bdiff()
        .arg("-b")
        .arg(old)
        .arg(new)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone()
}

#[test]
fn test_round_trip_through_both_tools() {
    let dir = tempfile::tempdir().unwrap();
    let old_data = sample(1, 5000);
    let mut new_data = old_data.clone();
    new_data.splice(2000..2100, b"replacement text".iter().copied());
    new_data.extend_from_slice(b"trailer");

    let old = write(dir.path(), "old.bin", &old_data);
    let new = write(dir.path(), "new.bin", &new_data);
    let patch = binary_patch(&old, &new);
    assert_eq!(&patch[..8], b"bdiff02\x1A");

    let rebuilt = dir.path().join("rebuilt.bin");
    bpatch()
        .arg(&old)
        .arg(&rebuilt)
        .write_stdin(patch)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
    assert_eq!(fs::read(&rebuilt).unwrap(), new_data);
}

#[test]
fn test_patch_in_place_from_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let old_data = sample(7, 3000);
    let mut new_data = old_data.clone();
    new_data.truncate(2500);
    new_data.insert(100, b'!');

    let old = write(dir.path(), "data.bin", &old_data);
    let new = write(dir.path(), "wanted.bin", &new_data);
    let patch = dir.path().join("delta.bpatch");
    bdiff()
        .args(["-b", "-o"])
        .arg(&patch)
        .arg(&old)
        .arg(&new)
        .assert()
        .success();

    bpatch().arg("-i").arg(&patch).arg(&old).assert().success();
    assert_eq!(fs::read(&old).unwrap(), new_data);
}

#[test]
fn test_quoted_is_default_format() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "a.txt", b"");
    let new = write(dir.path(), "b.txt", b"hi\n");

    let expected = format!(
        "% --- {} (0 bytes)\n% +++ {} (3 bytes)\n+hi\\012\n",
        old.display(),
        new.display()
    );
    bdiff()
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_filtered_format_spellings() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "a.txt", b"");
    let new = write(dir.path(), "b.txt", b"a\tb");

    for flag in [&["-f"][..], &["--format", "filter"], &["--format=filtered"]] {
        bdiff()
            .args(flag)
            .arg(&old)
            .arg(&new)
            .assert()
            .success()
            .stdout(predicate::str::ends_with("+a.b\n"));
    }
}

#[test]
fn test_last_format_flag_wins() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "a.txt", b"");
    let new = write(dir.path(), "b.txt", b"x");

    bdiff()
        .args(["-b", "-q"])
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("% --- "));
}

#[test]
fn test_min_equal_accepts_hex_and_rejects_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "a.bin", &sample(3, 200));
    let new = write(dir.path(), "b.bin", &sample(3, 210));

    bdiff()
        .args(["-b", "-m", "0x10"])
        .arg(&old)
        .arg(&new)
        .assert()
        .success();

    for value in ["0", "32768", "12abc"] {
        bdiff()
            .args(["-m", value])
            .arg(&old)
            .arg(&new)
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::starts_with("bdiff: "));
    }
}

#[test]
fn test_bdiff_usage_errors() {
    bdiff()
        .arg("only-one")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("need two filenames"));

    bdiff()
        .args(["a", "b", "c"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too many file names"));

    bdiff()
        .args(["--format", "hex", "a", "b"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid format specification"));
}

#[test]
fn test_command_line_errors_name_the_program() {
    bdiff()
        .arg("--bogus")
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("bdiff: unexpected argument '--bogus'"));

    bdiff()
        .arg("-m")
        .assert()
        .code(1)
        .stderr(
            predicate::str::starts_with("bdiff: ").and(predicate::str::contains("--min-equal")),
        );

    bpatch()
        .args(["-x", "a"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("bpatch: unexpected argument '-x'"));
}

#[test]
fn test_bdiff_missing_input_names_file() {
    let dir = tempfile::tempdir().unwrap();
    let present = write(dir.path(), "present.bin", b"x");
    bdiff()
        .arg(dir.path().join("absent.bin"))
        .arg(&present)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.bin"));
}

#[test]
fn test_help_and_version_exit_zero() {
    bdiff()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--min-equal"));
    bdiff()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("bdiff "));
    bpatch()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("--input"));
    bpatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("bpatch "));
}

#[test]
fn test_bpatch_requires_file_name() {
    bpatch()
        .write_stdin(Vec::new())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("file name argument missing"));
}

#[test]
fn test_bpatch_rejects_text_patch() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "a.txt", b"abc");
    let new = write(dir.path(), "b.txt", b"abd");
    let text = bdiff()
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let dest = dir.path().join("out.txt");
    bpatch()
        .arg(&old)
        .arg(&dest)
        .write_stdin(text)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("patch not in BINARY format"));
    assert!(!dest.exists());
}

#[test]
fn test_bpatch_reports_invalid_section() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "a.bin", b"abc");
    let dest = dir.path().join("out.bin");

    let mut patch = b"bdiff02\x1A".to_vec();
    patch.extend_from_slice(&3u32.to_le_bytes());
    patch.extend_from_slice(&1u32.to_le_bytes());
    patch.push(b'X');

    bpatch()
        .arg(&old)
        .arg(&dest)
        .write_stdin(patch)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid section `X'"));
    assert!(!dest.exists());
}

#[test]
fn test_bpatch_detects_modified_source() {
    let dir = tempfile::tempdir().unwrap();
    let old_data = sample(9, 1000);
    let mut new_data = old_data.clone();
    new_data[500] ^= 0xFF;

    let old = write(dir.path(), "old.bin", &old_data);
    let new = write(dir.path(), "new.bin", &new_data);
    let patch = binary_patch(&old, &new);

    let mut tampered = old_data.clone();
    tampered[10] ^= 0x01;
    fs::write(&old, &tampered).unwrap();
    let dest = write(dir.path(), "dest.bin", b"keep me");

    bpatch()
        .arg(&old)
        .arg(&dest)
        .write_stdin(patch)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("source file does not match patch"));
    assert_eq!(fs::read(&dest).unwrap(), b"keep me");
}

#[test]
fn test_verbose_logs_to_stderr_only() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "a.bin", &sample(2, 400));
    let new = write(dir.path(), "b.bin", &sample(2, 420));

    let output = bdiff()
        .args(["-b", "-V"])
        .arg(&old)
        .arg(&new)
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("block sorting old file"))
        .stderr(predicate::str::contains("\x1b[").not())
        .get_output()
        .stdout
        .clone();
    assert_eq!(&output[..8], b"bdiff02\x1A");
}
