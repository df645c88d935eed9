//! End-to-end tests of the `hts-codecs` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SAM_HEADER: &str = "@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:1000\tM5:6aef897c3d6ff0c78aff06ac189178dd\n@SQ\tSN:chr2\tLN:500\n";

fn hts_codecs() -> Command {
    Command::cargo_bin("hts-codecs").unwrap()
}

#[test]
fn test_detect_sam_file() {
    let dir = TempDir::new().unwrap();
    let sam = dir.path().join("sample.sam");
    std::fs::write(&sam, SAM_HEADER).unwrap();

    hts_codecs()
        .arg("detect")
        .arg(&sam)
        .assert()
        .success()
        .stdout(predicate::str::contains("Format:  SAM"))
        .stdout(predicate::str::contains("Version: 1.0.0"));
}

#[test]
fn test_detect_stdin_with_contigs_as_json() {
    hts_codecs()
        .args(["detect", "-", "--role", "READS", "--contigs", "--format", "json"])
        .write_stdin(SAM_HEADER)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"codec\": \"SAM 1.0.0\""))
        .stdout(predicate::str::contains("\"name\": \"chr2\""))
        .stdout(predicate::str::contains("6aef897c3d6ff0c78aff06ac189178dd"));
}

#[test]
fn test_detect_tsv() {
    hts_codecs()
        .args(["detect", "-", "--format", "tsv"])
        .write_stdin("CRAM\x03\x00rest-of-file")
        .assert()
        .success()
        .stdout(predicate::str::contains("source\trole\tformat\tversion\tcontigs"))
        .stdout(predicate::str::contains("<stdin>\tREADS\tCRAM\t3.0.0\t-"));
}

#[test]
fn test_detect_version_mismatch_fails() {
    hts_codecs()
        .args(["detect", "-", "--input-format", "cram", "--codec-version", "3.0"])
        .write_stdin("CRAM\x03\x01rest-of-file")
        .assert()
        .failure()
        .stderr(predicate::str::contains("detected 3.1.0"));
}

#[test]
fn test_detect_unrecognized_input_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.bam");
    std::fs::write(&path, [0u8; 16]).unwrap();

    hts_codecs()
        .arg("detect")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No codec for"))
        .stderr(predicate::str::contains("junk.bam"));
}

#[test]
fn test_bundle_discovers_index() {
    let dir = TempDir::new().unwrap();
    let bam = dir.path().join("sample.bam");
    std::fs::write(&bam, b"").unwrap();
    std::fs::write(dir.path().join("sample.bai"), b"").unwrap();

    hts_codecs()
        .arg("bundle")
        .arg(&bam)
        .arg("--discover-index")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"schemaName\": \"htsbundle\""))
        .stdout(predicate::str::contains("\"primary\": \"READS\""))
        .stdout(predicate::str::contains("\"READS_INDEX\""))
        .stdout(predicate::str::contains("sample.bai"));
}

#[test]
fn test_bundle_tsv_with_explicit_index() {
    hts_codecs()
        .args([
            "bundle",
            "calls.vcf.gz",
            "--index",
            "calls.vcf.gz.tbi",
            "--format",
            "tsv",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("VARIANT_CONTEXTS\tVCF\tcalls.vcf.gz"))
        .stdout(predicate::str::contains("VARIANTS_INDEX\t-\tcalls.vcf.gz.tbi"));
}

#[test]
fn test_bundle_role_conflict_is_reported_once() {
    hts_codecs()
        .args([
            "bundle",
            "calls.vcf.gz",
            "--role",
            "READS",
            "--index",
            "calls.bai",
            "--format",
            "tsv",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("READS\t-\tcalls.vcf.gz"))
        .stdout(predicate::str::contains("READS_INDEX\t-\tcalls.bai"))
        .stderr(predicate::function(|stderr: &str| {
            stderr
                .matches("doesn't match derived content type")
                .count()
                == 1
        }));
}

#[test]
fn test_bundle_unknown_extension_fails() {
    hts_codecs()
        .args(["bundle", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot infer a content type"));
}

#[test]
fn test_detect_bundle_document() {
    let dir = TempDir::new().unwrap();
    let sam = dir.path().join("sample.sam");
    std::fs::write(&sam, SAM_HEADER).unwrap();

    let output = hts_codecs().arg("bundle").arg(&sam).output().unwrap();
    assert!(output.status.success());
    let document = dir.path().join("sample.json");
    std::fs::write(&document, &output.stdout).unwrap();

    hts_codecs()
        .arg("detect")
        .arg(&document)
        .assert()
        .success()
        .stdout(predicate::str::contains("Role:    READS"))
        .stdout(predicate::str::contains("Format:  SAM"));
}
