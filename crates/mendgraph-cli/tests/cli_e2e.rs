use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;

const DAMAGED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<languageproject version="7000072">
<rt class="LexEntry" guid="00000000-0000-0000-0000-000000000001">
<Senses>
<objsur guid="00000000-0000-0000-0000-000000000002" t="o"/>
<objsur guid="00000000-0000-0000-0000-000000000009" t="o"/>
</Senses>
</rt>
<rt class="LexSense" guid="00000000-0000-0000-0000-000000000002" ownerguid="00000000-0000-0000-0000-000000000001"/>
</languageproject>
"#;

fn mendgraph_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mendgraph"))
}

fn run(args: &[&str], doc: &Path) -> Output {
    Command::new(mendgraph_bin())
        .args(args)
        .arg(doc)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("run mendgraph")
}

fn write_doc(dir: &Path) -> PathBuf {
    let path = dir.join("sena.fwdata");
    fs::write(&path, DAMAGED).expect("write fixture");
    path
}

#[test]
fn check_fails_on_damage_unless_told_not_to() {
    let dir = tempdir().unwrap();
    let doc = write_doc(dir.path());

    let out = run(&["check"], &doc);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("would repair"));

    let out = run(&["check", "--no-fail"], &doc);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&doc).unwrap(), DAMAGED);
}

#[test]
fn repair_then_check_is_clean() {
    let dir = tempdir().unwrap();
    let doc = write_doc(dir.path());

    let out = run(&["repair"], &doc);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(dir.path().join("sena.fwdata.bak").exists());
    assert!(dir.path().join("sena.fwdata.fixlog").exists());

    let out = run(&["check"], &doc);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("needs no repair"));
}

#[test]
fn repair_flags_override_extensions() {
    let dir = tempdir().unwrap();
    let doc = write_doc(dir.path());

    let out = run(&["repair", "--backup-extension", "orig", "--log-extension", "changes"], &doc);
    assert!(out.status.success());
    assert!(dir.path().join("sena.fwdata.orig").exists());
    assert!(dir.path().join("sena.fwdata.changes").exists());
}

#[test]
fn stats_json_reports_class_counts() {
    let dir = tempdir().unwrap();
    let doc = write_doc(dir.path());

    let out = run(&["stats", "--format", "json"], &doc);
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["stats"]["nodes"], 2);
    assert_eq!(report["stats"]["classes"]["LexEntry"], 1);
}

#[test]
fn unreadable_document_is_an_error() {
    let dir = tempdir().unwrap();
    let doc = dir.path().join("broken.fwdata");
    fs::write(&doc, "<notaproject/>").unwrap();

    let out = run(&["repair"], &doc);
    assert!(!out.status.success());
    assert_eq!(fs::read_to_string(&doc).unwrap(), "<notaproject/>");
}
