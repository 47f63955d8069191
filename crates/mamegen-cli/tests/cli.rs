use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("mamegen_cli_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn mamegen() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mamegen"))
}

const SPEC: &str = r#"mamegen {
  CONFIG {
    count 3
    reproducible true
  }
  HEADER { ["id", "name"] }
  COLUMN_RULES {
    "id" { seq 1.. }
    "name" { fixed "Al" }
  }
}"#;

#[test]
fn writes_csv_and_reports_ok() {
    let dir = temp_dir("csv");
    let spec = dir.join("spec.mame");
    let out = dir.join("out.csv");
    fs::write(&spec, SPEC).expect("write spec");

    let output = mamegen().arg(&spec).arg(&out).output().expect("run mamegen");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("OK -> "));
    let text = fs::read_to_string(&out).expect("read output");
    assert_eq!(text, "\"id\",\"name\"\n\"1\",\"Al\"\n\"2\",\"Al\"\n\"3\",\"Al\"\n");
}

#[test]
fn json_extension_selects_json() {
    let dir = temp_dir("json");
    let spec = dir.join("spec.mame");
    let out = dir.join("out.json");
    let dump = dir.join("spec.json");
    fs::write(&spec, SPEC).expect("write spec");

    let status = mamegen()
        .arg(&spec)
        .arg(&out)
        .args(["--count", "1", "--dump-spec"])
        .arg(&dump)
        .status()
        .expect("run mamegen");
    assert!(status.success());
    let rows: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read output")).expect("json");
    assert_eq!(rows, serde_json::json!([{ "id": 1, "name": "Al" }]));
    let dumped: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&dump).expect("read dump")).expect("json");
    assert_eq!(dumped["header"], serde_json::json!(["id", "name"]));
}

#[test]
fn exit_codes_distinguish_failures() {
    let dir = temp_dir("codes");
    let missing = mamegen()
        .arg(dir.join("missing.mame"))
        .arg(dir.join("out.csv"))
        .status()
        .expect("run mamegen");
    assert_eq!(missing.code(), Some(3));

    let broken = dir.join("broken.mame");
    fs::write(&broken, "mamegen {\n  CONFIG { type: CSV }\n}").expect("write spec");
    let output = mamegen()
        .arg(&broken)
        .arg(dir.join("out.csv"))
        .output()
        .expect("run mamegen");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[line 2]"));

    let encoding = dir.join("encoding.mame");
    fs::write(
        &encoding,
        "mamegen {\n  CONFIG { encoding \"martian\" }\n  HEADER { [\"a\"] }\n}",
    )
    .expect("write spec");
    let status = mamegen()
        .arg(&encoding)
        .arg(dir.join("out.csv"))
        .status()
        .expect("run mamegen");
    assert_eq!(status.code(), Some(2));

    let valid = dir.join("valid.mame");
    fs::write(&valid, SPEC).expect("write spec");
    let unwritable = mamegen()
        .arg(&valid)
        .arg(dir.join("no_such_dir").join("out.csv"))
        .status()
        .expect("run mamegen");
    assert_eq!(unwritable.code(), Some(3));
}
