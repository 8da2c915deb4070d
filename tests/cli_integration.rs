use std::io::Write;
use std::process::{Command, Output, Stdio};

fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("filterc_")
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn run_filterc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_filterc"))
        .args(args)
        .env_remove("FILTERC_SCHEMA")
        .env_remove("RUST_LOG")
        .output()
        .expect("run filterc")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect()
}

#[test]
fn compiles_tracking_query_to_document() {
    let output = run_filterc(&["--format", "json", "(distance gt 100) or (date eq 2020-03-22)"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let branches = doc["$or"].as_array().expect("$or array");
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0]["distance"]["$gt"].as_f64(), Some(100.0));
    assert_eq!(branches[1]["date"]["$eq"], "2020-03-22T00:00:00Z");
}

#[test]
fn user_schema_accepts_email_that_tracking_rejects() {
    let output = run_filterc(&["-s", "user", "email eq bahsjdbasd@gmail.com"]);
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["email"]["$eq"], "bahsjdbasd@gmail.com");

    let output = run_filterc(&["-s", "tracking", "email eq bahsjdbasd@gmail.com"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown term 'email'"), "{stderr}");
}

#[test]
fn reports_each_failure_and_exits_nonzero() {
    let output = run_filterc(&[
        "--format",
        "query",
        "distance gt 100 and time lt 10000s",
        "time gt not-a-duration",
        "((distance gt 1)",
    ]);
    assert!(!output.status.success());

    assert_eq!(
        stdout_lines(&output),
        vec!["(distance gt 100) and (time lt 10000s)"]
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("query 2: invalid value 'not-a-duration'"), "{stderr}");
    assert!(stderr.contains("query 3: incorrect parenthesis query"), "{stderr}");
}

#[test]
fn batch_file_with_config_schema() {
    let config = write_temp(
        "default_schema: route\npretty: false\nschemas:\n  route:\n    laps: int32\n    surface: text\n",
        ".yaml",
    );
    let batch = write_temp(
        "laps gt 3\n\nsurface eq gravel or laps lt 2\nsurface eq mud42\n",
        ".txt",
    );

    let output = run_filterc(&[
        "--config",
        config.path().to_str().unwrap(),
        "--batch",
        batch.path().to_str().unwrap(),
        "--threads",
        "2",
    ]);
    assert!(!output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(first, serde_json::json!({ "laps": { "$gt": 3 } }));
    let second: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(
        second,
        serde_json::json!({ "$or": [
            { "surface": { "$eq": "gravel" } },
            { "laps": { "$lt": 2 } },
        ] })
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(":4: invalid value 'mud42'"), "{stderr}");
}

#[test]
fn batch_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_filterc"))
        .args(["--format", "query", "--batch", "-"])
        .env_remove("FILTERC_SCHEMA")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn filterc");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(b"distance gt 100\ntime lt 90s or distance lt 5\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for filterc");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_lines(&output),
        vec!["distance gt 100", "(time lt 90s) or (distance lt 5)"]
    );
}

#[test]
fn yaml_output() {
    let output = run_filterc(&["-f", "yaml", "weather.windspeed lt 12.5"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("---\n"), "{stdout}");
    assert!(stdout.contains("weather.windspeed:"), "{stdout}");
    assert!(stdout.contains("12.5"), "{stdout}");
}

#[test]
fn empty_filter_matches_everything() {
    let output = run_filterc(&["--format", "json", ""]);
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["{}"]);
}

#[test]
fn lists_schema_fields() {
    let output = run_filterc(&["--list-fields"]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"date\ttimestamp".to_string()));
    assert!(lines.contains(&"time\tduration".to_string()));
    assert!(lines.contains(&"distance\tfloat32".to_string()));
    assert_eq!(lines.len(), 12);
}

#[test]
fn unknown_schema_is_rejected() {
    let output = run_filterc(&["-s", "weather", "temperature gt 5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown schema 'weather'"), "{stderr}");
}
