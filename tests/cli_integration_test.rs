use std::process::{Command, Output};

mod common;
use common::Fixtures;

fn xmlkit(args: &[&str], fixtures: &Fixtures) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xmlkit"))
        .args(args)
        .current_dir(fixtures.dir.path())
        .env_remove("RUST_LOG")
        .env_remove("XMLKIT_INDENT")
        .env_remove("XMLKIT_ERROR_POLICY")
        .output()
        .expect("Failed to execute xmlkit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    let output = xmlkit(&["--help"], &Fixtures::new());
    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["format", "query", "validate", "to-json"] {
        assert!(help.contains(command), "missing {} in help", command);
    }
    assert!(help.contains("--config"));
}

#[test]
fn test_format_command() {
    let fixtures = Fixtures::new();
    fixtures.write("doc.xml", "<a><b>x</b><c/></a>");

    let output = xmlkit(&["format", "doc.xml", "--indent", "4"], &fixtures);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "<a>\n    <b>x</b>\n    <c/>\n</a>\n");

    let output = xmlkit(&["format", "doc.xml", "--in-place"], &fixtures);
    assert!(output.status.success());
    let rewritten = std::fs::read_to_string(fixtures.path("doc.xml")).unwrap();
    assert_eq!(rewritten, "<a>\n  <b>x</b>\n  <c/>\n</a>\n");
}

#[test]
fn test_format_uses_discovered_config() {
    let fixtures = Fixtures::new();
    fixtures.write("doc.xml", "<a><b/></a>");
    fixtures.write("xmlkit.toml", "[format]\nindent = 3\n");

    let output = xmlkit(&["format", "doc.xml"], &fixtures);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "<a>\n   <b/>\n</a>\n");
}

#[test]
fn test_query_command() {
    let fixtures = Fixtures::orders();

    let output = xmlkit(&["query", "valid.xml", "item/sku", "--text"], &fixtures);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "widget\ngadget\n");

    let output = xmlkit(&["query", "valid.xml", "count(item)"], &fixtures);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "2");

    let output = xmlkit(&["query", "valid.xml", "missing"], &fixtures);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_validate_command() {
    let fixtures = Fixtures::orders();

    let output = xmlkit(&["validate", "-s", "order.xsd", "valid.xml"], &fixtures);
    assert!(output.status.success());

    let output = xmlkit(
        &["validate", "-s", "order.xsd", "valid.xml", "invalid.xml", "--policy", "collect"],
        &fixtures,
    );
    assert_eq!(output.status.code(), Some(1));
    let report = stdout(&output);
    assert!(report.contains("invalid.xml"));
    assert!(report.lines().all(|line| line.starts_with("invalid.xml")));

    let output = xmlkit(&["validate", "-s", "missing.xsd", "valid.xml"], &fixtures);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_to_json_command() {
    let fixtures = Fixtures::orders();
    let output = xmlkit(&["to-json", "valid.xml", "--compact"], &fixtures);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["@id"], "A-17");
    assert_eq!(json["item"][1]["sku"], "gadget");
}
