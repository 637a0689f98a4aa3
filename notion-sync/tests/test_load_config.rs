use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use notion_sync::load_config::load_config;
use notion_sync_core::artifact::OutputKeyPolicy;
use notion_sync_core::filter::Comparator;

fn set_secrets() {
    env::set_var("NOTION_API_KEY", "secret_abc");
    env::set_var("NOTION_DATABASE_ID", "db-42");
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[test]
#[serial]
fn test_load_config_merges_file_sections_with_env_secrets() {
    let file = config_file(
        r#"
notion:
  base_url: "http://localhost:9999"
  timeout_secs: 5
sync:
  output_dir: ./site
  filter:
    property: Status
    value: Live
    comparator: does_not_equal
  fields:
    title: Title
    output_key: Permalink
  render:
    escape_title: true
  output_keys: safe_segment
"#,
    );
    set_secrets();

    let config = load_config(Some(file.path())).expect("Config should load");

    assert_eq!(config.notion.api_key, "secret_abc");
    assert_eq!(config.notion.database_id, "db-42");
    assert_eq!(config.notion.api.base_url, "http://localhost:9999");
    assert_eq!(config.notion.api.timeout_secs, 5);
    assert_eq!(config.notion.api.version, "2022-06-28", "Unset keys keep defaults");

    assert_eq!(config.sync.output_dir, PathBuf::from("./site"));
    assert_eq!(config.sync.filter.property, "Status");
    assert_eq!(config.sync.filter.value, "Live");
    assert_eq!(config.sync.filter.comparator, Comparator::DoesNotEqual);
    assert_eq!(config.sync.filter.property_type, "select");
    assert_eq!(config.sync.fields.title, "Title");
    assert_eq!(config.sync.fields.output_key, "Permalink");
    assert!(config.sync.render.escape_title);
    assert_eq!(config.sync.output_keys, OutputKeyPolicy::SafeSegment);
    assert_eq!(config.sync.manifest_name, "posts.json");
}

#[test]
#[serial]
fn test_load_config_without_file_uses_defaults() {
    set_secrets();

    let config = load_config(None::<PathBuf>).expect("Defaults should load");

    assert_eq!(config.notion.api.base_url, "https://api.notion.com");
    assert_eq!(config.sync.output_dir, PathBuf::from("."));
    assert_eq!(config.sync.filter.property, "status");
    assert_eq!(config.sync.filter.value, "Published");
    assert_eq!(config.sync.fields.title, "Name");
    assert_eq!(config.sync.fields.output_key, "Slug");
    assert!(!config.sync.render.escape_title);
    assert_eq!(config.sync.output_keys, OutputKeyPolicy::Verbatim);
}

#[test]
#[serial]
fn test_load_config_accepts_empty_file() {
    let file = config_file("");
    set_secrets();

    let config = load_config(Some(file.path())).expect("Empty file means defaults");
    assert_eq!(config.sync.manifest_name, "posts.json");
}

#[test]
#[serial]
fn test_load_config_errors_name_missing_or_empty_secrets() {
    set_secrets();
    env::remove_var("NOTION_API_KEY");
    let err = load_config(None::<PathBuf>).unwrap_err();
    assert!(err.to_string().contains("NOTION_API_KEY"), "got: {err}");

    set_secrets();
    env::set_var("NOTION_DATABASE_ID", "   ");
    let err = load_config(None::<PathBuf>).unwrap_err();
    assert!(err.to_string().contains("NOTION_DATABASE_ID"), "got: {err}");
    assert!(err.to_string().contains("empty"), "got: {err}");

    set_secrets();
}

#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    let file = config_file("not-yaml: [:::");
    set_secrets();

    let err = load_config(Some(file.path())).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_rejects_unknown_output_key_policy() {
    let file = config_file("sync:\n  output_keys: anything_goes\n");
    set_secrets();

    assert!(load_config(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    set_secrets();
    let err = load_config(Some("/definitely/not/here.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"), "got: {err}");
}
