use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, NamedTempFile};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notion_sync() -> Command {
    let mut cmd = Command::cargo_bin("notion-sync").expect("Binary exists");
    cmd.env_remove("NOTION_API_KEY")
        .env_remove("NOTION_DATABASE_ID")
        .env("RUST_LOG", "info");
    cmd
}

fn config_pointing_at(server: &MockServer, output_dir: &std::path::Path) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    fs::write(
        config.path(),
        format!(
            "notion:\n  base_url: \"{}\"\n  timeout_secs: 5\nsync:\n  output_dir: \"{}\"\n",
            server.uri(),
            output_dir.display()
        ),
    )
    .expect("Writing temp config failed");
    config
}

async fn mount_database(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "id": "page-hello",
                    "properties": {
                        "Name": {"type": "title", "title": [{"plain_text": "Hello"}]},
                        "Slug": {"type": "rich_text", "rich_text": [{"plain_text": "hello"}]}
                    }
                },
                {
                    "id": "page-untitled",
                    "properties": {
                        "Name": {"type": "title", "title": []},
                        "Slug": {"type": "rich_text", "rich_text": [{"plain_text": "untitled"}]}
                    }
                }
            ],
            "has_more": false,
            "next_cursor": null
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/page-hello/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": "b1", "type": "paragraph", "has_children": false,
                 "paragraph": {"rich_text": [{"plain_text": "Hi there", "annotations": {"bold": true}}]}}
            ],
            "has_more": false,
            "next_cursor": null
        })))
        .mount(server)
        .await;
}

#[test]
fn sync_cli_help_lists_flags() {
    notion_sync()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config").and(predicate::str::contains("--output-dir")));
}

#[test]
fn sync_cli_fails_naming_missing_credential() {
    let out = tempdir().unwrap();
    notion_sync()
        .current_dir(out.path())
        .arg("sync")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("NOTION_API_KEY"));
    assert!(
        fs::read_dir(out.path()).unwrap().next().is_none(),
        "Nothing may be written before credentials are resolved"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_cli_happy_flow_writes_documents_and_manifest() {
    let server = MockServer::start().await;
    mount_database(&server).await;
    let out = tempdir().unwrap();
    let config = config_pointing_at(&server, out.path());

    notion_sync()
        .arg("sync")
        .arg("--config")
        .arg(config.path())
        .env("NOTION_API_KEY", "secret_test")
        .env("NOTION_DATABASE_ID", "db-1")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("1 processed, 1 skipped")
                .and(predicate::str::contains("page-untitled")),
        );

    let html = fs::read_to_string(out.path().join("hello.html")).expect("document written");
    assert!(html.contains("<title>Hello</title>"));
    assert!(html.contains("<strong>Hi there</strong>"));
    assert!(!out.path().join("untitled.html").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("posts.json")).unwrap()).unwrap();
    let entries = manifest.as_array().expect("manifest is an array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["slug"], "hello");
    assert_eq!(entries[0]["title"], "Hello");
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_cli_output_dir_flag_overrides_config() {
    let server = MockServer::start().await;
    mount_database(&server).await;
    let configured = tempdir().unwrap();
    let overridden = tempdir().unwrap();
    let config = config_pointing_at(&server, configured.path());

    notion_sync()
        .arg("sync")
        .arg("--config")
        .arg(config.path())
        .arg("--output-dir")
        .arg(overridden.path())
        .env("NOTION_API_KEY", "secret_test")
        .env("NOTION_DATABASE_ID", "db-1")
        .assert()
        .success();

    assert!(overridden.path().join("hello.html").exists());
    assert!(overridden.path().join("posts.json").exists());
    assert!(!configured.path().join("posts.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_cli_source_failure_exits_non_zero_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"code\":\"unauthorized\"}"))
        .mount(&server)
        .await;
    let out = tempdir().unwrap();
    let config = config_pointing_at(&server, out.path());

    notion_sync()
        .arg("sync")
        .arg("--config")
        .arg(config.path())
        .env("NOTION_API_KEY", "wrong")
        .env("NOTION_DATABASE_ID", "db-1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("content source unavailable"));

    assert!(!out.path().join("posts.json").exists());
}

/// Collects the debug rendering of every emitted event.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use notion_sync::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Sync {
            config: Some(std::path::PathBuf::from("dummy.yaml")),
            output_dir: None,
        },
    };

    let err = run(cli).await.expect_err("a missing config file is an error");
    assert!(err.to_string().contains("dummy.yaml"));

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
