//! End-to-end runs of the `elog` binary over synthetic binaries folders.
//!
//! None of these reach an event store: they stop at configuration or discovery.

use assert_cmd::Command;
use elog_testing::fixtures::{self, PRODUCT_ID};
use elog_testing::BinariesFolder;
use predicates::prelude::*;
use tempfile::TempDir;

struct CliFixture {
    config_dir: TempDir,
    binaries: BinariesFolder,
}

impl CliFixture {
    fn new() -> Self {
        Self {
            config_dir: TempDir::new().expect("Failed to create temp dir"),
            binaries: BinariesFolder::new()
                .with_root_binary()
                .with_assembly("Acme.Domain.dll", fixtures::product_assembly()),
        }
    }

    #[allow(deprecated)]
    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("elog").expect("elog binary");
        cmd.env_remove("RUST_LOG")
            .env_remove("ELOG_PATH")
            .arg("--config-dir")
            .arg(self.config_dir.path());
        cmd
    }

    fn init_profile(&self) {
        self.command()
            .args(["config", "init", "--database", "shop_events", "--binaries-path"])
            .arg(self.binaries.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved profile 'default'"));
    }
}

#[test]
fn config_init_then_show() {
    let fixture = CliFixture::new();
    fixture.init_profile();

    fixture
        .command()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[default] (default)"))
        .stdout(predicate::str::contains("localhost:27017/shop_events (event-log)"))
        .stdout(predicate::str::contains("id matching: exact"));

    assert!(fixture.config_dir.path().join("config.toml").exists());
}

#[test]
fn config_init_refuses_to_overwrite() {
    let fixture = CliFixture::new();
    fixture.init_profile();

    fixture
        .command()
        .args(["config", "init", "--database", "other", "--binaries-path", "/tmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn config_show_json() {
    let fixture = CliFixture::new();
    fixture.init_profile();

    let output = fixture
        .command()
        .args(["config", "show", "--json"])
        .output()
        .expect("Failed to run config show");
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config show prints JSON");
    assert_eq!(value["default_profile"], "default");
    assert_eq!(value["profiles"]["default"]["store"]["database"], "shop_events");
}

#[test]
fn lists_aggregates_without_a_store() {
    let fixture = CliFixture::new();
    fixture.init_profile();

    fixture
        .command()
        .arg("aggregates")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Product  {}", PRODUCT_ID)));
}

#[test]
fn lists_event_types_as_json() {
    let fixture = CliFixture::new();
    fixture.init_profile();

    let output = fixture
        .command()
        .args(["events", "--json"])
        .output()
        .expect("Failed to run events");
    assert!(output.status.success());

    let events: Vec<serde_json::Value> =
        serde_json::from_slice(&output.stdout).expect("events prints a JSON array");
    let names: Vec<&str> = events.iter().filter_map(|e| e["name"].as_str()).collect();
    assert_eq!(names, vec!["ProductCreated", "ProductRenamed", "ProductView"]);
}

#[test]
fn unknown_aggregate_is_reported() {
    let fixture = CliFixture::new();
    fixture.init_profile();

    fixture
        .command()
        .args(["entities", "Invoice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error: Aggregate 'Invoice' was not found in the binaries",
        ));
}

#[test]
fn unknown_event_type_is_reported() {
    let fixture = CliFixture::new();
    fixture.init_profile();

    fixture
        .command()
        .args(["events", "--name", "ProductDeleted"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Event type 'ProductDeleted' was not found"));
}

#[test]
fn missing_profile_points_to_config_init() {
    let fixture = CliFixture::new();

    fixture
        .command()
        .arg("aggregates")
        .assert()
        .failure()
        .stderr(predicate::str::contains("elog config init"));
}

#[test]
fn missing_root_binary_is_fatal() {
    let fixture = CliFixture::new();
    fixture.init_profile();
    fixture.binaries.remove(fixtures::ROOT_BINARY);

    fixture
        .command()
        .arg("aggregates")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Root type 'AggregateRoot' not found"));
}
