//! Test plan for the `roomcast-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use roomcast_config::{load, AppConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "ROOMCAST_CONFIG",
    "ROOMCAST__HTTP__ADDRESS",
    "ROOMCAST__HTTP__PORT",
    "ROOMCAST__DATABASE__URL",
    "ROOMCAST__DATABASE__MAX_CONNECTIONS",
    "ROOMCAST__REDIS__URL",
    "ROOMCAST__REDIS__CACHE_TTL_SECONDS",
    "ROOMCAST__IDENTITY__BASE_URL",
    "ROOMCAST__ROOMS__DIRECTORY_URL",
    "ROOMCAST__CHAT__MAX_MESSAGE_SIZE",
    "ROOMCAST__CHAT__HUB_IDLE_TIMEOUT_SECONDS",
    "ROOMCAST__CHAT__OUTBOUND_QUEUE_CAPACITY",
    "ROOMCAST__CHAT__PONG_WAIT_SECONDS",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.redis.url, defaults.redis.url);
    assert_eq!(config.identity.base_url, defaults.identity.base_url);
    assert_eq!(config.rooms.directory_url, defaults.rooms.directory_url);
    assert_eq!(config.chat.max_message_size, 512);
    assert_eq!(config.chat.outbound_queue_capacity, 256);
    assert_eq!(config.chat.topic_prefix, "pubsub:chat:");
    assert_eq!(config.chat.default_avatar, defaults.chat.default_avatar);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "roomcast.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/roomcast.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "roomcast.toml",
        r#"
        [chat]
        hub_idle_timeout_seconds = 120

        [identity]
        base_url = "http://identity.internal"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.chat.hub_idle_timeout_seconds, 120);
    assert_eq!(config.chat.max_message_size, defaults.chat.max_message_size);
    assert_eq!(config.identity.base_url, "http://identity.internal");
    assert_eq!(
        config.identity.request_timeout_seconds,
        defaults.identity.request_timeout_seconds
    );
    assert_eq!(config.http.port, defaults.http.port);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "roomcast.toml",
        r#"
        [redis]
        url = "redis://from-file:6379"
        "#,
    );
    ctx.set_var("ROOMCAST__REDIS__URL", "redis://from-env:6379");
    ctx.set_var("ROOMCAST__HTTP__PORT", "9191");

    let config = load().expect("environment overrides should apply");
    assert_eq!(config.redis.url, "redis://from-env:6379");
    assert_eq!(config.http.port, 9191);
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "roomcast.toml",
        r#"
        [http]
        port = 1111
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [http]
        port = 2222
        "#,
    );
    let explicit = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("ROOMCAST_CONFIG", explicit.display().to_string());

    let config = load().expect("explicit config path should load");
    assert_eq!(config.http.port, 2222);
}

#[test]
#[serial]
fn load_rejects_zero_message_size() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("ROOMCAST__CHAT__MAX_MESSAGE_SIZE", "0");

    let error = load().expect_err("zero message size must be rejected");
    assert!(error.to_string().contains("max_message_size"));
}

#[test]
#[serial]
fn load_rejects_zero_pong_wait() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("ROOMCAST__CHAT__PONG_WAIT_SECONDS", "0");

    let error = load().expect_err("zero pong wait must be rejected");
    assert!(error.to_string().contains("pong_wait_seconds"));
}
