use std::env;
use std::sync::{Mutex, OnceLock};

use guardian_cli::commands::{alerts, ask, config, doctor, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_in_memory_database() {
    with_env(&[("GUARDIAN_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_url() {
    with_env(&[("GUARDIAN_DATABASE_URL", "postgres://localhost/guardian")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_and_verifies_demo_inventory() {
    with_env(&[("GUARDIAN_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("4 products, 4 shipments"));
        assert!(message.contains("  - Cocoa Powder"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_url(&dir);
    with_env(&[("GUARDIAN_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.exit_code, 0);
        assert_eq!(second.exit_code, 0);

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn ask_routes_stock_question_to_ops_without_a_model() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_url(&dir);
    with_env(&[("GUARDIAN_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = ask::run("What are the current stock levels?");
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["details"]["agent"], "ops");
        assert_eq!(payload["details"]["routing"], "keyword");
        assert_eq!(payload["details"]["reply_mode"], "fallback");
        assert!(payload["message"].as_str().unwrap_or("").contains("Cocoa Powder"));
    });
}

#[test]
fn ask_rejects_blank_query() {
    with_env(&[("GUARDIAN_DATABASE_URL", "sqlite::memory:")], || {
        let result = ask::run("   ");
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_query");
    });
}

#[test]
fn alerts_check_records_each_alert_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_url(&dir);
    with_env(&[("GUARDIAN_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let first = parse_payload(&alerts::run(false).output);
        assert_eq!(first["status"], "ok");
        assert_eq!(first["details"]["created"].as_array().map(Vec::len), Some(2));
        assert_eq!(first["details"]["delayed_shipments_checked"], 1);

        let second = parse_payload(&alerts::run(false).output);
        assert_eq!(second["details"]["created"].as_array().map(Vec::len), Some(0));
        assert_eq!(second["details"]["duplicates_skipped"], 2);

        let summary = parse_payload(&alerts::run(true).output);
        assert_eq!(summary["details"]["total_active"], 2);
        assert_eq!(summary["message"], "2 active alerts (1 high, 1 medium, 0 low)");
    });
}

#[test]
fn config_reports_redacted_sources() {
    with_env(
        &[("GUARDIAN_DATABASE_URL", "sqlite::memory:"), ("WEATHER_API_KEY", "owm-test-key")],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains(
                "- database.url = sqlite::memory: (source: env (GUARDIAN_DATABASE_URL))"
            ));
            assert!(message
                .contains("- weather.api_key = set (redacted) (source: env (WEATHER_API_KEY))"));
            assert!(!message.contains("owm-test-key"));
        },
    );
}

#[test]
fn doctor_reports_mock_sources_as_degraded() {
    with_env(&[("GUARDIAN_DATABASE_URL", "sqlite::memory:")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "degraded");
        let checks = report["checks"].as_array().cloned().unwrap_or_default();
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("weather_source"), "degraded");
        assert_eq!(status_of("alert_channel"), "degraded");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn file_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("guardian.db").display())
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "GUARDIAN_DATABASE_URL",
        "GUARDIAN_DATABASE_MAX_CONNECTIONS",
        "GUARDIAN_DATABASE_TIMEOUT_SECS",
        "GUARDIAN_LLM_PROVIDER",
        "GUARDIAN_LLM_API_KEY",
        "GUARDIAN_LLM_BASE_URL",
        "GUARDIAN_LLM_MODEL",
        "GUARDIAN_WEATHER_API_KEY",
        "GUARDIAN_NEWS_API_KEY",
        "GUARDIAN_ALERTING_PUBSUB_TOPIC",
        "GUARDIAN_ALERTING_PUBSUB_ACCESS_TOKEN",
        "GUARDIAN_LOGGING_LEVEL",
        "GUARDIAN_LOGGING_FORMAT",
        "GUARDIAN_LOG_LEVEL",
        "GUARDIAN_LOG_FORMAT",
        "DB_CONNECTION_STRING",
        "WEATHER_API_KEY",
        "NEWS_API_KEY",
        "PUBSUB_TOPIC",
        "ALERT_EMAIL",
        "GOOGLE_CLOUD_PROJECT",
        "PORT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
