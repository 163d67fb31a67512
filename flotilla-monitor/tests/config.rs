use std::io::Write;

use flotilla_monitor::config::ReportConfig;
use flotilla_monitor::{Config, ConfigError, TransportConfig};
use flotilla_sync::store::UpdateOrdering;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_websocket_config() -> Result<(), ConfigError> {
    let file = write_config(
        r#"
        [transport]
        type = "websocket"
        url = "ws://localhost:8080/ws"

        [sync]
        reconnect_delay_secs = 5
        trajectory_capacity = 250
        ordering = "timestamp"
        allowed_prefixes = ["B", "C"]

        [server]
        http_addr = "127.0.0.1:9100"

        [report]
        interval_secs = 10
        "#,
    );

    let config = Config::load(file.path())?;

    match &config.transport {
        TransportConfig::WebSocket { url } => assert_eq!(url, "ws://localhost:8080/ws"),
        other => panic!("unexpected transport {other:?}"),
    }
    assert_eq!(config.sync.reconnect_delay_secs, 5);
    assert_eq!(config.sync.trajectory_capacity.get(), 250);
    assert_eq!(config.sync.ordering, UpdateOrdering::Timestamp);
    assert_eq!(config.sync.allowed_prefixes, ["B", "C"]);
    assert_eq!(config.sync.event_buffer, 100);
    assert_eq!(config.server.http_addr.port(), 9100);
    assert_eq!(config.report.interval_secs, 10);
    assert_eq!(config.report.stale_after_secs, 60);

    Ok(())
}

#[test]
fn sync_and_report_sections_are_optional() -> Result<(), ConfigError> {
    let file = write_config(
        r#"
        [transport]
        type = "simulated"
        drone_count = 12
        interval_ms = 250

        [server]
        http_addr = "0.0.0.0:8090"
        "#,
    );

    let config = Config::load(file.path())?;

    match config.transport {
        TransportConfig::Simulated {
            drone_count,
            interval_ms,
            session_secs,
        } => {
            assert_eq!(drone_count, 12);
            assert_eq!(interval_ms, 250);
            assert_eq!(session_secs, None);
        }
        other => panic!("unexpected transport {other:?}"),
    }
    assert_eq!(config.sync.reconnect_delay_secs, 3);
    assert_eq!(config.sync.trajectory_capacity.get(), 100);
    assert_eq!(config.sync.ordering, UpdateOrdering::Arrival);
    assert_eq!(config.report.interval_secs, 30);

    Ok(())
}

#[test]
fn zero_trajectory_capacity_is_rejected() {
    let file = write_config(
        r#"
        [transport]
        type = "simulated"
        drone_count = 1
        interval_ms = 100

        [sync]
        trajectory_capacity = 0

        [server]
        http_addr = "0.0.0.0:8090"
        "#,
    );

    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn non_websocket_url_is_rejected() {
    let file = write_config(
        r#"
        [transport]
        type = "websocket"
        url = "http://localhost:8080"

        [server]
        http_addr = "0.0.0.0:8090"
        "#,
    );

    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn stale_threshold_beyond_i64_is_rejected() {
    let report = ReportConfig {
        interval_secs: 30,
        stale_after_secs: u64::MAX,
    };
    assert!(matches!(report.stale_after(), Err(ConfigError::Invalid(_))));

    let report = ReportConfig {
        interval_secs: 30,
        stale_after_secs: 90,
    };
    assert_eq!(
        report.stale_after().unwrap(),
        jiff::SignedDuration::from_secs(90)
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(Config::load(&path), Err(ConfigError::Io(_))));
}

#[test]
fn defaults_run_a_simulated_fleet() {
    let config = Config::default();
    assert!(matches!(
        config.transport,
        TransportConfig::Simulated { drone_count: 8, .. }
    ));
    assert_eq!(config.server.http_addr.port(), 8090);
    assert_eq!(config.sync.allowed_prefixes, ["B"]);
}
