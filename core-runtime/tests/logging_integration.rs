//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{redact_if_sensitive, strip_path, LogFormat, LoggingConfig};

#[test]
fn test_logging_config() {
    // Logging can only be initialized once per process, so exercise the builder.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_pii_redaction(true)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.redact_pii);
    assert!(config.enable_spans);
}

#[test]
fn test_credential_fields_are_redacted() {
    assert_eq!(redact_if_sensitive("token", "ghp_abc123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("credential", "ghp_abc123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
}

#[test]
fn test_account_emails_are_masked() {
    let redacted = redact_if_sensitive("account", "octocat@example.com");

    assert!(redacted.starts_with('o'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_sync_fields_pass_through() {
    assert_eq!(redact_if_sensitive("playlist_id", "42"), "42");
    assert_eq!(redact_if_sensitive("playlist_name", "Road trip"), "Road trip");
    assert_eq!(redact_if_sensitive("remote", "octocat/music"), "octocat/music");
}

#[test]
fn test_path_stripping() {
    assert_eq!(
        strip_path("/home/me/.local/share/tunesync/play_history.json"),
        "play_history.json"
    );
    assert_eq!(
        strip_path("C:\\Users\\Me\\AppData\\tunesync\\settings.db"),
        "settings.db"
    );
    assert_eq!(strip_path("playlists.json"), "playlists.json");
    assert_eq!(strip_path("/var/log/"), "");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_filter_configuration() {
    let config = LoggingConfig::default().with_filter("core_sync=trace,provider_github=debug");

    assert_eq!(
        config.filter.as_deref(),
        Some("core_sync=trace,provider_github=debug")
    );
}
