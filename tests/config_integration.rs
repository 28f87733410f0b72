use ephemeral_relay::config::AppConfig;
use serial_test::serial;
use std::env;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("PORT");
        env::remove_var("STATIC_ROOT");
        env::remove_var("ALLOWED_ORIGINS");
        env::remove_var("DEFAULT_SESSION_TTL_SECONDS");
        env::remove_var("MAX_SESSION_TTL_SECONDS");
        env::remove_var("MAX_PAYLOAD_BYTES");
        env::remove_var("MAX_QUEUE_MESSAGES");
        env::remove_var("SESSION_SWEEP_MS");
        env::remove_var("RELAY_SERVER__PORT");
        env::remove_var("RELAY_RELAY__MAX_PAYLOAD_BYTES");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["ephemeral-relay"]).expect("Failed to load config");

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.static_root, ".");
    assert_eq!(config.server.allowed_origins, "");
    assert_eq!(config.relay.default_ttl_seconds, 180);
    assert_eq!(config.relay.max_ttl_seconds, 900);
    assert_eq!(config.relay.max_payload_bytes, 8192);
    assert_eq!(config.relay.max_queue_messages, 32);
    assert_eq!(config.relay.sweep_interval_ms, 30_000);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("PORT", "9090");
        env::set_var("MAX_QUEUE_MESSAGES", "8");
    }

    let config = AppConfig::load_from_args(["ephemeral-relay"]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.relay.max_queue_messages, 8);

    clear_env_vars();
}

#[test]
#[serial]
fn test_prefixed_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("RELAY_RELAY__MAX_PAYLOAD_BYTES", "1024");
    }

    let config = AppConfig::load_from_args(["ephemeral-relay"]).expect("Failed to load config");
    assert_eq!(config.relay.max_payload_bytes, 1024);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_override() {
    clear_env_vars();

    let config = AppConfig::load_from_args([
        "ephemeral-relay",
        "--port",
        "9999",
        "--default-ttl-seconds",
        "60",
        "--allowed-origins",
        "https://a.example,https://b.example",
    ])
    .expect("Failed to load config");

    assert_eq!(config.server.port, 9999);
    assert_eq!(config.relay.default_ttl_seconds, 60);
    assert_eq!(
        config.server.allowed_origins,
        "https://a.example,https://b.example"
    );
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("PORT", "9090");
    }

    let config = AppConfig::load_from_args(["ephemeral-relay", "--port", "7000"])
        .expect("Failed to load config");
    assert_eq!(config.server.port, 7000);

    clear_env_vars();
}
