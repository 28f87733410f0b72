use clap::Parser;
use config::{Config, Environment};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to static files
    #[arg(long, env = "STATIC_ROOT")]
    pub static_root: Option<String>,

    /// Comma-separated list of allowed CORS origins
    #[arg(long, env = "ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,

    /// Session TTL in seconds when the client does not request one
    #[arg(long, env = "DEFAULT_SESSION_TTL_SECONDS")]
    pub default_ttl_seconds: Option<i64>,

    /// Ceiling on the requested session TTL in seconds
    #[arg(long, env = "MAX_SESSION_TTL_SECONDS")]
    pub max_ttl_seconds: Option<i64>,

    /// Maximum serialized payload size in bytes
    #[arg(long, env = "MAX_PAYLOAD_BYTES")]
    pub max_payload_bytes: Option<i64>,

    /// Maximum queued messages per session before front-drop
    #[arg(long, env = "MAX_QUEUE_MESSAGES")]
    pub max_queue_messages: Option<i64>,

    /// Expiry sweep interval in milliseconds
    #[arg(long, env = "SESSION_SWEEP_MS")]
    pub sweep_interval_ms: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub static_root: String,
    /// Raw comma-separated origin list; empty means any origin.
    pub allowed_origins: String,
}

/// Limits applied by the relay operations.
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    pub default_ttl_seconds: u64,
    pub max_ttl_seconds: u64,
    pub max_payload_bytes: usize,
    pub max_queue_messages: usize,
    pub sweep_interval_ms: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        builder = builder
            .set_default("server.port", 8080_i64)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_root", ".")?
            .set_default("server.allowed_origins", "")?
            .set_default("relay.default_ttl_seconds", 180_i64)?
            .set_default("relay.max_ttl_seconds", 900_i64)?
            .set_default("relay.max_payload_bytes", 8192_i64)?
            .set_default("relay.max_queue_messages", 32_i64)?
            .set_default("relay.sweep_interval_ms", 30_000_i64)?;

        // CLI flags (and their clap-bound env vars) override defaults.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(root) = cli.static_root {
            builder = builder.set_override("server.static_root", root)?;
        }
        if let Some(origins) = cli.allowed_origins {
            builder = builder.set_override("server.allowed_origins", origins)?;
        }
        if let Some(ttl) = cli.default_ttl_seconds {
            builder = builder.set_override("relay.default_ttl_seconds", ttl)?;
        }
        if let Some(ttl) = cli.max_ttl_seconds {
            builder = builder.set_override("relay.max_ttl_seconds", ttl)?;
        }
        if let Some(bytes) = cli.max_payload_bytes {
            builder = builder.set_override("relay.max_payload_bytes", bytes)?;
        }
        if let Some(count) = cli.max_queue_messages {
            builder = builder.set_override("relay.max_queue_messages", count)?;
        }
        if let Some(ms) = cli.sweep_interval_ms {
            builder = builder.set_override("relay.sweep_interval_ms", ms)?;
        }

        // Prefixed environment variables for any remaining keys,
        // e.g. RELAY_SERVER__PORT=8000.
        builder = builder.add_source(
            Environment::with_prefix("RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
