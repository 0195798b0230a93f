// Configuration module entry point
// Loads layered configuration and builds the application state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{CalculateConfig, Config, HealthConfig, HttpConfig, LengthMismatch};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Builder pre-loaded with every default value
fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8000)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.request_timeout", 300)?
        .set_default("performance.shutdown_timeout", 30)?
        .set_default("http.server_name", "calc-appeals/0.1")?
        .set_default("http.enable_cors", false)?
        .set_default("http.max_body_size", 1_048_576)? // 1MB
        .set_default("calculate.length_mismatch", "reject")?
        .set_default("appeals.dir", "appeals")
}

impl Config {
    /// Load configuration from specified file path (without extension),
    /// then `SERVER_`-prefixed environment variables (`__` between sections)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        builder_with_defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only, ignoring files and environment
    pub fn defaults() -> Result<Self, config::ConfigError> {
        builder_with_defaults()?.build()?.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::defaults().unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "127.0.0.1:8000");
        assert_eq!(cfg.calculate.length_mismatch, LengthMismatch::Reject);
        assert_eq!(cfg.calculate.max_delay, None);
        assert_eq!(cfg.appeals.dir, "appeals");
        assert_eq!(cfg.performance.shutdown_timeout, 30);
        assert!(cfg.health.enabled);
        assert_eq!(cfg.health.liveness_path, "/healthz");
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\n\n[calculate]\nlength_mismatch = \"truncate\"\nmax_delay = 5.0\n\n[appeals]\ndir = \"/tmp/appeals\""
        )
        .unwrap();

        let base = dir.path().join("custom");
        let cfg = Config::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.calculate.length_mismatch, LengthMismatch::Truncate);
        assert_eq!(cfg.calculate.max_delay, Some(5.0));
        assert_eq!(cfg.appeals.dir, "/tmp/appeals");
    }

    #[test]
    fn test_invalid_address() {
        let mut cfg = Config::defaults().unwrap();
        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
