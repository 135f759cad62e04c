// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{Config, StorageConfig, UploadConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Priority: environment (`COUNTRIES_SECTION__KEY`) > file > defaults.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("COUNTRIES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("storage.data_file", "./data.json")?
            .set_default("storage.image_dir", "images")?
            .set_default("storage.image_route", "/images")?
            .set_default("upload.max_image_size", 4_194_304)? // 4MiB
            .set_default("upload.allowed_types", vec!["image/jpeg", "image/png"])?
            .set_default("http.server_name", "country-store/0.1")?
            .set_default("http.enable_cors", true)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("health.enabled", true)?
            .set_default("health.liveness_path", "/healthz")?
            .set_default("health.readiness_path", "/readyz")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.backlog", 128)?
            .set_default("performance.shutdown_grace", 10)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// Pick the config path from `--config <path>` / `-c <path>`
pub fn config_path_from_args<I>(args: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            if let Some(path) = args.next() {
                return path;
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("definitely-missing-config-file").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.data_file, "./data.json");
        assert_eq!(cfg.storage.image_dir, "images");
        assert_eq!(cfg.upload.max_image_size, 4 * 1024 * 1024);
        assert_eq!(cfg.upload.allowed_types, ["image/jpeg", "image/png"]);
        assert!(cfg.http.enable_cors);
        assert_eq!(cfg.health.readiness_path, "/readyz");
        assert!(cfg.logging.access_log_file.is_none());
        assert!(cfg.performance.max_connections.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("country_cfg_{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("config.toml");
        std::fs::write(
            &file,
            "[server]\nport = 9090\n\n[storage]\ndata_file = \"/tmp/countries.json\"\n",
        )
        .unwrap();

        let cfg = Config::load_from(file.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.storage.data_file, "/tmp/countries.json");
        assert_eq!(cfg.storage.image_route, "/images");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("definitely-missing-config-file").unwrap();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);
        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }

    #[test]
    fn test_config_path_from_args() {
        assert_eq!(config_path_from_args(args(&[])), DEFAULT_CONFIG_PATH);
        assert_eq!(config_path_from_args(args(&["-c", "prod"])), "prod");
        assert_eq!(config_path_from_args(args(&["--config", "a/b.toml"])), "a/b.toml");
        assert_eq!(config_path_from_args(args(&["--config=x.yaml"])), "x.yaml");
        assert_eq!(config_path_from_args(args(&["--config"])), DEFAULT_CONFIG_PATH);
    }
}
