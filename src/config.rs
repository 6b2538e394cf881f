//! Development host configuration.
//!
//! Configuration is layered with `figment`, matching the usual dev-tool
//! priority order: CLI flags > `DEVHOST_*` environment variables >
//! `devhost.config.json` > built-in defaults.

use crate::cli::Cli;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Development host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Requested server port (the engine may assign a nearby free port)
    pub port: u16,

    /// Open the browser automatically once listening
    pub open: bool,

    /// Directory containing built client assets and the HTML template
    pub root: PathBuf,

    /// Directory containing server render fragments
    pub ssr_dir: PathBuf,

    /// Logical page name used for both the render bundle and the template
    pub entry: String,

    /// Upper bound for one SSR attempt before falling back to CSR
    pub render_timeout_ms: u64,

    /// Patterns to ignore when watching for live reload
    pub watch_ignore: Vec<String>,

    /// Debounce delay in milliseconds for file change events
    pub debounce_ms: u64,

    /// Bind to this Unix domain socket instead of TCP when set
    pub socket_path: Option<PathBuf>,
}

impl HostConfig {
    /// Load configuration from all sources.
    ///
    /// Priority: CLI flags > environment variables > config file > defaults.
    /// A config file passed via `--config` must exist; the default
    /// `devhost.config.json` is only merged when present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested config file is missing or
    /// if any source contains values of the wrong shape.
    pub fn load(args: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config()));

        let config_file = match args.config.clone() {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let default_path = Path::new("devhost.config.json");
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };

        if let Some(path) = config_file {
            figment = figment.merge(Json::file(path));
        }

        // Environment variables (DEVHOST_PORT, DEVHOST_ROOT, etc.)
        figment = figment.merge(Env::prefixed("DEVHOST_"));

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: "Check devhost.config.json syntax and field types".to_string(),
        })?;

        // CLI flags override everything.
        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(ref root) = args.root {
            config.root = root.clone();
        }
        if let Some(ref entry) = args.entry {
            config.entry = entry.clone();
        }
        if args.open {
            config.open = true;
        }
        if let Some(ref uds) = args.uds {
            config.socket_path = Some(uds.clone());
        }

        Ok(config)
    }

    /// Get default configuration values.
    pub fn default_config() -> Self {
        Self {
            port: 3000,
            open: false,
            root: PathBuf::from("dist"),
            ssr_dir: PathBuf::from("ssr"),
            entry: "index".to_string(),
            render_timeout_ms: 10_000,
            watch_ignore: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "target".to_string(),
                "*.log".to_string(),
                ".DS_Store".to_string(),
            ],
            debounce_ms: 100,
            socket_path: None,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset root doesn't exist or the entry name is
    /// empty.
    pub fn validate(&self) -> Result<()> {
        if !self.root.exists() {
            return Err(ConfigError::InvalidValue {
                field: "root".to_string(),
                value: self.root.display().to_string(),
                hint: "Asset root directory does not exist. Build the client first or pass --root"
                    .to_string(),
            }
            .into());
        }

        if self.entry.is_empty() {
            return Err(ConfigError::MissingField {
                field: "entry".to_string(),
                hint: "Provide a logical page name via --entry or devhost.config.json".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Resolve the loopback address the engine will hand to the transport.
    ///
    /// Tries the requested port first, then incrementally searches for the
    /// next available port (up to +10 from the original).
    ///
    /// # Errors
    ///
    /// Returns an error if the whole port range is in use.
    pub fn resolve_addr(&self) -> Result<SocketAddr> {
        use std::net::TcpListener;

        if self.port != 0 && self.port < 1024 {
            crate::ui::warning(&format!(
                "Port {} is in privileged range, may require root access",
                self.port
            ));
        }

        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        if TcpListener::bind(addr).is_ok() {
            return Ok(addr);
        }

        for offset in 1..=10 {
            let port = self.port.saturating_add(offset);
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            if TcpListener::bind(addr).is_ok() {
                crate::ui::warning(&format!(
                    "Port {} is busy, using port {} instead",
                    self.port, port
                ));
                return Ok(addr);
            }
        }

        Err(ConfigError::InvalidValue {
            field: "port".to_string(),
            value: self.port.to_string(),
            hint: format!(
                "Ports {}-{} are all in use. Try a different port range.",
                self.port,
                self.port + 10
            ),
        }
        .into())
    }

    /// Upper bound for one SSR attempt.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Debounce window for file change events.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Format the server URL for a bound address.
    pub fn server_url(addr: SocketAddr) -> String {
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::net::TcpListener;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default_config();
        assert_eq!(config.port, 3000);
        assert_eq!(config.entry, "index");
        assert_eq!(config.root, PathBuf::from("dist"));
        assert_eq!(config.render_timeout(), Duration::from_secs(10));
        assert!(config.socket_path.is_none());
    }

    #[test]
    fn test_cli_flags_override_defaults() {
        let cli = Cli::parse_from(["devhost", "--port", "4100", "--entry", "app", "--open"]);
        let config = HostConfig::load(&cli).expect("load should succeed");
        assert_eq!(config.port, 4100);
        assert_eq!(config.entry, "app");
        assert!(config.open);
    }

    #[test]
    fn test_explicit_config_file_must_exist() {
        let cli = Cli::parse_from(["devhost", "--config", "/definitely/not/here.json"]);
        let err = HostConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_validate_missing_root() {
        let mut config = HostConfig::default_config();
        config.root = PathBuf::from("/definitely/not/a/real/dir");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("root"));
    }

    #[test]
    fn test_validate_empty_entry() {
        let mut config = HostConfig::default_config();
        config.root = PathBuf::from(".");
        config.entry = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("entry"));
    }

    #[test]
    fn test_resolve_addr_skips_busy_port() {
        let listener = match TcpListener::bind(("127.0.0.1", 0)) {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("Skipping test_resolve_addr_skips_busy_port: {}", err);
                return;
            }
        };
        let start_port = listener.local_addr().unwrap().port();

        let mut config = HostConfig::default_config();
        config.port = start_port;

        // Port is held by `listener`, so resolution should move past it.
        let addr = config.resolve_addr().expect("should find a port");
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert!(addr.port() >= start_port);
    }

    #[test]
    fn test_server_url() {
        let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        assert_eq!(HostConfig::server_url(addr), "http://127.0.0.1:3000");
    }
}
