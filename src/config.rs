// Configuration loading, validation, and default generation
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::scope::{Directives, Switch};
use crate::tag::Strategy;

pub const DEFAULT_PATH: &str = "static-etags.toml";

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: Srv,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Srv {
    pub listen_addr: String,
    pub buffer_size: usize,
    pub client_timeout: u64,
    pub upstream_timeout: u64,
    pub max_connections: usize,
    pub worker_threads: usize,
    pub shutdown_timeout: u64,
    pub log_level: String,
    pub logging: bool,

    pub root: Option<PathBuf>,
    pub upstream: Option<String>,
    pub file_etag: Switch,
    pub etag_format: Option<Strategy>,
    pub location: Vec<LocationConf>,
}

/// One `[[location]]` block as written; unset directives inherit from the
/// enclosing scope.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConf {
    pub prefix: String,
    pub root: Option<PathBuf>,
    pub upstream: Option<String>,
    pub file_etag: Switch,
    pub etag_format: Option<Strategy>,
    pub location: Vec<LocationConf>,
}

impl Default for Srv {
    fn default() -> Self {
        Srv {
            listen_addr: "127.0.0.1:3000".to_string(),
            buffer_size: 8192,
            client_timeout: 30,
            upstream_timeout: 30,
            max_connections: 10_000,
            worker_threads: 0,
            shutdown_timeout: 15,
            log_level: "info".to_string(),
            logging: true,
            root: None,
            upstream: None,
            file_etag: Switch::Unset,
            etag_format: None,
            location: Vec::new(),
        }
    }
}

impl Srv {
    pub fn directives(&self) -> Directives {
        Directives {
            file_etag: self.file_etag,
            etag_format: self.etag_format,
            root: self.root.clone(),
            upstream: self.upstream.clone(),
        }
    }

    /// Reject what cannot be served and clamp what can be corrected.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::ListenAddr(self.listen_addr.clone()));
        }
        if self.buffer_size < 1024 {
            tracing::warn!("buffer_size too small ({}), using 1024", self.buffer_size);
            self.buffer_size = 1024;
        }
        if self.client_timeout == 0 {
            tracing::warn!("client_timeout is 0, using 30");
            self.client_timeout = 30;
        }
        if self.upstream_timeout == 0 {
            tracing::warn!("upstream_timeout is 0, using 30");
            self.upstream_timeout = 30;
        }
        if self.max_connections == 0 {
            self.max_connections = 10_000;
        }
        if self.shutdown_timeout == 0 {
            self.shutdown_timeout = 15;
        }
        Ok(())
    }
}

impl LocationConf {
    pub fn directives(&self) -> Directives {
        Directives {
            file_etag: self.file_etag,
            etag_format: self.etag_format,
            root: self.root.clone(),
            upstream: self.upstream.clone(),
        }
    }
}

fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn parse_config(path: &Path, txt: &str) -> Result<Config, ConfigError> {
    let mut cfg: Config = toml::from_str(txt).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    cfg.server.validate()?;
    Ok(cfg)
}

/// Load the config at `path`, writing a default one if none exists.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match fs::read_to_string(path) {
        Ok(txt) => {
            let cfg = parse_config(path, &txt)?;
            tracing::info!("Loaded {}", path.display());
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let cfg = Config::default();
            match atomic_write(path, &generate_config(&cfg)) {
                Ok(()) => tracing::info!("Generated {}", path.display()),
                Err(e) => tracing::warn!("No config at '{}' ({e}), using defaults", path.display()),
            }
            Ok(cfg)
        }
        Err(source) => Err(ConfigError::Read { path: path.display().to_string(), source }),
    }
}

pub fn generate_config(cfg: &Config) -> String {
    let s = &cfg.server;
    let mut srv = toml::Table::new();
    srv.insert("listen_addr".into(), toml::Value::String(s.listen_addr.clone()));
    srv.insert("buffer_size".into(), toml::Value::Integer(s.buffer_size as i64));
    srv.insert("client_timeout".into(), toml::Value::Integer(s.client_timeout as i64));
    srv.insert("upstream_timeout".into(), toml::Value::Integer(s.upstream_timeout as i64));
    srv.insert("max_connections".into(), toml::Value::Integer(s.max_connections as i64));
    srv.insert("worker_threads".into(), toml::Value::Integer(s.worker_threads as i64));
    srv.insert("shutdown_timeout".into(), toml::Value::Integer(s.shutdown_timeout as i64));
    srv.insert("log_level".into(), toml::Value::String(s.log_level.clone()));
    srv.insert("logging".into(), toml::Value::Boolean(s.logging));
    let root = s.root.clone().unwrap_or_else(|| PathBuf::from(crate::scope::DEFAULT_ROOT));
    srv.insert("root".into(), toml::Value::String(root.display().to_string()));
    if let Some(up) = &s.upstream {
        srv.insert("upstream".into(), toml::Value::String(up.clone()));
    }
    let etag = if s.file_etag.enabled() { "on" } else { "off" };
    srv.insert("file_etag".into(), toml::Value::String(etag.to_string()));
    let format = s.etag_format.unwrap_or_default();
    srv.insert("etag_format".into(), toml::Value::String(format.as_str().to_string()));

    let mut doc = toml::Table::new();
    doc.insert("server".into(), toml::Value::Table(srv));
    match toml::to_string_pretty(&doc) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Config serialization failed: {e}");
            String::new()
        }
    }
}
