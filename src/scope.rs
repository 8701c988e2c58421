// Scope directives, parent-to-child merging, and location lookup
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{LocationConf, Srv};
use crate::error::ConfigError;
use crate::tag::Strategy;

pub const DEFAULT_ROOT: &str = "./html";

/// A directive flag that may be left unset so it inherits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "toml::Value")]
pub enum Switch {
    #[default]
    Unset,
    On,
    Off,
}

impl Switch {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Switch::On),
            "off" => Ok(Switch::Off),
            _ => Err(format!("FileETag must be 'on' or 'off', got \"{s}\"")),
        }
    }

    /// Explicit child values win; an unset child takes the parent's.
    pub fn merge(self, parent: Switch) -> Switch {
        match self {
            Switch::Unset => parent,
            set => set,
        }
    }

    /// Only an explicit `on` enables; unset resolves to off.
    pub fn enabled(self) -> bool {
        self == Switch::On
    }
}

impl TryFrom<toml::Value> for Switch {
    type Error = String;

    fn try_from(v: toml::Value) -> Result<Self, Self::Error> {
        match v {
            toml::Value::Boolean(true) => Ok(Switch::On),
            toml::Value::Boolean(false) => Ok(Switch::Off),
            toml::Value::String(s) => Switch::parse(&s),
            other => Err(format!("FileETag must be 'on' or 'off', got {other}")),
        }
    }
}

/// The inheritable directives of one scope, before resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    pub file_etag: Switch,
    pub etag_format: Option<Strategy>,
    pub root: Option<PathBuf>,
    pub upstream: Option<String>,
}

impl Directives {
    pub fn merge(&self, parent: &Directives) -> Directives {
        Directives {
            file_etag: self.file_etag.merge(parent.file_etag),
            etag_format: self.etag_format.or(parent.etag_format),
            root: self.root.clone().or_else(|| parent.root.clone()),
            upstream: self.upstream.clone().or_else(|| parent.upstream.clone()),
        }
    }
}

/// A fully resolved scope. Immutable once the tree is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub prefix: String,
    pub file_etag: bool,
    pub strategy: Strategy,
    pub root: PathBuf,
    pub upstream: Option<String>,
}

impl Location {
    fn resolve(prefix: &str, d: &Directives) -> Result<Self, ConfigError> {
        if let Some(addr) = &d.upstream {
            if addr.parse::<SocketAddr>().is_err() {
                return Err(ConfigError::Upstream { prefix: prefix.to_string(), addr: addr.clone() });
            }
        }
        Ok(Location {
            prefix: prefix.to_string(),
            file_etag: d.file_etag.enabled(),
            strategy: d.etag_format.unwrap_or_default(),
            root: d.root.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            upstream: d.upstream.clone(),
        })
    }
}

pub struct ScopeTree {
    server: Arc<Location>,
    locations: Vec<Arc<Location>>,
}

impl ScopeTree {
    /// Merge every location from its parent, the server scope being the root.
    pub fn build(srv: &Srv) -> Result<Self, ConfigError> {
        let top = srv.directives().merge(&Directives::default());
        let server = Arc::new(Location::resolve("/", &top)?);
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        walk(&srv.location, "/", &top, &mut out, &mut seen)?;
        out.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(ScopeTree { server, locations: out.into_iter().map(Arc::new).collect() })
    }

    /// Longest-prefix match on the path part of `uri`.
    pub fn find(&self, uri: &str) -> Arc<Location> {
        let path = uri.split_once('?').map(|(p, _)| p).unwrap_or(uri);
        self.locations
            .iter()
            .find(|l| path.starts_with(l.prefix.as_str()))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.server))
    }

    pub fn server(&self) -> &Location {
        &self.server
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

fn walk(
    confs: &[LocationConf],
    parent_prefix: &str,
    parent: &Directives,
    out: &mut Vec<Location>,
    seen: &mut HashSet<String>,
) -> Result<(), ConfigError> {
    for lc in confs {
        if !lc.prefix.starts_with(parent_prefix) {
            return Err(ConfigError::LocationOutside {
                parent: parent_prefix.to_string(),
                child: lc.prefix.clone(),
            });
        }
        if !seen.insert(lc.prefix.clone()) {
            return Err(ConfigError::DuplicateLocation(lc.prefix.clone()));
        }
        let merged = lc.directives().merge(parent);
        out.push(Location::resolve(&lc.prefix, &merged)?);
        walk(&lc.location, &lc.prefix, &merged, out, seen)?;
    }
    Ok(())
}
