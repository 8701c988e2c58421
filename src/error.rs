// Error types shared across configuration, path mapping and filtering
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("listen_addr '{0}' is not a valid address (expected ip:port)")]
    ListenAddr(String),

    #[error("upstream '{addr}' in location \"{prefix}\" is not a valid address (expected ip:port)")]
    Upstream { prefix: String, addr: String },

    #[error("location \"{child}\" is outside location \"{parent}\"")]
    LocationOutside { parent: String, child: String },

    #[error("duplicate location \"{0}\"")]
    DuplicateLocation(String),
}

/// Why a request URI could not be turned into a filesystem path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("uri \"{0}\" does not start with '/'")]
    NotAbsolute(String),

    #[error("uri is not valid utf-8 once decoded")]
    Encoding,

    #[error("uri contains a NUL byte")]
    NulByte,

    #[error("uri contains a '..' segment")]
    Traversal,
}

/// The one fatal outcome a header filter reports to the host.
///
/// Carries no cause; the host answers 500 either way.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("internal server error")]
pub struct ServerError;
