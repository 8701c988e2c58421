//! Stamps `Etag` response headers derived from the size and modification
//! time of the file a request maps to, without reading the file.
//!
//! The crate is organised around a header filter chain that the host builds
//! once at startup ([`filters::ChainBuilder`]) and then runs for every
//! response. [`filters::StaticEtags`] is the filter that does the stamping;
//! [`tag::derive`] is the pure tag function it relies on.
pub mod config;
pub mod context;
pub mod error;
pub mod filters;
pub mod host;
pub mod http;
pub mod log;
pub mod scope;
pub mod server;
pub mod tag;
pub mod upstream;
