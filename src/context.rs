// Per-request state handed through the header filter chain
use std::sync::Arc;
use std::time::Instant;

use crate::scope::Location;

pub struct Context {
    pub client_ip: String,
    /// The scope the request matched; read-only for filters.
    pub location: Arc<Location>,
    pub started_at: Instant,
}

impl Context {
    pub fn new(client_ip: impl Into<String>, location: Arc<Location>) -> Self {
        Context {
            client_ip: client_ip.into(),
            location,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}
