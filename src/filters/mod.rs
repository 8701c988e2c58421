// Header filter chain: installation at startup, ordered dispatch per request
pub mod static_etags;

use std::collections::VecDeque;

use crate::context::Context;
use crate::error::ServerError;
use crate::http::{HttpRequest, HttpResponse};

pub use static_etags::StaticEtags;

pub type FilterResult = Result<(), ServerError>;

pub trait HeaderFilter: Send + Sync {
    fn name(&self) -> &str;
    /// Inspect or amend response headers, then hand over to `next`.
    ///
    /// Returning without calling `next` ends the chain; do so only with an
    /// error.
    fn filter(
        &self,
        req: &HttpRequest,
        resp: &mut HttpResponse,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> FilterResult;
}

/// The remainder of the chain after the current filter. Consumed on use, so
/// a filter can delegate at most once.
pub struct Next<'a> {
    rest: &'a [Box<dyn HeaderFilter>],
}

impl<'a> Next<'a> {
    pub fn run(self, req: &HttpRequest, resp: &mut HttpResponse, ctx: &mut Context) -> FilterResult {
        match self.rest.split_first() {
            Some((head, rest)) => head.filter(req, resp, ctx, Next { rest }),
            None => Ok(()),
        }
    }
}

/// Collects filters during startup. Each install becomes the new head, so
/// the last filter installed runs first.
#[derive(Default)]
pub struct ChainBuilder {
    filters: VecDeque<Box<dyn HeaderFilter>>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        ChainBuilder::default()
    }

    pub fn install(&mut self, f: Box<dyn HeaderFilter>) {
        crate::log::filter_installed(f.name());
        self.filters.push_front(f);
    }

    pub fn build(self) -> FilterChain {
        FilterChain { filters: self.filters.into() }
    }
}

/// The frozen chain, shared read-only by every worker.
pub struct FilterChain {
    filters: Vec<Box<dyn HeaderFilter>>,
}

impl FilterChain {
    pub fn run(&self, req: &HttpRequest, resp: &mut HttpResponse, ctx: &mut Context) -> FilterResult {
        Next { rest: &self.filters }.run(req, resp, ctx)
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Install the built-in filters in their fixed order.
pub fn register_all(b: &mut ChainBuilder) {
    static_etags::register(b);
}
