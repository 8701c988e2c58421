// Etag header from the mapped file's size and mtime
use std::collections::TryReserveError;
use std::sync::Arc;
use thiserror::Error;

use super::{ChainBuilder, FilterResult, HeaderFilter, Next};
use crate::context::Context;
use crate::error::{MapError, ServerError};
use crate::host::{FileStat, FsStat, HeaderAppender, PathMapper, ResponseHeaders, RootMapper};
use crate::http::{HttpRequest, HttpResponse};
use crate::scope::Location;
use crate::tag;

pub const HEADER: &str = "Etag";

pub fn register(b: &mut ChainBuilder) {
    b.install(Box::new(StaticEtags::new(RootMapper, FsStat)));
}

/// Fatal causes. Only logged; the host sees a bare `ServerError`.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("cannot map uri to a path: {0}")]
    Unmapped(#[from] MapError),
    #[error("cannot allocate response header: {0}")]
    HeaderAlloc(#[from] TryReserveError),
}

pub struct StaticEtags<M = RootMapper, S = FsStat, H = ResponseHeaders> {
    mapper: M,
    stat: S,
    headers: H,
}

impl<M: PathMapper, S: FileStat> StaticEtags<M, S> {
    pub fn new(mapper: M, stat: S) -> Self {
        StaticEtags::with_headers(mapper, stat, ResponseHeaders)
    }
}

impl<M: PathMapper, S: FileStat, H: HeaderAppender> StaticEtags<M, S, H> {
    pub fn with_headers(mapper: M, stat: S, headers: H) -> Self {
        StaticEtags { mapper, stat, headers }
    }

    /// Add the header if the file can be stat'ed. A failed stat is not an
    /// error: plenty of responses have no backing file.
    pub fn attach(&self, req: &HttpRequest, resp: &mut HttpResponse, loc: &Location) -> Result<(), Fault> {
        let path = self.mapper.map_uri_to_path(req, loc)?;
        tracing::debug!(path = %path.display(), "static_etags: http filename");

        let meta = match self.stat.stat(&path) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "static_etags: stat failed, skipping");
                return Ok(());
            }
        };
        let etag = tag::derive(meta.size, meta.modified, loc.strategy);
        tracing::debug!(
            size = meta.size,
            mtime = meta.modified,
            strategy = %loc.strategy,
            etag = %etag,
            "static_etags: derived"
        );
        self.headers.append_header(resp, HEADER, &etag)?;
        Ok(())
    }
}

impl<M: PathMapper, S: FileStat, H: HeaderAppender> HeaderFilter for StaticEtags<M, S, H> {
    fn name(&self) -> &str {
        "static_etags"
    }

    fn filter(
        &self,
        req: &HttpRequest,
        resp: &mut HttpResponse,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> FilterResult {
        let loc = Arc::clone(&ctx.location);
        if loc.file_etag {
            if let Err(fault) = self.attach(req, resp, &loc) {
                tracing::error!(uri = %req.target, location = %loc.prefix, "static_etags: {fault}");
                return Err(ServerError);
            }
        }
        next.run(req, resp, ctx)
    }
}
