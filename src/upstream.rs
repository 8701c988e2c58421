// Fetches the response for a request from the location's upstream
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::http::{HttpRequest, HttpResponse, ReadError};

/// One connection per request; the upstream is asked to close when done.
pub fn fetch(addr: &str, req: &HttpRequest, timeout: Duration, buf: usize) -> HttpResponse {
    let sock_addr: SocketAddr = match addr.parse() {
        Ok(a) => a,
        Err(_) => return HttpResponse::error(502, "Invalid upstream address"),
    };
    let mut s = match TcpStream::connect_timeout(&sock_addr, timeout) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("upstream {addr} unavailable: {e}");
            return HttpResponse::error(502, "Upstream unavailable");
        }
    };
    let _ = s.set_read_timeout(Some(timeout));
    let _ = s.set_write_timeout(Some(timeout));
    let _ = s.set_nodelay(true);

    let mut fwd = req.clone();
    fwd.set_header("Connection", "close");
    if let Err(e) = s.write_all(&fwd.to_bytes()) {
        tracing::warn!("upstream write error: {e}");
        return HttpResponse::error(502, "Upstream write failed");
    }

    match crate::http::read_until_close(&mut s, buf) {
        Ok(d) => HttpResponse::parse(&d).unwrap_or_else(|| {
            tracing::warn!("failed to parse upstream response");
            HttpResponse::error(502, "Bad upstream response")
        }),
        Err(ReadError::TimedOut) => HttpResponse::error(504, "Upstream timeout"),
        Err(e) => {
            tracing::warn!("upstream read error: {e}");
            HttpResponse::error(502, "Upstream error")
        }
    }
}
