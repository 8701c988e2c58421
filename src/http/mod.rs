// HTTP/1.1 message framing and header helpers
mod request;
mod response;
pub use request::HttpRequest;
pub use response::HttpResponse;

use std::io::{ErrorKind, Read};
use thiserror::Error;

pub const MAX_HEADER_SIZE: usize = 65_536;
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("headers too large")]
    HeadersTooLarge,
    #[error("body too large")]
    BodyTooLarge,
    #[error("invalid header encoding")]
    Encoding,
    #[error("timed out")]
    TimedOut,
    #[error("connection closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReadError {
    /// Status to answer a client with, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ReadError::HeadersTooLarge => Some(431),
            ReadError::BodyTooLarge => Some(413),
            ReadError::Encoding => Some(400),
            _ => None,
        }
    }
}

pub fn find_hdr_end(d: &[u8]) -> Option<usize> {
    d.windows(4).position(|w| w == b"\r\n\r\n")
}

pub fn get_hdr<'a>(h: &'a [(String, String)], n: &str) -> Option<&'a str> {
    h.iter().find(|(k, _)| k.eq_ignore_ascii_case(n)).map(|(_, v)| v.as_str())
}

fn raw_hdr<'a>(t: &'a str, n: &str) -> Option<&'a str> {
    t.lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(n))
        .map(|(_, v)| v.trim())
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Read one request: headers plus a `Content-Length` body, if any.
pub fn read_request(r: &mut impl Read, buf_size: usize) -> Result<Vec<u8>, ReadError> {
    let mut d = Vec::with_capacity(buf_size);
    let mut b = vec![0u8; buf_size];
    let mut want: Option<usize> = None;

    loop {
        if let Some(total) = want {
            if d.len() >= total {
                d.truncate(total);
                return Ok(d);
            }
        }
        let n = match r.read(&mut b) {
            Ok(0) if d.is_empty() => return Err(ReadError::Closed),
            Ok(0) => return if want.is_some() { Err(ReadError::Closed) } else { Ok(d) },
            Ok(n) => n,
            Err(e) if is_timeout(&e) => return Err(ReadError::TimedOut),
            Err(e) => return Err(e.into()),
        };
        d.extend_from_slice(&b[..n]);

        if want.is_none() {
            let Some(end) = find_hdr_end(&d) else {
                if d.len() > MAX_HEADER_SIZE {
                    return Err(ReadError::HeadersTooLarge);
                }
                continue;
            };
            if end > MAX_HEADER_SIZE {
                return Err(ReadError::HeadersTooLarge);
            }
            let text = std::str::from_utf8(&d[..end]).map_err(|_| ReadError::Encoding)?;
            let len = raw_hdr(text, "Content-Length")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            if len > MAX_BODY_SIZE {
                return Err(ReadError::BodyTooLarge);
            }
            want = Some(end + 4 + len);
        }
    }
}

/// Read a whole message from a peer that closes when done.
pub fn read_until_close(r: &mut impl Read, buf_size: usize) -> Result<Vec<u8>, ReadError> {
    let mut d = Vec::with_capacity(buf_size);
    let mut b = vec![0u8; buf_size];
    loop {
        match r.read(&mut b) {
            Ok(0) => break,
            Ok(n) => {
                d.extend_from_slice(&b[..n]);
                if d.len() > MAX_HEADER_SIZE + MAX_BODY_SIZE {
                    return Err(ReadError::BodyTooLarge);
                }
            }
            Err(e) if is_timeout(&e) => return Err(ReadError::TimedOut),
            Err(e) => return Err(e.into()),
        }
    }
    if d.is_empty() {
        return Err(ReadError::Closed);
    }
    Ok(d)
}
