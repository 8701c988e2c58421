// HTTP request parsing and serialization
use percent_encoding::percent_decode_str;

use super::{find_hdr_end, get_hdr};
use crate::error::MapError;

#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Parse a raw HTTP request. Returns None for malformed input.
    pub fn parse(r: &[u8]) -> Option<Self> {
        let e = find_hdr_end(r)?;
        let t = std::str::from_utf8(&r[..e]).ok()?;
        let mut l = t.lines();
        let mut p = l.next()?.split_whitespace();
        let method = p.next()?;
        let target = p.next()?;
        let version = p.next()?;
        if p.next().is_some() {
            return None;
        }
        http::Method::from_bytes(method.as_bytes()).ok()?;
        if target.bytes().any(|b| b < 0x20 || b == 0x7F) {
            return None;
        }
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return None;
        }

        let headers: Vec<(String, String)> = l
            .take_while(|ln| !ln.is_empty())
            .filter_map(|ln| ln.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let s = e + 4;
        let len: usize = get_hdr(&headers, "Content-Length").and_then(|v| v.parse().ok()).unwrap_or(0);
        let body = if s < r.len() { r[s..r.len().min(s + len)].to_vec() } else { Vec::new() };
        Some(HttpRequest {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
            headers,
            body,
        })
    }

    /// Target without its query string. An absolute-form target
    /// (`http://host/p`) yields just its path.
    pub fn uri_path(&self) -> &str {
        let (t, absolute) = match strip_authority(&self.target) {
            Some(p) => (p, true),
            None => (self.target.as_str(), false),
        };
        let path = t.split_once('?').map(|(p, _)| p).unwrap_or(t);
        if absolute && path.is_empty() {
            "/"
        } else {
            path
        }
    }

    /// Percent-decoded `uri_path` with empty and `.` segments dropped.
    /// Location lookup and path mapping both work on this form.
    pub fn normalized_path(&self) -> Result<String, MapError> {
        let raw = self.uri_path();
        if !raw.starts_with('/') {
            return Err(MapError::NotAbsolute(raw.to_string()));
        }
        let decoded = percent_decode_str(raw).decode_utf8().map_err(|_| MapError::Encoding)?;
        if decoded.contains('\0') {
            return Err(MapError::NulByte);
        }
        let mut out = String::with_capacity(decoded.len());
        for seg in decoded.split('/') {
            match seg {
                "" | "." => continue,
                ".." => return Err(MapError::Traversal),
                s => {
                    out.push('/');
                    out.push_str(s);
                }
            }
        }
        if out.is_empty() || decoded.ends_with('/') || decoded.ends_with("/.") {
            out.push('/');
        }
        Ok(out)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut o = format!("{} {} {}\r\n", self.method, self.target, self.version);
        for (k, v) in &self.headers {
            o.push_str(k);
            o.push_str(": ");
            o.push_str(v);
            o.push_str("\r\n");
        }
        o.push_str("\r\n");
        let mut b = o.into_bytes();
        b.extend_from_slice(&self.body);
        b
    }

    pub fn set_header(&mut self, n: &str, val: &str) {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(n)) {
            Some((_, v)) => *v = val.to_string(),
            None => self.headers.push((n.to_string(), val.to_string())),
        }
    }
}

/// `scheme://authority/rest` -> `/rest`; `None` for any other form.
fn strip_authority(target: &str) -> Option<&str> {
    let (scheme, rest) = target.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
    if !valid {
        return None;
    }
    Some(rest.find(['/', '?']).map_or("", |i| &rest[i..]))
}
