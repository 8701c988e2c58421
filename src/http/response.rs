// HTTP response parsing and serialization
use super::{find_hdr_end, get_hdr};
use http::StatusCode;
use std::collections::TryReserveError;

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub version: String,
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn parse(r: &[u8]) -> Option<Self> {
        let e = find_hdr_end(r)?;
        let t = std::str::from_utf8(&r[..e]).ok()?;
        let mut l = t.lines();
        let (version, rest) = l.next()?.split_once(' ')?;
        let (code, text) = rest.split_once(' ').unwrap_or((rest, ""));
        let status_code: u16 = code.parse().ok()?;
        let headers = l
            .take_while(|ln| !ln.is_empty())
            .filter_map(|ln| ln.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let s = e + 4;
        let body = if s < r.len() { r[s..].to_vec() } else { Vec::new() };
        Some(HttpResponse {
            version: version.to_string(),
            status_code,
            status_text: text.to_string(),
            headers,
            body,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut o = format!("{} {} {}\r\n", self.version, self.status_code, self.status_text);
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

    pub fn error(c: u16, m: &str) -> Self {
        let t = StatusCode::from_u16(c)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Error");
        HttpResponse {
            version: "HTTP/1.1".to_string(),
            status_code: c,
            status_text: t.to_string(),
            headers: vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Content-Length".to_string(), m.len().to_string()),
                ("Connection".to_string(), "close".to_string()),
            ],
            body: m.as_bytes().to_vec(),
        }
    }

    pub fn get_header(&self, n: &str) -> Option<&str> {
        get_hdr(&self.headers, n)
    }

    /// Overwrite `n` in place, or append it. Allocation failure for a new
    /// slot is reported instead of aborting.
    pub fn try_set_header(&mut self, n: &str, val: &str) -> Result<(), TryReserveError> {
        if let Some((_, v)) = self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(n)) {
            *v = val.to_string();
            return Ok(());
        }
        self.headers.try_reserve(1)?;
        self.headers.push((n.to_string(), val.to_string()));
        Ok(())
    }
}
