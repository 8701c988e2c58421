// Host seams consumed by header filters: URI mapping, file metadata, header append
use std::collections::TryReserveError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::MapError;
use crate::http::{HttpRequest, HttpResponse};
use crate::scope::Location;

/// What a stat call yields. `modified` is seconds since the unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub size: u64,
    pub modified: i64,
}

pub trait PathMapper: Send + Sync {
    fn map_uri_to_path(&self, req: &HttpRequest, loc: &Location) -> Result<PathBuf, MapError>;
}

pub trait FileStat: Send + Sync {
    fn stat(&self, path: &Path) -> io::Result<FileMeta>;
}

pub trait HeaderAppender: Send + Sync {
    fn append_header(&self, resp: &mut HttpResponse, name: &str, value: &str) -> Result<(), TryReserveError>;
}

/// Maps a request onto `root` + its normalized path.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootMapper;

impl PathMapper for RootMapper {
    fn map_uri_to_path(&self, req: &HttpRequest, loc: &Location) -> Result<PathBuf, MapError> {
        let norm = req.normalized_path()?;
        let mut path = loc.root.clone();
        path.extend(norm.split('/').filter(|s| !s.is_empty()));
        Ok(path)
    }
}

/// `stat(2)` via `std::fs::metadata`. Anything but a regular file is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStat;

impl FileStat for FsStat {
    fn stat(&self, path: &Path) -> io::Result<FileMeta> {
        let md = fs::metadata(path)?;
        if !md.is_file() {
            return Err(io::Error::other("not a regular file"));
        }
        Ok(FileMeta { size: md.len(), modified: mtime(&md)? })
    }
}

#[cfg(unix)]
fn mtime(md: &fs::Metadata) -> io::Result<i64> {
    use std::os::unix::fs::MetadataExt;
    Ok(md.mtime())
}

#[cfg(not(unix))]
fn mtime(md: &fs::Metadata) -> io::Result<i64> {
    use std::time::UNIX_EPOCH;
    let t = md.modified()?;
    Ok(match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    })
}

/// Writes into the response's own header list.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseHeaders;

impl HeaderAppender for ResponseHeaders {
    fn append_header(&self, resp: &mut HttpResponse, name: &str, value: &str) -> Result<(), TryReserveError> {
        resp.try_set_header(name, value)
    }
}
