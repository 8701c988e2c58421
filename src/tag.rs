// Entity tag derivation from file size and modification time
use md5::{Digest, Md5};
use serde::Deserialize;
use std::fmt;

/// How a tag is rendered from `(size, mtime)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// `<SIZE>_<MTIME>` in upper-case hex.
    #[default]
    Hex,
    /// MD5 of the lower-case composite, 32 lower-case hex chars.
    Md5,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Hex => "hex",
            Strategy::Md5 => "md5",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the tag for a file. Total over its inputs: nothing is validated.
///
/// A negative `mtime` is rendered as its 64-bit two's complement pattern.
/// Files with equal size and mtime get equal tags, hashed or not.
pub fn derive(size: u64, mtime: i64, strategy: Strategy) -> String {
    let mtime = mtime as u64;
    match strategy {
        Strategy::Hex => format!("{size:X}_{mtime:X}"),
        Strategy::Md5 => {
            let composite = format!("{size:x}_{mtime:x}");
            format!("{:x}", Md5::digest(composite.as_bytes()))
        }
    }
}
