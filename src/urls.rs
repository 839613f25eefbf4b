//! URL values and hashing for consistent crawling behavior across modules.

use std::fmt;

use thiserror::Error;
use url::Url;

pub const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
pub const FNV_PRIME: u32 = 16_777_619;

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported scheme '{0}' (only http is fetched)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// FNV-1a over the input bytes, 32-bit. The function is fixed so dedup keys
/// and derived filenames stay identical across platforms and runs.
pub fn fnv1a_32(input: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A normalized crawl target and its derived identity.
///
/// The hash covers host plus request file (path and query), so the same page
/// reached through different ports or fragments dedups to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrl {
    host: String,
    port: u16,
    file: String,
    hash: u32,
    filename: String,
}

impl PageUrl {
    /// Normalize a raw URL string into a crawlable value.
    ///
    /// Only `http` URLs are accepted; the port defaults to 80, the path to
    /// `/`, and any query string is kept as part of the request file.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let parsed = Url::parse(raw.trim())?;
        if parsed.scheme() != "http" {
            return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
        }
        let host = parsed
            .host_str()
            .ok_or(UrlError::MissingHost)?
            .to_lowercase();
        let port = parsed.port().unwrap_or(80);
        let mut file = parsed.path().to_string();
        if file.is_empty() {
            file.push('/');
        }
        if let Some(query) = parsed.query() {
            file.push('?');
            file.push_str(query);
        }

        let hash = fnv1a_32(&format!("{host}{file}"));
        let filename = format!("{hash:010}");
        Ok(Self { host, port, file, hash, filename })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request target as sent on the wire: path plus optional query.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Ten-digit zero-padded decimal rendering of the hash, used as the
    /// page's storage name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// `host` or `host:port` as it belongs in a Host header.
    pub fn authority(&self) -> String {
        if self.port == 80 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}{}", self.authority(), self.file)
    }
}

pub fn convert_to_absolute_url(link: &str, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    let absolute = base.join(link).ok()?;
    Some(absolute.to_string())
}

/// Keyword admission filter. An empty keyword admits every URL.
pub fn matches_keyword(url: &str, keyword: &str) -> bool {
    keyword.is_empty() || url.contains(keyword)
}
