//! Purpose: Resolve the document store location at startup.
//! Exports: `StoreConfig`, `STORE_URL_ENV`, `PAGE_SIZE`.
//! Role: The only environment-dependent input of the application.
//! Invariants: Base URLs are http(s) with no query or fragment; path prefixes are kept.
use crate::error::{Error, ErrorKind};
use url::Url;

/// Environment variable consulted when no explicit store URL is given.
pub const STORE_URL_ENV: &str = "BOOKLIST_STORE_URL";

/// Rows per grid page.
pub const PAGE_SIZE: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    base_url: Url,
}

impl StoreConfig {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, Error> {
        Ok(Self {
            base_url: normalize_base_url(base_url.as_ref())?,
        })
    }

    /// Use `explicit` when present, otherwise fall back to `STORE_URL_ENV`.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, Error> {
        if let Some(url) = explicit {
            return Self::new(url);
        }
        match std::env::var(STORE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message("no document store url configured")
                .with_hint(format!(
                    "Pass --store-url or set {STORE_URL_ENV} (e.g. https://example.firebaseio.com)."
                ))),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw.trim()).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid document store url")
            .with_hint("Use an absolute http(s) url such as https://example.firebaseio.com.")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("document store url must use http or https scheme"));
    }
    if url.cannot_be_a_base() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("document store url cannot be a base")
        );
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
