//! HTML index listing.
//!
//! The archive serves plain directory indexes. Entries are anchor hrefs;
//! the interesting ones follow two fixed lexical patterns:
//! `gdas.YYYYMMDD/` date buckets and `HH/` hour buckets. Anything else on
//! the page (sort links, parent links, stray files) is ignored.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Result, UpstreamError};

fn href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]+)""#).expect("static pattern"))
}

fn date_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^gdas\.(\d{8})/$").expect("static pattern"))
}

fn hour_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2})/$").expect("static pattern"))
}

/// HTTP client for the archive's HTML indexes.
#[derive(Debug, Clone)]
pub struct IndexClient {
    http: reqwest::Client,
    base_url: String,
}

impl IndexClient {
    /// Build a client for the given product root.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The product root this client lists.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client (shared with probes and fetches).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch an index page under the root and return its hrefs.
    ///
    /// `path` is relative to the root; pass `""` for the root itself.
    pub async fn list(&self, path: &str) -> Result<Vec<String>> {
        let url = if path.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}", self.base_url, path.trim_matches('/'))
        };
        let response = self.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(UpstreamError::Status {
                url,
                status: response.status(),
            });
        }
        let body = response.text().await?;
        let hrefs = extract_hrefs(&body);
        debug!(url, entries = hrefs.len(), "listed index page");
        Ok(hrefs)
    }
}

/// Pull every anchor href out of an index page.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    href_re()
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

/// Filter hrefs down to date-bucket entries, returning the `YYYYMMDD`
/// portions.
pub fn date_entries(hrefs: &[String]) -> Vec<String> {
    hrefs
        .iter()
        .filter_map(|h| date_entry_re().captures(h).map(|c| c[1].to_string()))
        .collect()
}

/// Filter hrefs down to hour-bucket entries, returning the `HH` portions
/// with valid hours only.
pub fn hour_entries(hrefs: &[String]) -> Vec<String> {
    hrefs
        .iter()
        .filter_map(|h| hour_entry_re().captures(h).map(|c| c[1].to_string()))
        .filter(|h| h.parse::<u8>().map(|n| n < 24).unwrap_or(false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body><pre>
<a href="../">../</a>
<a href="?C=M;O=A">sort</a>
<a href="gdas.20250101/">gdas.20250101/</a>
<a href="gdas.20250102/">gdas.20250102/</a>
<a href="sst.20250102/">sst.20250102/</a>
<a href="README.txt">README.txt</a>
</pre></body></html>"#;

    #[test]
    fn extracts_all_hrefs() {
        let hrefs = extract_hrefs(PAGE);
        assert_eq!(hrefs.len(), 6);
        assert!(hrefs.contains(&"gdas.20250102/".to_string()));
    }

    #[test]
    fn date_entries_match_only_the_date_pattern() {
        let hrefs = extract_hrefs(PAGE);
        assert_eq!(date_entries(&hrefs), vec!["20250101", "20250102"]);
    }

    #[test]
    fn hour_entries_reject_out_of_range_and_noise() {
        let hrefs: Vec<String> = ["../", "00/", "06/", "25/", "atmos/", "1/", "18/"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(hour_entries(&hrefs), vec!["00", "06", "18"]);
    }
}
