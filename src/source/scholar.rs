//! Google Scholar source.
//!
//! Scholar has no API. The first result of a search page is identified by
//! its cluster id, whose citation dialog links to a BibTeX export. Scholar
//! throttles scripted access aggressively; a blocked request surfaces as a
//! fetch failure.

use once_cell::sync::Lazy;
use tracing::debug;

use super::{HttpClient, SecondarySource};
use crate::Result;
use crate::regex::Regex;

pub const SCHOLAR_URL: &str = "https://scholar.google.com";

static CLUSTER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"data-cid="([^"]+)""#).unwrap());

static BIBTEX_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="([^"]+)"[^>]*>\s*BibTeX\s*<"#).unwrap());

pub struct ScholarSource {
    http: HttpClient,
    base_url: String,
}

impl ScholarSource {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: SCHOLAR_URL.to_string(),
        }
    }

    fn search_page(&self, query: &str) -> Result<String> {
        let url = format!("{}/scholar", self.base_url);
        Ok(self.http.get_with_params(&url, &[("hl", "en"), ("q", query)])?)
    }

    fn cite_page(&self, cluster_id: &str) -> Result<String> {
        let url = format!("{}/scholar", self.base_url);
        let info = format!("info:{cluster_id}:scholar.google.com/");
        Ok(self.http.get_with_params(
            &url,
            &[("q", info.as_str()), ("output", "cite"), ("scirp", "0"), ("hl", "en")],
        )?)
    }

    /// Makes a link from the cite dialog absolute and decodes its entities.
    fn absolute_link(&self, href: &str) -> String {
        let href = href.replace("&amp;", "&");
        if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            href
        }
    }
}

/// Cluster id of the first search result.
fn first_cluster_id(html: &str) -> Option<String> {
    CLUSTER_ID
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Target of the "BibTeX" link in a cite dialog.
fn bibtex_link(html: &str) -> Option<String> {
    BIBTEX_LINK
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

impl SecondarySource for ScholarSource {
    fn search(&self, query: &str) -> Result<Option<String>> {
        let results = self.search_page(query)?;
        let Some(cluster_id) = first_cluster_id(&results) else {
            debug!(%query, "no Google Scholar result");
            return Ok(None);
        };

        let dialog = self.cite_page(&cluster_id)?;
        let Some(href) = bibtex_link(&dialog) else {
            debug!(%cluster_id, "Google Scholar offered no BibTeX export");
            return Ok(None);
        };

        Ok(Some(self.http.get_ok(&self.absolute_link(&href))?))
    }
}
