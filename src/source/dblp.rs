//! DBLP source.
//!
//! Records: `https://dblp.org/rec/<key>.bib?param=1` (standard) and
//! `?param=0` (condensed). Search: `https://dblp.org/search/publ/api`.

use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CatalogEntry, CatalogKey, CatalogSource, HttpClient};
use crate::utils::title_similarity;
use crate::{BibwormError, Result};

pub const DBLP_RECORD_URL: &str = "https://dblp.org/rec/";
pub const DBLP_SEARCH_URL: &str = "https://dblp.org/search/publ/api";

/// Below this similarity the search hit is reported as a doubtful match.
const TITLE_MATCH_THRESHOLD: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct DblpResponse {
    result: DblpResult,
}

#[derive(Debug, Deserialize)]
struct DblpResult {
    hits: DblpHits,
}

#[derive(Debug, Deserialize)]
struct DblpHits {
    #[serde(default)]
    hit: Vec<DblpHit>,
}

#[derive(Debug, Deserialize)]
struct DblpHit {
    info: DblpInfo,
}

#[derive(Debug, Deserialize)]
struct DblpInfo {
    key: String,
    title: Option<String>,
}

/// BibTeX flavours served for a DBLP record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavour {
    Condensed,
    Standard,
}

impl Flavour {
    fn param(self) -> u8 {
        match self {
            Flavour::Condensed => 0,
            Flavour::Standard => 1,
        }
    }
}

pub struct DblpSource {
    http: HttpClient,
    record_url: String,
    search_url: String,
}

impl DblpSource {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            record_url: DBLP_RECORD_URL.to_string(),
            search_url: DBLP_SEARCH_URL.to_string(),
        }
    }

    /// Points the source at a mirror, e.g. `https://dblp.uni-trier.de/rec/`.
    #[must_use]
    pub fn with_record_url(mut self, url: &str) -> Self {
        self.record_url = url.to_string();
        self
    }

    fn record_url(&self, key: &CatalogKey, flavour: Flavour) -> String {
        format!("{}{}.bib?param={}", self.record_url, key.path(), flavour.param())
    }

    fn download(&self, key: &CatalogKey, flavour: Flavour) -> Result<String> {
        Ok(self.http.get_ok(&self.record_url(key, flavour))?)
    }

    /// Parses a search API response into the first hit's key and title.
    fn parse_search_response(json: &str) -> Result<Option<(String, Option<String>)>> {
        let response: DblpResponse = serde_json::from_str(json)
            .map_err(|e| BibwormError::FetchFailed(format!("invalid DBLP search response: {e}")))?;

        Ok(response
            .result
            .hits
            .hit
            .into_iter()
            .next()
            .map(|hit| (hit.info.key, hit.info.title)))
    }
}

/// Search query for a title: URL-encoded words joined by `+`.
pub fn search_query(title: &str) -> String {
    title
        .split_whitespace()
        .map(urlencoding::encode)
        .join("+")
}

impl CatalogSource for DblpSource {
    fn fetch(&self, key: &CatalogKey) -> Result<CatalogEntry> {
        let standard = self.download(key, Flavour::Standard)?;
        let condensed = match self.download(key, Flavour::Condensed) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(%key, error = %e, "condensed DBLP record unavailable");
                None
            }
        };
        Ok(CatalogEntry {
            standard,
            condensed,
        })
    }

    fn search_title(&self, title: &str) -> Result<Option<CatalogKey>> {
        let url = format!("{}?q={}&format=json&h=1", self.search_url, search_query(title));
        let body = self.http.get_ok(&url)?;

        let Some((path, hit_title)) = Self::parse_search_response(&body)? else {
            debug!(%title, "no DBLP hit");
            return Ok(None);
        };

        if let Some(hit_title) = hit_title {
            let similarity = title_similarity(title, &hit_title);
            if similarity < TITLE_MATCH_THRESHOLD {
                warn!(query = %title, hit = %hit_title, similarity, "DBLP hit may not be the requested publication");
            }
        }
        Ok(Some(CatalogKey::from_dblp_path(&path)))
    }
}
