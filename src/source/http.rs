//! Blocking HTTP client shared by the citation sources.

use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Rate limited by {url}")]
    RateLimited { url: String },
    #[error("Parse error: {message}")]
    ParseError { message: String },
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    /// Sends a GET request and returns the response, whatever its status.
    pub fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(HttpError::RateLimited {
                url: url.to_string(),
            });
        }

        let body = response.text().map_err(|e| HttpError::ParseError {
            message: e.to_string(),
        })?;
        debug!(%url, status, bytes = body.len(), "response");

        Ok(HttpResponse { status, body })
    }

    /// Like [`get`](Self::get) but fails on any non-2xx status.
    pub fn get_ok(&self, url: &str) -> Result<String, HttpError> {
        let response = self.get(url)?;
        if !response.is_success() {
            return Err(HttpError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }

    pub fn get_with_params(&self, url: &str, params: &[(&str, &str)]) -> Result<String, HttpError> {
        let url =
            reqwest::Url::parse_with_params(url, params).map_err(|_| HttpError::InvalidUrl {
                url: url.to_string(),
            })?;

        self.get_ok(url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(301, false)]
    #[case(404, false)]
    #[case(500, false)]
    fn test_is_success(#[case] status: u16, #[case] expected: bool) {
        let response = HttpResponse {
            status,
            body: String::new(),
        };
        assert_eq!(response.is_success(), expected);
    }

    #[test]
    fn test_invalid_url_is_reported() {
        let client = HttpClient::new("bibworm-test").unwrap();
        let result = client.get_with_params("not a url", &[("q", "x")]);
        assert!(matches!(result, Err(HttpError::InvalidUrl { .. })));
    }

    #[test]
    fn test_error_display() {
        let error = HttpError::Status {
            status: 404,
            url: "https://dblp.org/rec/x.bib".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 404 from https://dblp.org/rec/x.bib");
    }
}
