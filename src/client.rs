use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::brief::{self, ClientBrief};
use crate::portfolio::PortfolioEntry;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to scoring server failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API code is not a valid header value")]
    BadApiCode(#[from] reqwest::header::InvalidHeaderValue),
    #[error("scoring server returned {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("could not decode client brief: {0}")]
    BadBrief(#[from] serde_json::Error),
}

/// Authenticated HTTP client for the scoring server. Every request carries
/// the team's API code in the `X-API-Code` header.
pub struct ScoringClient {
    http: reqwest::Client,
    base_url: String,
    port: u16,
    api_code: String,
}

impl ScoringClient {
    pub fn new(base_url: impl Into<String>, port: u16, api_code: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            port,
            api_code: api_code.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let port = self.port;
        format!("{base}:{port}{path}")
    }

    fn headers(&self) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Code", HeaderValue::from_str(&self.api_code)?);
        Ok(headers)
    }

    async fn get(&self, path: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .headers(self.headers()?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Rejected { status, body });
        }
        Ok(body)
    }

    async fn post(&self, path: &str, data: Value) -> Result<String, ClientError> {
        let mut headers = self.headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .http
            .post(self.endpoint(path))
            .headers(headers)
            .json(&data)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Rejected { status, body });
        }
        Ok(body)
    }

    /// Fetch and decode the client's investment brief (`GET /request`).
    pub async fn fetch_brief(&self) -> Result<ClientBrief, ClientError> {
        let body = self.get("/request").await?;
        Ok(brief::parse_brief(&body)?)
    }

    /// Team status line (`GET /info`). Informational only.
    pub async fn team_info(&self) -> Result<String, ClientError> {
        self.get("/info").await
    }

    /// Submit the sized portfolio for scoring (`POST /submit`).
    pub async fn submit(&self, entries: &[PortfolioEntry]) -> Result<String, ClientError> {
        self.post("/submit", submission_payload(entries)).await
    }
}

/// Wire format for `/submit`: a JSON array of `{"ticker", "quantity"}` pairs.
pub fn submission_payload(entries: &[PortfolioEntry]) -> Value {
    let lines: Vec<Value> = entries
        .iter()
        .map(|entry| {
            json!({
                "ticker": entry.ticker,
                "quantity": entry.shares,
            })
        })
        .collect();
    json!(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_port_and_path() {
        let client = ScoringClient::new("http://mts-prism.com", 8082, "CODE");
        assert_eq!(client.endpoint("/request"), "http://mts-prism.com:8082/request");

        let client = ScoringClient::new("http://mts-prism.com/", 8082, "CODE");
        assert_eq!(client.endpoint("/submit"), "http://mts-prism.com:8082/submit");
    }

    #[test]
    fn submission_payload_matches_the_wire_format() {
        let entries = vec![
            PortfolioEntry {
                ticker: "AAPL".to_string(),
                shares: 833,
            },
            PortfolioEntry {
                ticker: "SCCO".to_string(),
                shares: 12,
            },
        ];
        let payload = submission_payload(&entries);
        assert_eq!(
            payload,
            json!([
                {"ticker": "AAPL", "quantity": 833},
                {"ticker": "SCCO", "quantity": 12},
            ])
        );
    }

    #[test]
    fn empty_submission_is_an_empty_array() {
        assert_eq!(submission_payload(&[]), json!([]));
    }
}
