//! Remote reputation lookup against a CAS-style service.
//!
//! The check never fails hard: a detector that errors out on a bad remote
//! response would deny service on every message during an outage, so every
//! transport or parse failure degrades to a ham result with a detail string.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::spam_detection::models::{CheckResult, HttpClient, HttpResponse};

/// Body of `GET {cas_api}/check?user_id={id}`. `ok == true` means the user is
/// a known spammer.
#[derive(Debug, Deserialize)]
struct CasResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: String,
}

/// Look up a user id with the reputation service.
///
/// A missing client means the caller configured `cas_api` without injecting
/// an HTTP client; the check degrades to a ham result naming the problem.
pub(crate) fn cas_check(
    client: Option<&dyn HttpClient>,
    cas_api: &str,
    user_id: &str,
) -> CheckResult {
    let ham = |details: String| CheckResult {
        name: "cas".to_string(),
        spam: false,
        details,
    };

    if user_id.parse::<i64>().is_err() {
        return ham(format!("invalid user id {:?}", user_id));
    }

    let Some(client) = client else {
        log::warn!("cas api {} is set but no http client is configured", cas_api);
        return ham("no http client configured".to_string());
    };

    let url = format!("{}/check?user_id={}", cas_api, user_id);
    let response = match client.get(&url) {
        Ok(response) => response,
        Err(e) => return ham(format!("failed to send request {}: {:#}", url, e)),
    };

    let data: CasResponse = match serde_json::from_slice(&response.body) {
        Ok(data) => data,
        Err(e) => return ham(format!("failed to parse response from {}: {}", url, e)),
    };

    let description = data
        .description
        .to_lowercase()
        .trim_end_matches('.')
        .to_string();

    if data.ok {
        return CheckResult {
            name: "cas".to_string(),
            spam: true,
            details: description,
        };
    }
    let details = if description.is_empty() {
        "not found".to_string()
    } else {
        description
    };
    ham(details)
}

impl HttpClient for reqwest::blocking::Client {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = reqwest::blocking::Client::get(self, url)
            .send()
            .with_context(|| format!("request to {} failed", url))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .with_context(|| format!("failed to read response body from {}", url))?
            .to_vec();
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct StubHttpClient {
        response: Result<&'static str, &'static str>,
        requested: Mutex<Vec<String>>,
    }

    impl StubHttpClient {
        fn new(response: Result<&'static str, &'static str>) -> Self {
            Self {
                response,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for StubHttpClient {
        fn get(&self, url: &str) -> Result<HttpResponse> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.response {
                Ok(body) => Ok(HttpResponse {
                    status: 200,
                    body: body.as_bytes().to_vec(),
                }),
                Err(msg) => Err(anyhow!(msg)),
            }
        }
    }

    #[test]
    fn test_known_spammer() {
        let client = StubHttpClient::new(Ok(r#"{"ok": true, "description": "CAS banned."}"#));
        let result = cas_check(Some(&client), "https://api.example.com", "12345");
        assert!(result.spam);
        assert_eq!(result.name, "cas");
        assert_eq!(result.details, "cas banned");
        assert_eq!(
            client.requested.lock().unwrap()[0],
            "https://api.example.com/check?user_id=12345"
        );
    }

    #[test]
    fn test_miss_with_empty_description() {
        let client = StubHttpClient::new(Ok(r#"{"ok": false, "description": ""}"#));
        let result = cas_check(Some(&client), "https://api.example.com", "12345");
        assert!(!result.spam);
        assert_eq!(result.details, "not found");
    }

    #[test]
    fn test_miss_keeps_description() {
        let client = StubHttpClient::new(Ok(r#"{"ok": false, "description": "Record not found."}"#));
        let result = cas_check(Some(&client), "https://api.example.com", "12345");
        assert!(!result.spam);
        assert_eq!(result.details, "record not found");
    }

    #[test]
    fn test_invalid_user_id_skips_request() {
        let client = StubHttpClient::new(Ok(r#"{"ok": true}"#));
        let result = cas_check(Some(&client), "https://api.example.com", "not-a-number");
        assert!(!result.spam);
        assert!(result.details.contains("invalid user id"));
        assert!(client.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn test_transport_error_becomes_ham() {
        let client = StubHttpClient::new(Err("connection refused"));
        let result = cas_check(Some(&client), "https://api.example.com", "12345");
        assert!(!result.spam);
        assert!(result.details.contains("failed to send request"));
        assert!(result.details.contains("connection refused"));
    }

    #[test]
    fn test_malformed_json_becomes_ham() {
        let client = StubHttpClient::new(Ok("not json at all"));
        let result = cas_check(Some(&client), "https://api.example.com", "12345");
        assert!(!result.spam);
        assert!(result.details.contains("failed to parse response"));
    }

    #[test]
    fn test_missing_client_becomes_ham() {
        let result = cas_check(None, "https://api.example.com", "12345");
        assert!(!result.spam);
        assert_eq!(result.name, "cas");
        assert_eq!(result.details, "no http client configured");
    }

    #[test]
    fn test_negative_user_id_is_valid() {
        let client = StubHttpClient::new(Ok(r#"{"ok": false, "description": ""}"#));
        let result = cas_check(Some(&client), "https://api.example.com", "-42");
        assert!(!result.spam);
        assert_eq!(result.details, "not found");
        assert_eq!(client.requested.lock().unwrap().len(), 1);
    }
}
