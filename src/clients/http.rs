//! Shared plumbing for the reqwest-backed clients.

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::{LensError, Result};

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LensError::Config {
            message: format!("failed to build HTTP client: {}", e),
        })
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| LensError::Config {
        message: format!("invalid base URL '{}': {}", raw, e),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(LensError::Config {
            message: format!("base URL '{}' must be an http(s) URL", raw),
        });
    }
    Ok(url)
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| LensError::Config {
            message: format!("base URL '{}' cannot take a path", base),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn transport_error(operation: &str, err: reqwest::Error, timeout: Duration) -> LensError {
    if err.is_timeout() {
        LensError::Timeout {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        LensError::Transport {
            message: format!("{} failed: {}", operation, err),
        }
    }
}

/// Turns a non-2xx response into `LensError::Server`, preferring the body's `error` field.
pub(crate) async fn ensure_success(operation: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = server_message(&text)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("{} failed", operation));
    tracing::debug!("{} returned {}: {}", operation, status, message);
    Err(LensError::Server {
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(operation: &str, resp: Response) -> Result<T> {
    let resp = ensure_success(operation, resp).await?;
    let bytes = resp.bytes().await.map_err(|e| LensError::Transport {
        message: format!("{} failed reading body: {}", operation, e),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| LensError::Serialization {
        message: format!("{} returned malformed JSON: {}", operation, e),
    })
}

fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str())
                && !msg.trim().is_empty()
            {
                return Some(msg.trim().to_string());
            }
        }
    }
    Some(truncate_chars(trimmed, 300))
}

fn truncate_chars(input: &str, max: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in input.chars().enumerate() {
        if idx >= max {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        let base = parse_base_url("http://localhost:4000/").unwrap();
        let url = endpoint(&base, &["api", "products", "a b/c", "score"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/products/a%20b%2Fc/score");

        let prefixed = parse_base_url("https://lens.example/v2").unwrap();
        let url = endpoint(&prefixed, &["generate-questions"]).unwrap();
        assert_eq!(url.as_str(), "https://lens.example/v2/generate-questions");
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn server_message_prefers_error_field() {
        assert_eq!(
            server_message(r#"{"error":"Product not found"}"#).as_deref(),
            Some("Product not found")
        );
        assert_eq!(server_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(server_message("  "), None);
    }
}
