//! HTTP utilities for Superset REST API calls

use crate::error::{SupersetError, SupersetResult};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const USER_AGENT: &str = concat!("superset-toolkit/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// HTTP client wrapper for Superset API calls
///
/// Keeps a cookie store so the session cookie issued alongside the CSRF token
/// is replayed on later requests.
#[derive(Clone)]
pub struct SupersetHttpClient {
    client: Client,
}

impl SupersetHttpClient {
    /// Create a new HTTP client
    pub fn new(timeout: Duration) -> SupersetResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a request and return the body if the status is in `expected`
    ///
    /// `action` names the operation in error messages, e.g. "Dataset creation".
    pub async fn send(
        &self,
        request: RequestBuilder,
        expected: &[u16],
        action: &str,
    ) -> SupersetResult<String> {
        let response = request.send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!("{} -> {}", action, status);

        if !expected.contains(&status) {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(SupersetError::api(
                status,
                format!("{} failed: {}", action, status),
                body,
            ));
        }

        Ok(body)
    }
}

/// Decode a response body into a typed schema
pub fn parse_json<T: DeserializeOwned>(body: &str, action: &str) -> SupersetResult<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            "Unexpected response for {}: {} - {}",
            action,
            e,
            sanitize_for_log(body)
        );
        SupersetError::malformed(format!("{}: {}", action, e))
    })
}

/// Format a Superset error for display
/// Maps common statuses to short hints instead of echoing raw API bodies
pub fn format_superset_error(error: &SupersetError) -> String {
    match error {
        SupersetError::Authentication(_) => {
            "Authentication failed. Check SUPERSET_USERNAME and SUPERSET_PASSWORD.".to_string()
        }
        SupersetError::NotFound(what) => format!("Not found: {}", what),
        SupersetError::Config(msg) => format!("Configuration error: {}", msg),
        SupersetError::MalformedResponse(_) => {
            "Superset returned an unexpected response. Check the server version.".to_string()
        }
        SupersetError::Transport(e) if e.is_timeout() => {
            "Request timed out. Increase SUPERSET_TIMEOUT_SECS or check the server.".to_string()
        }
        SupersetError::Transport(_) => {
            "Could not reach Superset. Check the URL and your network connection.".to_string()
        }
        SupersetError::Api { status, message, .. } => match status {
            401 => "Session rejected. Log in again.".to_string(),
            403 => "Permission denied. The user lacks the required Superset role.".to_string(),
            404 => "Resource not found.".to_string(),
            409 | 422 => format!("Request rejected: {}", message),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            500..=599 => "Superset service error. Please try again.".to_string(),
            _ => message.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.ends_with("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_respects_char_boundaries() {
        let body = "é".repeat(150);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
    }

    #[test]
    fn test_parse_json_reports_malformed() {
        #[derive(serde::Deserialize, Debug)]
        struct Expected {
            #[allow(dead_code)]
            id: i64,
        }
        let err = parse_json::<Expected>("{\"name\": 1}", "Chart creation").unwrap_err();
        assert!(matches!(err, SupersetError::MalformedResponse(_)));
    }

    #[test]
    fn test_format_error_messages() {
        let forbidden = SupersetError::api(403, "Chart deletion failed: 403", "");
        assert!(format_superset_error(&forbidden).contains("Permission denied"));

        let conflict = SupersetError::api(422, "Dataset creation failed: 422", "");
        assert_eq!(
            format_superset_error(&conflict),
            "Request rejected: Dataset creation failed: 422"
        );
    }
}
