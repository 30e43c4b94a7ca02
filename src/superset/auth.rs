//! Superset Authentication
//!
//! Handles the database-provider login exchange, CSRF token capture and access
//! token refresh, plus extraction of the user ID from the access token.

use super::http::{parse_json, SupersetHttpClient};
use crate::error::{SupersetError, SupersetResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;

pub const LOGIN_PATH: &str = "/api/v1/security/login";
pub const REFRESH_PATH: &str = "/api/v1/security/refresh";
pub const CSRF_PATH: &str = "/api/v1/security/csrf_token/";
pub const ME_PATH: &str = "/api/v1/me/";
pub const LOGOUT_PATH: &str = "/logout/";

/// Tokens held by an authenticated session
#[derive(Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub csrf_token: String,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("csrf_token", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    result: CurrentUser,
}

/// The authenticated user as reported by `/api/v1/me/`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

fn auth_failure(err: SupersetError) -> SupersetError {
    match err {
        SupersetError::Api { message, .. } => SupersetError::Authentication(message),
        other => other,
    }
}

/// Exchange credentials for an access token, then capture a CSRF token
pub async fn login(
    http: &SupersetHttpClient,
    base_url: &str,
    username: &str,
    password: &str,
) -> SupersetResult<AuthTokens> {
    tracing::info!("Logging in to {} as {}", base_url, username);

    let payload = json!({
        "username": username,
        "password": password,
        "provider": "db",
        "refresh": true,
    });

    let request = http
        .request(Method::POST, &format!("{}{}", base_url, LOGIN_PATH))
        .json(&payload);
    let body = http
        .send(request, &[200], "Login")
        .await
        .map_err(auth_failure)?;

    let login: LoginResponse = parse_json(&body, "Login")
        .map_err(|_| SupersetError::Authentication("login response missing access_token".into()))?;

    let csrf_token = fetch_csrf_token(http, base_url, &login.access_token).await?;

    Ok(AuthTokens {
        access_token: login.access_token,
        refresh_token: login.refresh_token,
        csrf_token,
    })
}

/// Fetch a CSRF token; the response also sets the session cookie it is bound to
pub async fn fetch_csrf_token(
    http: &SupersetHttpClient,
    base_url: &str,
    access_token: &str,
) -> SupersetResult<String> {
    let request = http
        .request(Method::GET, &format!("{}{}", base_url, CSRF_PATH))
        .bearer_auth(access_token);
    let body = http
        .send(request, &[200], "CSRF token fetch")
        .await
        .map_err(auth_failure)?;

    let csrf: CsrfResponse = parse_json(&body, "CSRF token fetch")?;
    Ok(csrf.result)
}

/// Trade a refresh token for a new access token
pub async fn refresh_access_token(
    http: &SupersetHttpClient,
    base_url: &str,
    refresh_token: &str,
) -> SupersetResult<String> {
    let request = http
        .request(Method::POST, &format!("{}{}", base_url, REFRESH_PATH))
        .bearer_auth(refresh_token);
    let body = http
        .send(request, &[200], "Token refresh")
        .await
        .map_err(auth_failure)?;

    let refreshed: RefreshResponse = parse_json(&body, "Token refresh")?;
    Ok(refreshed.access_token)
}

/// Ask the server who the access token belongs to
pub async fn fetch_current_user(
    http: &SupersetHttpClient,
    base_url: &str,
    access_token: &str,
) -> SupersetResult<CurrentUser> {
    let request = http
        .request(Method::GET, &format!("{}{}", base_url, ME_PATH))
        .bearer_auth(access_token);
    let body = http.send(request, &[200], "Current user lookup").await?;
    let me: MeResponse = parse_json(&body, "Current user lookup")?;
    Ok(me.result)
}

/// Read the user ID from the `sub` claim of a JWT access token
///
/// Superset 4 stores the ID as a string, older releases as a number.
/// The signature is not verified; the token came straight from the server.
pub fn user_id_from_jwt(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;

    match claims.get("sub")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_claims(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_user_id_from_string_sub() {
        let token = token_with_claims(json!({"sub": "7", "fresh": true}));
        assert_eq!(user_id_from_jwt(&token), Some(7));
    }

    #[test]
    fn test_user_id_from_numeric_sub() {
        let token = token_with_claims(json!({"sub": 12}));
        assert_eq!(user_id_from_jwt(&token), Some(12));
    }

    #[test]
    fn test_user_id_missing_or_garbage() {
        assert_eq!(user_id_from_jwt(&token_with_claims(json!({"type": "access"}))), None);
        assert_eq!(user_id_from_jwt("not-a-jwt"), None);
        assert_eq!(user_id_from_jwt("a.!!!.c"), None);
    }

    #[test]
    fn test_tokens_debug_is_masked() {
        let tokens = AuthTokens {
            access_token: "secret-access".into(),
            refresh_token: Some("secret-refresh".into()),
            csrf_token: "secret-csrf".into(),
        };
        let printed = format!("{:?}", tokens);
        assert!(!printed.contains("secret"));
    }
}
