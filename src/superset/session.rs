//! Superset Session
//!
//! An authenticated connection to one Superset instance: HTTP client, base URL,
//! tokens and the ID of the logged-in user. All resource functions take a
//! `&Session`.

use super::auth::{self, AuthTokens};
use super::http::{parse_json, SupersetHttpClient};
use crate::config::Config;
use crate::error::{SupersetError, SupersetResult};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

const CSRF_HEADER: &str = "X-CSRFToken";

pub struct Session {
    http: SupersetHttpClient,
    base_url: String,
    tokens: AuthTokens,
    user_id: i64,
}

impl Session {
    /// Log in and capture the tokens needed for later calls
    pub async fn login(config: &Config) -> SupersetResult<Self> {
        let http = SupersetHttpClient::new(config.timeout())?;
        let base_url = config.superset_url.trim_end_matches('/').to_string();

        let tokens = auth::login(&http, &base_url, &config.username, &config.password).await?;

        let user_id = match auth::user_id_from_jwt(&tokens.access_token) {
            Some(id) => id,
            None => {
                tracing::debug!("Access token carries no user ID, asking the server");
                auth::fetch_current_user(&http, &base_url, &tokens.access_token)
                    .await?
                    .id
            }
        };

        tracing::info!("Authenticated as {} (user ID {})", config.username, user_id);

        Ok(Self {
            http,
            base_url,
            tokens,
            user_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// ID of the authenticated user
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Build a REST API URL, e.g. `api_url("dataset/42")`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Swap the access token for a fresh one using the refresh token
    pub async fn refresh(&mut self) -> SupersetResult<()> {
        let Some(refresh_token) = self.tokens.refresh_token.clone() else {
            return Err(SupersetError::Authentication(
                "no refresh token held; log in again".to_string(),
            ));
        };

        self.tokens.access_token =
            auth::refresh_access_token(&self.http, &self.base_url, &refresh_token).await?;
        self.tokens.csrf_token =
            auth::fetch_csrf_token(&self.http, &self.base_url, &self.tokens.access_token).await?;

        tracing::debug!("Access token refreshed");
        Ok(())
    }

    fn read(&self, url: &str) -> RequestBuilder {
        tracing::debug!("GET {}", url);
        self.http
            .request(Method::GET, url)
            .bearer_auth(&self.tokens.access_token)
    }

    fn write(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .bearer_auth(&self.tokens.access_token)
            .header(CSRF_HEADER, &self.tokens.csrf_token)
            .header(reqwest::header::REFERER, &self.base_url)
    }

    /// GET an API path and decode the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, action: &str) -> SupersetResult<T> {
        let body = self
            .http
            .send(self.read(&self.api_url(path)), &[200], action)
            .await?;
        parse_json(&body, action)
    }

    /// GET an API path with a Rison `q` parameter
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        rison: &str,
        action: &str,
    ) -> SupersetResult<T> {
        let url = format!("{}?q={}", self.api_url(path), urlencoding::encode(rison));
        let body = self.http.send(self.read(&url), &[200], action).await?;
        parse_json(&body, action)
    }

    /// POST a JSON payload and decode the JSON response
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &Value,
        expected: &[u16],
        action: &str,
    ) -> SupersetResult<T> {
        let request = self.write(Method::POST, &self.api_url(path)).json(payload);
        let body = self.http.send(request, expected, action).await?;
        parse_json(&body, action)
    }

    /// PUT an optional JSON payload, returning the raw body
    pub async fn put(
        &self,
        path: &str,
        payload: Option<&Value>,
        expected: &[u16],
        action: &str,
    ) -> SupersetResult<String> {
        let mut request = self.write(Method::PUT, &self.api_url(path));
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        self.http.send(request, expected, action).await
    }

    pub async fn delete(&self, path: &str, expected: &[u16], action: &str) -> SupersetResult<()> {
        let request = self.write(Method::DELETE, &self.api_url(path));
        self.http.send(request, expected, action).await?;
        Ok(())
    }

    /// End the server-side session
    ///
    /// Best effort: failures are logged and the session is dropped either way.
    pub async fn logout(self) {
        let url = format!("{}{}", self.base_url, auth::LOGOUT_PATH);
        let request = self.read(&url);
        match self.http.send(request, &[200, 302], "Logout").await {
            Ok(_) => tracing::info!("Logged out of {}", self.base_url),
            Err(e) => tracing::debug!("Logout request failed: {}", e),
        }
    }
}
