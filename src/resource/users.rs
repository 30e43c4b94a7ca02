//! User lookup
//!
//! Username resolution goes through the security API, which requires an admin
//! (or `can_read on User`) role.

use super::fetcher::{fetch_resources, ResourceFilter};
use super::models::UserSummary;
use super::ResourceKind;
use crate::error::{SupersetError, SupersetResult};
use crate::superset::session::Session;

/// Resolve a username to its numeric ID
pub async fn get_user_id_by_username(session: &Session, username: &str) -> SupersetResult<i64> {
    let filters = [ResourceFilter::eq("username", username)];
    let users: Vec<UserSummary> = fetch_resources(session, ResourceKind::User, &filters).await?;

    users
        .iter()
        .filter(|u| u.username == username)
        .map(|u| u.id)
        .min()
        .ok_or_else(|| SupersetError::not_found(format!("user '{}'", username)))
}
