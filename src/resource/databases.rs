//! Database connections
//!
//! Datasets are registered against a database connection, so most workflows start
//! by resolving the configured database name to its ID.

use super::fetcher::{fetch_resources, ResourceFilter};
use super::models::{CreatedResponse, DatabaseSummary};
use super::ResourceKind;
use crate::error::{SupersetError, SupersetResult};
use crate::superset::session::Session;
use serde_json::json;

pub async fn list_databases(session: &Session) -> SupersetResult<Vec<DatabaseSummary>> {
    fetch_resources(session, ResourceKind::Database, &[]).await
}

/// Look up a database connection by its display name
pub async fn get_database_id_by_name(session: &Session, name: &str) -> SupersetResult<Option<i64>> {
    let filters = [ResourceFilter::eq("database_name", name)];
    let databases: Vec<DatabaseSummary> =
        fetch_resources(session, ResourceKind::Database, &filters).await?;

    Ok(databases
        .iter()
        .filter(|db| db.database_name == name)
        .map(|db| db.id)
        .min())
}

/// Like [`get_database_id_by_name`], but absence is an error
pub async fn require_database_id(session: &Session, name: &str) -> SupersetResult<i64> {
    get_database_id_by_name(session, name)
        .await?
        .ok_or_else(|| SupersetError::not_found(format!("database '{}'", name)))
}

/// Register a new database connection
pub async fn create_database(
    session: &Session,
    name: &str,
    sqlalchemy_uri: &str,
) -> SupersetResult<i64> {
    let payload = json!({
        "database_name": name,
        "sqlalchemy_uri": sqlalchemy_uri,
    });

    let created: CreatedResponse = session
        .post_json(ResourceKind::Database.path(), &payload, &[201], "Database creation")
        .await?;

    tracing::info!("Created database '{}' (ID {})", name, created.id);
    Ok(created.id)
}

/// Return the ID of the named database, registering it first if needed
pub async fn ensure_database(
    session: &Session,
    name: &str,
    sqlalchemy_uri: &str,
) -> SupersetResult<i64> {
    if let Some(id) = get_database_id_by_name(session, name).await? {
        tracing::debug!("Database '{}' already exists (ID {})", name, id);
        return Ok(id);
    }
    create_database(session, name, sqlalchemy_uri).await
}
