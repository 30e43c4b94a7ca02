//! Dataset management
//!
//! A dataset is keyed by `(database, schema, table_name)`.

use super::fetcher::{fetch_resources, ResourceFilter};
use super::models::{CreatedResponse, DatasetDetail, DatasetSummary, ItemResponse};
use super::ResourceKind;
use crate::error::{SupersetError, SupersetResult};
use crate::superset::session::Session;
use serde_json::json;

/// List every dataset visible to the session
pub async fn list_datasets(session: &Session) -> SupersetResult<Vec<DatasetSummary>> {
    fetch_resources(session, ResourceKind::Dataset, &[]).await
}

/// Find the dataset for a table
///
/// With `database_id`, only datasets registered against that database match.
/// Several matches resolve to the lowest ID.
pub async fn get_dataset_id(
    session: &Session,
    table_name: &str,
    schema: &str,
    database_id: Option<i64>,
) -> SupersetResult<Option<i64>> {
    let mut filters = vec![
        ResourceFilter::eq("table_name", table_name),
        ResourceFilter::eq("schema", schema),
    ];
    if let Some(db) = database_id {
        filters.push(ResourceFilter::related_one("database", db));
    }

    let datasets: Vec<DatasetSummary> =
        fetch_resources(session, ResourceKind::Dataset, &filters).await?;

    Ok(datasets
        .iter()
        .filter(|d| d.table_name == table_name && d.schema.as_deref() == Some(schema))
        .filter(|d| database_id.is_none() || d.database_id() == database_id)
        .map(|d| d.id)
        .min())
}

/// Register a physical table as a dataset
pub async fn create_dataset(
    session: &Session,
    database_id: i64,
    schema: &str,
    table_name: &str,
) -> SupersetResult<i64> {
    let payload = json!({
        "database": database_id,
        "schema": schema,
        "table_name": table_name,
    });

    tracing::info!("Creating dataset {}.{}", schema, table_name);
    let created: CreatedResponse = session
        .post_json(ResourceKind::Dataset.path(), &payload, &[201], "Dataset creation")
        .await?;

    tracing::info!("Created dataset {}.{} (ID {})", schema, table_name, created.id);
    Ok(created.id)
}

/// Return the dataset ID for a table, creating the dataset if it does not exist
pub async fn ensure_dataset(
    session: &Session,
    database_id: i64,
    schema: &str,
    table_name: &str,
) -> SupersetResult<i64> {
    if let Some(id) = get_dataset_id(session, table_name, schema, Some(database_id)).await? {
        tracing::debug!("Dataset {}.{} already exists (ID {})", schema, table_name, id);
        return Ok(id);
    }
    create_dataset(session, database_id, schema, table_name).await
}

/// Re-read the column list from the underlying table
pub async fn refresh_dataset_metadata(session: &Session, dataset_id: i64) -> SupersetResult<()> {
    tracing::info!("Refreshing dataset metadata for dataset {}", dataset_id);
    session
        .put(
            &format!("{}/refresh", ResourceKind::Dataset.item_path(dataset_id)),
            None,
            &[200, 202, 204],
            "Dataset refresh",
        )
        .await?;
    Ok(())
}

/// Set the dataset's main datetime column for time-series charts
pub async fn set_main_dttm_col(
    session: &Session,
    dataset_id: i64,
    time_column: &str,
) -> SupersetResult<()> {
    session
        .put(
            &ResourceKind::Dataset.item_path(dataset_id),
            Some(&json!({ "main_dttm_col": time_column })),
            &[200, 201],
            "Setting main_dttm_col",
        )
        .await?;
    tracing::info!("Dataset {} main datetime column set to '{}'", dataset_id, time_column);
    Ok(())
}

/// Fetch one dataset with its columns
pub async fn get_dataset(session: &Session, dataset_id: i64) -> SupersetResult<DatasetDetail> {
    let response: ItemResponse<DatasetDetail> = session
        .get_json(&ResourceKind::Dataset.item_path(dataset_id), "Dataset fetch")
        .await
        .map_err(|e| match e.status() {
            Some(404) => SupersetError::not_found(format!("dataset {}", dataset_id)),
            _ => e,
        })?;
    Ok(response.result)
}

/// Column names of a dataset; a dataset without columns counts as not found
pub async fn get_dataset_column_names(
    session: &Session,
    dataset_id: i64,
) -> SupersetResult<Vec<String>> {
    let dataset = get_dataset(session, dataset_id).await?;

    let names: Vec<String> = dataset
        .columns
        .into_iter()
        .filter_map(|c| c.column_name)
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(SupersetError::not_found(format!(
            "no columns returned for dataset {}",
            dataset_id
        )));
    }
    Ok(names)
}

pub async fn delete_dataset(session: &Session, dataset_id: i64) -> SupersetResult<bool> {
    session
        .delete(
            &ResourceKind::Dataset.item_path(dataset_id),
            &[200, 204],
            &format!("Deleting dataset {}", dataset_id),
        )
        .await?;
    tracing::info!("Deleted dataset {}", dataset_id);
    Ok(true)
}
