//! Resource queries
//!
//! Listing helpers keyed on owner, username or underlying table. Owner filters are
//! applied server-side and checked again locally, so a server that ignores the
//! relation filter still yields only owned resources.

use super::fetcher::{fetch_resources, ResourceFilter};
use super::models::{ChartSummary, DashboardSummary, DatasetSummary, Owned};
use super::users::get_user_id_by_username;
use super::ResourceKind;
use crate::error::SupersetResult;
use crate::superset::session::Session;

pub async fn get_charts_by_owner(session: &Session, user_id: i64) -> SupersetResult<Vec<ChartSummary>> {
    let filters = [ResourceFilter::related("owners", user_id)];
    let charts: Vec<ChartSummary> = fetch_resources(session, ResourceKind::Chart, &filters).await?;
    Ok(charts.into_iter().filter(|c| c.is_owned_by(user_id)).collect())
}

pub async fn get_dashboards_by_owner(
    session: &Session,
    user_id: i64,
) -> SupersetResult<Vec<DashboardSummary>> {
    let filters = [ResourceFilter::related("owners", user_id)];
    let dashboards: Vec<DashboardSummary> =
        fetch_resources(session, ResourceKind::Dashboard, &filters).await?;
    Ok(dashboards
        .into_iter()
        .filter(|d| d.is_owned_by(user_id))
        .collect())
}

pub async fn get_charts_by_username(
    session: &Session,
    username: &str,
) -> SupersetResult<Vec<ChartSummary>> {
    let user_id = get_user_id_by_username(session, username).await?;
    get_charts_by_owner(session, user_id).await
}

pub async fn get_dashboards_by_username(
    session: &Session,
    username: &str,
) -> SupersetResult<Vec<DashboardSummary>> {
    let user_id = get_user_id_by_username(session, username).await?;
    get_dashboards_by_owner(session, user_id).await
}

/// Charts built on one dataset
pub async fn get_charts_by_dataset(
    session: &Session,
    dataset_id: i64,
) -> SupersetResult<Vec<ChartSummary>> {
    let filters = [ResourceFilter::eq("datasource_id", dataset_id)];
    let charts: Vec<ChartSummary> = fetch_resources(session, ResourceKind::Chart, &filters).await?;
    Ok(charts
        .into_iter()
        .filter(|c| c.datasource_id == Some(dataset_id))
        .collect())
}

/// Charts built on any dataset registered for `schema.table_name`
pub async fn get_charts_by_table(
    session: &Session,
    table_name: &str,
    schema: &str,
) -> SupersetResult<Vec<ChartSummary>> {
    let filters = [
        ResourceFilter::eq("table_name", table_name),
        ResourceFilter::eq("schema", schema),
    ];
    let datasets: Vec<DatasetSummary> =
        fetch_resources(session, ResourceKind::Dataset, &filters).await?;

    let mut dataset_ids: Vec<i64> = datasets
        .iter()
        .filter(|d| d.table_name == table_name && d.schema.as_deref() == Some(schema))
        .map(|d| d.id)
        .collect();
    dataset_ids.sort_unstable();

    let mut charts = Vec::new();
    for dataset_id in dataset_ids {
        charts.extend(get_charts_by_dataset(session, dataset_id).await?);
    }
    Ok(charts)
}
