//! Batch operations
//!
//! Pattern deletion, explicit-ID deletion, ownership migration and per-user
//! cleanup. Each item is handled by its own request; a failing item is logged and
//! skipped so the rest of the batch still runs. Dry runs list what would happen and
//! issue no mutating request.

use super::charts::{delete_chart, list_charts, update_chart, ChartUpdate};
use super::dashboards::{delete_dashboard, list_dashboards, update_dashboard, DashboardUpdate};
use super::datasets::{delete_dataset, list_datasets};
use super::models::{ChartSummary, DashboardSummary, Owned};
use super::queries::{get_charts_by_owner, get_dashboards_by_owner};
use super::ResourceKind;
use crate::error::{SupersetError, SupersetResult};
use crate::superset::session::Session;
use serde::Serialize;

/// Case-sensitive substring match; an empty pattern matches everything
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    name.contains(pattern)
}

/// Replace `from` with `to` in an owner list, keeping order and avoiding duplicates
pub fn replace_owner(owners: &[i64], from: i64, to: i64) -> Vec<i64> {
    let mut replaced: Vec<i64> = owners.iter().copied().filter(|&id| id != from).collect();
    if !replaced.contains(&to) {
        replaced.push(to);
    }
    replaced
}

async fn delete_one(session: &Session, kind: ResourceKind, id: i64) -> SupersetResult<bool> {
    match kind {
        ResourceKind::Chart => delete_chart(session, id).await,
        ResourceKind::Dashboard => delete_dashboard(session, id).await,
        ResourceKind::Dataset => delete_dataset(session, id).await,
        ResourceKind::Database | ResourceKind::User => Err(SupersetError::config(format!(
            "batch deletion of {} is not supported",
            kind.plural()
        ))),
    }
}

/// Delete each ID in turn, returning the ones that were actually deleted
pub async fn delete_ids(session: &Session, kind: ResourceKind, ids: &[i64], dry_run: bool) -> Vec<i64> {
    if dry_run {
        tracing::info!(
            "[DRY RUN] Would delete {} {}: {:?}",
            ids.len(),
            kind.plural(),
            ids
        );
        return ids.to_vec();
    }

    let mut deleted = Vec::with_capacity(ids.len());
    for &id in ids {
        match delete_one(session, kind, id).await {
            Ok(_) => deleted.push(id),
            Err(e) => tracing::warn!("Failed to delete {} {}: {}", kind.label(), id, e),
        }
    }

    tracing::info!("Deleted {} of {} {}", deleted.len(), ids.len(), kind.plural());
    deleted
}

async fn delete_matching(
    session: &Session,
    kind: ResourceKind,
    pattern: &str,
    candidates: Vec<(i64, String)>,
    dry_run: bool,
) -> Vec<i64> {
    let matching: Vec<(i64, String)> = candidates
        .into_iter()
        .filter(|(_, name)| matches_pattern(name, pattern))
        .collect();

    if matching.is_empty() {
        tracing::info!("No {} found matching pattern '{}'", kind.plural(), pattern);
        return Vec::new();
    }

    tracing::info!(
        "{}Found {} {} matching '{}'",
        if dry_run { "[DRY RUN] " } else { "" },
        matching.len(),
        kind.plural(),
        pattern
    );
    for (id, name) in &matching {
        tracing::info!("  - {} ID {}: {}", kind.label(), id, name);
    }

    let ids: Vec<i64> = matching.iter().map(|(id, _)| *id).collect();
    delete_ids(session, kind, &ids, dry_run).await
}

/// Delete every chart whose name contains `pattern`
pub async fn delete_charts_by_name_pattern(
    session: &Session,
    pattern: &str,
    dry_run: bool,
) -> SupersetResult<Vec<i64>> {
    let candidates = list_charts(session)
        .await?
        .into_iter()
        .map(|c| (c.id, c.slice_name))
        .collect();
    Ok(delete_matching(session, ResourceKind::Chart, pattern, candidates, dry_run).await)
}

/// Delete every dashboard whose title contains `pattern`
pub async fn delete_dashboards_by_name_pattern(
    session: &Session,
    pattern: &str,
    dry_run: bool,
) -> SupersetResult<Vec<i64>> {
    let candidates = list_dashboards(session)
        .await?
        .into_iter()
        .map(|d| (d.id, d.dashboard_title))
        .collect();
    Ok(delete_matching(session, ResourceKind::Dashboard, pattern, candidates, dry_run).await)
}

/// Delete every dataset whose table name contains `pattern`
pub async fn delete_datasets_by_name_pattern(
    session: &Session,
    pattern: &str,
    dry_run: bool,
) -> SupersetResult<Vec<i64>> {
    let candidates = list_datasets(session)
        .await?
        .into_iter()
        .map(|d| (d.id, d.table_name))
        .collect();
    Ok(delete_matching(session, ResourceKind::Dataset, pattern, candidates, dry_run).await)
}

pub async fn delete_charts_batch(session: &Session, chart_ids: &[i64], dry_run: bool) -> Vec<i64> {
    delete_ids(session, ResourceKind::Chart, chart_ids, dry_run).await
}

/// Outcome of [`migrate_user_resources`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Resources reassigned (or that would be, on a dry run)
    pub migrated: usize,
    pub chart_ids: Vec<i64>,
    pub dashboard_ids: Vec<i64>,
    pub failed_chart_ids: Vec<i64>,
    pub failed_dashboard_ids: Vec<i64>,
    pub dry_run: bool,
}

/// Reassign every chart and dashboard owned by `from_user_id` to `to_user_id`
pub async fn migrate_user_resources(
    session: &Session,
    from_user_id: i64,
    to_user_id: i64,
    dry_run: bool,
) -> SupersetResult<MigrationReport> {
    let charts = get_charts_by_owner(session, from_user_id).await?;
    let dashboards = get_dashboards_by_owner(session, from_user_id).await?;

    tracing::info!(
        "{}Migrating {} charts and {} dashboards from user {} to user {}",
        if dry_run { "[DRY RUN] " } else { "" },
        charts.len(),
        dashboards.len(),
        from_user_id,
        to_user_id
    );

    let mut report = MigrationReport {
        dry_run,
        ..Default::default()
    };

    if dry_run {
        report.chart_ids = charts.iter().map(|c| c.id).collect();
        report.dashboard_ids = dashboards.iter().map(|d| d.id).collect();
        report.migrated = report.chart_ids.len() + report.dashboard_ids.len();
        return Ok(report);
    }

    for chart in &charts {
        let update = ChartUpdate {
            owners: Some(replace_owner(&chart.owner_ids(), from_user_id, to_user_id)),
            ..Default::default()
        };
        match update_chart(session, chart.id, &update).await {
            Ok(()) => report.chart_ids.push(chart.id),
            Err(e) => {
                tracing::warn!("Failed to migrate chart {}: {}", chart.id, e);
                report.failed_chart_ids.push(chart.id);
            }
        }
    }

    for dashboard in &dashboards {
        let update = DashboardUpdate {
            owners: Some(replace_owner(&dashboard.owner_ids(), from_user_id, to_user_id)),
            ..Default::default()
        };
        match update_dashboard(session, dashboard.id, &update).await {
            Ok(()) => report.dashboard_ids.push(dashboard.id),
            Err(e) => {
                tracing::warn!("Failed to migrate dashboard {}: {}", dashboard.id, e);
                report.failed_dashboard_ids.push(dashboard.id);
            }
        }
    }

    report.migrated = report.chart_ids.len() + report.dashboard_ids.len();
    tracing::info!("Migrated {} resources", report.migrated);
    Ok(report)
}

/// Outcome of [`cleanup_user`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub chart_ids: Vec<i64>,
    pub dashboard_ids: Vec<i64>,
    pub dry_run: bool,
}

/// Delete every chart and dashboard the user owns
pub async fn cleanup_user(session: &Session, user_id: i64, dry_run: bool) -> SupersetResult<CleanupReport> {
    let chart_ids: Vec<i64> = get_charts_by_owner(session, user_id)
        .await?
        .iter()
        .map(|c| c.id)
        .collect();
    let dashboard_ids: Vec<i64> = get_dashboards_by_owner(session, user_id)
        .await?
        .iter()
        .map(|d| d.id)
        .collect();

    Ok(CleanupReport {
        chart_ids: delete_ids(session, ResourceKind::Chart, &chart_ids, dry_run).await,
        dashboard_ids: delete_ids(session, ResourceKind::Dashboard, &dashboard_ids, dry_run).await,
        dry_run,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceGroup<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> ResourceGroup<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// Charts and dashboards owned by one user, most recently changed first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResourceSummary {
    pub username: String,
    pub user_id: i64,
    pub charts: ResourceGroup<ChartSummary>,
    pub dashboards: ResourceGroup<DashboardSummary>,
    pub summary: String,
}

pub async fn user_summary(
    session: &Session,
    user_id: i64,
    username: &str,
) -> SupersetResult<UserResourceSummary> {
    let mut charts = get_charts_by_owner(session, user_id).await?;
    let mut dashboards = get_dashboards_by_owner(session, user_id).await?;

    // newest first, undated last
    charts.sort_by(|a, b| b.changed_on_utc.cmp(&a.changed_on_utc));
    dashboards.sort_by(|a, b| b.changed_on_utc.cmp(&a.changed_on_utc));

    let summary = format!("{} charts, {} dashboards", charts.len(), dashboards.len());

    Ok(UserResourceSummary {
        username: username.to_string(),
        user_id,
        charts: ResourceGroup::new(charts),
        dashboards: ResourceGroup::new(dashboards),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_case_sensitive_substring() {
        assert!(matches_pattern("reports_2023", "report"));
        assert!(matches_pattern("reports_2023", "2023"));
        assert!(!matches_pattern("reports_2023", "Report"));
        assert!(!matches_pattern("Batch 1", "batch"));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        assert!(matches_pattern("anything", ""));
        assert!(matches_pattern("", ""));
    }

    #[test]
    fn test_replace_owner() {
        assert_eq!(replace_owner(&[1, 2, 3], 2, 9), vec![1, 3, 9]);
        assert_eq!(replace_owner(&[2], 2, 9), vec![9]);
        assert_eq!(replace_owner(&[2, 9], 2, 9), vec![9]);
        assert_eq!(replace_owner(&[], 2, 9), vec![9]);
    }
}
