//! Dashboard management
//!
//! Dashboards are resolved by slug. Linking charts updates each chart's dashboard
//! list and then rewrites the dashboard layout so every linked chart is placed.

use super::charts::{get_chart, update_chart, ChartUpdate};
use super::fetcher::{fetch_resources, ResourceFilter};
use super::models::{CreatedResponse, DashboardChart, DashboardSummary, ListResponse};
use super::ResourceKind;
use crate::error::{SupersetError, SupersetResult};
use crate::superset::session::Session;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Grid columns per dashboard row
const GRID_COLUMNS: u32 = 12;
const CHARTS_PER_ROW: usize = 3;
const CHART_HEIGHT: u32 = 50;

/// Fields of a dashboard update; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

pub async fn list_dashboards(session: &Session) -> SupersetResult<Vec<DashboardSummary>> {
    fetch_resources(session, ResourceKind::Dashboard, &[]).await
}

/// Find a dashboard by slug; several matches resolve to the lowest ID
pub async fn get_dashboard_id_by_slug(session: &Session, slug: &str) -> SupersetResult<Option<i64>> {
    let filters = [ResourceFilter::eq("slug", slug)];
    let dashboards: Vec<DashboardSummary> =
        fetch_resources(session, ResourceKind::Dashboard, &filters).await?;

    Ok(dashboards
        .iter()
        .filter(|d| d.slug.as_deref() == Some(slug))
        .map(|d| d.id)
        .min())
}

pub async fn create_dashboard(
    session: &Session,
    title: &str,
    slug: &str,
    owner_id: Option<i64>,
) -> SupersetResult<i64> {
    let mut payload = json!({
        "dashboard_title": title,
        "slug": slug,
    });
    if let Some(owner) = owner_id {
        payload["owners"] = json!([owner]);
    }

    let created: CreatedResponse = session
        .post_json(ResourceKind::Dashboard.path(), &payload, &[201], "Dashboard creation")
        .await?;

    tracing::info!("Created dashboard '{}' (ID {}, slug {})", title, created.id, slug);
    Ok(created.id)
}

/// Return the ID of the dashboard with `slug`, creating it if needed
pub async fn ensure_dashboard(
    session: &Session,
    title: &str,
    slug: &str,
    owner_id: Option<i64>,
) -> SupersetResult<i64> {
    if let Some(id) = get_dashboard_id_by_slug(session, slug).await? {
        tracing::debug!("Dashboard '{}' already exists (ID {})", slug, id);
        return Ok(id);
    }
    create_dashboard(session, title, slug, owner_id).await
}

pub async fn update_dashboard(
    session: &Session,
    dashboard_id: i64,
    update: &DashboardUpdate,
) -> SupersetResult<()> {
    let payload = serde_json::to_value(update)
        .map_err(|e| SupersetError::malformed(format!("dashboard update: {}", e)))?;
    session
        .put(
            &ResourceKind::Dashboard.item_path(dashboard_id),
            Some(&payload),
            &[200, 201],
            &format!("Updating dashboard {}", dashboard_id),
        )
        .await?;
    Ok(())
}

/// Charts currently linked to a dashboard
pub async fn get_dashboard_charts(
    session: &Session,
    dashboard_id: i64,
) -> SupersetResult<Vec<DashboardChart>> {
    let response: ListResponse<DashboardChart> = session
        .get_json(
            &format!("{}/charts", ResourceKind::Dashboard.item_path(dashboard_id)),
            "Dashboard charts fetch",
        )
        .await?;
    Ok(response.result)
}

/// Link charts to a dashboard and lay every linked chart out on the grid
pub async fn add_charts_to_dashboard(
    session: &Session,
    dashboard_id: i64,
    chart_ids: &[i64],
) -> SupersetResult<()> {
    for &chart_id in chart_ids {
        let chart = get_chart(session, chart_id).await?;
        let mut dashboards: Vec<i64> = chart.dashboards.iter().map(|d| d.id).collect();
        if dashboards.contains(&dashboard_id) {
            continue;
        }
        dashboards.push(dashboard_id);

        let update = ChartUpdate {
            dashboards: Some(dashboards),
            ..Default::default()
        };
        update_chart(session, chart_id, &update).await?;
        tracing::debug!("Linked chart {} to dashboard {}", chart_id, dashboard_id);
    }

    let charts = get_dashboard_charts(session, dashboard_id).await?;
    let update = DashboardUpdate {
        position_json: Some(build_position_json(&charts).to_string()),
        ..Default::default()
    };
    update_dashboard(session, dashboard_id, &update).await?;

    tracing::info!(
        "Dashboard {} now shows {} charts",
        dashboard_id,
        charts.len()
    );
    Ok(())
}

pub async fn delete_dashboard(session: &Session, dashboard_id: i64) -> SupersetResult<bool> {
    session
        .delete(
            &ResourceKind::Dashboard.item_path(dashboard_id),
            &[200, 204],
            &format!("Deleting dashboard {}", dashboard_id),
        )
        .await?;
    tracing::info!("Deleted dashboard {}", dashboard_id);
    Ok(true)
}

/// Build a v2 dashboard layout with the charts in rows of three
pub fn build_position_json(charts: &[DashboardChart]) -> Value {
    let mut layout = Map::new();
    let mut row_ids = Vec::new();
    let width = GRID_COLUMNS / CHARTS_PER_ROW as u32;

    layout.insert("DASHBOARD_VERSION_KEY".into(), json!("v2"));
    layout.insert(
        "ROOT_ID".into(),
        json!({"type": "ROOT", "id": "ROOT_ID", "children": ["GRID_ID"]}),
    );

    for row in charts.chunks(CHARTS_PER_ROW) {
        let row_id = format!("ROW-{}", uuid::Uuid::new_v4().simple());
        let mut children = Vec::with_capacity(row.len());

        for chart in row {
            let chart_key = format!("CHART-{}", chart.id);
            layout.insert(
                chart_key.clone(),
                json!({
                    "type": "CHART",
                    "id": chart_key,
                    "children": [],
                    "parents": ["ROOT_ID", "GRID_ID", row_id],
                    "meta": {
                        "chartId": chart.id,
                        "sliceName": chart.slice_name,
                        "width": width,
                        "height": CHART_HEIGHT,
                    },
                }),
            );
            children.push(chart_key);
        }

        layout.insert(
            row_id.clone(),
            json!({
                "type": "ROW",
                "id": row_id,
                "children": children,
                "parents": ["ROOT_ID", "GRID_ID"],
                "meta": {"background": "BACKGROUND_TRANSPARENT"},
            }),
        );
        row_ids.push(row_id);
    }

    layout.insert(
        "GRID_ID".into(),
        json!({"type": "GRID", "id": "GRID_ID", "children": row_ids, "parents": ["ROOT_ID"]}),
    );

    Value::Object(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(id: i64) -> DashboardChart {
        DashboardChart {
            id,
            slice_name: format!("Chart {}", id),
        }
    }

    #[test]
    fn test_layout_rows_of_three() {
        let charts: Vec<DashboardChart> = (1..=4).map(chart).collect();
        let layout = build_position_json(&charts);

        let rows = layout["GRID_ID"]["children"].as_array().unwrap();
        assert_eq!(rows.len(), 2);

        let first_row = rows[0].as_str().unwrap();
        assert_eq!(layout[first_row]["children"].as_array().unwrap().len(), 3);
        assert_eq!(layout["CHART-4"]["meta"]["chartId"], 4);
        assert_eq!(layout["CHART-1"]["meta"]["width"], 4);
    }

    #[test]
    fn test_empty_layout_has_grid() {
        let layout = build_position_json(&[]);
        assert_eq!(layout["GRID_ID"]["children"], json!([]));
        assert_eq!(layout["ROOT_ID"]["children"], json!(["GRID_ID"]));
    }
}
