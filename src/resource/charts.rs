//! Chart creation and management
//!
//! Charts ("slices") store their visualization settings as a JSON string in
//! `params`. [`ChartKind`] builds those settings for the chart types the toolkit
//! supports.

use super::fetcher::{fetch_resources, ResourceFilter};
use super::models::{ChartDetail, ChartSummary, CreatedResponse, ItemResponse};
use super::ResourceKind;
use crate::error::{SupersetError, SupersetResult};
use crate::superset::session::Session;
use serde::Serialize;
use serde_json::{json, Value};

pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Visualization type and its settings
#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    /// Raw-records table
    Table {
        columns: Vec<String>,
        row_limit: u32,
        include_search: bool,
        table_filter: bool,
    },
    Pie {
        metric: Value,
        groupby: Vec<String>,
        row_limit: u32,
    },
    Histogram {
        columns_x: Vec<String>,
        bins: u32,
        row_limit: u32,
    },
}

impl ChartKind {
    pub fn table(columns: Vec<String>, row_limit: u32) -> Self {
        ChartKind::Table {
            columns,
            row_limit,
            include_search: false,
            table_filter: false,
        }
    }

    pub fn viz_type(&self) -> &'static str {
        match self {
            ChartKind::Table { .. } => "table",
            ChartKind::Pie { .. } => "pie",
            ChartKind::Histogram { .. } => "histogram",
        }
    }

    /// Form data stored in the chart's `params`
    pub fn params(&self, dataset_id: i64) -> Value {
        let datasource = format!("{}__table", dataset_id);
        match self {
            ChartKind::Table {
                columns,
                row_limit,
                include_search,
                table_filter,
            } => json!({
                "datasource": datasource,
                "viz_type": self.viz_type(),
                "query_mode": "raw",
                "all_columns": columns,
                "row_limit": row_limit,
                "include_search": include_search,
                "table_filter": table_filter,
                "order_by_cols": [],
                "adhoc_filters": [],
            }),
            ChartKind::Pie {
                metric,
                groupby,
                row_limit,
            } => json!({
                "datasource": datasource,
                "viz_type": self.viz_type(),
                "metric": metric,
                "groupby": groupby,
                "row_limit": row_limit,
                "show_legend": true,
                "show_labels": true,
                "label_type": "key",
                "adhoc_filters": [],
            }),
            // legacy histogram keeps the bin count in `link_length`
            ChartKind::Histogram {
                columns_x,
                bins,
                row_limit,
            } => json!({
                "datasource": datasource,
                "viz_type": self.viz_type(),
                "all_columns_x": columns_x,
                "link_length": bins,
                "row_limit": row_limit,
                "adhoc_filters": [],
            }),
        }
    }
}

/// Everything needed to create one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub slice_name: String,
    pub dataset_id: i64,
    /// Empty means Superset assigns the creating user
    pub owner_ids: Vec<i64>,
    pub kind: ChartKind,
}

impl ChartSpec {
    pub fn payload(&self) -> Value {
        let mut payload = json!({
            "slice_name": self.slice_name,
            "viz_type": self.kind.viz_type(),
            "datasource_id": self.dataset_id,
            "datasource_type": "table",
            "params": self.kind.params(self.dataset_id).to_string(),
        });
        if !self.owner_ids.is_empty() {
            payload["owners"] = json!(self.owner_ids);
        }
        payload
    }
}

/// Fields of a chart update; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboards: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A SIMPLE ad-hoc metric, e.g. `COUNT(id)`
pub fn build_simple_metric(column: &str, column_type: &str, aggregate: &str, label: &str) -> Value {
    json!({
        "expressionType": "SIMPLE",
        "column": {
            "column_name": column,
            "type": column_type,
        },
        "aggregate": aggregate,
        "label": label,
        "hasCustomLabel": true,
        "optionName": format!("metric_{}", uuid::Uuid::new_v4().simple()),
    })
}

pub async fn create_chart(session: &Session, spec: &ChartSpec) -> SupersetResult<i64> {
    let created: CreatedResponse = session
        .post_json(ResourceKind::Chart.path(), &spec.payload(), &[201], "Chart creation")
        .await?;

    tracing::info!(
        "Created {} chart '{}' (ID {})",
        spec.kind.viz_type(),
        spec.slice_name,
        created.id
    );
    Ok(created.id)
}

pub async fn create_table_chart(
    session: &Session,
    slice_name: &str,
    dataset_id: i64,
    owner_id: Option<i64>,
    columns: &[String],
    row_limit: u32,
) -> SupersetResult<i64> {
    let spec = ChartSpec {
        slice_name: slice_name.to_string(),
        dataset_id,
        owner_ids: owner_id.into_iter().collect(),
        kind: ChartKind::table(columns.to_vec(), row_limit),
    };
    create_chart(session, &spec).await
}

pub async fn create_pie_chart(
    session: &Session,
    slice_name: &str,
    dataset_id: i64,
    owner_id: Option<i64>,
    metric: Value,
    groupby: &[String],
    row_limit: u32,
) -> SupersetResult<i64> {
    let spec = ChartSpec {
        slice_name: slice_name.to_string(),
        dataset_id,
        owner_ids: owner_id.into_iter().collect(),
        kind: ChartKind::Pie {
            metric,
            groupby: groupby.to_vec(),
            row_limit,
        },
    };
    create_chart(session, &spec).await
}

pub async fn create_histogram_chart(
    session: &Session,
    slice_name: &str,
    dataset_id: i64,
    owner_id: Option<i64>,
    columns_x: &[String],
    bins: u32,
) -> SupersetResult<i64> {
    let spec = ChartSpec {
        slice_name: slice_name.to_string(),
        dataset_id,
        owner_ids: owner_id.into_iter().collect(),
        kind: ChartKind::Histogram {
            columns_x: columns_x.to_vec(),
            bins,
            row_limit: DEFAULT_ROW_LIMIT,
        },
    };
    create_chart(session, &spec).await
}

pub async fn update_chart(session: &Session, chart_id: i64, update: &ChartUpdate) -> SupersetResult<()> {
    let payload = serde_json::to_value(update)
        .map_err(|e| SupersetError::malformed(format!("chart update: {}", e)))?;
    session
        .put(
            &ResourceKind::Chart.item_path(chart_id),
            Some(&payload),
            &[200, 201],
            &format!("Updating chart {}", chart_id),
        )
        .await?;
    Ok(())
}

pub async fn get_chart(session: &Session, chart_id: i64) -> SupersetResult<ChartDetail> {
    let response: ItemResponse<ChartDetail> = session
        .get_json(&ResourceKind::Chart.item_path(chart_id), "Chart fetch")
        .await
        .map_err(|e| match e.status() {
            Some(404) => SupersetError::not_found(format!("chart {}", chart_id)),
            _ => e,
        })?;
    Ok(response.result)
}

pub async fn list_charts(session: &Session) -> SupersetResult<Vec<ChartSummary>> {
    fetch_resources(session, ResourceKind::Chart, &[]).await
}

/// Find a chart by exact name; several matches resolve to the lowest ID
pub async fn get_chart_id_by_name(session: &Session, slice_name: &str) -> SupersetResult<Option<i64>> {
    let filters = [ResourceFilter::eq("slice_name", slice_name)];
    let charts: Vec<ChartSummary> = fetch_resources(session, ResourceKind::Chart, &filters).await?;

    Ok(charts
        .iter()
        .filter(|c| c.slice_name == slice_name)
        .map(|c| c.id)
        .min())
}

pub async fn delete_chart(session: &Session, chart_id: i64) -> SupersetResult<bool> {
    session
        .delete(
            &ResourceKind::Chart.item_path(chart_id),
            &[200, 204],
            &format!("Deleting chart {}", chart_id),
        )
        .await?;
    tracing::info!("Deleted chart {}", chart_id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_params() {
        let kind = ChartKind::table(vec!["id".into(), "name".into()], 50);
        let params = kind.params(7);
        assert_eq!(params["datasource"], "7__table");
        assert_eq!(params["viz_type"], "table");
        assert_eq!(params["query_mode"], "raw");
        assert_eq!(params["all_columns"], json!(["id", "name"]));
        assert_eq!(params["row_limit"], 50);
    }

    #[test]
    fn test_payload_serializes_params_as_string() {
        let spec = ChartSpec {
            slice_name: "Orders".into(),
            dataset_id: 3,
            owner_ids: vec![5],
            kind: ChartKind::table(vec!["id".into()], 10),
        };
        let payload = spec.payload();
        assert_eq!(payload["datasource_type"], "table");
        assert_eq!(payload["owners"], json!([5]));

        let params: Value = serde_json::from_str(payload["params"].as_str().unwrap()).unwrap();
        assert_eq!(params["datasource"], "3__table");
    }

    #[test]
    fn test_payload_without_owner_omits_owners() {
        let spec = ChartSpec {
            slice_name: "Orders".into(),
            dataset_id: 3,
            owner_ids: vec![],
            kind: ChartKind::table(vec![], 10),
        };
        assert!(spec.payload().get("owners").is_none());
    }

    #[test]
    fn test_histogram_bins() {
        let kind = ChartKind::Histogram {
            columns_x: vec!["age".into()],
            bins: 5,
            row_limit: 100,
        };
        let params = kind.params(1);
        assert_eq!(params["link_length"], 5);
        assert_eq!(params["all_columns_x"], json!(["age"]));
    }

    #[test]
    fn test_simple_metric() {
        let metric = build_simple_metric("id", "BIGINT", "COUNT", "Record Count");
        assert_eq!(metric["expressionType"], "SIMPLE");
        assert_eq!(metric["column"]["column_name"], "id");
        assert_eq!(metric["aggregate"], "COUNT");
        assert!(metric["optionName"].as_str().unwrap().starts_with("metric_"));
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let update = ChartUpdate {
            owners: Some(vec![2, 3]),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"owners": [2, 3]}));
    }
}
