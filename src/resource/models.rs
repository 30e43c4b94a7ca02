//! Response schemas
//!
//! Typed views of the Superset REST payloads this crate reads. Fields the toolkit
//! depends on are required; a response missing them fails to decode and surfaces as
//! `SupersetError::MalformedResponse`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Envelope of every list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: Option<usize>,
    pub result: Vec<T>,
}

/// Envelope of create endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Envelope of single-item GET endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ItemResponse<T> {
    pub result: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRef {
    pub id: i64,
    #[serde(default)]
    pub database_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub id: i64,
    pub database_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: i64,
    pub table_name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database: Option<DatabaseRef>,
    #[serde(default)]
    pub owners: Vec<Owner>,
}

impl DatasetSummary {
    pub fn database_id(&self) -> Option<i64> {
        self.database.as_ref().map(|db| db.id)
    }

    /// `schema.table` for display
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, self.table_name),
            _ => self.table_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetColumn {
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default, rename = "type")]
    pub column_type: Option<String>,
    #[serde(default)]
    pub is_dttm: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub columns: Vec<DatasetColumn>,
    #[serde(default)]
    pub main_dttm_col: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    pub id: i64,
    pub slice_name: String,
    #[serde(default)]
    pub viz_type: Option<String>,
    #[serde(default)]
    pub datasource_id: Option<i64>,
    #[serde(default)]
    pub datasource_name_text: Option<String>,
    #[serde(default)]
    pub owners: Vec<Owner>,
    #[serde(default, deserialize_with = "superset_timestamp")]
    pub changed_on_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRef {
    pub id: i64,
    #[serde(default)]
    pub dashboard_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartDetail {
    #[serde(default)]
    pub id: Option<i64>,
    pub slice_name: String,
    #[serde(default)]
    pub viz_type: Option<String>,
    #[serde(default)]
    pub params: Option<String>,
    #[serde(default)]
    pub owners: Vec<Owner>,
    #[serde(default)]
    pub dashboards: Vec<DashboardRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub id: i64,
    pub dashboard_title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub owners: Vec<Owner>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default, deserialize_with = "superset_timestamp")]
    pub changed_on_utc: Option<DateTime<Utc>>,
}

/// Entry of `/api/v1/dashboard/{id}/charts`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardChart {
    pub id: i64,
    pub slice_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

/// Resources that carry an owner list
pub trait Owned {
    fn id(&self) -> i64;
    fn owners(&self) -> &[Owner];

    fn owner_ids(&self) -> Vec<i64> {
        self.owners().iter().map(|o| o.id).collect()
    }

    fn is_owned_by(&self, user_id: i64) -> bool {
        self.owners().iter().any(|o| o.id == user_id)
    }
}

impl Owned for ChartSummary {
    fn id(&self) -> i64 {
        self.id
    }
    fn owners(&self) -> &[Owner] {
        &self.owners
    }
}

impl Owned for DashboardSummary {
    fn id(&self) -> i64 {
        self.id
    }
    fn owners(&self) -> &[Owner] {
        &self.owners
    }
}

impl Owned for DatasetSummary {
    fn id(&self) -> i64 {
        self.id
    }
    fn owners(&self) -> &[Owner] {
        &self.owners
    }
}

/// Superset renders timestamps as `2024-05-01T12:30:00.123456+0000`
fn superset_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    DateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(&raw))
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_chart_summary_parses_superset_timestamp() {
        let chart: ChartSummary = serde_json::from_value(json!({
            "id": 3,
            "slice_name": "Revenue",
            "owners": [{"id": 1, "first_name": "Ada", "last_name": "L"}],
            "changed_on_utc": "2024-05-01T12:30:00.000000+0000"
        }))
        .unwrap();

        assert_eq!(
            chart.changed_on_utc,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap())
        );
        assert!(chart.is_owned_by(1));
        assert!(!chart.is_owned_by(2));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let result = serde_json::from_value::<DashboardSummary>(json!({"id": 1, "slug": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_qualified_name() {
        let dataset: DatasetSummary = serde_json::from_value(json!({
            "id": 42, "table_name": "orders", "schema": "sales",
            "database": {"id": 1, "database_name": "warehouse"}
        }))
        .unwrap();
        assert_eq!(dataset.qualified_name(), "sales.orders");
        assert_eq!(dataset.database_id(), Some(1));
    }
}
