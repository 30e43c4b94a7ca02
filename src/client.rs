//! Superset Client
//!
//! High-level facade over a [`Session`]: resolves usernames to IDs (once per
//! client), fills in the configured schema and database, and strings the resource
//! functions together into complete workflows.
//!
//! The client owns its session. Dropping it discards the tokens and cookies on every
//! path, errors included; [`SupersetClient::close`] also ends the server-side
//! session.

use crate::config::Config;
use crate::error::SupersetResult;
use crate::resource::batch::{self, CleanupReport, MigrationReport, UserResourceSummary};
use crate::resource::charts::{self, ChartKind, ChartSpec};
use crate::resource::dashboards;
use crate::resource::databases;
use crate::resource::datasets;
use crate::resource::fetcher::fetch_resources_paginated;
use crate::resource::models::{ChartSummary, DashboardSummary};
use crate::resource::queries;
use crate::resource::users;
use crate::resource::ResourceKind;
use crate::superset::session::Session;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A chart to create on a table, resolved to a dataset on the fly
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDefinition {
    pub name: String,
    pub table: String,
    /// Falls back to the configured schema
    pub schema: Option<String>,
    /// Username; falls back to the batch owner, then the authenticated user
    pub owner: Option<String>,
    pub kind: ChartKind,
}

impl ChartDefinition {
    pub fn table_chart(name: &str, table: &str, columns: &[&str], row_limit: u32) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            schema: None,
            owner: None,
            kind: ChartKind::table(columns.iter().map(|c| c.to_string()).collect(), row_limit),
        }
    }
}

/// Filter for [`SupersetClient::get_charts`]; unset fields do not filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartQuery {
    pub owner: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Failed,
}

/// Result of [`SupersetClient::validate_connection`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub status: ConnectionState,
    pub url: String,
    pub user_id: i64,
    pub schema: String,
    pub database: String,
    pub chart_count: Option<usize>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardWithCharts {
    pub dashboard_id: i64,
    pub chart_ids: Vec<i64>,
}

/// Main Superset client
pub struct SupersetClient {
    session: Session,
    config: Config,
    user_ids: Arc<RwLock<HashMap<String, i64>>>,
}

impl SupersetClient {
    /// Log in and return a ready client
    pub async fn connect(config: Config) -> SupersetResult<Self> {
        let session = Session::login(&config).await?;

        let mut user_ids = HashMap::new();
        user_ids.insert(config.username.clone(), session.user_id());

        Ok(Self {
            session,
            config,
            user_ids: Arc::new(RwLock::new(user_ids)),
        })
    }

    /// End the server-side session and release the client
    pub async fn close(self) {
        self.session.logout().await;
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    /// ID of the authenticated user
    pub fn user_id(&self) -> i64 {
        self.session.user_id()
    }

    /// Swap the access token for a fresh one
    pub async fn refresh_session(&mut self) -> SupersetResult<()> {
        self.session.refresh().await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Resolve a username, consulting the per-client cache first
    pub async fn resolve_user_id(&self, username: &str) -> SupersetResult<i64> {
        {
            let cache = self.user_ids.read().await;
            if let Some(&id) = cache.get(username) {
                return Ok(id);
            }
        }

        let id = users::get_user_id_by_username(&self.session, username).await?;
        tracing::debug!("Resolved user '{}' to ID {}", username, id);

        {
            let mut cache = self.user_ids.write().await;
            cache.insert(username.to_string(), id);
        }
        Ok(id)
    }

    /// Owner ID for a username, or the authenticated user when none is given
    async fn owner_id(&self, owner: Option<&str>) -> SupersetResult<i64> {
        match owner {
            Some(username) => self.resolve_user_id(username).await,
            None => Ok(self.user_id()),
        }
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Check that the session can read from the API
    pub async fn validate_connection(&self) -> ConnectionStatus {
        let probe =
            fetch_resources_paginated::<ChartSummary>(&self.session, ResourceKind::Chart, &[], 0)
                .await;

        let (status, chart_count, message) = match probe {
            Ok(page) => (
                ConnectionState::Connected,
                Some(page.total.unwrap_or(page.items.len())),
                None,
            ),
            Err(e) => {
                tracing::warn!("Connection check failed: {}", e);
                (ConnectionState::Failed, None, Some(e.to_string()))
            }
        };

        ConnectionStatus {
            status,
            url: self.base_url().to_string(),
            user_id: self.user_id(),
            schema: self.config.schema.clone(),
            database: self.config.database_name.clone(),
            chart_count,
            message,
        }
    }

    // =========================================================================
    // Datasets
    // =========================================================================

    /// ID of the configured database
    pub async fn database_id(&self) -> SupersetResult<i64> {
        databases::require_database_id(&self.session, &self.config.database_name).await
    }

    /// Dataset ID for a table in the configured database, created if needed
    pub async fn ensure_dataset(&self, table: &str, schema: Option<&str>) -> SupersetResult<i64> {
        let database_id = self.database_id().await?;
        let schema = schema.unwrap_or(&self.config.schema);
        datasets::ensure_dataset(&self.session, database_id, schema, table).await
    }

    // =========================================================================
    // Charts
    // =========================================================================

    async fn create_chart_owned(
        &self,
        definition: &ChartDefinition,
        fallback_owner: Option<&str>,
    ) -> SupersetResult<i64> {
        let owner = definition.owner.as_deref().or(fallback_owner);
        let owner_id = self.owner_id(owner).await?;
        let dataset_id = self
            .ensure_dataset(&definition.table, definition.schema.as_deref())
            .await?;

        let spec = ChartSpec {
            slice_name: definition.name.clone(),
            dataset_id,
            owner_ids: vec![owner_id],
            kind: definition.kind.clone(),
        };
        charts::create_chart(&self.session, &spec).await
    }

    /// Create a chart on a table, registering the dataset first if needed
    pub async fn create_chart(&self, definition: &ChartDefinition) -> SupersetResult<i64> {
        self.create_chart_owned(definition, None).await
    }

    pub async fn create_table_chart(
        &self,
        name: &str,
        table: &str,
        owner: Option<&str>,
        columns: &[&str],
        row_limit: u32,
    ) -> SupersetResult<i64> {
        let mut definition = ChartDefinition::table_chart(name, table, columns, row_limit);
        definition.owner = owner.map(str::to_string);
        self.create_chart(&definition).await
    }

    /// Create several charts; failures are logged and skipped
    pub async fn create_charts_batch(
        &self,
        definitions: &[ChartDefinition],
        owner: Option<&str>,
    ) -> SupersetResult<Vec<i64>> {
        // fail fast on an unknown batch owner instead of once per chart
        if let Some(username) = owner {
            self.resolve_user_id(username).await?;
        }

        let mut created = Vec::with_capacity(definitions.len());
        for definition in definitions {
            match self.create_chart_owned(definition, owner).await {
                Ok(id) => created.push(id),
                Err(e) => tracing::warn!("Failed to create chart '{}': {}", definition.name, e),
            }
        }

        tracing::info!("Created {} of {} charts", created.len(), definitions.len());
        Ok(created)
    }

    pub async fn delete_charts_batch(&self, chart_ids: &[i64], dry_run: bool) -> Vec<i64> {
        batch::delete_charts_batch(&self.session, chart_ids, dry_run).await
    }

    /// Charts filtered by owner and/or table; no filter lists everything
    pub async fn get_charts(&self, query: &ChartQuery) -> SupersetResult<Vec<ChartSummary>> {
        let by_owner = match query.owner.as_deref() {
            Some(username) => {
                let owner_id = self.resolve_user_id(username).await?;
                Some(queries::get_charts_by_owner(&self.session, owner_id).await?)
            }
            None => None,
        };

        let by_table = match query.table.as_deref() {
            Some(table) => {
                let schema = query.schema.as_deref().unwrap_or(&self.config.schema);
                Some(queries::get_charts_by_table(&self.session, table, schema).await?)
            }
            None => None,
        };

        Ok(match (by_owner, by_table) {
            (Some(owned), Some(on_table)) => owned
                .into_iter()
                .filter(|c| on_table.iter().any(|t| t.id == c.id))
                .collect(),
            (Some(charts), None) | (None, Some(charts)) => charts,
            (None, None) => charts::list_charts(&self.session).await?,
        })
    }

    // =========================================================================
    // Dashboards
    // =========================================================================

    pub async fn get_dashboards(&self, owner: Option<&str>) -> SupersetResult<Vec<DashboardSummary>> {
        match owner {
            Some(username) => {
                let owner_id = self.resolve_user_id(username).await?;
                queries::get_dashboards_by_owner(&self.session, owner_id).await
            }
            None => dashboards::list_dashboards(&self.session).await,
        }
    }

    /// Ensure a dashboard by slug and link the named charts to it
    ///
    /// Chart names that do not resolve are logged and skipped.
    pub async fn create_dashboard(
        &self,
        title: &str,
        slug: &str,
        owner: Option<&str>,
        chart_names: &[&str],
    ) -> SupersetResult<i64> {
        let owner_id = self.owner_id(owner).await?;
        let dashboard_id =
            dashboards::ensure_dashboard(&self.session, title, slug, Some(owner_id)).await?;

        let mut chart_ids = Vec::with_capacity(chart_names.len());
        for name in chart_names {
            match charts::get_chart_id_by_name(&self.session, name).await? {
                Some(id) => chart_ids.push(id),
                None => tracing::warn!("Chart '{}' not found, not linking it", name),
            }
        }

        if !chart_ids.is_empty() {
            dashboards::add_charts_to_dashboard(&self.session, dashboard_id, &chart_ids).await?;
        }
        Ok(dashboard_id)
    }

    /// Create charts and a dashboard showing them in one call
    pub async fn create_dashboard_with_charts(
        &self,
        title: &str,
        slug: &str,
        definitions: &[ChartDefinition],
        owner: Option<&str>,
    ) -> SupersetResult<DashboardWithCharts> {
        let chart_ids = self.create_charts_batch(definitions, owner).await?;

        let owner_id = self.owner_id(owner).await?;
        let dashboard_id =
            dashboards::ensure_dashboard(&self.session, title, slug, Some(owner_id)).await?;

        if !chart_ids.is_empty() {
            dashboards::add_charts_to_dashboard(&self.session, dashboard_id, &chart_ids).await?;
        }

        Ok(DashboardWithCharts {
            dashboard_id,
            chart_ids,
        })
    }

    // =========================================================================
    // Batch and per-user operations
    // =========================================================================

    pub async fn get_user_summary(&self, username: &str) -> SupersetResult<UserResourceSummary> {
        let user_id = self.resolve_user_id(username).await?;
        batch::user_summary(&self.session, user_id, username).await
    }

    pub async fn cleanup_user(&self, username: &str, dry_run: bool) -> SupersetResult<CleanupReport> {
        let user_id = self.resolve_user_id(username).await?;
        batch::cleanup_user(&self.session, user_id, dry_run).await
    }

    pub async fn migrate_user_resources(
        &self,
        from_user: &str,
        to_user: &str,
        dry_run: bool,
    ) -> SupersetResult<MigrationReport> {
        let from_id = self.resolve_user_id(from_user).await?;
        let to_id = self.resolve_user_id(to_user).await?;
        batch::migrate_user_resources(&self.session, from_id, to_id, dry_run).await
    }

    pub async fn delete_charts_by_name_pattern(
        &self,
        pattern: &str,
        dry_run: bool,
    ) -> SupersetResult<Vec<i64>> {
        batch::delete_charts_by_name_pattern(&self.session, pattern, dry_run).await
    }

    pub async fn delete_dashboards_by_name_pattern(
        &self,
        pattern: &str,
        dry_run: bool,
    ) -> SupersetResult<Vec<i64>> {
        batch::delete_dashboards_by_name_pattern(&self.session, pattern, dry_run).await
    }

    pub async fn delete_datasets_by_name_pattern(
        &self,
        pattern: &str,
        dry_run: bool,
    ) -> SupersetResult<Vec<i64>> {
        batch::delete_datasets_by_name_pattern(&self.session, pattern, dry_run).await
    }
}
