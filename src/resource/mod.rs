//! Resource layer
//!
//! Functions over Superset's REST resources. Every function takes a
//! [`Session`](crate::superset::session::Session) and issues plain, sequential
//! requests; nothing is cached.
//!
//! # Architecture
//!
//! - [`models`] - Typed response schemas
//! - [`fetcher`] - Rison list queries with pagination
//! - [`databases`], [`datasets`], [`charts`], [`dashboards`], [`users`] - Resolvers,
//!   ensure functions and single-call mutations per resource kind
//! - [`queries`] - Listing by owner, username or table
//! - [`batch`] - Pattern deletion, batch operations and ownership migration
//!
//! # Resolvers and ensure
//!
//! Resolvers (`get_*_id*`) return `Ok(None)` when nothing matches the natural key and
//! pick the lowest ID when several do. `ensure_*` functions create the resource only
//! when the resolver comes back empty, so calling them again with the same key returns
//! the same ID. Existing resources are never modified by an ensure call.

pub mod batch;
pub mod charts;
pub mod dashboards;
pub mod databases;
pub mod datasets;
pub mod fetcher;
pub mod models;
pub mod queries;
pub mod users;

pub use fetcher::{fetch_resources, fetch_resources_paginated, ResourceFilter};

/// REST resource collections used by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Chart,
    Dashboard,
    Dataset,
    Database,
    User,
}

impl ResourceKind {
    /// Collection path below `/api/v1/`
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Chart => "chart/",
            ResourceKind::Dashboard => "dashboard/",
            ResourceKind::Dataset => "dataset/",
            ResourceKind::Database => "database/",
            ResourceKind::User => "security/users/",
        }
    }

    /// Path of one item below `/api/v1/`
    pub fn item_path(&self, id: i64) -> String {
        format!("{}{}", self.path(), id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Chart => "Chart",
            ResourceKind::Dashboard => "Dashboard",
            ResourceKind::Dataset => "Dataset",
            ResourceKind::Database => "Database",
            ResourceKind::User => "User",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Chart => "charts",
            ResourceKind::Dashboard => "dashboards",
            ResourceKind::Dataset => "datasets",
            ResourceKind::Database => "databases",
            ResourceKind::User => "users",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(ResourceKind::Dataset.path(), "dataset/");
        assert_eq!(ResourceKind::Chart.item_path(9), "chart/9");
        assert_eq!(ResourceKind::User.path(), "security/users/");
    }
}
