//! Superset REST API toolkit
//!
//! Authenticate against a Superset instance, then ensure, query, batch-delete and
//! migrate datasets, charts and dashboards.
//!
//! # Module Structure
//!
//! - [`config`] - Connection settings, layered from explicit values, a YAML profile
//!   and the environment
//! - [`superset`] - Authentication, transport and the authenticated session
//! - [`resource`] - Resolvers, ensure functions, mutations and batch operations
//! - [`client`] - High-level facade with username resolution
//!
//! # Example
//!
//! ```ignore
//! use superset_toolkit::{Config, SupersetClient};
//!
//! async fn example() -> superset_toolkit::SupersetResult<()> {
//!     let config = Config::new("http://localhost:8088", "admin", "admin")?
//!         .with_schema("analytics");
//!     let client = SupersetClient::connect(config).await?;
//!
//!     let dataset_id = client.ensure_dataset("orders", None).await?;
//!     let stale = client.delete_charts_by_name_pattern("tmp_", true).await?;
//!     println!("dataset {dataset_id}, would delete {stale:?}");
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod resource;
pub mod superset;

pub use client::{ChartDefinition, ChartQuery, SupersetClient};
pub use config::{Config, ConfigOverrides};
pub use error::{SupersetError, SupersetResult};
