//! Superset API interaction module
//!
//! Authentication and transport for the Superset REST API.
//!
//! # Module Structure
//!
//! - [`auth`] - Login exchange, CSRF token capture, token refresh
//! - [`http`] - HTTP client wrapper with status checking and typed errors
//! - [`session`] - Authenticated session used by every resource function
//!
//! # Example
//!
//! ```ignore
//! use superset_toolkit::config::Config;
//! use superset_toolkit::superset::session::Session;
//!
//! async fn example() -> superset_toolkit::SupersetResult<()> {
//!     let config = Config::new("http://localhost:8088", "admin", "admin")?;
//!     let session = Session::login(&config).await?;
//!     println!("logged in as user {}", session.user_id());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod http;
pub mod session;
