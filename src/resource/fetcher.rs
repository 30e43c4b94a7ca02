//! Resource Fetcher
//!
//! Lists resources through Superset's Rison-encoded `q` parameter, following
//! pages until the server reports everything has been returned.

use super::models::ListResponse;
use super::ResourceKind;
use crate::error::SupersetResult;
use crate::superset::session::Session;
use serde::de::DeserializeOwned;

/// Largest page size Superset accepts by default
pub const PAGE_SIZE: usize = 100;

/// Scalar value inside a Rison filter
#[derive(Debug, Clone, PartialEq)]
pub enum RisonValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl RisonValue {
    fn encode(&self) -> String {
        match self {
            RisonValue::Int(n) => n.to_string(),
            RisonValue::Bool(true) => "!t".to_string(),
            RisonValue::Bool(false) => "!f".to_string(),
            RisonValue::Str(s) => rison_string(s),
        }
    }
}

impl From<i64> for RisonValue {
    fn from(value: i64) -> Self {
        RisonValue::Int(value)
    }
}

impl From<bool> for RisonValue {
    fn from(value: bool) -> Self {
        RisonValue::Bool(value)
    }
}

impl From<&str> for RisonValue {
    fn from(value: &str) -> Self {
        RisonValue::Str(value.to_string())
    }
}

impl From<String> for RisonValue {
    fn from(value: String) -> Self {
        RisonValue::Str(value)
    }
}

/// Quote a string for Rison: `!` and `'` are escaped with `!`
pub fn rison_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '!' || c == '\'' {
            out.push('!');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// One `(col:..,opr:..,value:..)` filter
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFilter {
    pub col: String,
    pub opr: String,
    pub value: RisonValue,
}

impl ResourceFilter {
    pub fn new(col: &str, opr: &str, value: impl Into<RisonValue>) -> Self {
        Self {
            col: col.to_string(),
            opr: opr.to_string(),
            value: value.into(),
        }
    }

    /// Exact match
    pub fn eq(col: &str, value: impl Into<RisonValue>) -> Self {
        Self::new(col, "eq", value)
    }

    /// Many-to-many relation contains the given ID (e.g. owners)
    pub fn related(col: &str, id: i64) -> Self {
        Self::new(col, "rel_m_m", id)
    }

    /// Many-to-one relation equals the given ID (e.g. database)
    pub fn related_one(col: &str, id: i64) -> Self {
        Self::new(col, "rel_o_m", id)
    }

    fn encode(&self) -> String {
        format!(
            "(col:{},opr:{},value:{})",
            self.col,
            self.opr,
            self.value.encode()
        )
    }
}

/// A list query for one page
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<'a> {
    pub filters: &'a [ResourceFilter],
    pub page: usize,
    pub page_size: usize,
}

impl ListQuery<'_> {
    pub fn to_rison(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if !self.filters.is_empty() {
            let filters: Vec<String> = self.filters.iter().map(ResourceFilter::encode).collect();
            parts.push(format!("filters:!({})", filters.join(",")));
        }
        parts.push(format!("page:{}", self.page));
        parts.push(format!("page_size:{}", self.page_size));
        format!("({})", parts.join(","))
    }
}

/// Result of paginated fetch
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: Option<usize>,
}

/// Fetch all resources (auto-paginate)
pub async fn fetch_resources<T: DeserializeOwned>(
    session: &Session,
    kind: ResourceKind,
    filters: &[ResourceFilter],
) -> SupersetResult<Vec<T>> {
    let mut all_items = Vec::new();
    let mut page = 0;

    loop {
        let result = fetch_resources_paginated(session, kind, filters, page).await?;
        let fetched = result.items.len();
        all_items.extend(result.items);

        // servers may cap page_size below PAGE_SIZE, so trust `count` when present
        let exhausted = match result.total {
            Some(total) => fetched == 0 || all_items.len() >= total,
            None => fetched < PAGE_SIZE,
        };
        if exhausted {
            break;
        }
        page += 1;
    }

    tracing::debug!("Fetched {} {}", all_items.len(), kind.plural());
    Ok(all_items)
}

/// Fetch one page of resources
pub async fn fetch_resources_paginated<T: DeserializeOwned>(
    session: &Session,
    kind: ResourceKind,
    filters: &[ResourceFilter],
    page: usize,
) -> SupersetResult<PaginatedResult<T>> {
    let query = ListQuery {
        filters,
        page,
        page_size: PAGE_SIZE,
    };

    let response: ListResponse<T> = session
        .get_json_with_query(
            kind.path(),
            &query.to_rison(),
            &format!("{} listing", kind.label()),
        )
        .await?;

    Ok(PaginatedResult {
        items: response.result,
        total: response.count,
    })
}
