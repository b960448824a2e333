use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::publication::PublicationState;
use crate::policy::filter::{Filter, Flag};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
/// Highest page number a caller can ask for; larger values are clamped.
pub const MAX_PAGE: u64 = 1_000_000;

/// Fields a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    SortOrder,
    Title,
}

impl SortField {
    /// Stored field name.
    pub fn field_name(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::PublishedAt => "publishedAt",
            SortField::SortOrder => "sortOrder",
            SortField::Title => "title",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            "publishedAt" => Some(SortField::PublishedAt),
            "sortOrder" => Some(SortField::SortOrder),
            "title" => Some(SortField::Title),
            _ => None,
        }
    }
}

/// Sort specification in the `field` / `-field` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub descending: bool,
}

impl SortSpec {
    pub const fn ascending(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub const fn descending(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };
        let field = SortField::from_field_name(name)
            .ok_or_else(|| AppError::BadRequest(format!("Cannot sort by '{}'", name)))?;
        Ok(Self { field, descending })
    }

    /// Back to the `field` / `-field` notation.
    pub fn to_param(&self) -> String {
        if self.descending {
            format!("-{}", self.field.field_name())
        } else {
            self.field.field_name().to_string()
        }
    }
}

/// A comparable projection of a sortable field. Missing values sort first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

impl From<Option<DateTime<Utc>>> for SortValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(SortValue::Time).unwrap_or(SortValue::Missing)
    }
}

/// A validated list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub limit: u64,
    /// 1-based page number.
    pub page: u64,
    pub sort: SortSpec,
    /// Caller-supplied narrowing, combined with the access scope by the store.
    pub filter: Option<Filter>,
    /// Replace media ids with media documents in the response.
    pub populate: bool,
}

impl ListQuery {
    pub fn new(sort: SortSpec) -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
            sort,
            filter: None,
            populate: false,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn populated(mut self) -> Self {
        self.populate = true;
        self
    }

    /// Number of documents before this page. Saturates instead of overflowing,
    /// and stays within the signed range the document store accepts.
    pub fn skip(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }

    /// Query-string form understood by the HTTP API.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("page".to_string(), self.page.to_string()),
            ("sort".to_string(), self.sort.to_param()),
            (
                "depth".to_string(),
                if self.populate { "1" } else { "0" }.to_string(),
            ),
        ];
        if let Some(filter) = &self.filter {
            push_filter_pairs(filter, &mut pairs);
        }
        pairs
    }
}

fn push_filter_pairs(filter: &Filter, pairs: &mut Vec<(String, String)>) {
    match filter {
        Filter::StatusEquals(state) => pairs.push(("status".into(), state.as_str().into())),
        Filter::FlagEquals(flag, value) => {
            pairs.push((flag.field_name().into(), value.to_string()))
        }
        Filter::All(branches) => branches.iter().for_each(|f| push_filter_pairs(f, pairs)),
        // authorship and disjunctions are never caller-supplied
        Filter::AuthorEquals(_) | Filter::Any(_) => {}
    }
}

/// Raw list parameters as they arrive on the query string.
#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
    pub depth: Option<String>,
    pub status: Option<PublicationState>,
    pub featured: Option<bool>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

impl ListParams {
    pub fn limit(&self) -> u64 {
        self.limit
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }

    pub fn page(&self) -> u64 {
        self.page
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_PAGE)
    }

    pub fn populate(&self) -> bool {
        self.depth
            .as_ref()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|depth| depth > 0)
            .unwrap_or(false)
    }

    /// Validate into a [`ListQuery`], using `default_sort` when none is given.
    pub fn into_query(self, default_sort: SortSpec) -> Result<ListQuery, AppError> {
        let sort = match self.sort.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => SortSpec::parse(raw)?,
            None => default_sort,
        };

        let mut conditions = Vec::new();
        if let Some(state) = self.status {
            conditions.push(Filter::StatusEquals(state));
        }
        if let Some(featured) = self.featured {
            conditions.push(Filter::FlagEquals(Flag::Featured, featured));
        }
        if let Some(active) = self.is_active {
            conditions.push(Filter::FlagEquals(Flag::Active, active));
        }
        let filter = match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Filter::All(conditions)),
        };

        Ok(ListQuery {
            limit: self.limit(),
            page: self.page(),
            sort,
            filter,
            populate: self.populate(),
        })
    }
}

/// One page of a listing, in the shape served by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u64,
    pub page: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: u64, query: &ListQuery) -> Self {
        let limit = query.limit.max(1);
        let total_pages = total_docs.div_ceil(limit);
        let page = query.page.max(1);
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }

    pub fn empty(query: &ListQuery) -> Self {
        Self::new(Vec::new(), 0, query)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_prev_page: self.has_prev_page,
        }
    }
}
