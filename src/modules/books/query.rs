//! Parser for the list-endpoint query mini-languages.
//!
//! `sorts=field:direction,...` and `filters=field:value,...` are parsed into
//! typed directives. `sorts`, when supplied, wins outright: filters are
//! ignored and only the accepted directives order the result. Without
//! `sorts`, filters (if any) apply and the listing falls back to newest-first
//! ordering by id.

use serde::Deserialize;
use thiserror::Error;

use biblio_http::error::AppError;

pub const DEFAULT_LIMIT: i64 = 10;
const DEFAULT_PAGE: i64 = 1;

/// Raw query parameters of `GET /books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub filters: Option<String>,
    pub sorts: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("malformed directive '{0}': expected field:value")]
    MalformedDirective(String),

    #[error("limit must be a positive integer, got '{0}'")]
    InvalidLimit(String),

    #[error("page must be a positive integer, got '{0}'")]
    InvalidPage(String),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Exact, case-sensitive match; anything else is not a direction.
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => " ASC",
            Self::Desc => " DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDirective {
    pub field: String,
    pub needle: String,
}

/// Which of the two mutually exclusive selection modes applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `sorts` was supplied: explicit ordering only, filters ignored.
    Sorted(Vec<SortDirective>),
    /// No `sorts`: optional filters plus the default newest-first ordering.
    Filtered(Vec<FilterDirective>),
}

/// Fully parsed list query, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub selection: Selection,
    pub limit: i64,
    pub page: i64,
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Parse raw query parameters into a [`ListQuery`].
///
/// A single malformed directive fails the whole request; an invalid sort
/// direction only drops that directive.
pub fn parse(params: &ListParams) -> Result<ListQuery, QueryError> {
    let selection = match &params.sorts {
        Some(raw) => Selection::Sorted(parse_sorts(raw)?),
        None => Selection::Filtered(match &params.filters {
            Some(raw) => parse_filters(raw)?,
            None => Vec::new(),
        }),
    };

    let limit = parse_positive(params.limit.as_deref(), DEFAULT_LIMIT, QueryError::InvalidLimit)?;
    let page = parse_positive(params.page.as_deref(), DEFAULT_PAGE, QueryError::InvalidPage)?;

    Ok(ListQuery {
        selection,
        limit,
        page,
    })
}

/// Split a comma-separated directive list, each token on its first colon.
fn split_directives(raw: &str) -> impl Iterator<Item = Result<(&str, &str), QueryError>> {
    raw.split(',').map(|token| {
        token
            .split_once(':')
            .ok_or_else(|| QueryError::MalformedDirective(token.to_string()))
    })
}

fn parse_sorts(raw: &str) -> Result<Vec<SortDirective>, QueryError> {
    let mut directives = Vec::new();
    for pair in split_directives(raw) {
        let (field, direction) = pair?;
        // Unknown directions are dropped, not errors; order of the survivors
        // is preserved and duplicates are kept.
        if let Some(direction) = Direction::parse(direction) {
            directives.push(SortDirective {
                field: field.to_string(),
                direction,
            });
        }
    }
    Ok(directives)
}

fn parse_filters(raw: &str) -> Result<Vec<FilterDirective>, QueryError> {
    split_directives(raw)
        .map(|pair| {
            let (field, needle) = pair?;
            Ok(FilterDirective {
                field: field.to_string(),
                needle: needle.to_string(),
            })
        })
        .collect()
}

fn parse_positive(
    raw: Option<&str>,
    default: i64,
    err: fn(String) -> QueryError,
) -> Result<i64, QueryError> {
    match raw {
        None => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(err(raw.to_string())),
        },
    }
}
