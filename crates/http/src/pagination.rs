//! Offset-pagination envelope mirroring the classic paginator shape.

use serde::Serialize;

/// One page of results plus the metadata to fetch the neighbors.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub current_page: i64,
    pub data: Vec<T>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: i64, per_page: i64, total: i64, links: &PageLinks) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            (total + per_page - 1) / per_page
        };

        let from = if data.is_empty() {
            None
        } else {
            Some((current_page - 1) * per_page + 1)
        };
        let to = from.map(|first| first + data.len() as i64 - 1);

        let next_page_url =
            (current_page < last_page).then(|| links.url_for(current_page + 1));
        let prev_page_url = (current_page > 1).then(|| links.url_for(current_page - 1));

        Self {
            current_page,
            data,
            from,
            to,
            per_page,
            total,
            last_page,
            next_page_url,
            prev_page_url,
        }
    }
}

/// Builds page URLs that echo the original query parameters and swap only
/// the `page` parameter.
pub struct PageLinks {
    base: String,
    params: Vec<(String, String)>,
}

impl PageLinks {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            params: Vec::new(),
        }
    }

    /// Echo the given query parameters in every generated link. Any `page`
    /// entry is skipped; the link supplies its own.
    pub fn params(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params
            .extend(pairs.into_iter().filter(|(key, _)| key != "page"));
        self
    }

    fn url_for(&self, page: i64) -> String {
        let mut query: Vec<(&str, String)> = self
            .params
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        query.push(("page", page.to_string()));

        match serde_urlencoded::to_string(&query) {
            Ok(encoded) => format!("{}?{}", self.base, encoded),
            Err(_) => self.base.clone(),
        }
    }
}
