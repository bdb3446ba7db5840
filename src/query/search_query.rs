use crate::query::traits::ExternalText;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const MAX_SEARCH_LEN: usize = 100;

/// Free text typed into the search box.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchQuery(String);

impl ExternalText for SearchQuery {
    fn cleaned(&self) -> Self {
        let mut query = self.clean(&self.0);
        if let Some((cut, _)) = query.char_indices().nth(MAX_SEARCH_LEN) {
            query.truncate(cut);
            query = query.trim_end().to_string();
        }
        SearchQuery(query)
    }
}

impl SearchQuery {
    pub fn new(value: &str) -> Self {
        SearchQuery(value.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The effective search term, or `None` when nothing but whitespace was typed.
    pub fn into_term(self) -> Option<String> {
        let cleaned = self.cleaned();
        if cleaned.is_empty() {
            return None;
        }
        Some(cleaned.0)
    }
}

impl Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
