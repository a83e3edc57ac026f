//! Categorical label encoding.

use serde::{Deserialize, Serialize};

/// Code for a category that was not seen when the encoder was fitted.
///
/// Trained categories use `0..n`, so this never collides with one of them.
pub const OUT_OF_VOCABULARY: i64 = -1;

/// Frozen category → integer code mapping for one column.
///
/// Codes are the positions of the categories in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    categories: Vec<String>,
}

impl CategoryEncoder {
    /// Learn the vocabulary from every observed value.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories: Vec<String> = values.into_iter().map(Into::into).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    /// Code for `value`, or [`OUT_OF_VOCABULARY`] when it was never seen.
    pub fn encode(&self, value: &str) -> i64 {
        match self.categories.binary_search_by(|probe| probe.as_str().cmp(value)) {
            Ok(index) => index as i64,
            Err(_) => OUT_OF_VOCABULARY,
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.encode(value) != OUT_OF_VOCABULARY
    }

    pub fn decode(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|index| self.categories.get(index))
            .map(String::as_str)
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
