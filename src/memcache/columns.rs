//! Column selection for row reads and scanners

use bytes::Bytes;

use crate::key::{split_column, FAMILY_DELIMITER};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnMatcher {
    /// `family:` - every qualifier of the family
    Family(Bytes),

    /// `family:qualifier` - exactly this column
    Exact(Bytes),
}

/// Set of columns a read is interested in.
///
/// Empty means every column. A requested column with an empty qualifier
/// (`"info:"`) selects the whole family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    matchers: Vec<ColumnMatcher>,
}

impl ColumnSet {
    /// Select every column
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        let matchers = columns
            .into_iter()
            .map(Into::into)
            .map(|column: Bytes| {
                if column.last() == Some(&FAMILY_DELIMITER) {
                    let family = column.slice(..column.len() - 1);
                    ColumnMatcher::Family(family)
                } else {
                    ColumnMatcher::Exact(column)
                }
            })
            .collect();
        Self { matchers }
    }

    /// Whether every column is selected
    pub fn is_wildcard(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn matches(&self, column: &[u8]) -> bool {
        if self.matchers.is_empty() {
            return true;
        }
        self.matchers.iter().any(|m| match m {
            ColumnMatcher::Family(family) => split_column(column).0 == &family[..],
            ColumnMatcher::Exact(exact) => &exact[..] == column,
        })
    }
}
