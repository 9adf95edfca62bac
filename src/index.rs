use std::collections::HashMap;

use log::debug;

/// Identifier comparison form: outer whitespace trimmed, case folded.
///
/// Internal whitespace is kept as-is, so `"E  5"` and `"E 5"` are different
/// identifiers. Datasets that mix spacing styles have to be cleaned at the
/// source.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Maps normalized core identifiers to row positions in dataset order.
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    positions: HashMap<String, Vec<usize>>,
}

impl RowIndex {
    /// Builds the index from identifiers in dataset order. Blank identifiers
    /// are not indexed.
    pub fn build<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        for (row, identifier) in identifiers.into_iter().enumerate() {
            let key = normalize_identifier(identifier.as_ref());
            if key.is_empty() {
                debug!("Row {row} has a blank identifier and is not indexed");
                continue;
            }
            let entry = positions.entry(key).or_default();
            if let Some(first) = entry.first() {
                debug!(
                    "Row {row} repeats identifier '{}' first seen at row {first}; it is shadowed",
                    identifier.as_ref().trim()
                );
            }
            entry.push(row);
        }
        RowIndex { positions }
    }

    /// First row whose identifier matches.
    pub fn resolve(&self, identifier: &str) -> Option<usize> {
        self.resolve_all(identifier).first().copied()
    }

    /// Every matching row, in dataset order.
    pub fn resolve_all(&self, identifier: &str) -> &[usize] {
        self.positions
            .get(&normalize_identifier(identifier))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_folds_case_and_outer_whitespace() {
        let index = RowIndex::build(["E 5", "RM 6"]);
        assert_eq!(index.resolve("E 5"), Some(0));
        assert_eq!(index.resolve("e 5"), Some(0));
        assert_eq!(index.resolve(" E 5 "), Some(0));
        assert_eq!(index.resolve("rm 6"), Some(1));
    }

    #[test]
    fn internal_whitespace_is_significant() {
        let index = RowIndex::build(["E 5"]);
        assert_eq!(index.resolve("E  5"), None);
        let spaced = RowIndex::build(["E  5"]);
        assert_eq!(spaced.resolve("e  5"), Some(0));
    }

    #[test]
    fn duplicates_resolve_to_first_row() {
        let index = RowIndex::build(["E 5", "RM 6", "e 5 "]);
        assert_eq!(index.resolve("E 5"), Some(0));
        assert_eq!(index.resolve_all("E 5"), &[0, 2]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn blank_identifiers_are_skipped() {
        let index = RowIndex::build(["", "  ", "ETD 29"]);
        assert_eq!(index.resolve(""), None);
        assert_eq!(index.resolve("etd 29"), Some(2));
        assert!(index.resolve_all("nonexistent").is_empty());
    }
}
