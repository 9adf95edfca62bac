//! Resolved rows: one dataset row coerced into typed values.
//!
//! A [`ResolvedRow`] is built per query from the immutable dataset snapshot
//! and never mutated afterwards; derived metrics read from it atomically.

use serde::Serialize;

use crate::{
    data::{RawCell, TypedValue, coerce_cell},
    schema::Schema,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedField {
    pub key: String,
    pub value: TypedValue,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedRow {
    /// Position of the source row in dataset order.
    pub position: usize,
    pub identifier: String,
    pub fields: Vec<ResolvedField>,
}

impl ResolvedRow {
    /// Coerces a slot-aligned raw row. Slots the row does not reach are
    /// `Unavailable`.
    pub fn from_raw(schema: &Schema, position: usize, raw: &[RawCell]) -> Self {
        let fields = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(slot, key)| ResolvedField {
                key: key.clone(),
                value: raw
                    .get(slot)
                    .map(coerce_cell)
                    .unwrap_or(TypedValue::Unavailable),
            })
            .collect();
        let identifier = raw
            .get(schema.identity_slot())
            .map(|cell| cell.as_text().trim().to_string())
            .unwrap_or_default();
        ResolvedRow {
            position,
            identifier,
            fields,
        }
    }

    /// `None` when the dataset has no such field; a present but blank cell is
    /// `Some(Unavailable)`.
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(TypedValue::as_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_pads_short_rows_with_unavailable() {
        let schema = Schema::from_labels(&["Core Type", "A_w [mm^2]", "Notes"]).unwrap();
        let raw = vec![RawCell::Text(" E 5 ".into()), RawCell::Text("12.5".into())];
        let row = ResolvedRow::from_raw(&schema, 3, &raw);
        assert_eq!(row.identifier, "E 5");
        assert_eq!(row.position, 3);
        assert_eq!(row.number("a_w_mm_2"), Some(12.5));
        assert_eq!(row.get("notes"), Some(&TypedValue::Unavailable));
        assert_eq!(row.get("missing"), None);
    }
}
