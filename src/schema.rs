//! Canonical field keys for arbitrary spreadsheet headers.
//!
//! External column labels vary between deployments (`"A_c,e [mm^2]"`,
//! `"Core Type"`, `"l_t [mm]"`), so every load re-derives the field keys and
//! the identity field from the labels it was given. Nothing here touches cell
//! values.
//!
//! Two labels that normalize to the same key share one field slot; the later
//! column wins in every row. The collision is recorded on the [`Schema`] and
//! logged, never rejected.

use std::collections::HashMap;

use log::warn;
use serde::Serialize;

const IDENTITY_HINT: &str = "core";

/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `_`, and strips `_` from both ends. Total and idempotent; a label
/// made only of symbols becomes the empty key.
pub fn normalize_label(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_separator = false;
    for ch in label.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.push(ch);
        } else {
            pending_separator = true;
        }
    }
    key
}

pub fn normalize_labels<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels
        .iter()
        .map(|label| normalize_label(label.as_ref()))
        .collect()
}

/// First key containing `core`, otherwise the first key. `None` only when
/// there are no keys at all.
pub fn select_identity_field<S: AsRef<str>>(keys: &[S]) -> Option<usize> {
    if keys.is_empty() {
        return None;
    }
    let hinted = keys
        .iter()
        .position(|key| key.as_ref().contains(IDENTITY_HINT));
    Some(hinted.unwrap_or(0))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Label as it appeared in the source header.
    pub label: String,
    pub key: String,
    /// Index into [`Schema::fields`].
    pub slot: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Collision {
    pub key: String,
    pub shadowed_label: String,
    pub winning_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
    fields: Vec<String>,
    identity: usize,
    collisions: Vec<Collision>,
}

impl Schema {
    /// Returns `None` when there is no column to identify cores by.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Option<Self> {
        let keys = normalize_labels(labels);
        let mut fields: Vec<String> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut collisions = Vec::new();
        let mut columns = Vec::with_capacity(keys.len());

        for (label, key) in labels.iter().zip(keys) {
            let label = label.as_ref().to_string();
            let slot = match slots.get(&key) {
                Some(&slot) => {
                    let previous = columns
                        .iter()
                        .rev()
                        .find(|c: &&ColumnMeta| c.slot == slot)
                        .map(|c| c.label.clone())
                        .unwrap_or_default();
                    warn!(
                        "Column '{label}' normalizes to '{key}' and overwrites column '{previous}'"
                    );
                    collisions.push(Collision {
                        key: key.clone(),
                        shadowed_label: previous,
                        winning_label: label.clone(),
                    });
                    slot
                }
                None => {
                    let slot = fields.len();
                    fields.push(key.clone());
                    slots.insert(key.clone(), slot);
                    slot
                }
            };
            columns.push(ColumnMeta { label, key, slot });
        }

        let identity = select_identity_field(&fields)?;
        Some(Schema {
            columns,
            fields,
            identity,
            collisions,
        })
    }

    /// Distinct field keys in first-seen order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn identity_field(&self) -> &str {
        &self.fields[self.identity]
    }

    pub fn identity_slot(&self) -> usize {
        self.identity
    }

    pub fn slot_of(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == key)
    }

    /// Label of the column that supplies a field's values (the last one on
    /// collision).
    pub fn label_of(&self, slot: usize) -> Option<&str> {
        self.columns
            .iter()
            .rev()
            .find(|column| column.slot == slot)
            .map(|column| column.label.as_str())
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }
}
