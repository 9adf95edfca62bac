//! One normalized, immutable snapshot of a data source.

use itertools::Itertools;
use log::info;

use crate::{
    data::RawCell,
    error::{LoadError, LookupError},
    index::RowIndex,
    rows::ResolvedRow,
    schema::Schema,
    source::{RawTable, SourceIdentity},
};

#[derive(Debug, Clone)]
pub struct Dataset {
    identity: SourceIdentity,
    schema: Schema,
    /// Rows aligned to schema field slots.
    rows: Vec<Vec<RawCell>>,
    index: RowIndex,
}

impl Dataset {
    pub fn from_table(identity: SourceIdentity, table: RawTable) -> Result<Self, LoadError> {
        let schema = Schema::from_labels(&table.headers).ok_or_else(|| {
            LoadError::SchemaDegenerate {
                source_id: identity.to_string(),
            }
        })?;

        let width = schema.fields().len();
        let rows = table
            .rows
            .into_iter()
            .map(|raw| {
                let mut aligned = vec![RawCell::Blank; width];
                // Later columns overwrite earlier ones that share a key.
                for (column, cell) in schema.columns.iter().zip(raw) {
                    aligned[column.slot] = cell;
                }
                aligned
            })
            .collect::<Vec<_>>();

        let identity_slot = schema.identity_slot();
        let index = RowIndex::build(rows.iter().map(|row| row[identity_slot].as_text()));
        info!(
            "Loaded {} row(s) with {} field(s) from {identity}; identity field '{}' ({} distinct)",
            rows.len(),
            width,
            schema.identity_field(),
            index.len()
        );
        Ok(Dataset {
            identity,
            schema,
            rows,
            index,
        })
    }

    pub fn identity(&self) -> &SourceIdentity {
        &self.identity
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn identity_field(&self) -> &str {
        self.schema.identity_field()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedRow, LookupError> {
        self.index
            .resolve(identifier)
            .map(|position| self.resolve_position(position))
            .ok_or_else(|| LookupError::NotFound {
                identifier: identifier.trim().to_string(),
            })
    }

    pub fn resolve_all(&self, identifier: &str) -> Result<Vec<ResolvedRow>, LookupError> {
        let positions = self.index.resolve_all(identifier);
        if positions.is_empty() {
            return Err(LookupError::NotFound {
                identifier: identifier.trim().to_string(),
            });
        }
        Ok(positions
            .iter()
            .map(|&position| self.resolve_position(position))
            .collect())
    }

    /// Distinct identifiers in first-occurrence order, as typed in the source.
    pub fn identifiers(&self) -> Vec<String> {
        let slot = self.schema.identity_slot();
        self.rows
            .iter()
            .map(|row| row[slot].as_text().trim().to_string())
            .filter(|identifier| !identifier.is_empty())
            .unique_by(|identifier| identifier.to_lowercase())
            .collect()
    }

    fn resolve_position(&self, position: usize) -> ResolvedRow {
        ResolvedRow::from_raw(&self.schema, position, &self.rows[position])
    }
}
