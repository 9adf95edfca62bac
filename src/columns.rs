//! Column listing for a dataset.
//!
//! Renders each source header next to its canonical field key and display
//! label, marking the identity field and any headers that collide on the same
//! key.

use anyhow::Result;
use log::info;

use crate::{
    cli::ColumnsArgs,
    config::Settings,
    label::plain_label,
    open_session,
    schema::Schema,
    table::{self, Align},
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let settings = Settings::resolve(&args.source)?;
    let session = open_session(settings)?;
    let schema = session.dataset().schema();

    let headers = ["#", "header", "key", "label", "note"];
    table::print_table(
        &headers,
        &column_rows(schema),
        &[Align::Right, Align::Left, Align::Left, Align::Left, Align::Left],
    );
    info!(
        "Listed {} column(s); identity field '{}', {} collision(s)",
        schema.columns.len(),
        schema.identity_field(),
        schema.collisions().len()
    );
    Ok(())
}

pub fn column_rows(schema: &Schema) -> Vec<Vec<String>> {
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let shadowed = schema
                .columns
                .iter()
                .skip(idx + 1)
                .any(|later| later.slot == column.slot);
            let note = if shadowed {
                "shadowed".to_string()
            } else if column.slot == schema.identity_slot() {
                "identity".to_string()
            } else {
                String::new()
            };
            vec![
                (idx + 1).to_string(),
                column.label.clone(),
                column.key.clone(),
                plain_label(&column.key),
                note,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_mark_identity_and_shadowed_columns() {
        let schema = Schema::from_labels(&["Part", "Core Type", "A_w", "a w"]).unwrap();
        let rows = column_rows(&schema);
        assert_eq!(rows[1][2], "core_type");
        assert_eq!(rows[1][4], "identity");
        assert_eq!(rows[2][4], "shadowed");
        assert_eq!(rows[3][4], "");
        assert_eq!(rows[3][3], "A_w");
    }
}
