//! Query results as handed to presentation, plus the text and JSON renderers
//! the command line uses.
//!
//! Everything here is already coerced and computed; renderers only format.
//! `Unavailable` values render as the session placeholder and serialize as
//! JSON `null`.

use anyhow::Result;
use serde::Serialize;

use crate::{
    data::TypedValue,
    dataset::Dataset,
    derive::{DerivedMetric, MetricTable, MetricValue},
    label::{format_label, plain_label},
    rows::ResolvedRow,
    table::{self, Align},
};

const PICTURE_FIELD: &str = "image_path";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldReport {
    pub key: String,
    /// Header label from the data source.
    pub source_label: String,
    /// Markup label from [`format_label`].
    pub label: String,
    pub value: TypedValue,
    pub display: String,
}

impl FieldReport {
    pub fn new(key: &str, source_label: &str, value: TypedValue, placeholder: &str) -> Self {
        FieldReport {
            key: key.to_string(),
            source_label: source_label.to_string(),
            label: format_label(key),
            display: value.display_with(placeholder),
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoreReport {
    pub identifier: String,
    pub identity_field: String,
    pub source: String,
    pub row: usize,
    pub fields: Vec<FieldReport>,
    pub metrics: Vec<DerivedMetric>,
    pub picture: Option<String>,
}

impl CoreReport {
    pub fn build(
        dataset: &Dataset,
        row: ResolvedRow,
        metrics: &MetricTable,
        placeholder: &str,
    ) -> Self {
        let schema = dataset.schema();
        let derived = metrics.evaluate_all(&row, placeholder);
        let picture = match row.get(PICTURE_FIELD) {
            Some(TypedValue::Text(path)) => Some(path.trim().to_string()),
            _ => None,
        };
        let fields = row
            .fields
            .into_iter()
            .enumerate()
            .map(|(slot, field)| {
                let source_label = schema
                    .label_of(slot)
                    .unwrap_or(field.key.as_str())
                    .to_string();
                FieldReport::new(&field.key, &source_label, field.value, placeholder)
            })
            .collect();
        CoreReport {
            identifier: row.identifier,
            identity_field: dataset.identity_field().to_string(),
            source: dataset.identity().to_string(),
            row: row.position,
            fields,
            metrics: derived,
            picture,
        }
    }

    pub fn metric(&self, name: &str) -> Option<MetricValue> {
        self.metrics
            .iter()
            .find(|metric| metric.name.eq_ignore_ascii_case(name))
            .map(|metric| metric.value)
    }

    pub fn field(&self, key: &str) -> Option<&FieldReport> {
        self.fields.iter().find(|field| field.key == key)
    }
}

pub fn render_core_text(report: &CoreReport) -> String {
    let mut output = format!("{}\n\n", report.identifier);

    let rows = report
        .fields
        .iter()
        .filter(|field| field.key != report.identity_field && field.key != PICTURE_FIELD)
        .map(|field| {
            vec![
                field.source_label.clone(),
                plain_label(&field.key),
                field.display.clone(),
            ]
        })
        .collect::<Vec<_>>();
    output.push_str(&table::render_table(
        &["dimension", "symbol", "value"],
        &rows,
        &[Align::Left, Align::Left, Align::Right],
    ));

    if !report.metrics.is_empty() {
        output.push('\n');
        let metric_rows = report
            .metrics
            .iter()
            .map(|metric| {
                vec![
                    metric.title.clone(),
                    format!("{} = {}", metric.name, metric.formula),
                    metric.display.clone(),
                ]
            })
            .collect::<Vec<_>>();
        output.push_str(&table::render_table(
            &["calculated", "formula", "value"],
            &metric_rows,
            &[Align::Left, Align::Left, Align::Right],
        ));
    }

    output.push('\n');
    match &report.picture {
        Some(path) => output.push_str(&format!("Picture: {path}\n")),
        None => output.push_str("No picture available for this core.\n"),
    }
    output
}

/// `"<dimension> for <core>: <value>"`, with the dimension as the source
/// header spells it.
pub fn render_field_text(identifier: &str, field: &FieldReport) -> String {
    format!(
        "{} for {}: {}",
        field.source_label,
        identifier.trim(),
        field.display
    )
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
