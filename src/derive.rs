//! Derived metrics computed from a resolved row.
//!
//! The built-in table carries the area product `Ap = A_e * A_w` and the core
//! geometry constant `Kg = A_c,min * A_w / l_t`. Configuration can append
//! expression metrics evaluated with `evalexpr`. A metric whose inputs are
//! missing, textual or out of domain is [`MetricValue::Unavailable`]; the
//! calculator itself never fails.
//!
//! Source attributes are looked up through [`FieldAliases`] because the same
//! quantity shows up under different headers across datasets.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use evalexpr::{
    ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, Node, Value as EvalValue,
    build_operator_tree,
};
use log::{debug, warn};
use serde::{Serialize, Serializer};

use crate::{data::format_number, rows::ResolvedRow};

pub const EFFECTIVE_CORE_AREA: &str = "effective_core_area";
pub const WINDOW_AREA: &str = "window_area";
pub const MINIMUM_CORE_AREA: &str = "minimum_core_area";
pub const MEAN_TURN_LENGTH: &str = "mean_turn_length";

const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    (
        EFFECTIVE_CORE_AREA,
        &["effective_core_area", "a_c_e_mm_2", "a_c_e", "a_e_mm_2", "a_e"],
    ),
    (WINDOW_AREA, &["window_area", "a_w_mm_2", "a_w"]),
    (
        MINIMUM_CORE_AREA,
        &["minimum_core_area", "a_c_min_mm_2", "a_c_min"],
    ),
    (MEAN_TURN_LENGTH, &["mean_turn_length", "l_t_mm", "l_t"]),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Unavailable,
}

impl MetricValue {
    pub fn as_number(self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(n),
            MetricValue::Unavailable => None,
        }
    }

    fn from_finite(value: f64) -> Self {
        if value.is_finite() {
            MetricValue::Number(value)
        } else {
            MetricValue::Unavailable
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MetricValue::Number(n) => serializer.serialize_f64(*n),
            MetricValue::Unavailable => serializer.serialize_none(),
        }
    }
}

/// Attribute name → candidate field keys, most specific first.
#[derive(Debug, Clone)]
pub struct FieldAliases {
    aliases: BTreeMap<String, Vec<String>>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(attribute, keys)| {
                (
                    attribute.to_string(),
                    keys.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect();
        FieldAliases { aliases }
    }
}

impl FieldAliases {
    /// Extra aliases are tried before the built-in ones.
    pub fn extend(&mut self, attribute: &str, keys: &[String]) {
        let entry = self.aliases.entry(attribute.to_string()).or_default();
        for (offset, key) in keys.iter().enumerate() {
            entry.retain(|existing| existing != key);
            entry.insert(offset.min(entry.len()), key.clone());
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    /// Number for an attribute or a plain field key. The first alias present
    /// in the row decides; it is not skipped when it holds text.
    pub fn number(&self, row: &ResolvedRow, name: &str) -> Option<f64> {
        match self.aliases.get(name) {
            Some(keys) => keys
                .iter()
                .find_map(|key| row.get(key))
                .and_then(|value| value.as_number()),
            None => row.number(name),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Formula {
    AreaProduct,
    GeometryConstant,
    Expression {
        source: String,
        node: Node<DefaultNumericTypes>,
    },
}

impl Formula {
    pub fn expression(source: &str) -> Result<Self> {
        let node = build_operator_tree::<DefaultNumericTypes>(source)
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("Parsing metric expression '{source}'"))?;
        Ok(Formula::Expression {
            source: source.to_string(),
            node,
        })
    }

    pub fn describe(&self) -> String {
        match self {
            Formula::AreaProduct => "A_e * A_w".to_string(),
            Formula::GeometryConstant => "A_c,min * A_w / l_t".to_string(),
            Formula::Expression { source, .. } => source.clone(),
        }
    }

    fn evaluate(&self, row: &ResolvedRow, aliases: &FieldAliases) -> MetricValue {
        match self {
            Formula::AreaProduct => {
                let (Some(a_e), Some(a_w)) = (
                    aliases.number(row, EFFECTIVE_CORE_AREA),
                    aliases.number(row, WINDOW_AREA),
                ) else {
                    return MetricValue::Unavailable;
                };
                MetricValue::from_finite(a_e * a_w)
            }
            Formula::GeometryConstant => {
                let (Some(a_c_min), Some(a_w), Some(l_t)) = (
                    aliases.number(row, MINIMUM_CORE_AREA),
                    aliases.number(row, WINDOW_AREA),
                    aliases.number(row, MEAN_TURN_LENGTH),
                ) else {
                    return MetricValue::Unavailable;
                };
                if l_t == 0.0 {
                    return MetricValue::Unavailable;
                }
                MetricValue::from_finite(a_c_min * a_w / l_t)
            }
            Formula::Expression { source, node } => evaluate_expression(source, node, row, aliases),
        }
    }
}

fn evaluate_expression(
    source: &str,
    node: &Node<DefaultNumericTypes>,
    row: &ResolvedRow,
    aliases: &FieldAliases,
) -> MetricValue {
    let mut context = HashMapContext::<DefaultNumericTypes>::new();
    for identifier in node.iter_variable_identifiers() {
        let Some(value) = aliases.number(row, identifier) else {
            debug!("Expression '{source}' needs '{identifier}', which is not a number here");
            return MetricValue::Unavailable;
        };
        if context
            .set_value(identifier.to_string(), EvalValue::Float(value))
            .is_err()
        {
            return MetricValue::Unavailable;
        }
    }
    match node.eval_with_context(&context) {
        Ok(EvalValue::Float(f)) => MetricValue::from_finite(f),
        Ok(EvalValue::Int(i)) => MetricValue::Number(i as f64),
        Ok(other) => {
            debug!("Expression '{source}' produced a non-numeric value {other:?}");
            MetricValue::Unavailable
        }
        Err(err) => {
            debug!("Expression '{source}' failed: {err}");
            MetricValue::Unavailable
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub name: String,
    pub title: String,
    pub unit: String,
    /// Decimal places used when rendering; the stored value keeps full
    /// precision.
    pub precision: usize,
    pub formula: Formula,
}

impl MetricDefinition {
    /// Parses `name=expression` as given on the command line.
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, expression) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("Metric '{raw}' must look like name=expression"))?;
        let name = name.trim();
        let expression = expression.trim();
        if name.is_empty() {
            return Err(anyhow!("Metric '{raw}' is missing a name"));
        }
        if expression.is_empty() {
            return Err(anyhow!("Metric '{name}' is missing an expression"));
        }
        Ok(MetricDefinition {
            name: name.to_string(),
            title: name.to_string(),
            unit: String::new(),
            precision: 4,
            formula: Formula::expression(expression)?,
        })
    }

    /// `value unit` at this metric's precision, or the placeholder.
    pub fn render(&self, value: MetricValue, placeholder: &str) -> String {
        match value {
            MetricValue::Number(n) if self.unit.is_empty() => {
                format!("{n:.prec$}", prec = self.precision)
            }
            MetricValue::Number(n) => format!("{n:.prec$} {}", self.unit, prec = self.precision),
            MetricValue::Unavailable => placeholder.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DerivedMetric {
    pub name: String,
    pub title: String,
    pub unit: String,
    pub formula: String,
    pub value: MetricValue,
    /// Value at display precision, or the placeholder.
    pub display: String,
}

#[derive(Debug, Clone)]
pub struct MetricTable {
    definitions: Vec<MetricDefinition>,
    aliases: FieldAliases,
}

impl Default for MetricTable {
    fn default() -> Self {
        MetricTable {
            definitions: vec![
                MetricDefinition {
                    name: "Ap".to_string(),
                    title: "Area product".to_string(),
                    unit: "mm\u{2074}".to_string(),
                    precision: 3,
                    formula: Formula::AreaProduct,
                },
                MetricDefinition {
                    name: "Kg".to_string(),
                    title: "Core geometry constant".to_string(),
                    unit: "mm\u{b3}".to_string(),
                    precision: 4,
                    formula: Formula::GeometryConstant,
                },
            ],
            aliases: FieldAliases::default(),
        }
    }
}

impl MetricTable {
    pub fn with_aliases(aliases: FieldAliases) -> Self {
        MetricTable {
            aliases,
            ..MetricTable::default()
        }
    }

    /// Adds a metric, replacing any existing one with the same name.
    pub fn push(&mut self, definition: MetricDefinition) {
        match self
            .definitions
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&definition.name))
        {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }

    pub fn definitions(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    pub fn aliases(&self) -> &FieldAliases {
        &self.aliases
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.name.eq_ignore_ascii_case(name))
    }

    /// Unknown names are `Unavailable`, like any other metric that cannot be
    /// determined.
    pub fn compute(&self, name: &str, row: &ResolvedRow) -> MetricValue {
        match self.get(name) {
            Some(definition) => definition.formula.evaluate(row, &self.aliases),
            None => {
                warn!("Unknown metric '{name}'");
                MetricValue::Unavailable
            }
        }
    }

    pub fn evaluate_all(&self, row: &ResolvedRow, placeholder: &str) -> Vec<DerivedMetric> {
        self.definitions
            .iter()
            .map(|definition| {
                let value = definition.formula.evaluate(row, &self.aliases);
                if let MetricValue::Number(n) = value {
                    debug!(
                        "{} for '{}' = {}",
                        definition.name,
                        row.identifier,
                        format_number(n)
                    );
                }
                DerivedMetric {
                    name: definition.name.clone(),
                    title: definition.title.clone(),
                    unit: definition.unit.clone(),
                    formula: definition.formula.describe(),
                    value,
                    display: definition.render(value, placeholder),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::TypedValue,
        rows::{ResolvedField, ResolvedRow},
    };

    fn row(fields: &[(&str, TypedValue)]) -> ResolvedRow {
        ResolvedRow {
            position: 0,
            identifier: "E 5".to_string(),
            fields: fields
                .iter()
                .map(|(key, value)| ResolvedField {
                    key: key.to_string(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn area_product_multiplies_exactly() {
        let table = MetricTable::default();
        let r = row(&[
            ("a_c_e_mm_2", TypedValue::Number(10.0)),
            ("a_w_mm_2", TypedValue::Number(5.0)),
        ]);
        assert_eq!(table.compute("Ap", &r), MetricValue::Number(50.0));
    }

    #[test]
    fn area_product_needs_both_inputs() {
        let table = MetricTable::default();
        let r = row(&[
            ("a_c_e_mm_2", TypedValue::Number(10.0)),
            ("a_w_mm_2", TypedValue::Text("N/A".to_string())),
        ]);
        assert_eq!(table.compute("Ap", &r), MetricValue::Unavailable);
        let missing = row(&[("a_w_mm_2", TypedValue::Number(5.0))]);
        assert_eq!(table.compute("ap", &missing), MetricValue::Unavailable);
    }

    #[test]
    fn geometry_constant_guards_zero_turn_length() {
        let table = MetricTable::default();
        let mut r = row(&[
            ("minimum_core_area", TypedValue::Number(3.0)),
            ("window_area", TypedValue::Number(5.0)),
            ("mean_turn_length", TypedValue::Number(0.0)),
        ]);
        assert_eq!(table.compute("Kg", &r), MetricValue::Unavailable);
        r.fields[2].value = TypedValue::Number(2.0);
        assert_eq!(table.compute("Kg", &r), MetricValue::Number(7.5));
        r.fields[2].value = TypedValue::Unavailable;
        assert_eq!(table.compute("Kg", &r), MetricValue::Unavailable);
    }

    #[test]
    fn first_present_alias_decides() {
        let aliases = FieldAliases::default();
        let r = row(&[
            ("a_w_mm_2", TypedValue::Text("see note".to_string())),
            ("a_w", TypedValue::Number(9.0)),
        ]);
        assert_eq!(aliases.number(&r, WINDOW_AREA), None);
    }

    #[test]
    fn extended_aliases_take_priority() {
        let mut aliases = FieldAliases::default();
        aliases.extend(WINDOW_AREA, &["aw_sq_mm".to_string()]);
        let r = row(&[
            ("aw_sq_mm", TypedValue::Number(4.0)),
            ("a_w", TypedValue::Number(9.0)),
        ]);
        assert_eq!(aliases.number(&r, WINDOW_AREA), Some(4.0));
    }

    #[test]
    fn expression_metrics_bind_attributes_and_keys() {
        let mut table = MetricTable::default();
        table.push(MetricDefinition::parse("ratio = window_area / l_e_mm").unwrap());
        let r = row(&[
            ("a_w_mm_2", TypedValue::Number(12.0)),
            ("l_e_mm", TypedValue::Number(4.0)),
        ]);
        assert_eq!(table.compute("ratio", &r), MetricValue::Number(3.0));

        let texty = row(&[
            ("a_w_mm_2", TypedValue::Number(12.0)),
            ("l_e_mm", TypedValue::Text("-".to_string())),
        ]);
        assert_eq!(table.compute("ratio", &texty), MetricValue::Unavailable);
    }

    #[test]
    fn expression_division_by_zero_is_unavailable() {
        let mut table = MetricTable::default();
        table.push(MetricDefinition::parse("inv=1.0 / l_t").unwrap());
        let r = row(&[("l_t", TypedValue::Number(0.0))]);
        assert_eq!(table.compute("inv", &r), MetricValue::Unavailable);
    }

    #[test]
    fn unknown_metric_is_unavailable() {
        let table = MetricTable::default();
        assert_eq!(table.compute("Bmax", &row(&[])), MetricValue::Unavailable);
    }

    #[test]
    fn malformed_metric_definitions_are_rejected() {
        assert!(MetricDefinition::parse("no_equals").is_err());
        assert!(MetricDefinition::parse("=1+1").is_err());
        assert!(MetricDefinition::parse("x=").is_err());
        assert!(MetricDefinition::parse("x=(1+").is_err());
    }

    #[test]
    fn rendering_applies_precision_only_for_display() {
        let table = MetricTable::default();
        let ap = table.get("Ap").unwrap();
        let kg = table.get("Kg").unwrap();
        assert_eq!(ap.render(MetricValue::Number(50.0), "-"), "50.000 mm\u{2074}");
        assert_eq!(kg.render(MetricValue::Number(7.5), "-"), "7.5000 mm\u{b3}");
        assert_eq!(kg.render(MetricValue::Unavailable, "-"), "-");

        let r = row(&[
            ("a_e", TypedValue::Number(1.0 / 3.0)),
            ("a_w", TypedValue::Number(1.0)),
        ]);
        let metrics = table.evaluate_all(&r, "-");
        assert_eq!(metrics[0].value, MetricValue::Number(1.0 / 3.0));
        assert_eq!(metrics[0].display, "0.333 mm\u{2074}");
        assert_eq!(metrics[1].value, MetricValue::Unavailable);
    }
}
