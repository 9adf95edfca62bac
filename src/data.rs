use std::fmt;

use serde::{Serialize, Serializer};

pub const DEFAULT_PLACEHOLDER: &str = "\u{2014}";

/// A cell exactly as the data source produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Blank,
}

impl RawCell {
    /// Builds a cell from delimited text, where every value arrives as a string.
    pub fn from_text(value: &str) -> Self {
        if value.trim().is_empty() {
            RawCell::Blank
        } else {
            RawCell::Text(value.to_string())
        }
    }

    /// Text used for identifier matching and verbatim display.
    pub fn as_text(&self) -> String {
        match self {
            RawCell::Text(s) => s.clone(),
            RawCell::Number(n) => format_number(*n),
            RawCell::Blank => String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Blank => true,
            RawCell::Text(s) => s.trim().is_empty(),
            RawCell::Number(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Number(f64),
    Text(String),
    Unavailable,
}

impl TypedValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, TypedValue::Unavailable)
    }

    /// Renders the value for people. `Unavailable` always shows `placeholder`,
    /// never zero or an empty string.
    pub fn display_with(&self, placeholder: &str) -> String {
        match self {
            TypedValue::Number(n) => format_number(*n),
            TypedValue::Text(s) => s.clone(),
            TypedValue::Unavailable => placeholder.to_string(),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with(DEFAULT_PLACEHOLDER))
    }
}

impl Serialize for TypedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TypedValue::Number(n) => serializer.serialize_f64(*n),
            TypedValue::Text(s) => serializer.serialize_str(s),
            TypedValue::Unavailable => serializer.serialize_none(),
        }
    }
}

/// Coerces a raw string: numbers first, then blank, then verbatim text.
pub fn coerce(raw: &str) -> TypedValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return TypedValue::Unavailable;
    }
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => TypedValue::Number(parsed),
        _ => TypedValue::Text(raw.to_string()),
    }
}

pub fn coerce_cell(cell: &RawCell) -> TypedValue {
    match cell {
        RawCell::Number(n) if n.is_finite() => TypedValue::Number(*n),
        RawCell::Number(n) => TypedValue::Text(n.to_string()),
        RawCell::Text(s) => coerce(s),
        RawCell::Blank => TypedValue::Unavailable,
    }
}

/// Integral values print without a fractional part; everything else uses the
/// shortest round-trip representation.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_distinguishes_number_text_and_blank() {
        assert_eq!(coerce(""), TypedValue::Unavailable);
        assert_eq!(coerce("   "), TypedValue::Unavailable);
        assert_eq!(coerce("12.5"), TypedValue::Number(12.5));
        assert_eq!(coerce(" -3 "), TypedValue::Number(-3.0));
        assert_eq!(coerce("1.5e3"), TypedValue::Number(1500.0));
        assert_eq!(coerce("N/A"), TypedValue::Text("N/A".to_string()));
    }

    #[test]
    fn coerce_keeps_non_finite_tokens_as_text() {
        assert_eq!(coerce("NaN"), TypedValue::Text("NaN".to_string()));
        assert_eq!(coerce("inf"), TypedValue::Text("inf".to_string()));
    }

    #[test]
    fn coerce_cell_passes_spreadsheet_numbers_through() {
        assert_eq!(coerce_cell(&RawCell::Number(4.0)), TypedValue::Number(4.0));
        assert_eq!(coerce_cell(&RawCell::Blank), TypedValue::Unavailable);
        assert_eq!(
            coerce_cell(&RawCell::Text("7".to_string())),
            TypedValue::Number(7.0)
        );
    }

    #[test]
    fn unavailable_never_renders_as_zero_or_empty() {
        assert_eq!(TypedValue::Unavailable.display_with("n/a"), "n/a");
        assert_eq!(TypedValue::Unavailable.to_string(), DEFAULT_PLACEHOLDER);
        assert_eq!(TypedValue::Number(0.0).to_string(), "0");
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(12.25), "12.25");
        assert_eq!(RawCell::Number(5.0).as_text(), "5");
    }
}
