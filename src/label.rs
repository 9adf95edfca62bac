//! Display labels for canonical field keys.
//!
//! Labels are built in three passes, in this order:
//!
//! 1. **Symbol**: the first prefix-anchored pattern that matches replaces the
//!    matched prefix with a symbol (`a_c_min` → `A<sub>c,min</sub>`). Keys
//!    with no known symbol use their first segment, capitalized, as the base
//!    and the segments up to the unit as its subscript.
//! 2. **Unit**: on what is left, `_2`/`_3` become `²`/`³` on the preceding
//!    segment and a trailing `mm` segment becomes ` [mm…]`.
//! 3. **Cleanup**: remaining underscores become spaces.
//!
//! The unit pass only ever sees the remainder of the first pass, so a symbol
//! prefix is never mistaken for a unit.

use std::sync::OnceLock;

use regex::Regex;

const UNNAMED: &str = "(unnamed)";
const UNIT_SEGMENT: &str = "mm";

const SYMBOL_PATTERNS: &[(&str, &str)] = &[
    (r"^(?:a_c_min|minimum_core_area)(?:_|$)", "A<sub>c,min</sub>"),
    (r"^(?:a_c_e|a_e|effective_core_area)(?:_|$)", "A<sub>e</sub>"),
    (r"^(?:a_b_w|bobbin_window_area)(?:_|$)", "A<sub>b,w</sub>"),
    (r"^(?:a_w|window_area)(?:_|$)", "A<sub>w</sub>"),
    (r"^(?:a_p|area_product)(?:_|$)", "A<sub>p</sub>"),
    (r"^(?:k_g|geometry_constant)(?:_|$)", "K<sub>g</sub>"),
    (r"^(?:l_e|effective_path_length)(?:_|$)", "l<sub>e</sub>"),
    (r"^(?:l_t|mean_turn_length)(?:_|$)", "l<sub>t</sub>"),
    (r"^l_n(?:_|$)", "l<sub>N</sub>"),
    (r"^core_type(?:_|$)", "Core type"),
    (r"^image_path(?:_|$)", "Picture"),
];

fn symbol_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SYMBOL_PATTERNS
            .iter()
            .map(|(pattern, symbol)| {
                (
                    Regex::new(pattern).expect("label patterns are valid regexes"),
                    *symbol,
                )
            })
            .collect()
    })
}

/// Markup label (`<sub>` for subscripts) for a field key. Never empty.
pub fn format_label(key: &str) -> String {
    let (symbol, remainder) = substitute_symbol(key);
    let units = substitute_units(&remainder);
    let joined = if units.is_empty() {
        symbol
    } else {
        format!("{symbol}_{units}")
    };
    let cleaned = joined.replace('_', " ").trim().to_string();
    if cleaned.is_empty() {
        UNNAMED.to_string()
    } else {
        cleaned
    }
}

/// [`format_label`] without markup, for terminals.
pub fn plain_label(key: &str) -> String {
    format_label(key).replace("<sub>", "_").replace("</sub>", "")
}

fn substitute_symbol(key: &str) -> (String, String) {
    for (pattern, symbol) in symbol_patterns() {
        if let Some(found) = pattern.find(key) {
            return (symbol.to_string(), key[found.end()..].to_string());
        }
    }

    let segments = key.split('_').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    let Some((first, tail)) = segments.split_first() else {
        return (String::new(), String::new());
    };
    let unit_start = tail
        .iter()
        .position(|segment| *segment == UNIT_SEGMENT)
        .unwrap_or(tail.len());
    let base = capitalize(first);
    let subscript = tail[..unit_start].join("_");
    let symbol = if subscript.is_empty() {
        base
    } else {
        format!("{base}<sub>{subscript}</sub>")
    };
    (symbol, tail[unit_start..].join("_"))
}

fn substitute_units(remainder: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    for segment in remainder.split('_').filter(|s| !s.is_empty()) {
        let exponent = match segment {
            "2" => Some('\u{b2}'),
            "3" => Some('\u{b3}'),
            _ => None,
        };
        match (exponent, segments.last_mut()) {
            (Some(mark), Some(previous)) => previous.push(mark),
            _ => segments.push(segment.to_string()),
        }
    }
    if let Some(last) = segments.last_mut() {
        if last.trim_end_matches(['\u{b2}', '\u{b3}']) == UNIT_SEGMENT {
            *last = format!("[{last}]");
        }
    }
    segments.join("_")
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_symbol_pattern_compiles() {
        assert_eq!(symbol_patterns().len(), SYMBOL_PATTERNS.len());
        for (pattern, _) in SYMBOL_PATTERNS {
            assert!(Regex::new(pattern).is_ok(), "invalid pattern {pattern}");
        }
    }

    #[test]
    fn only_a_bare_mm_segment_becomes_a_unit() {
        assert_eq!(format_label("a_w_mmol"), "A<sub>w</sub> mmol");
        assert_eq!(format_label("l_e_mm"), "l<sub>e</sub> [mm]");
        assert_eq!(format_label("a_w_mm_3"), "A<sub>w</sub> [mm\u{b3}]");
    }

    #[test]
    fn known_symbols_take_units() {
        assert_eq!(format_label("a_c_min_mm_2"), "A<sub>c,min</sub> [mm\u{b2}]");
        assert_eq!(format_label("a_c_e_mm_2"), "A<sub>e</sub> [mm\u{b2}]");
        assert_eq!(format_label("a_w_mm_2"), "A<sub>w</sub> [mm\u{b2}]");
        assert_eq!(format_label("l_t_mm"), "l<sub>t</sub> [mm]");
        assert_eq!(format_label("l_n"), "l<sub>N</sub>");
        assert_eq!(format_label("bobbin_window_area"), "A<sub>b,w</sub>");
    }

    #[test]
    fn more_specific_prefix_wins() {
        // `a_c_min` must not be read as `a_c_...` or `a_...`.
        assert!(format_label("a_c_min").starts_with("A<sub>c,min</sub>"));
        // `a_w` only matches at a segment boundary.
        assert_eq!(format_label("a_width"), "A<sub>width</sub>");
    }

    #[test]
    fn fallback_uses_first_segment_as_base() {
        assert_eq!(format_label("core_type"), "Core type");
        assert_eq!(format_label("height_mm"), "Height [mm]");
        assert_eq!(format_label("volume_v_e_mm_3"), "Volume<sub>v e</sub> [mm\u{b3}]");
        assert_eq!(format_label("weight"), "Weight");
    }

    #[test]
    fn empty_key_is_still_labelled() {
        assert_eq!(format_label(""), UNNAMED);
        assert_eq!(format_label("___"), UNNAMED);
    }

    #[test]
    fn plain_label_strips_markup() {
        assert_eq!(plain_label("a_c_min_mm_2"), "A_c,min [mm\u{b2}]");
        assert_eq!(plain_label("core_type"), "Core type");
    }
}
