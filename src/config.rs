//! Optional YAML configuration merged under command-line flags.
//!
//! ```yaml
//! data: Cores-Info-Database.xlsx
//! sheet: Cores
//! placeholder: "n/a"
//! aliases:
//!   window_area: ["A_w (mm^2)"]
//! metrics:
//!   - name: Ap_cm
//!     expression: "effective_core_area * window_area / 10000"
//!     unit: cm^4
//!     precision: 3
//! ```

use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::debug;
use serde::Deserialize;

use crate::{
    cli::{SourceArgs, parse_delimiter},
    data::DEFAULT_PLACEHOLDER,
    derive::{FieldAliases, Formula, MetricDefinition, MetricTable},
    io_utils,
    schema::normalize_label,
    source::{self, DataSource},
};

const DEFAULT_METRIC_PRECISION: usize = 4;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data: Option<PathBuf>,
    pub sheet: Option<String>,
    pub delimiter: Option<String>,
    pub encoding: Option<String>,
    pub placeholder: Option<String>,
    /// Attribute name → extra header labels (normalized on load).
    pub aliases: BTreeMap<String, Vec<String>>,
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    pub name: String,
    pub expression: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_precision() -> usize {
    DEFAULT_METRIC_PRECISION
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Reading config {path:?}"))?;
        Self::from_yaml(&contents).with_context(|| format!("Parsing config {path:?}"))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn field_aliases(&self) -> FieldAliases {
        let mut aliases = FieldAliases::default();
        for (attribute, labels) in &self.aliases {
            let keys = labels
                .iter()
                .map(|label| normalize_label(label))
                .filter(|key| !key.is_empty())
                .collect::<Vec<_>>();
            aliases.extend(attribute.trim(), &keys);
        }
        aliases
    }

    pub fn metric_table(&self) -> Result<MetricTable> {
        let mut table = MetricTable::with_aliases(self.field_aliases());
        for metric in &self.metrics {
            let name = metric.name.trim();
            if name.is_empty() {
                return Err(anyhow!("Configured metric is missing a name"));
            }
            table.push(MetricDefinition {
                name: name.to_string(),
                title: metric.title.clone().unwrap_or_else(|| name.to_string()),
                unit: metric.unit.clone(),
                precision: metric.precision,
                formula: Formula::expression(&metric.expression)
                    .with_context(|| format!("Configured metric '{name}'"))?,
            });
        }
        Ok(table)
    }
}

/// Command-line flags merged over the config file.
#[derive(Debug)]
pub struct Settings {
    pub input: PathBuf,
    pub sheet: Option<String>,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub placeholder: String,
    pub metrics: MetricTable,
}

impl Settings {
    pub fn resolve(args: &SourceArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        debug!("Effective config: {config:?}");

        let input = args
            .input
            .clone()
            .or_else(|| config.data.clone())
            .ok_or_else(|| anyhow!("No data source given; pass --input or set 'data' in --config"))?;
        let delimiter = match (args.delimiter, config.delimiter.as_deref()) {
            (Some(delimiter), _) => Some(delimiter),
            (None, Some(raw)) => Some(
                parse_delimiter(raw).map_err(|err| anyhow!("Config delimiter '{raw}': {err}"))?,
            ),
            (None, None) => None,
        };
        let encoding = io_utils::resolve_encoding(
            args.input_encoding
                .as_deref()
                .or(config.encoding.as_deref()),
        )?;
        let placeholder = args
            .placeholder
            .clone()
            .or_else(|| config.placeholder.clone())
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string());

        Ok(Settings {
            input,
            sheet: args.sheet.clone().or_else(|| config.sheet.clone()),
            delimiter,
            encoding,
            placeholder,
            metrics: config.metric_table()?,
        })
    }

    pub fn source(&self) -> Box<dyn DataSource> {
        source::open_path(&self.input, self.sheet.clone(), self.delimiter, self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::WINDOW_AREA;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn config_parses_metrics_and_aliases() {
        let config = Config::from_yaml(
            r#"
data: cores.csv
placeholder: "n/a"
aliases:
  window_area: ["Aw (sq mm)"]
metrics:
  - name: Ap_cm
    expression: "effective_core_area * window_area / 10000"
    unit: cm^4
"#,
        )
        .unwrap();
        assert_eq!(config.data, Some(PathBuf::from("cores.csv")));
        assert_eq!(config.metrics[0].precision, DEFAULT_METRIC_PRECISION);

        let table = config.metric_table().unwrap();
        assert!(table.get("Ap").is_some());
        assert_eq!(table.get("ap_cm").unwrap().unit, "cm^4");
        let aliases = config.field_aliases();
        assert!(aliases.attributes().any(|a| a == WINDOW_AREA));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_yaml("datafile: x.csv").is_err());
    }

    #[test]
    fn bad_metric_expression_fails_config() {
        let config = Config::from_yaml("metrics:\n  - name: x\n    expression: \"(1+\"\n").unwrap();
        assert!(config.metric_table().is_err());
    }

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("magcore.yaml");
        fs::write(
            &config_path,
            "data: from-config.csv\ndelimiter: semicolon\nplaceholder: \"?\"\n",
        )
        .unwrap();
        let args = SourceArgs {
            input: Some(PathBuf::from("from-flag.csv")),
            sheet: None,
            delimiter: None,
            input_encoding: None,
            config: Some(config_path),
            placeholder: None,
        };
        let settings = Settings::resolve(&args).unwrap();
        assert_eq!(settings.input, PathBuf::from("from-flag.csv"));
        assert_eq!(settings.delimiter, Some(b';'));
        assert_eq!(settings.placeholder, "?");
    }

    #[test]
    fn missing_input_is_reported() {
        let args = SourceArgs {
            input: None,
            sheet: None,
            delimiter: None,
            input_encoding: None,
            config: None,
            placeholder: None,
        };
        assert!(Settings::resolve(&args).is_err());
    }
}
