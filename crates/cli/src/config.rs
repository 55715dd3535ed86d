//! Option defaults loaded from `--config`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pdfprobe_core::api::{AnalysisOptions, ContentOptions, ExportOptions, SplitOptions};
use serde::Deserialize;
use tracing::debug;

/// One section per option struct; every section and field is optional.
///
/// ```json
/// { "content": { "max_ops": 2000, "pages": "1-3" }, "export": { "include_undecoded": false } }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub analysis: AnalysisOptions,
    pub content: ContentOptions,
    pub export: ExportOptions,
    pub split: SplitOptions,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_are_optional() {
        let config: Config =
            serde_json::from_str(r#"{"content": {"max_ops": 25, "pages": "2-"}}"#).unwrap();
        assert_eq!(config.content.max_ops, 25);
        assert_eq!(config.content.page_numbers(4).unwrap(), vec![2, 3, 4]);
        assert_eq!(config.analysis, AnalysisOptions::default());
        assert!(config.export.include_undecoded);
    }

    #[test]
    fn test_unknown_sections_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"contnet": {}}"#).is_err());
        assert!(serde_json::from_str::<Config>(r#"{"split": {"pages": "0"}}"#).is_err());
    }
}
