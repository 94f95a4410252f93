use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parser configuration. Fixed when a [crate::Converter] is built and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Raw html passes through as `html-block`/`html-inline` nodes instead of literal text.
    pub allow_raw_html: bool,
    /// Bare urls and e-mail addresses in text become links.
    pub auto_link_bare_urls: bool,
    pub math_delimiters: MathDelimiters,
    pub enable_block_images: bool,
    pub enable_toc: bool,
    pub block_image: BlockImageOptions,
    pub toc: TocOptions,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            allow_raw_html: true,
            auto_link_bare_urls: true,
            math_delimiters: MathDelimiters::default(),
            enable_block_images: true,
            enable_toc: true,
            block_image: BlockImageOptions::default(),
            toc: TocOptions::default(),
        }
    }
}

/// Delimiter convention that triggers math nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MathDelimiters {
    /// `$inline$`, `$$display$$`
    #[default]
    Dollars,
    /// `\(inline\)`, `\[display\]`
    Brackets,
    /// `$$...$$` for both inline and display math.
    Kramdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockImageOptions {
    /// Element name a renderer should wrap the image in, e.g. `figure`.
    pub container: Option<String>,
    pub container_class: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocListType {
    #[default]
    Ol,
    Ul,
}

impl TocListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TocListType::Ol => "ol",
            TocListType::Ul => "ul",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TocOptions {
    /// Regex matched against the whole text of a paragraph.
    pub placeholder: String,
    pub min_level: u8,
    pub max_level: u8,
    pub list_type: TocListType,
    pub container_class: String,
    /// Write the computed slug to the `id` attribute of every heading.
    pub anchor_headings: bool,
    /// Suffix used for the first duplicate slug (`intro`, `intro-1`, ...).
    pub unique_slug_start_index: usize,
}

impl Default for TocOptions {
    fn default() -> Self {
        TocOptions {
            placeholder: r"(\$\{toc\}|\[\[?_?toc_?\]?\])".to_string(),
            min_level: 1,
            max_level: 6,
            list_type: TocListType::default(),
            container_class: "table-of-contents".to_string(),
            anchor_headings: true,
            unique_slug_start_index: 1,
        }
    }
}

/// A syntax extension could not be registered. Raised only while building a converter.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("extension `{0}` is registered more than once")]
    DuplicateExtension(String),
    #[error("invalid heading range {min}..={max} for `{extension}`")]
    HeadingRange {
        extension: &'static str,
        min: u8,
        max: u8,
    },
    #[error("invalid pattern for `{extension}`")]
    Pattern {
        extension: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("extension `{extension}` is misconfigured: {reason}")]
    Conflict {
        extension: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: ParserConfig = serde_json::from_str(
            r#"{"allow_raw_html": false, "math_delimiters": "brackets", "toc": {"max_level": 3}}"#,
        )
        .unwrap();

        assert!(!config.allow_raw_html);
        assert!(config.auto_link_bare_urls);
        assert_eq!(config.math_delimiters, MathDelimiters::Brackets);
        assert_eq!(config.toc.max_level, 3);
        assert_eq!(config.toc.min_level, 1);
        assert_eq!(config.toc.container_class, "table-of-contents");
    }
}
