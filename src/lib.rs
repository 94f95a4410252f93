//! Host side of `mdtree`: configuration files, logging setup and batch conversion of markdown files
//! to their serialized node trees.

pub mod batch;
pub mod config;
pub mod logging;

use mdtree_parser::Converter;

/// Serialized node tree of `text`, compact or indented.
pub fn render(converter: &Converter, text: &str, pretty: bool) -> anyhow::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(&converter.to_nodes(text))?)
    } else {
        Ok(converter.to_serialized(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdtree_parser::ParserConfig;

    #[test]
    fn pretty_and_compact_agree() {
        let converter = Converter::new(ParserConfig::default()).unwrap();
        let compact = render(&converter, "# Title\n\n$x$", false).unwrap();
        let pretty = render(&converter, "# Title\n\n$x$", true).unwrap();

        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));
        assert_eq!(
            mdtree_parser::from_serialized(&compact).unwrap(),
            mdtree_parser::from_serialized(&pretty).unwrap()
        );
    }
}
