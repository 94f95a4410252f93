//! Converts CommonMark text, extended with TeX math, block images and a table of contents, into a
//! tree of document nodes.
//!
//! ```
//! use mdtree_parser::{Converter, NodeKind, ParserConfig};
//!
//! let converter = Converter::new(ParserConfig::default()).unwrap();
//! let nodes = converter.to_nodes("$x^2$");
//! assert_eq!(nodes[0].children[0].kind, NodeKind::MathInline);
//! assert_eq!(nodes[0].children[0].content(), Some("x^2"));
//! ```

pub mod ast;
pub mod config;
mod converter;
pub mod extensions;
pub mod node;
mod raw;

pub use config::{ConfigError, ParserConfig};
pub use converter::{from_serialized, Converter, ConverterBuilder};
pub use node::{Node, NodeKind};
