//! Template document reader: XML text into an owned, ordered node tree.
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// One element of the template. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocNode {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<DocNode>,
}

impl DocNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

pub fn read_document(path: &Path) -> Result<DocNode> {
    let source = std::fs::read_to_string(path)?;
    parse_document(&source).map_err(|source| Error::Document {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_document(source: &str) -> std::result::Result<DocNode, roxmltree::Error> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(source, options)?;
    Ok(convert(doc.root_element()))
}

fn convert(node: roxmltree::Node<'_, '_>) -> DocNode {
    let attributes = node
        .attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect();
    let children = node
        .children()
        .filter(|c| c.is_element())
        .map(convert)
        .collect();
    DocNode {
        tag: node.tag_name().name().to_string(),
        attributes,
        text: node.text().map(str::to_string),
        children,
    }
}
