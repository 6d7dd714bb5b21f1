//! Diagnostic channels written while the template is walked.
//!
//! Three channels are plain text on the diagnostic sink (`-o`); the fourth,
//! general debug output, goes through `tracing` and is enabled by the log
//! filter set up in `main`.
use std::fmt::Display;
use std::io::{self, Write};

use crate::config::TraceFlags;
use crate::ir::{DataType, SchemaNode};

pub struct Trace {
    channels: TraceFlags,
    out: Box<dyn Write>,
}

impl Trace {
    pub fn new(channels: TraceFlags, out: Box<dyn Write>) -> Self {
        Self { channels, out }
    }

    /// All channels off.
    pub fn discard() -> Self {
        Self::new(TraceFlags::empty(), Box::new(io::sink()))
    }

    pub fn enabled(&self, channel: TraceFlags) -> bool {
        self.channels.intersects(channel)
    }

    /// One line of the markup echo, indented `depth` tabs.
    pub fn document(&mut self, depth: usize, line: impl Display) -> io::Result<()> {
        if !self.enabled(TraceFlags::DOCUMENT) {
            return Ok(());
        }
        writeln!(self.out, "{}{line}", "\t".repeat(depth))
    }

    /// A leaf of the document as it was classified.
    pub fn document_schema(&mut self, node: &SchemaNode) -> io::Result<()> {
        if !self.enabled(TraceFlags::DOCUMENT_SCHEMA) {
            return Ok(());
        }
        let mut line = format!("[plist:{}", node.kind_name());
        if let SchemaNode::Blob(blob) = node {
            push_attr(&mut line, "data_type", Some(blob.data_type.as_attr()));
            push_attr(&mut line, "data_size", blob.size.map(|s| s.to_string()).as_deref());
        }
        push_attr(&mut line, "value", node.value());
        line.push(']');
        writeln!(self.out, "{line}")
    }

    /// A schema node at the point it is attached to its parent.
    pub fn config_schema(&mut self, name: Option<&str>, node: &SchemaNode) -> io::Result<()> {
        if !self.enabled(TraceFlags::CONFIG_SCHEMA) {
            return Ok(());
        }
        let mut line = format!("[schema:{}", schema_label(node));
        push_attr(&mut line, "name", name);
        push_attr(&mut line, "id", node.generated_id().map(|id| id.name.as_str()));
        match node {
            SchemaNode::Blob(blob) => {
                push_attr(&mut line, "size", blob.size.map(|s| s.to_string()).as_deref());
            }
            SchemaNode::Struct(st) => {
                push_attr(&mut line, "of", Some(format!("fields[{}]", st.fields.len()).as_str()));
            }
            SchemaNode::Array(array) => {
                push_attr(&mut line, "of", Some(schema_label(&array.element)));
            }
            SchemaNode::Map(map) => {
                push_attr(&mut line, "of", Some(schema_label(&map.value)));
            }
            _ => {}
        }
        push_attr(&mut line, "value", node.value());
        line.push(']');
        writeln!(self.out, "{line}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn push_attr(line: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        line.push_str(&format!(" {name}=\"{value}\""));
    }
}

fn schema_label(node: &SchemaNode) -> &'static str {
    match node {
        SchemaNode::Key(_) => "KEY",
        SchemaNode::Boolean { .. } => "BOOLEAN",
        SchemaNode::Integer32 { .. } => "UINT32",
        SchemaNode::String { .. } => "OC_STRING",
        SchemaNode::Blob(blob) => match blob.data_type {
            DataType::Blob => "OC_DATA",
            other => other.c_type().unwrap_or("OC_DATA"),
        },
        SchemaNode::AssociativeBlob => "OC_ASSOC",
        SchemaNode::Struct(_) => "STRUCT",
        SchemaNode::Array(_) => "ARRAY",
        SchemaNode::Map(_) => "MAP",
    }
}
