//! Schema tree builder: lowers the template document into schema IR.
//!
//! One depth-first pass. Structural rules for a container are checked before
//! any of its children are visited, and each array/map is declared through
//! the [`Emitter`] as soon as its subtree is complete.
use crate::config::{GeneratorConfig, is_identifier};
use crate::codegen::{Declarations, Emitter};
use crate::document::DocNode;
use crate::error::{Error, Result};
use crate::inference::infer_scalar;
use crate::ir::{Array, Field, IdSuffix, KeyNode, Map, Path, Role, SchemaNode, Struct};
use crate::trace::Trace;

/// Result of a complete run over one template.
#[derive(Debug)]
pub struct Lowered {
    pub root: Struct,
    pub declarations: Declarations,
}

/// Lower a whole template. The document must describe a struct at its root,
/// which becomes the global configuration type.
pub fn lower_document(doc: &DocNode, config: &GeneratorConfig, trace: &mut Trace) -> Result<Lowered> {
    let mut emitter = Emitter::new(&config.prefix);
    let root = {
        let mut lower = Lower { emitter: &mut emitter, trace: &mut *trace };
        lower.node(doc, &Path::root(), Role::Root, 0)?
    };
    let SchemaNode::Struct(root) = root else {
        return Err(Error::RootNotStruct);
    };
    emitter.declare_root(&root)?;
    trace.flush()?;
    Ok(Lowered { root, declarations: emitter.finish() })
}

struct Lower<'a> {
    emitter: &'a mut Emitter,
    trace: &'a mut Trace,
}

impl Lower<'_> {
    /// Dispatch on the element tag. `depth` only drives echo indentation.
    fn node(&mut self, node: &DocNode, path: &Path, role: Role, depth: usize) -> Result<SchemaNode> {
        tracing::trace!(tag = %node.tag, path = ?path.segments(), ?role, "visit");
        match node.tag.as_str() {
            "key" => self.key(node, depth).map(SchemaNode::Key),
            "array" => self.array(node, path, role, depth),
            "dict" => match node.attr("type") {
                Some("map") => self.map(node, path, role, depth),
                Some(other) => Err(Error::UnknownDictType(other.to_string())),
                None => self.fields(node, path, role, depth),
            },
            "plist" => self.plist(node, path, role, depth),
            _ => {
                let Some(scalar) = infer_scalar(node)? else {
                    return Err(Error::UnhandledTag(node.tag.clone()));
                };
                self.echo_leaf(node, &scalar, depth)?;
                self.trace.document_schema(&scalar)?;
                Ok(scalar)
            }
        }
    }

    /// Like [`Lower::node`] but for positions where a `<key>` is not allowed.
    fn value(&mut self, node: &DocNode, path: &Path, role: Role, depth: usize) -> Result<SchemaNode> {
        match self.node(node, path, role, depth)? {
            SchemaNode::Key(key) => Err(Error::KeyAsValue(key.text.unwrap_or_default())),
            value => Ok(value),
        }
    }

    fn key(&mut self, node: &DocNode, depth: usize) -> Result<KeyNode> {
        let key = KeyNode {
            text: node.text.clone(),
            path: node.attr("path").map(str::to_string),
        };
        match &key.path {
            Some(p) => self.trace.document(depth, format_args!(
                "<key path=\"{p}\">{}</key>",
                key.text.as_deref().unwrap_or_default()
            ))?,
            None => self.echo_open_close(node, depth)?,
        }
        self.trace.document_schema(&SchemaNode::Key(key.clone()))?;
        Ok(key)
    }

    fn plist(&mut self, node: &DocNode, path: &Path, role: Role, depth: usize) -> Result<SchemaNode> {
        self.trace.document(depth, format_args!("<{}>", node.tag))?;
        let [child] = node.children.as_slice() else {
            return Err(Error::InvalidPlist(node.children.len()));
        };
        // the root tag contributes no schema and no indentation
        let schema = self.value(child, path, role, depth)?;
        self.trace.document(depth, format_args!("</{}>", node.tag))?;
        Ok(schema)
    }

    fn array(&mut self, node: &DocNode, path: &Path, role: Role, depth: usize) -> Result<SchemaNode> {
        self.trace.document(depth, "<array>")?;
        let Some(template) = node.children.first() else {
            return Err(Error::EmptyArray);
        };
        let element = self.value(template, &content_path(path, role), Role::ArrayElement, depth + 1)?;
        self.trace.config_schema(None, &element)?;
        self.echo_skipped(node.children.len() - 1, depth)?;
        self.trace.document(depth, "</array>")?;

        let suffix = match role {
            Role::MapValue | Role::ArrayElement => IdSuffix::Entry,
            Role::Root | Role::Field => IdSuffix::Array,
        };
        let array = Array {
            id: self.emitter.assign_id(path, suffix)?,
            element: Box::new(element),
        };
        self.emitter.declare_array(&array)?;
        Ok(SchemaNode::Array(array))
    }

    fn map(&mut self, node: &DocNode, path: &Path, role: Role, depth: usize) -> Result<SchemaNode> {
        let pairs = self.open_dict(node, "<dict type=\"map\">", depth)?;
        let [key_elem, value_elem, ..] = node.children.as_slice() else {
            return Err(Error::EmptyDict("<dict type=\"map\">".to_string()));
        };
        if key_elem.tag != "key" {
            return Err(Error::MissingKey { parent: node.tag.clone(), position: "first" });
        }
        let key = self.key(key_elem, depth + 1)?;
        let base = content_path(path, role);
        // map keys are example data; only an explicit path names the value
        let value_path = match key.path.as_deref() {
            Some(segment) => base.join(checked_segment(segment)?),
            None => base.clone(),
        };
        let value = self.value(value_elem, &value_path, Role::MapValue, depth + 1)?;
        self.trace.config_schema(None, &value)?;
        self.echo_skipped(pairs - 1, depth)?;
        self.trace.document(depth, "</dict>")?;

        if let SchemaNode::Blob(_) = value {
            tracing::debug!(path = ?path.segments(), ?role, "map of data collapsed to associative blob");
            return Ok(SchemaNode::AssociativeBlob);
        }
        let map = Map {
            id: self.emitter.assign_id(&base, IdSuffix::Map)?,
            value: Box::new(value),
        };
        self.emitter.declare_map(&map)?;
        Ok(SchemaNode::Map(map))
    }

    fn fields(&mut self, node: &DocNode, path: &Path, role: Role, depth: usize) -> Result<SchemaNode> {
        self.open_dict(node, "<dict>", depth)?;
        // every pair must start with a key before any value is looked at
        for (index, pair) in node.children.chunks(2).enumerate() {
            if pair[0].tag != "key" {
                return Err(Error::MissingKey {
                    parent: node.tag.clone(),
                    position: if index == 0 { "first" } else { "every even" },
                });
            }
        }

        let mut fields: Vec<Field> = Vec::with_capacity(node.children.len() / 2);
        for pair in node.children.chunks(2) {
            let key = self.key(&pair[0], depth + 1)?;
            let name = match key.text.as_deref() {
                Some(text) if !text.trim().is_empty() => checked_segment(text.trim())?.to_string(),
                _ => return Err(Error::EmptyKey),
            };
            if fields.iter().any(|f| f.name == name) {
                return Err(Error::DuplicateField(name));
            }
            let segment = match key.path.as_deref() {
                Some(segment) => checked_segment(segment)?,
                None => name.as_str(),
            };
            if role == Role::Root {
                self.emitter.section(&name);
            }
            let field_path = path.join(segment);
            let value = self.value(&pair[1], &field_path, Role::Field, depth + 1)?;
            self.trace.config_schema(Some(&name), &value)?;
            fields.push(Field { name, node: value });
        }
        self.trace.document(depth, "</dict>")?;

        let st = Struct { path: path.clone(), role, fields };
        self.emitter.declare_struct(&st)?;
        Ok(SchemaNode::Struct(st))
    }

    /// Echo the opening tag and check the child count. Returns the number of pairs.
    fn open_dict(&mut self, node: &DocNode, display: &str, depth: usize) -> Result<usize> {
        self.trace.document(depth, display)?;
        let count = node.children.len();
        if count == 0 {
            return Err(Error::EmptyDict(display.to_string()));
        }
        if count % 2 != 0 {
            return Err(Error::OddDict(display.to_string()));
        }
        Ok(count / 2)
    }

    // ---- markup echo ----

    fn echo_leaf(&mut self, node: &DocNode, scalar: &SchemaNode, depth: usize) -> Result<()> {
        match scalar {
            SchemaNode::Blob(blob) => {
                let size = blob.size.map(|s| format!(" size=\"{s}\"")).unwrap_or_default();
                let value = blob.value.as_deref().unwrap_or("[None]");
                self.trace.document(depth, format_args!(
                    "<{0} type=\"{1}\"{size}>{value}</{0}>",
                    node.tag,
                    blob.data_type.as_attr()
                ))?;
            }
            _ => self.echo_open_close(node, depth)?,
        }
        Ok(())
    }

    fn echo_open_close(&mut self, node: &DocNode, depth: usize) -> Result<()> {
        match &node.text {
            Some(text) => self.trace.document(depth, format_args!("<{0}>{text}</{0}>", node.tag))?,
            None => self.trace.document(depth, format_args!("<{}/>", node.tag))?,
        }
        Ok(())
    }

    fn echo_skipped(&mut self, skipped: usize, depth: usize) -> Result<()> {
        if skipped > 0 {
            let plural = if skipped == 1 { "" } else { "s" };
            self.trace.document(depth + 1, format_args!("(skipping {skipped} item{plural})"))?;
        }
        Ok(())
    }
}

/// Base path for the contents of an array or map. A composite that is itself
/// an element or map value steps one segment deeper, so it never shares a
/// name with its container.
fn content_path(path: &Path, role: Role) -> Path {
    match role {
        Role::ArrayElement | Role::MapValue => path.join("Entry"),
        Role::Root | Role::Field => path.clone(),
    }
}

/// Path segments and field names end up inside C identifiers.
fn checked_segment(segment: &str) -> Result<&str> {
    if is_identifier(segment) {
        Ok(segment)
    } else {
        Err(Error::InvalidSegment(segment.to_string()))
    }
}

// ------------------------------- Tests ------------------------------------ //
