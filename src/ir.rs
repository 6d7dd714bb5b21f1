// Strongly-typed schema IR for codegen. No document nodes here.
use serde::Serialize;

/// Field-name segments from the root down to a node.
///
/// Appending returns a new path, so sibling subtrees never share one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// `DeviceProperties/Add` → `DEVICEPROPERTIES_ADD`
    pub fn upper_stem(&self) -> String {
        self.0
            .iter()
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// `DeviceProperties/Add` → `DevicePropertiesAdd`
    pub fn camel_stem(&self) -> String {
        self.0.concat()
    }
}

/// Where a node sits relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Root,
    Field,
    ArrayElement,
    MapValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdSuffix {
    Array,
    Entry,
    Map,
}

impl IdSuffix {
    pub fn upper(self) -> &'static str {
        match self {
            IdSuffix::Array => "ARRAY",
            IdSuffix::Entry => "ENTRY",
            IdSuffix::Map => "MAP",
        }
    }

    pub fn camel(self) -> &'static str {
        match self {
            IdSuffix::Array => "Array",
            IdSuffix::Entry => "Entry",
            IdSuffix::Map => "Map",
        }
    }
}

/// Name of an array or map declaration, fixed when the node is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedId {
    pub name: String,
    pub path: Path,
    pub suffix: IdSuffix,
}

impl GeneratedId {
    pub fn new(upper_prefix: &str, path: &Path, suffix: IdSuffix) -> Self {
        let name = if path.is_root() {
            format!("{upper_prefix}_{}", suffix.upper())
        } else {
            format!("{upper_prefix}_{}_{}", path.upper_stem(), suffix.upper())
        };
        Self { name, path: path.clone(), suffix }
    }
}

/// Scalar representation chosen for a `<data>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Blob,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
}

impl DataType {
    pub fn from_attr(raw: &str) -> Option<Self> {
        Some(match raw {
            "blob" => DataType::Blob,
            "uint8" => DataType::Uint8,
            "uint16" => DataType::Uint16,
            "uint32" => DataType::Uint32,
            "uint64" => DataType::Uint64,
            "int8" => DataType::Int8,
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            _ => return None,
        })
    }

    pub fn as_attr(self) -> &'static str {
        match self {
            DataType::Blob => "blob",
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
        }
    }

    /// C scalar type; `None` for the opaque blob.
    pub fn c_type(self) -> Option<&'static str> {
        match self {
            DataType::Blob => None,
            DataType::Uint8 => Some("UINT8"),
            DataType::Uint16 => Some("UINT16"),
            DataType::Uint32 => Some("UINT32"),
            DataType::Uint64 => Some("UINT64"),
            DataType::Int8 => Some("INT8"),
            DataType::Int16 => Some("INT16"),
            DataType::Int32 => Some("INT32"),
            DataType::Int64 => Some("INT64"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyNode {
    pub text: Option<String>,
    /// explicit `path="..."` override
    pub path: Option<String>,
}

impl KeyNode {
    /// Segment this key contributes to a struct field's path.
    pub fn segment(&self) -> Option<&str> {
        self.path.as_deref().or(self.text.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blob {
    pub data_type: DataType,
    pub size: Option<usize>,
    /// `0x…` rendering of the example bytes, diagnostics only
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub node: SchemaNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Struct {
    pub path: Path,
    pub role: Role,
    pub fields: Vec<Field>, // document order
}

impl Struct {
    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.node)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Array {
    pub id: GeneratedId,
    pub element: Box<SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Map {
    pub id: GeneratedId,
    pub value: Box<SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum SchemaNode {
    Key(KeyNode),
    Boolean { value: String },
    Integer32 { value: Option<String> },
    String { value: Option<String> },
    Blob(Blob),
    AssociativeBlob,
    Struct(Struct),
    Array(Array),
    Map(Map),
}

impl SchemaNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Key(_) => "key",
            SchemaNode::Boolean { .. } => "bool",
            SchemaNode::Integer32 { .. } => "integer",
            SchemaNode::String { .. } => "string",
            SchemaNode::Blob(_) => "data",
            SchemaNode::AssociativeBlob => "assoc",
            SchemaNode::Struct(_) => "struct",
            SchemaNode::Array(_) => "array",
            SchemaNode::Map(_) => "map",
        }
    }

    pub fn generated_id(&self) -> Option<&GeneratedId> {
        match self {
            SchemaNode::Array(a) => Some(&a.id),
            SchemaNode::Map(m) => Some(&m.id),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            SchemaNode::Key(k) => k.text.as_deref(),
            SchemaNode::Boolean { value } => Some(value),
            SchemaNode::Integer32 { value } | SchemaNode::String { value } => value.as_deref(),
            SchemaNode::Blob(b) => b.value.as_deref(),
            _ => None,
        }
    }
}
