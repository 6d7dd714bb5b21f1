//! Declaration emitter.
//!
//! Produces three buffers while the schema tree is built bottom-up:
//! - header declarations (`#define <ID>_FIELDS` X-macro blocks),
//! - C structor instantiations,
//! - C serialization schema tables.
//!
//! A composite is declared once, when it is complete, so every identifier a
//! declaration refers to has already been written above it.
use indexmap::IndexSet;

use crate::config::Prefix;
use crate::error::{Error, Result};
use crate::ir::{Array, GeneratedId, IdSuffix, Map, Path, Role, SchemaNode, Struct};

pub const ROOT_SCHEMA_TABLE: &str = "mRootConfigurationNodes";
pub const ROOT_SCHEMA_INFO: &str = "mRootConfigurationInfo";

/// Generated text, ready for the template assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub h_types: String,
    pub c_structors: String,
    pub c_schema: String,
    /// declared array/map identifiers, in declaration order
    pub identifiers: Vec<String>,
}

pub struct Emitter {
    upper_prefix: String,
    assigned: IndexSet<String>,
    declared: IndexSet<String>,
    /// every `STATIC OC_SCHEMA` symbol written so far
    tables: IndexSet<String>,
    out: Declarations,
}

/// How a composite's element is spelled inside its declaration.
enum ElementRef<'a> {
    Named(String),
    Inline(&'a Struct),
}

impl Emitter {
    pub fn new(prefix: &Prefix) -> Self {
        Self {
            upper_prefix: prefix.upper().to_string(),
            assigned: IndexSet::new(),
            declared: IndexSet::new(),
            tables: IndexSet::new(),
            out: Declarations::default(),
        }
    }

    pub fn global_config(&self) -> String {
        format!("{}_GLOBAL_CONFIG", self.upper_prefix)
    }

    /// Assign the identifier for an array or map at `path`. Two nodes that
    /// stringify to the same name are rejected.
    pub fn assign_id(&mut self, path: &Path, suffix: IdSuffix) -> Result<GeneratedId> {
        let id = GeneratedId::new(&self.upper_prefix, path, suffix);
        if id.name == self.global_config() || !self.assigned.insert(id.name.clone()) {
            return Err(Error::DuplicateIdentifier(id.name));
        }
        tracing::debug!(id = %id.name, "assigned identifier");
        Ok(id)
    }

    /// Label the declarations that follow with a top-level key.
    pub fn section(&mut self, name: &str) {
        self.out.h_types.push_str(&format!("//\n// {name} section\n//\n\n"));
    }

    pub fn declare_array(&mut self, array: &Array) -> Result<()> {
        let body = match self.element_ref(&array.element)? {
            ElementRef::Named(ty) => vec![format!("  OC_ARRAY ({ty}, _, __)")],
            ElementRef::Inline(entry) => {
                let mut lines = vec!["  OC_ENTRY_ARRAY (_, __,".to_string()];
                lines.extend(self.field_lines(entry, 4)?);
                lines.push("  )".to_string());
                lines
            }
        };
        let descriptor = self.schema_entry(None, &array.element)?;
        self.declare(&array.id, body, descriptor)
    }

    pub fn declare_map(&mut self, map: &Map) -> Result<()> {
        let body = match self.element_ref(&map.value)? {
            ElementRef::Named(ty) => vec![format!("  OC_MAP (OC_STRING, {ty}, _, __)")],
            ElementRef::Inline(entry) => {
                let mut lines = vec!["  OC_ENTRY_MAP (OC_STRING, _, __,".to_string()];
                lines.extend(self.field_lines(entry, 4)?);
                lines.push("  )".to_string());
                lines
            }
        };
        let descriptor = self.schema_entry(None, &map.value)?;
        self.declare(&map.id, body, descriptor)
    }

    /// Write the serialization table for a struct. Entries are sorted by key
    /// because the table is binary searched at load time.
    pub fn declare_struct(&mut self, st: &Struct) -> Result<()> {
        let mut fields: Vec<_> = st.fields.iter().collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        let table = self.claim_table(struct_table(st))?;
        let mut text = format!("STATIC OC_SCHEMA {table}[] = {{\n");
        for field in fields {
            text.push_str(&format!("  {},\n", self.schema_entry(Some(&field.name), &field.node)?));
        }
        text.push_str("};\n\n");
        self.out.c_schema.push_str(&text);
        Ok(())
    }

    /// The root struct becomes the global configuration type and closes all three buffers.
    pub fn declare_root(&mut self, root: &Struct) -> Result<()> {
        let name = self.global_config();
        let body = self.field_lines(root, 2)?;
        self.push_fields_macro(&name, &body);
        self.out.c_structors.push_str(&format!("OC_STRUCTORS ({name}, ())\n"));
        self.out.c_schema.push_str(&format!(
            "STATIC OC_SCHEMA_INFO {ROOT_SCHEMA_INFO} = {{\n  .Dict = {{ {ROOT_SCHEMA_TABLE}, ARRAY_SIZE ({ROOT_SCHEMA_TABLE}) }}\n}};\n"
        ));
        Ok(())
    }

    pub fn finish(mut self) -> Declarations {
        self.out.identifiers = self.declared.into_iter().collect();
        self.out
    }

    fn declare(&mut self, id: &GeneratedId, body: Vec<String>, descriptor: String) -> Result<()> {
        if !self.assigned.contains(&id.name) {
            return Err(Error::internal(format!("{} declared without being assigned", id.name)));
        }
        if !self.declared.insert(id.name.clone()) {
            return Err(Error::internal(format!("{} declared more than once", id.name)));
        }
        let table = self.claim_table(composite_table(id))?;
        self.push_fields_macro(&id.name, &body);
        self.out.c_structors.push_str(&format!("OC_STRUCTORS ({}, ())\n", id.name));
        self.out.c_schema.push_str(&format!("STATIC OC_SCHEMA {table} = {descriptor};\n\n"));
        tracing::debug!(id = %id.name, "declared");
        Ok(())
    }

    /// Schema symbols join camel-cased segments with no separator, so distinct
    /// paths can still spell the same symbol.
    fn claim_table(&mut self, table: String) -> Result<String> {
        if !self.tables.insert(table.clone()) {
            return Err(Error::DuplicateIdentifier(table));
        }
        Ok(table)
    }

    fn push_fields_macro(&mut self, name: &str, body: &[String]) {
        let h = &mut self.out.h_types;
        h.push_str(&format!("#define {name}_FIELDS(_, __) \\\n"));
        h.push_str(&body.join(" \\\n"));
        h.push_str(&format!("\n  OC_DECLARE ({name})\n\n"));
    }

    fn require_declared<'a>(&self, id: &'a GeneratedId) -> Result<&'a str> {
        if self.declared.contains(&id.name) {
            Ok(&id.name)
        } else {
            Err(Error::internal(format!("reference to undeclared identifier {}", id.name)))
        }
    }

    fn element_ref<'a>(&self, node: &'a SchemaNode) -> Result<ElementRef<'a>> {
        Ok(match node {
            SchemaNode::Struct(st) => ElementRef::Inline(st),
            // a fixed-size byte array cannot be an element type
            SchemaNode::Blob(blob) if blob.size.is_some() => ElementRef::Named("OC_DATA".to_string()),
            other => ElementRef::Named(self.field_parts(other)?.ty),
        })
    }

    fn field_lines(&self, st: &Struct, indent: usize) -> Result<Vec<String>> {
        let pad = " ".repeat(indent);
        let mut lines = Vec::new();
        for field in &st.fields {
            if let SchemaNode::Struct(inner) = &field.node {
                lines.push(format!("{pad}OC_STRUCT ({}, _, __,", field.name));
                lines.extend(self.field_lines(inner, indent + 2)?);
                lines.push(format!("{pad})"));
                continue;
            }
            let FieldParts { ty, suffix, constructor, destructor } = self.field_parts(&field.node)?;
            let suffix = if suffix.is_empty() { suffix } else { format!("{suffix} ") };
            lines.push(format!(
                "{pad}_({ty} , {} , {suffix}, {constructor} , {destructor})",
                field.name
            ));
        }
        Ok(lines)
    }

    fn field_parts(&self, node: &SchemaNode) -> Result<FieldParts> {
        Ok(match node {
            SchemaNode::Boolean { .. } => FieldParts::plain("BOOLEAN", "FALSE"),
            SchemaNode::Integer32 { .. } => FieldParts::plain("UINT32", "0"),
            SchemaNode::String { .. } => FieldParts::owned(
                "OC_STRING",
                "OC_STRING_CONSTR (\"\", _, __)".to_string(),
            ),
            SchemaNode::Blob(blob) => match (blob.data_type.c_type(), blob.size) {
                (None, _) => FieldParts::owned("OC_DATA", "OC_EDATA_CONSTR (_, __)".to_string()),
                (Some(ty), Some(size)) => FieldParts {
                    ty: ty.to_string(),
                    suffix: format!("[{size}]"),
                    constructor: "{0}".to_string(),
                    destructor: "()".to_string(),
                },
                (Some(ty), None) => FieldParts::plain(ty, "0"),
            },
            SchemaNode::AssociativeBlob => {
                FieldParts::owned("OC_ASSOC", "OC_CONSTR (OC_ASSOC, _, __)".to_string())
            }
            SchemaNode::Array(Array { id, .. }) | SchemaNode::Map(Map { id, .. }) => {
                let name = self.require_declared(id)?;
                FieldParts::owned(name, format!("OC_CONSTR ({name}, _, __)"))
            }
            SchemaNode::Struct(_) => {
                return Err(Error::internal("inline struct rendered as a plain field"));
            }
            SchemaNode::Key(key) => {
                return Err(Error::internal(format!(
                    "key {:?} reached the declaration emitter",
                    key.text
                )));
            }
        })
    }

    fn schema_entry(&self, name: Option<&str>, node: &SchemaNode) -> Result<String> {
        let key = name.map_or_else(|| "NULL".to_string(), |n| format!("\"{n}\""));
        Ok(match node {
            SchemaNode::Boolean { .. } => format!("OC_SCHEMA_BOOLEAN ({key})"),
            SchemaNode::Integer32 { .. } => format!("OC_SCHEMA_INTEGER ({key}, UINT32)"),
            SchemaNode::String { .. } => format!("OC_SCHEMA_STRING ({key})"),
            SchemaNode::Blob(blob) => match (blob.data_type.c_type(), blob.size) {
                (None, _) => format!("OC_SCHEMA_DATA ({key})"),
                // stored as OC_DATA in element position, see element_ref
                (Some(_), Some(_)) if name.is_none() => format!("OC_SCHEMA_DATA ({key})"),
                (Some(ty), Some(size)) => format!("OC_SCHEMA_DATAF ({key}, {ty}, {size})"),
                (Some(ty), None) => format!("OC_SCHEMA_INTEGER ({key}, {ty})"),
            },
            SchemaNode::AssociativeBlob => format!("OC_SCHEMA_ASSOC ({key})"),
            SchemaNode::Struct(st) => format!("OC_SCHEMA_DICT ({key}, {})", struct_table(st)),
            SchemaNode::Array(array) => {
                self.require_declared(&array.id)?;
                format!("OC_SCHEMA_ARRAY ({key}, &{})", composite_table(&array.id))
            }
            SchemaNode::Map(map) => {
                self.require_declared(&map.id)?;
                format!("OC_SCHEMA_MAP ({key}, &{})", composite_table(&map.id))
            }
            SchemaNode::Key(_) => {
                return Err(Error::internal("key reached the schema table emitter"));
            }
        })
    }
}

struct FieldParts {
    ty: String,
    suffix: String,
    constructor: String,
    destructor: String,
}

impl FieldParts {
    fn plain(ty: &str, constructor: &str) -> Self {
        Self {
            ty: ty.to_string(),
            suffix: String::new(),
            constructor: constructor.to_string(),
            destructor: "()".to_string(),
        }
    }

    /// Types that own memory and need a destructor.
    fn owned(ty: &str, constructor: String) -> Self {
        Self {
            ty: ty.to_string(),
            suffix: String::new(),
            constructor,
            destructor: format!("OC_DESTR ({ty})"),
        }
    }
}

fn struct_table(st: &Struct) -> String {
    let role = match st.role {
        Role::Root => return ROOT_SCHEMA_TABLE.to_string(),
        Role::Field => "",
        Role::ArrayElement => "EntryFields",
        Role::MapValue => "ValueFields",
    };
    format!("m{}{role}Schema", st.path.camel_stem())
}

fn composite_table(id: &GeneratedId) -> String {
    format!("m{}{}Schema", id.path.camel_stem(), id.suffix.camel())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Blob, DataType, Field};

    fn path(segments: &[&str]) -> Path {
        segments.iter().fold(Path::root(), |p, s| p.join(s))
    }

    fn string_field(name: &str) -> Field {
        Field { name: name.into(), node: SchemaNode::String { value: None } }
    }

    #[test]
    fn array_of_scalars_is_array_style() {
        let mut em = Emitter::new(&Prefix::default());
        let p = path(&["Misc", "Tools"]);
        let id = em.assign_id(&p, IdSuffix::Array).unwrap();
        let array = Array { id, element: Box::new(SchemaNode::String { value: None }) };
        em.declare_array(&array).unwrap();
        let out = em.finish();
        assert_eq!(
            out.h_types,
            "#define OC_MISC_TOOLS_ARRAY_FIELDS(_, __) \\\n  OC_ARRAY (OC_STRING, _, __)\n  OC_DECLARE (OC_MISC_TOOLS_ARRAY)\n\n"
        );
        assert_eq!(out.c_structors, "OC_STRUCTORS (OC_MISC_TOOLS_ARRAY, ())\n");
        assert_eq!(out.c_schema, "STATIC OC_SCHEMA mMiscToolsArraySchema = OC_SCHEMA_STRING (NULL);\n\n");
        assert_eq!(out.identifiers, ["OC_MISC_TOOLS_ARRAY"]);
    }

    #[test]
    fn array_of_structs_is_entry_style_with_inline_fields() {
        let mut em = Emitter::new(&Prefix::default());
        let p = path(&["Items"]);
        let entry = Struct {
            path: p.clone(),
            role: Role::ArrayElement,
            fields: vec![
                Field { name: "Enabled".into(), node: SchemaNode::Boolean { value: "true".into() } },
                Field {
                    name: "Mask".into(),
                    node: SchemaNode::Blob(Blob { data_type: DataType::Uint8, size: Some(16), value: None }),
                },
            ],
        };
        em.declare_struct(&entry).unwrap();
        let id = em.assign_id(&p, IdSuffix::Array).unwrap();
        em.declare_array(&Array { id, element: Box::new(SchemaNode::Struct(entry)) }).unwrap();
        let out = em.finish();
        assert!(out.h_types.contains(
            "  OC_ENTRY_ARRAY (_, __, \\\n    _(BOOLEAN , Enabled , , FALSE , ()) \\\n    _(UINT8 , Mask , [16] , {0} , ()) \\\n  )\n  OC_DECLARE (OC_ITEMS_ARRAY)"
        ), "{}", out.h_types);
        assert!(out.c_schema.contains("OC_SCHEMA_DATAF (\"Mask\", UINT8, 16)"));
        assert!(out.c_schema.contains("mItemsArraySchema = OC_SCHEMA_DICT (NULL, mItemsEntryFieldsSchema)"));
    }

    #[test]
    fn map_of_arrays_references_the_array_identifier() {
        let mut em = Emitter::new(&Prefix::new("Lb").unwrap());
        let p = path(&["Nvram", "Delete"]);
        let entry = em.assign_id(&p, IdSuffix::Entry).unwrap();
        let array = Array { id: entry, element: Box::new(SchemaNode::String { value: None }) };
        em.declare_array(&array).unwrap();
        let id = em.assign_id(&p, IdSuffix::Map).unwrap();
        em.declare_map(&Map { id, value: Box::new(SchemaNode::Array(array)) }).unwrap();
        let out = em.finish();
        assert!(out.h_types.contains("  OC_MAP (OC_STRING, LB_NVRAM_DELETE_ENTRY, _, __)"));
        assert_eq!(out.identifiers, ["LB_NVRAM_DELETE_ENTRY", "LB_NVRAM_DELETE_MAP"]);
        assert!(out.c_schema.contains("mNvramDeleteMapSchema = OC_SCHEMA_ARRAY (NULL, &mNvramDeleteEntrySchema)"));
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let mut em = Emitter::new(&Prefix::default());
        em.assign_id(&path(&["A_B"]), IdSuffix::Array).unwrap();
        let err = em.assign_id(&path(&["A", "B"]), IdSuffix::Array).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier(ref id) if id == "OC_A_B_ARRAY"));
    }

    #[test]
    fn referencing_an_undeclared_child_is_internal() {
        let mut em = Emitter::new(&Prefix::default());
        let child = GeneratedId::new("OC", &path(&["X"]), IdSuffix::Array);
        let inner = Array { id: child, element: Box::new(SchemaNode::AssociativeBlob) };
        let id = em.assign_id(&path(&["X"]), IdSuffix::Map).unwrap();
        let err = em.declare_map(&Map { id, value: Box::new(SchemaNode::Array(inner)) }).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn declaring_twice_is_internal() {
        let mut em = Emitter::new(&Prefix::default());
        let id = em.assign_id(&path(&["X"]), IdSuffix::Array).unwrap();
        let array = Array { id, element: Box::new(SchemaNode::AssociativeBlob) };
        em.declare_array(&array).unwrap();
        assert!(em.declare_array(&array).unwrap_err().is_internal());
    }

    #[test]
    fn schema_tables_are_sorted_but_declarations_keep_document_order() {
        let mut em = Emitter::new(&Prefix::default());
        let root = Struct {
            path: Path::root(),
            role: Role::Root,
            fields: vec![string_field("Zeta"), string_field("Alpha")],
        };
        em.declare_struct(&root).unwrap();
        em.declare_root(&root).unwrap();
        let out = em.finish();
        let alpha = out.c_schema.find("\"Alpha\"").unwrap();
        let zeta = out.c_schema.find("\"Zeta\"").unwrap();
        assert!(alpha < zeta);
        let zeta_h = out.h_types.find(", Zeta ,").unwrap();
        let alpha_h = out.h_types.find(", Alpha ,").unwrap();
        assert!(zeta_h < alpha_h);
        assert!(out.h_types.contains("OC_DECLARE (OC_GLOBAL_CONFIG)"));
        assert!(out.c_schema.ends_with(
            "STATIC OC_SCHEMA_INFO mRootConfigurationInfo = {\n  .Dict = { mRootConfigurationNodes, ARRAY_SIZE (mRootConfigurationNodes) }\n};\n"
        ));
    }

    #[test]
    fn sized_blob_elements_are_described_as_variable_data() {
        let mut em = Emitter::new(&Prefix::default());
        let id = em.assign_id(&path(&["Keys"]), IdSuffix::Array).unwrap();
        let mask = Blob { data_type: DataType::Uint8, size: Some(16), value: None };
        em.declare_array(&Array { id, element: Box::new(SchemaNode::Blob(mask)) }).unwrap();
        let out = em.finish();
        assert!(out.h_types.contains("  OC_ARRAY (OC_DATA, _, __)"));
        assert!(out.c_schema.contains("mKeysArraySchema = OC_SCHEMA_DATA (NULL);"));
        assert!(!out.c_schema.contains("OC_SCHEMA_DATAF"));
    }

    #[test]
    fn struct_tables_and_entry_descriptors_get_distinct_symbols() {
        let mut em = Emitter::new(&Prefix::default());
        let p = path(&["Table"]);
        let entry = Struct {
            path: p.clone(),
            role: Role::ArrayElement,
            fields: vec![Field { name: "A".into(), node: SchemaNode::Boolean { value: "true".into() } }],
        };
        em.declare_struct(&entry).unwrap();
        let id = em.assign_id(&p, IdSuffix::Entry).unwrap();
        em.declare_array(&Array { id, element: Box::new(SchemaNode::Struct(entry)) }).unwrap();
        let out = em.finish();
        assert!(out.c_schema.contains("STATIC OC_SCHEMA mTableEntryFieldsSchema[] = {"));
        assert!(out.c_schema.contains("STATIC OC_SCHEMA mTableEntrySchema = OC_SCHEMA_DICT (NULL, mTableEntryFieldsSchema);"));
    }

    #[test]
    fn schema_symbols_spelled_alike_are_rejected() {
        let mut em = Emitter::new(&Prefix::default());
        let first = Struct { path: path(&["Ab", "C"]), role: Role::Field, fields: vec![string_field("X")] };
        let second = Struct { path: path(&["A", "bC"]), role: Role::Field, fields: vec![string_field("Y")] };
        em.declare_struct(&first).unwrap();
        let err = em.declare_struct(&second).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier(ref table) if table == "mAbCSchema"));
        assert!(!err.is_internal());
    }

    #[test]
    fn nested_structs_render_inline() {
        let mut em = Emitter::new(&Prefix::default());
        let quirks = Struct {
            path: path(&["Acpi", "Quirks"]),
            role: Role::Field,
            fields: vec![Field { name: "ResetHwSig".into(), node: SchemaNode::Boolean { value: "false".into() } }],
        };
        let root = Struct {
            path: Path::root(),
            role: Role::Root,
            fields: vec![Field { name: "Quirks".into(), node: SchemaNode::Struct(quirks) }],
        };
        em.declare_root(&root).unwrap();
        let out = em.finish();
        assert!(out.h_types.contains(
            "  OC_STRUCT (Quirks, _, __, \\\n    _(BOOLEAN , ResetHwSig , , FALSE , ()) \\\n  )"
        ));
    }
}
