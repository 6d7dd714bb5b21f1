//! Scalar type inference for template leaves.
//!
//! Booleans, strings and integers are classified by tag alone. `<data>` is the
//! only element with real inference: explicit `type`/`size` attributes win,
//! and whatever is missing is filled in from the byte length of the example.
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::document::DocNode;
use crate::error::{Error, Result};
use crate::ir::{Blob, DataType, SchemaNode};

// ------------------------------- Scalars ---------------------------------- //

/// Classify a leaf element. `Ok(None)` means the tag is not a scalar.
pub fn infer_scalar(node: &DocNode) -> Result<Option<SchemaNode>> {
    let inferred = match node.tag.as_str() {
        "true" | "false" => SchemaNode::Boolean { value: node.tag.clone() },
        "string" => SchemaNode::String { value: node.text.clone() },
        // always 32 bits, the example magnitude is not consulted
        "integer" => SchemaNode::Integer32 { value: node.text.clone() },
        "data" => SchemaNode::Blob(infer_blob(
            node.attr("type"),
            node.attr("size"),
            node.text.as_deref(),
        )?),
        _ => return Ok(None),
    };
    Ok(Some(inferred))
}

// -------------------------------- Blobs ----------------------------------- //

/// Default representation for `len` bytes of example data, plus the fixed
/// size it implies.
pub fn infer_from_length(len: usize) -> (DataType, Option<usize>) {
    match len {
        2 => (DataType::Uint16, None),
        4 => (DataType::Uint32, None),
        8 => (DataType::Uint64, None),
        1 => (DataType::Uint8, None),
        n => (DataType::Uint8, Some(n)),
    }
}

pub fn infer_blob(type_attr: Option<&str>, size_attr: Option<&str>, text: Option<&str>) -> Result<Blob> {
    let mut data_type = type_attr
        .map(|raw| DataType::from_attr(raw).ok_or_else(|| Error::UnknownDataType(raw.to_string())))
        .transpose()?;
    let mut size = size_attr.map(parse_size).transpose()?;
    let bytes = text.map(decode_literal).transpose()?.flatten();

    if let Some(bytes) = &bytes {
        if data_type.is_none() || size.is_none() {
            let (from_length, size_from_length) = infer_from_length(bytes.len());
            // an opaque blob never picks up a size it was not given
            if size.is_none() && data_type != Some(DataType::Blob) {
                size = size_from_length;
            }
            if data_type.is_none() {
                data_type = Some(from_length);
            }
            tracing::trace!(len = bytes.len(), ?data_type, ?size, "inferred <data> from example");
        }
    }

    let data_type = match (data_type, size) {
        (Some(DataType::Blob), Some(_)) => return Err(Error::SizedOpaqueBlob),
        (Some(t), _) => t,
        (None, Some(_)) => DataType::Uint8,
        (None, None) => DataType::Blob,
    };

    Ok(Blob {
        data_type,
        size,
        value: bytes.as_deref().map(hex_literal),
    })
}

fn parse_size(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::InvalidSize(raw.to_string())),
    }
}

/// Whitespace is insignificant in base64 bodies; an all-whitespace body is no data.
fn decode_literal(text: &str) -> Result<Option<Vec<u8>>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(None);
    }
    Ok(Some(STANDARD.decode(compact)?))
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(bytes: &[u8]) -> Blob {
        infer_blob(None, None, Some(&STANDARD.encode(bytes))).unwrap()
    }

    #[test]
    fn power_of_two_lengths_become_integers() {
        assert_eq!(blob(&[1, 2]).data_type, DataType::Uint16);
        assert_eq!(blob(&[1, 0, 0, 0]).data_type, DataType::Uint32);
        assert_eq!(blob(&[0; 8]).data_type, DataType::Uint64);
        for len in [2, 4, 8] {
            assert_eq!(blob(&vec![0; len]).size, None, "no size for {len} bytes");
        }
    }

    #[test]
    fn single_byte_stays_a_bare_scalar() {
        let b = blob(&[0xff]);
        assert_eq!(b.data_type, DataType::Uint8);
        assert_eq!(b.size, None);
        assert_eq!(b.value.as_deref(), Some("0xff"));
    }

    #[test]
    fn other_lengths_become_sized_byte_arrays() {
        for len in [3, 5, 16, 24] {
            let b = blob(&vec![0; len]);
            assert_eq!(b.data_type, DataType::Uint8);
            assert_eq!(b.size, Some(len));
        }
    }

    #[test]
    fn explicit_attributes_skip_length_inference() {
        let b = infer_blob(Some("uint8"), Some("4"), Some("AAAAAAAAAAA=")).unwrap();
        assert_eq!(b.data_type, DataType::Uint8);
        assert_eq!(b.size, Some(4));

        // type given, size missing: only the size is filled in
        let b = infer_blob(Some("uint8"), None, Some(&STANDARD.encode([0u8; 6]))).unwrap();
        assert_eq!((b.data_type, b.size), (DataType::Uint8, Some(6)));
        let b = infer_blob(Some("int32"), None, Some(&STANDARD.encode([0u8; 4]))).unwrap();
        assert_eq!((b.data_type, b.size), (DataType::Int32, None));
    }

    #[test]
    fn missing_data_falls_back_on_size() {
        assert_eq!(infer_blob(None, None, None).unwrap().data_type, DataType::Blob);
        let b = infer_blob(None, Some("16"), None).unwrap();
        assert_eq!((b.data_type, b.size), (DataType::Uint8, Some(16)));
        assert_eq!(infer_blob(None, None, Some(" \n\t")).unwrap().data_type, DataType::Blob);
    }

    #[test]
    fn opaque_blob_with_size_is_rejected() {
        let err = infer_blob(Some("blob"), Some("4"), None).unwrap_err();
        assert!(matches!(err, Error::SizedOpaqueBlob));
    }

    #[test]
    fn opaque_blob_keeps_no_size_from_data() {
        let b = infer_blob(Some("blob"), None, Some(&STANDARD.encode([0u8; 16]))).unwrap();
        assert_eq!((b.data_type, b.size), (DataType::Blob, None));
    }

    #[test]
    fn bad_attributes_and_payloads_are_errors() {
        assert!(matches!(infer_blob(Some("float"), None, None), Err(Error::UnknownDataType(_))));
        assert!(matches!(infer_blob(None, Some("0"), None), Err(Error::InvalidSize(_))));
        assert!(matches!(infer_blob(None, Some("four"), None), Err(Error::InvalidSize(_))));
        assert!(matches!(infer_blob(None, None, Some("!!!")), Err(Error::InvalidBase64(_))));
    }

    #[test]
    fn base64_bodies_may_wrap_lines() {
        let b = infer_blob(None, None, Some("AAAA\n\t\tAAAA\n")).unwrap();
        assert_eq!((b.data_type, b.size), (DataType::Uint8, Some(6)));
    }

    #[test]
    fn scalar_tags_are_classified_without_parsing_values() {
        let node = |tag: &str, text: Option<&str>| DocNode {
            tag: tag.into(),
            attributes: Default::default(),
            text: text.map(str::to_string),
            children: vec![],
        };
        assert_eq!(
            infer_scalar(&node("false", None)).unwrap(),
            Some(SchemaNode::Boolean { value: "false".into() })
        );
        assert_eq!(
            infer_scalar(&node("integer", Some("99999999999"))).unwrap(),
            Some(SchemaNode::Integer32 { value: Some("99999999999".into()) })
        );
        assert_eq!(
            infer_scalar(&node("string", None)).unwrap(),
            Some(SchemaNode::String { value: None })
        );
        assert_eq!(infer_scalar(&node("dict", None)).unwrap(), None);
    }
}
