//! Every failure the generator can detect. All of them are fatal.
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ---- template document shape ----
    #[error("No template for <array>")]
    EmptyArray,

    #[error("No elements in {0}")]
    EmptyDict(String),

    #[error("Number of nodes in {0} must be even")]
    OddDict(String),

    #[error("<key> required as {position} element of <{parent}>")]
    MissingKey { parent: String, position: &'static str },

    #[error("<key> used in a struct template cannot be empty, its contents are used as the field name")]
    EmptyKey,

    #[error("<key>{0}</key> found where a value was expected")]
    KeyAsValue(String),

    #[error("Invalid contents for <plist>: expected exactly one child, found {0}")]
    InvalidPlist(usize),

    #[error("Unhandled tag: <{0}>")]
    UnhandledTag(String),

    #[error("Unknown value of attribute type=\"{0}\" in <dict>")]
    UnknownDictType(String),

    // ---- <data> attributes ----
    #[error("size attribute not valid with type=\"blob\"")]
    SizedOpaqueBlob,

    #[error("Unknown data type=\"{0}\" in <data>")]
    UnknownDataType(String),

    #[error("Invalid size=\"{0}\" in <data>, expected a positive integer")]
    InvalidSize(String),

    #[error("Invalid base64 content in <data>: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    // ---- naming ----
    #[error("Duplicate field \"{0}\" in struct")]
    DuplicateField(String),

    #[error("Generated identifier {0} is produced by more than one node")]
    DuplicateIdentifier(String),

    #[error("\"{0}\" cannot be used as an identifier segment")]
    InvalidSegment(String),

    #[error("Root of the template must be a <dict> describing the configuration struct")]
    RootNotStruct,

    // ---- command line ----
    #[error("{0}")]
    Usage(String),

    // ---- reading ----
    #[error("Cannot parse template {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    // ---- builder invariants ----
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Internal errors point at a bug in the generator rather than at the input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }
}
