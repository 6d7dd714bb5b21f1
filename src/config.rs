//! Run-wide settings: identifier prefix and diagnostic channels.
use bitflags::bitflags;
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_PREFIX: &str = "Oc";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// True when `s` can be spliced into a C identifier as-is.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

bitflags! {
    /// Diagnostic channels selected with `-f`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceFlags: u32 {
        /// echo the template markup with implied types added
        const DOCUMENT = 1 << 0;
        /// show each document node as it is classified
        const DOCUMENT_SCHEMA = 1 << 1;
        /// show each schema node as it is attached to its parent
        const CONFIG_SCHEMA = 1 << 2;
        /// general debug trace, routed through `tracing`
        const DEBUG = 1 << 3;
    }
}

impl Default for TraceFlags {
    fn default() -> Self {
        TraceFlags::DOCUMENT
    }
}

impl TraceFlags {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let bits = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid print flags \"{raw}\", expected a decimal bitmask"))?;
        TraceFlags::from_bits(bits).ok_or_else(|| {
            format!(
                "invalid print flags {bits}, known bits are {}",
                TraceFlags::all().bits()
            )
        })
    }
}

/// Identifier prefix in both of the forms the templates use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    camel: String,
    upper: String,
}

impl Prefix {
    pub fn new(camel: impl Into<String>) -> Result<Self, String> {
        let camel = camel.into();
        if !is_identifier(&camel) {
            return Err(format!("prefix \"{camel}\" is not a valid identifier"));
        }
        let upper = camel.to_uppercase();
        Ok(Self { camel, upper })
    }

    /// As given, e.g. `Oc` in `OcConfigurationInit`.
    pub fn camel(&self) -> &str {
        &self.camel
    }

    /// Uppercased, e.g. `OC` in `OC_GLOBAL_CONFIG`.
    pub fn upper(&self) -> &str {
        &self.upper
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Self {
            camel: DEFAULT_PREFIX.to_string(),
            upper: DEFAULT_PREFIX.to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    pub prefix: Prefix,
    pub trace: TraceFlags,
}
