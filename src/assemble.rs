//! Wraps generated declarations in the fixed header/source templates.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::codegen::Declarations;
use crate::config::Prefix;

const HEADER_INTRO: &str = include_str!("../templates/header_intro.h");
const HEADER_OUTRO: &str = include_str!("../templates/header_outro.h");
const SOURCE_INTRO: &str = include_str!("../templates/source_intro.c");
const SOURCE_OUTRO: &str = include_str!("../templates/source_outro.c");

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(Prefix|PREFIX|INPUT)\]\]").unwrap());

/// Replace `[[Prefix]]`, `[[PREFIX]]` and `[[INPUT]]`. Anything else in
/// double brackets is left as written.
pub fn substitute(template: &str, prefix: &Prefix, input: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "Prefix" => prefix.camel().to_string(),
            "PREFIX" => prefix.upper().to_string(),
            _ => input.to_string(),
        })
        .into_owned()
}

pub fn header(decls: &Declarations, prefix: &Prefix, input: &str) -> String {
    let mut out = substitute(HEADER_INTRO, prefix, input);
    out.push_str(&decls.h_types);
    out.push_str(&substitute(HEADER_OUTRO, prefix, input));
    out
}

pub fn source(decls: &Declarations, prefix: &Prefix, input: &str) -> String {
    let mut out = substitute(SOURCE_INTRO, prefix, input);
    out.push_str(&decls.c_structors);
    out.push('\n');
    out.push_str(&decls.c_schema);
    out.push_str(&substitute(SOURCE_OUTRO, prefix, input));
    out
}
