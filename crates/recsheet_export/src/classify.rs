//! Declared-type classification.
//!
//! Classification looks only at the declared static type text, never at a
//! runtime value, so a field is bucketed before anything is read from it.

use crate::spec::EnumFieldKind;

const TUP_TEXT_TYPES: [&str; 2] = ["String", "str"];
const TUP_NUMERIC_TYPES: [&str; 12] = [
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32", "f64",
];
const TUP_BOOLEAN_TYPES: [&str; 1] = ["bool"];
const TUP_COMPOUND_TYPES: [&str; 7] = [
    "Vec",
    "VecDeque",
    "LinkedList",
    "HashSet",
    "BTreeSet",
    "HashMap",
    "BTreeMap",
];
const TUP_TRANSPARENT_WRAPPERS: [&str; 4] = ["Option", "Box", "Rc", "Arc"];

/// Classify a declared type name into one bucket. Never fails.
pub fn classify_type_name(type_name: &str) -> EnumFieldKind {
    let c_name = derive_base_type_name(type_name);
    let c_name = c_name.as_str();

    if is_any_of(c_name, &TUP_TEXT_TYPES) {
        EnumFieldKind::Text
    } else if is_any_of(c_name, &TUP_NUMERIC_TYPES) {
        EnumFieldKind::Numeric
    } else if is_any_of(c_name, &TUP_BOOLEAN_TYPES) {
        EnumFieldKind::Boolean
    } else if is_any_of(c_name, &TUP_COMPOUND_TYPES) {
        EnumFieldKind::Compound
    } else {
        EnumFieldKind::Other
    }
}

/// Reduce a declared type to the simple name that drives classification.
///
/// `"Option < Box < crate::model::Node > >"` becomes `"Node"`,
/// `"std::collections::HashMap<String, u32>"` becomes `"HashMap"`.
pub fn derive_base_type_name(type_name: &str) -> String {
    let mut c_name = type_name.trim();

    loop {
        c_name = strip_reference(c_name);
        let (c_head, c_args) = split_generic_args(c_name);
        let c_simple = strip_type_path(c_head);
        match c_args {
            Some(c_inner) if is_any_of(c_simple, &TUP_TRANSPARENT_WRAPPERS) => {
                c_name = c_inner.trim();
            }
            _ => return c_simple.to_string(),
        }
    }
}

fn strip_reference(type_name: &str) -> &str {
    let Some(c_rest) = type_name.strip_prefix('&') else {
        return type_name;
    };
    let mut c_rest = c_rest.trim_start();
    if let Some(c_lifetime) = c_rest.strip_prefix('\'') {
        c_rest = c_lifetime
            .trim_start_matches(|c: char| c.is_alphanumeric() || c == '_')
            .trim_start();
    }
    if let Some(c_mut) = c_rest.strip_prefix("mut ") {
        c_rest = c_mut.trim_start();
    }
    c_rest
}

fn split_generic_args(type_name: &str) -> (&str, Option<&str>) {
    match (type_name.find('<'), type_name.rfind('>')) {
        (Some(n_open), Some(n_close)) if n_open < n_close => {
            (&type_name[..n_open], Some(&type_name[n_open + 1..n_close]))
        }
        _ => (type_name, None),
    }
}

fn strip_type_path(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name).trim()
}

fn is_any_of(name: &str, candidates: &[&str]) -> bool {
    candidates.iter().any(|c| c.eq_ignore_ascii_case(name))
}
