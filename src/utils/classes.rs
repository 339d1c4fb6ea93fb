//! Class attribute helpers.
//!
//! These work on the raw `class="..."` string so they can be used on markup
//! produced server-side or by a templating layer.

use std::collections::BTreeMap;

use crate::core::{ProKitError, ProKitResult};

const VENDOR_PREFIXES: [&str; 4] = ["webkit", "Moz", "ms", "OT"];

/// Checks whether `class_attr` contains the single class `cls`.
///
/// Fails if `cls` contains a space; an empty `cls` is never present.
pub fn has_class(class_attr: &str, cls: &str) -> ProKitResult<bool> {
    if cls.is_empty() {
        return Ok(false);
    }
    if cls.contains(' ') {
        return Err(ProKitError::Validation(
            "className should not contain space.".to_string(),
        ));
    }
    Ok(class_attr.split_whitespace().any(|c| c == cls))
}

/// Adds every space-separated class of `cls` that is not already present.
pub fn add_class(class_attr: &str, cls: &str) -> String {
    let mut classes: Vec<&str> = class_attr.split_whitespace().collect();
    for name in cls.split(' ').filter(|c| !c.is_empty()) {
        if !classes.contains(&name) {
            classes.push(name);
        }
    }
    classes.join(" ")
}

/// Removes every space-separated class of `cls`.
pub fn remove_class(class_attr: &str, cls: &str) -> String {
    let removed: Vec<&str> = cls.split(' ').filter(|c| !c.is_empty()).collect();
    class_attr
        .split_whitespace()
        .filter(|c| !removed.contains(c))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Expands a style property into its vendor-prefixed variants plus itself.
pub fn hack_css(attr: &str, value: &str) -> BTreeMap<String, String> {
    let upper = upper_first(attr);
    let mut style: BTreeMap<String, String> = VENDOR_PREFIXES
        .iter()
        .map(|prefix| (format!("{prefix}{upper}"), value.to_string()))
        .collect();
    style.insert(attr.to_string(), value.to_string());
    style
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
