//! Definition naming rules.

use crate::model::metadata::ClassMetadata;

/// Name for scanned or directly registered components.
///
/// Uses the declared component name when present, otherwise the short class
/// name with its first letter lowered.
pub fn component_name(metadata: &ClassMetadata) -> String {
    match metadata.component_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => decapitalize(metadata.short_name()),
    }
}

/// Name for imported configuration units: the fully-qualified class name.
pub fn import_name(metadata: &ClassMetadata) -> String {
    metadata.class_name.clone()
}

/// Lowers the first letter unless the first two letters are both uppercase.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) && first.is_uppercase() {
        return name.to_string();
    }
    let mut result = String::with_capacity(name.len());
    result.extend(first.to_lowercase());
    result.push_str(&name[first.len_utf8()..]);
    result
}
