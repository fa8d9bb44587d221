//! Naming conventions shared by the validator and diagnostics

/// Path segment delimiter
pub const PATH_DELIMITER: char = '.';

/// Uppercase the first character, leave the rest as is
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derived computation method name: `prefix` + capitalized field name
pub fn computed_method_name(prefix: &str, target_field: &str) -> String {
    format!("{}{}", prefix, capitalize(target_field))
}

/// Final segment of a dotted path, used as the derived parameter name
pub fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_DELIMITER).next().unwrap_or(path)
}
