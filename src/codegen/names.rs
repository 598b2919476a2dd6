//! Naming for generated code
//!
//! Case conversion, keyword escaping, and the names derived from a member:
//! the stage type for a required member (`RequiresId`), the setter
//! (`with_id`), and the accessor (`id`).

/// Rust keywords that must be escaped as raw identifiers in field position
const KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "box", "final", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Escape a field or method name that collides with a keyword
pub fn escape_keyword(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

/// Convert to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' || c == '.' {
            result.push('_');
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    result
}

/// Convert to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' || c == '.' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// The stage type exposing exactly one required member's setter
pub fn stage_name(field_name: &str) -> String {
    format!("Requires{}", to_pascal_case(field_name))
}

/// The setter for a member
pub fn setter_name(prefix: &str, field_name: &str) -> String {
    escape_keyword(&format!("{prefix}{}", to_snake_case(field_name)))
}

/// The accessor for a member
pub fn accessor_name(field_name: &str) -> String {
    escape_keyword(&to_snake_case(field_name))
}
