use std::sync::LazyLock;

use regex::Regex;

static LOWER_UPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-z0-9])([A-Z])").expect("unable to compile lower-upper boundary regex")
});

static ACRONYM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("unable to compile acronym boundary regex")
});

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("unable to compile identifier regex")
});

/// Convert a camelCase or PascalCase name into snake_case.
///
/// Acronym runs are kept together, so `UserID` becomes `user_id` and
/// `HTTPServer` becomes `http_server`.
///
/// # Examples
///
/// ```
/// use folio_utils::string::camel_to_snake;
///
/// assert_eq!(camel_to_snake("createdAt"), "created_at");
/// ```
pub fn camel_to_snake(s: &str) -> String {
    let s = ACRONYM_RE.replace_all(s, "${1}_${2}");
    let s = LOWER_UPPER_RE.replace_all(&s, "${1}_${2}");
    s.to_lowercase()
}

/// Lowercase the first character, leaving the rest untouched.
///
/// `CreatedAt` becomes `createdAt`, the form request parameters use.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `s` is a plain column identifier, optionally qualified by a table
/// name (`status`, `users.status`).
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER_RE.is_match(s)
}
