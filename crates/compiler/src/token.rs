//! Token classification.
//!
//! Tokens are plain strings; these predicates tell the parser and the
//! emitters what shape a lexeme has. Identifiers are lowercase-led and may
//! continue with lowercase letters, digits, and underscores; anything in
//! `KEYWORDS` is reserved.

/// Reserved words of the language.
pub const KEYWORDS: &[&str] = &[
    "program", "begin", "end", "var", "const", "integer", "boolean", "true", "false", "not", "mod",
    "div", "and", "or", "read", "write", "if", "then", "else", "repeat", "while", "do", "until",
];

/// True if the word is reserved.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// True if the token is a legal non-keyword identifier: a lowercase letter
/// followed by lowercase letters, digits, and underscores.
pub fn is_non_key_id(token: &str) -> bool {
    if is_keyword(token) {
        return false;
    }
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// True if every character is a digit or a sign.
///
/// Deliberately permissive: a bare sign (and the empty string) passes.
/// Signed literals like `-5` are built by the parser folding a unary sign
/// into the lexeme, so the sign may appear at any position here.
pub fn is_integer_literal(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_digit() || c == '+' || c == '-')
}

/// True for the boolean literals.
pub fn is_boolean_literal(name: &str) -> bool {
    name == "true" || name == "false"
}

/// True for compiler temporaries: `T` followed by digits only.
pub fn is_temp_name(name: &str) -> bool {
    let mut chars = name.chars();
    if chars.next() != Some('T') {
        return false;
    }
    chars.all(|c| c.is_ascii_digit())
}

/// Relational operators, lowest precedence level.
pub fn is_relational_operator(op: &str) -> bool {
    matches!(op, "=" | "<>" | "<=" | ">=" | "<" | ">")
}

/// Addition-level operators.
pub fn is_add_level_operator(op: &str) -> bool {
    matches!(op, "+" | "-" | "or")
}

/// Multiplication-level operators, highest binary precedence.
pub fn is_mul_level_operator(op: &str) -> bool {
    matches!(op, "*" | "div" | "mod" | "and")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_not_identifiers() {
        assert!(is_keyword("program"));
        assert!(is_keyword("until"));
        assert!(!is_non_key_id("while"));
        assert!(!is_non_key_id("true"));
    }

    #[test]
    fn test_non_key_id_shapes() {
        assert!(is_non_key_id("x"));
        assert!(is_non_key_id("loop_counter2"));
        assert!(!is_non_key_id("Counter"));
        assert!(!is_non_key_id("2x"));
        assert!(!is_non_key_id(""));
        assert!(!is_non_key_id("a-b"));
    }

    #[test]
    fn test_integer_literal_is_permissive() {
        assert!(is_integer_literal("42"));
        assert!(is_integer_literal("-5"));
        assert!(is_integer_literal("+5"));
        // The classifier only looks at the character set; bare signs and
        // the empty string pass, and callers depend on that when folding.
        assert!(is_integer_literal("-"));
        assert!(is_integer_literal(""));
        assert!(!is_integer_literal("x1"));
        assert!(!is_integer_literal("1.5"));
    }

    #[test]
    fn test_temp_names() {
        assert!(is_temp_name("T0"));
        assert!(is_temp_name("T17"));
        assert!(!is_temp_name("TRUE"));
        assert!(!is_temp_name("t0"));

        // "T" alone has no digits but the tail check is vacuous; only the
        // leading character is mandatory.
        assert!(is_temp_name("T"));
    }

    #[test]
    fn test_operator_levels() {
        for op in ["=", "<>", "<=", ">=", "<", ">"] {
            assert!(is_relational_operator(op));
            assert!(!is_add_level_operator(op));
        }
        for op in ["+", "-", "or"] {
            assert!(is_add_level_operator(op));
            assert!(!is_mul_level_operator(op));
        }
        for op in ["*", "div", "mod", "and"] {
            assert!(is_mul_level_operator(op));
            assert!(!is_relational_operator(op));
        }
    }
}
