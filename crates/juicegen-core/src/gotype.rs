//! String-level shape tests on declared Go type names.
//!
//! Nothing here resolves types; every question is answered from the literal
//! text the interface declared.

pub const CONTEXT_TYPE: &str = "context.Context";
pub const ERROR_TYPE: &str = "error";
pub const EXEC_RESULT_TYPE: &str = "sql.Result";

const PREDECLARED: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

pub fn is_builtin(type_name: &str) -> bool {
    PREDECLARED.contains(&type_name)
}

pub fn is_pointer(type_name: &str) -> bool {
    type_name.starts_with('*')
}

pub fn is_slice(type_name: &str) -> bool {
    type_name.starts_with("[]")
}

/// Slices and fixed-size arrays; `map[..]` and generic instantiations are neither.
pub fn is_array_or_slice(type_name: &str) -> bool {
    type_name.starts_with('[')
}

/// Element type of `[]T` or `[N]T`.
pub fn element_type(type_name: &str) -> Option<&str> {
    let rest = type_name.strip_prefix('[')?;
    let close = rest.find(']')?;
    Some(&rest[close + 1..])
}

pub fn strip_pointer(type_name: &str) -> &str {
    type_name.strip_prefix('*').unwrap_or(type_name)
}

/// Package qualifiers referenced by a type expression, in order of appearance.
///
/// `map[string]*model.User` yields `["model"]`; `func(context.Context) error`
/// yields `["context"]`.
pub fn qualifiers(type_name: &str) -> Vec<String> {
    let bytes = type_name.as_bytes();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if is_ident_start(c) {
            let start = i;
            while i < bytes.len() && is_ident_continue(bytes[i]) {
                i += 1;
            }
            let preceded_by_dot = start > 0 && bytes[start - 1] == b'.';
            let followed_by_selector =
                i + 1 < bytes.len() && bytes[i] == b'.' && is_ident_start(bytes[i + 1]);
            if followed_by_selector && !preceded_by_dot {
                let q = &type_name[start..i];
                if !out.iter().any(|x| x == q) {
                    out.push(q.to_string());
                }
            }
        } else {
            i += 1;
        }
    }
    out
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names() {
        assert!(is_builtin("int64"));
        assert!(is_builtin("string"));
        assert!(!is_builtin("User"));
        assert!(!is_builtin("[]int"));
        assert!(!is_builtin("*string"));
    }

    #[test]
    fn array_and_element_shapes() {
        assert!(is_array_or_slice("[]*User"));
        assert!(is_array_or_slice("[4]int"));
        assert!(!is_array_or_slice("map[string]int"));
        assert_eq!(element_type("[]*User"), Some("*User"));
        assert_eq!(element_type("[16]byte"), Some("byte"));
        assert_eq!(element_type("User"), None);
    }

    #[test]
    fn qualifiers_skip_variadic_dots_and_selectors() {
        assert_eq!(qualifiers("context.Context"), vec!["context"]);
        assert_eq!(
            qualifiers("map[string]*model.User"),
            vec!["model".to_string()]
        );
        assert_eq!(
            qualifiers("func(ctx context.Context, t time.Time) error"),
            vec!["context".to_string(), "time".to_string()]
        );
        assert!(qualifiers("...string").is_empty());
        assert!(qualifiers("[]*User").is_empty());
    }
}
