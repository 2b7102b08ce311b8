//! Field name to column name conventions

use std::fmt;
use std::sync::Arc;

/// Convert a field name to lower-case words joined by underscores.
///
/// Word boundaries are case transitions: `FooBar` -> `foo_bar`,
/// `HTTPServer` -> `http_server`, `UserID` -> `user_id`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let boundary = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower);
                if boundary && !out.ends_with('_') {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// How a field name turns into a column name when no tag overrides it
#[derive(Clone, Default)]
pub enum NameMapper {
    /// `FooBar` -> `foo_bar`
    #[default]
    SnakeCase,
    /// `FooBar` -> `foobar`
    Lowercase,
    /// Field name used as-is
    Verbatim,
    /// Caller supplied transform
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl NameMapper {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        NameMapper::Custom(Arc::new(f))
    }

    pub fn map(&self, field_name: &str) -> String {
        match self {
            NameMapper::SnakeCase => to_snake_case(field_name),
            NameMapper::Lowercase => field_name.to_lowercase(),
            NameMapper::Verbatim => field_name.to_string(),
            NameMapper::Custom(f) => f(field_name),
        }
    }
}

impl fmt::Debug for NameMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMapper::SnakeCase => write!(f, "SnakeCase"),
            NameMapper::Lowercase => write!(f, "Lowercase"),
            NameMapper::Verbatim => write!(f, "Verbatim"),
            NameMapper::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_boundaries() {
        let cases = [
            ("Foo", "foo"),
            ("FooBar", "foo_bar"),
            ("fooBar", "foo_bar"),
            ("HTTPServer", "http_server"),
            ("UserID", "user_id"),
            ("ID", "id"),
            ("Address2Line", "address2_line"),
            ("already_snake", "already_snake"),
            ("Created_At", "created_at"),
            ("A", "a"),
            ("", ""),
        ];

        for (input, expected) in cases {
            assert_eq!(to_snake_case(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_snake_case_is_stable() {
        // Converting an already converted name changes nothing
        for name in ["FirstName", "HTMLBody", "LastLoginAt", "X509Cert"] {
            let once = to_snake_case(name);
            assert_eq!(to_snake_case(&once), once);
        }
    }

    #[test]
    fn test_mappers() {
        assert_eq!(NameMapper::SnakeCase.map("FirstName"), "first_name");
        assert_eq!(NameMapper::Lowercase.map("FirstName"), "firstname");
        assert_eq!(NameMapper::Verbatim.map("FirstName"), "FirstName");

        let upper = NameMapper::custom(|name| name.to_uppercase());
        assert_eq!(upper.map("FirstName"), "FIRSTNAME");
    }
}
