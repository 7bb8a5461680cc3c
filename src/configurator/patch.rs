//! Text substitution on JavaScript/TypeScript sources
//!
//! Handles `field: "literal"` and `field = 'literal'` assignments in any of
//! the three JS quote styles. The rewritten literal keeps its quote style
//! and the new value is escaped for it.

use regex::{Captures, Regex};

use super::ConfiguratorError;

/// Double, single and backtick string bodies, escapes allowed
const STRING_LITERAL: &str =
    r#"(?:"(?P<dq>(?:\\.|[^"\\])*)"|'(?P<sq>(?:\\.|[^'\\])*)'|`(?P<bq>(?:\\.|[^`\\])*)`)"#;

/// Pattern matching assignments of a string literal to `field`
pub fn field_pattern(field: &str) -> Result<Regex, ConfiguratorError> {
    let pattern = format!(
        r"(?P<head>\b{}\s*[:=]\s*){}",
        regex::escape(field),
        STRING_LITERAL
    );
    Ok(Regex::new(&pattern)?)
}

/// Replace every literal assigned to `field` with `value`.
///
/// Returns the new text and the number of assignments rewritten.
pub fn rewrite_field(
    source: &str,
    field: &str,
    value: &str,
) -> Result<(String, usize), ConfiguratorError> {
    let pattern = field_pattern(field)?;
    let mut count = 0;

    let rewritten = pattern.replace_all(source, |caps: &Captures| {
        count += 1;
        let quote = if caps.name("dq").is_some() {
            '"'
        } else if caps.name("sq").is_some() {
            '\''
        } else {
            '`'
        };
        format!(
            "{}{}{}{}",
            &caps["head"],
            quote,
            escape_for_quote(value, quote),
            quote
        )
    });

    Ok((rewritten.into_owned(), count))
}

/// Replace every occurrence of `from` with `to`
pub fn replace_literal(source: &str, from: &str, to: &str) -> (String, usize) {
    if from.is_empty() {
        return (source.to_string(), 0);
    }
    let count = source.matches(from).count();
    if count == 0 {
        return (source.to_string(), 0);
    }
    (source.replace(from, to), count)
}

/// Escape `value` for use inside a JS string delimited by `quote`
pub fn escape_for_quote(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            '$' if quote == '`' && chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINTS: &str = r#"export const endpoints = {
  domain: "localhost",
  apiUrl: 'http://localhost:3000',
  evolutionApiUrl: `http://localhost:8080`,
  evolutionApiKey: "",
};
"#;

    #[test]
    fn test_rewrites_each_quote_style() {
        let (out, n) = rewrite_field(ENDPOINTS, "apiUrl", "https://api.example.com").unwrap();
        assert_eq!(n, 1);
        assert!(out.contains("apiUrl: 'https://api.example.com'"));

        let (out, n) = rewrite_field(&out, "evolutionApiUrl", "https://gw.example.com").unwrap();
        assert_eq!(n, 1);
        assert!(out.contains("evolutionApiUrl: `https://gw.example.com`"));

        let (out, _) = rewrite_field(&out, "evolutionApiKey", "k3y").unwrap();
        assert!(out.contains("evolutionApiKey: \"k3y\""));

        // untouched fields stay as they were
        assert!(out.contains("domain: \"localhost\""));
    }

    #[test]
    fn test_field_names_match_whole_words() {
        let (out, n) = rewrite_field(ENDPOINTS, "ApiUrl", "x").unwrap();
        assert_eq!(n, 0);
        assert_eq!(out, ENDPOINTS);

        let src = "const VITE_SUPABASE_URL = 'a';\nconst SUPABASE_URL = \"b\";\n";
        let (out, n) = rewrite_field(src, "SUPABASE_URL", "https://x.supabase.co").unwrap();
        assert_eq!(n, 1);
        assert!(out.contains("VITE_SUPABASE_URL = 'a'"));
        assert!(out.contains("SUPABASE_URL = \"https://x.supabase.co\""));
    }

    #[test]
    fn test_escaped_quotes_in_old_literal() {
        let src = r#"apiKey: "abc\"def", next: "keep""#;
        let (out, n) = rewrite_field(src, "apiKey", "new").unwrap();
        assert_eq!(n, 1);
        assert_eq!(out, r#"apiKey: "new", next: "keep""#);
    }

    #[test]
    fn test_value_escaped_for_quote() {
        assert_eq!(escape_for_quote("it's", '\''), r"it\'s");
        assert_eq!(escape_for_quote("it's", '"'), "it's");
        assert_eq!(escape_for_quote(r"a\b", '"'), r"a\\b");
        assert_eq!(escape_for_quote("${x}", '`'), r"\${x}");
        assert_eq!(escape_for_quote("${x}", '"'), "${x}");
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let src = "if (apiUrl == \"x\") {}";
        let (_, n) = rewrite_field(src, "apiUrl", "y").unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_replace_literal() {
        let (out, n) = replace_literal("a http://localhost:3000 b http://localhost:3000", "http://localhost:3000", "https://crm.io");
        assert_eq!(n, 2);
        assert_eq!(out, "a https://crm.io b https://crm.io");

        let (_, n) = replace_literal("abc", "", "x");
        assert_eq!(n, 0);
    }
}
