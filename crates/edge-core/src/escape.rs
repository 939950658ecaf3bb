//! HTML escaping.

/// Escape text content.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value (double-quoted).
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Whether a tag or attribute name can be written into markup as is.
///
/// Names are limited to ASCII letters, digits, `-`, `:` and `_`.
pub fn is_markup_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_text(r#"say "hi""#), r#"say "hi""#);
    }

    #[test]
    fn test_escape_attr_quotes() {
        assert_eq!(escape_attr(r#"x" onload="y"#), "x&quot; onload=&quot;y");
    }

    #[test]
    fn test_markup_names() {
        for name in ["div", "data-test", "xml:lang", "my_el", "h1"] {
            assert!(is_markup_name(name), "{}", name);
        }
        for name in ["", "a b", "x\"", "img src=x onerror=alert(1)", "div>", "on<"] {
            assert!(!is_markup_name(name), "{}", name);
        }
    }
}
