//! Escaping rules shared by compile-time and run-time serialization.
//!
//! Only `<` and `>` are replaced in text; `&` passes through, which
//! keeps entity references that were in the source intact.

use std::borrow::Cow;


pub fn html_escape(s: &str) -> Cow<str> {
    if ! s.contains(|c: char| c == '<' || c == '>') {
        return Cow::Borrowed(s)
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c)
        }
    }
    Cow::Owned(out)
}

/// Append `s` as a JSON string literal, including the surrounding
/// double quotes.
fn push_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32))
            }
            _ => out.push(c)
        }
    }
    out.push('"');
}

/// Append an attribute value in double quotes: HTML-escaped, `"`
/// turned into `&quot;`, then JSON-escaped so that control characters
/// can't break out of the quotes.
pub fn push_quoted_attribute_value(out: &mut String, value: &str) {
    let escaped = html_escape(value);
    push_json_string(out, &escaped.replace('"', "&quot;"));
}

pub fn quote_attribute_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    push_quoted_attribute_value(&mut out, value);
    out
}

/// Append ` name="value"`.
pub fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(&html_escape(name));
    out.push('=');
    push_quoted_attribute_value(out, value);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_html_escape() {
        assert_eq!(html_escape("a < b"), "a &lt; b");
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("A&B"), "A&B");
        assert!(matches!(html_escape("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn t_quote_attribute_value() {
        assert_eq!(quote_attribute_value("box"), "\"box\"");
        assert_eq!(quote_attribute_value("say \"hi\""), "\"say &quot;hi&quot;\"");
        assert_eq!(quote_attribute_value("a\nb\tc"), "\"a\\nb\\tc\"");
        assert_eq!(quote_attribute_value("x<y"), "\"x&lt;y\"");
        assert_eq!(quote_attribute_value("c:\\dir"), "\"c:\\\\dir\"");
        assert_eq!(quote_attribute_value("\u{1}"), "\"\\u0001\"");
    }

    #[test]
    fn t_push_attribute() {
        let mut s = String::new();
        push_attribute(&mut s, "href", "/x?a=1&b=2");
        assert_eq!(s, " href=\"/x?a=1&b=2\"");
    }
}
