//! Splitting of binding attribute values like `text: name, css: {a:
//! b}` into their entries, keeping each value as unparsed source text.

use kstring::KString;


#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ObjectLiteralError {
    #[error("unbalanced {0:?} at offset {1}")]
    Unbalanced(char, usize),
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("missing ':' in {:?}", .0.as_str())]
    MissingColon(KString),
    #[error("empty key in {:?}", .0.as_str())]
    EmptyKey(KString),
}


/// Byte offsets of the occurrences of `sep` in `s` that are outside
/// of brackets and string literals.
pub fn top_level_positions(s: &str, sep: char) -> Result<Vec<usize>, ObjectLiteralError> {
    let mut positions = Vec::new();
    let mut closers: Vec<(char, usize)> = Vec::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' | '`' => {
                let mut terminated = false;
                while let Some((_, d)) = chars.next() {
                    if d == '\\' {
                        chars.next();
                    } else if d == c {
                        terminated = true;
                        break
                    }
                }
                if ! terminated {
                    return Err(ObjectLiteralError::UnterminatedString(i))
                }
            }
            '(' => closers.push((')', i)),
            '[' => closers.push((']', i)),
            '{' => closers.push(('}', i)),
            ')' | ']' | '}' => match closers.pop() {
                Some((expected, _)) if expected == c => {}
                _ => return Err(ObjectLiteralError::Unbalanced(c, i))
            },
            c if c == sep && closers.is_empty() => positions.push(i),
            _ => {}
        }
    }
    match closers.pop() {
        Some((closer, i)) => Err(ObjectLiteralError::Unbalanced(
            match closer { ')' => '(', ']' => '[', _ => '{' }, i)),
        None => Ok(positions)
    }
}

/// Split `s` at top-level `sep` characters.
pub fn split_top_level(s: &str, sep: char) -> Result<Vec<&str>, ObjectLiteralError> {
    let mut parts = Vec::new();
    let mut start = 0;
    for i in top_level_positions(s, sep)? {
        parts.push(&s[start..i]);
        start = i + sep.len_utf8();
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// The contents of a quoted string literal, without handling escapes.
pub fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    let q = s.chars().next()?;
    if (q == '"' || q == '\'') && s.len() >= 2 && s.ends_with(q) {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

/// Strip one pair of enclosing braces, if they enclose the whole
/// string.
fn strip_braces(s: &str) -> &str {
    if s.starts_with('{') && s.ends_with('}') {
        let inner = &s[1..s.len() - 1];
        // `{a} , {b}` must not be taken apart like this
        if top_level_positions(inner, ',').is_ok() {
            return inner
        }
    }
    s
}

/// Parse `{key: expr, ...}` (braces optional) into its entries, in
/// source order. Keys may be quoted; values are trimmed source text.
pub fn parse_object_literal(s: &str) -> Result<Vec<(KString, KString)>, ObjectLiteralError> {
    let body = strip_braces(s.trim());
    let mut entries = Vec::new();
    for entry in split_top_level(body, ',')? {
        let entry = entry.trim();
        if entry.is_empty() {
            continue
        }
        let colon = top_level_positions(entry, ':')?.first().copied().ok_or_else(
            || ObjectLiteralError::MissingColon(KString::from_ref(entry)))?;
        let key = entry[..colon].trim();
        let key = unquote(key).unwrap_or(key);
        if key.is_empty() {
            return Err(ObjectLiteralError::EmptyKey(KString::from_ref(entry)))
        }
        let value = entry[colon + 1..].trim();
        entries.push((KString::from_ref(key), KString::from_ref(value)));
    }
    Ok(entries)
}
