//! Inline CSS declarations, as found in `style` attributes.

use kstring::KString;

use crate::objlit::top_level_positions;


/// Split at `;` outside of quotes and parentheses; if the brackets are
/// unbalanced, fall back to a plain split.
fn split_declarations(s: &str) -> Vec<&str> {
    match top_level_positions(s, ';') {
        Ok(positions) => {
            let mut parts = Vec::new();
            let mut start = 0;
            for i in positions {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            parts.push(&s[start..]);
            parts
        }
        Err(_) => s.split(';').collect()
    }
}

fn is_valid_property(name: &str) -> bool {
    ! name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `prop: value; ...` into (lowercased property, value) pairs in
/// source order. Declarations without a property name or value are
/// dropped; a repeated property keeps its first position and the last
/// value.
pub fn parse_declarations(s: &str) -> Vec<(KString, KString)> {
    let mut decls: Vec<(KString, KString)> = Vec::new();
    for decl in split_declarations(s) {
        let (name, value) = match decl.split_once(':') {
            Some(nv) => nv,
            None => continue
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if ! is_valid_property(&name) || value.is_empty() {
            continue
        }
        let value = KString::from_ref(value);
        match decls.iter_mut().find(|(k, _)| k.as_str() == name) {
            Some(existing) => existing.1 = value,
            None => decls.push((KString::from_string(name), value)),
        }
    }
    decls
}

/// `fontSize` -> `font-size`. Names that already contain dashes are
/// left as they are, apart from lowercasing.
pub fn css_property_name(key: &str) -> KString {
    let mut s = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            s.push('-');
            s.push(c.to_ascii_lowercase());
        } else {
            s.push(c);
        }
    }
    KString::from_string(s)
}
