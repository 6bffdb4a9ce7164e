//! Indexed element data for fast lookups during parsing and
//! serialization.

use std::collections::HashMap;
use kstring::KString;
use lazy_static::lazy_static;

// =============================================================================
// Element tables

// HTML 4 and 5 void tags. These never get a closing tag nor children.
const VOID_TAG_NAMES: &[&str] = &[
    "area", "base", "basefont", "br", "col", "command", "embed", "frame",
    "hr", "img", "input", "keygen", "link", "meta", "param", "source",
    "track", "wbr",
];

// Elements whose content is opaque text, never markup.
const RAW_TEXT_TAG_NAMES: &[&str] = &[
    "script",
    "style",
];

// Everything else we know about; unknown (custom) elements are treated
// like these.
const NORMAL_TAG_NAMES: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "audio", "b", "bdi", "bdo",
    "blockquote", "body", "button", "canvas", "caption", "cite", "code",
    "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog",
    "div", "dl", "dt", "em", "fieldset", "figcaption", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup",
    "html", "i", "iframe", "ins", "kbd", "label", "legend", "li", "main",
    "map", "mark", "menu", "meter", "nav", "noscript", "object", "ol",
    "optgroup", "option", "output", "p", "picture", "pre", "progress", "q",
    "rp", "rt", "ruby", "s", "samp", "section", "select", "slot", "small",
    "span", "strong", "sub", "summary", "sup", "table", "tbody", "td",
    "template", "textarea", "tfoot", "th", "thead", "time", "title", "tr",
    "u", "ul", "var", "video",
];


#[derive(Debug)]
pub struct ElementMeta {
    pub tag_name: KString,
    pub has_closing_tag: bool,
    pub is_raw_text: bool,
}

impl PartialEq for ElementMeta {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.tag_name == other.tag_name
    }
}

impl Eq for ElementMeta {}


#[derive(Debug)]
pub struct MetaDb {
    pub elementmeta: HashMap<KString, ElementMeta>,
}

impl MetaDb {
    /// `tag_name` must be lowercase.
    pub fn get(&self, tag_name: &str) -> Option<&ElementMeta> {
        self.elementmeta.get(tag_name)
    }

    /// Unknown elements are assumed to need a closing tag.
    pub fn has_closing_tag(&self, tag_name: &str) -> bool {
        self.get(tag_name).map(|m| m.has_closing_tag).unwrap_or(true)
    }

    pub fn is_void(&self, tag_name: &str) -> bool {
        ! self.has_closing_tag(tag_name)
    }

    pub fn is_raw_text(&self, tag_name: &str) -> bool {
        self.get(tag_name).map(|m| m.is_raw_text).unwrap_or(false)
    }
}


pub fn read_meta_db() -> MetaDb {
    let mut elementmeta = HashMap::new();
    let mut add = |names: &[&'static str], has_closing_tag: bool, is_raw_text: bool| {
        for &name in names {
            elementmeta.insert(KString::from_static(name), ElementMeta {
                tag_name: KString::from_static(name),
                has_closing_tag,
                is_raw_text,
            });
        }
    };
    add(NORMAL_TAG_NAMES, true, false);
    add(VOID_TAG_NAMES, false, false);
    add(RAW_TEXT_TAG_NAMES, true, true);
    MetaDb { elementmeta }
}

lazy_static!{
    pub static ref METADB: MetaDb = read_meta_db();
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_void_and_raw() {
        assert!(METADB.is_void("br"));
        assert!(METADB.is_void("img"));
        assert!(METADB.is_void("keygen"));
        assert!(! METADB.is_void("div"));
        // custom elements
        assert!(! METADB.is_void("my-widget"));
        assert!(METADB.is_raw_text("script"));
        assert!(METADB.is_raw_text("style"));
        assert!(! METADB.is_raw_text("textarea"));
        assert_eq!(METADB.get("li").map(|m| m.tag_name.as_str()), Some("li"));
    }
}
