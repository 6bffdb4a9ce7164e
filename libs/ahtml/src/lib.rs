//! Html dom abstraction: immutable fragments in an arena, with
//! runtime lookups of element metadata.

pub mod arena;
pub mod util;

pub use arena::{Fragment, NodeId, Node, Element, RawContainer};
pub use ahtml_html::meta::{MetaDb, ElementMeta, METADB};
pub use util::{html_escape, quote_attribute_value, push_attribute};


pub trait Print {
    /// Append serialized HTML. Text is escaped, script and style
    /// contents are not, void elements are closed with `/>`.
    fn print_html_fragment(&self, out: &mut String, fragment: &Fragment);

    fn to_html_fragment_string(&self, fragment: &Fragment) -> String {
        let mut s = String::new();
        self.print_html_fragment(&mut s, fragment);
        s
    }
}

impl Print for NodeId {
    fn print_html_fragment(&self, out: &mut String, fragment: &Fragment) {
        fragment.node(*self).print_html_fragment(out, fragment)
    }
}

impl Print for [NodeId] {
    fn print_html_fragment(&self, out: &mut String, fragment: &Fragment) {
        for id in self {
            id.print_html_fragment(out, fragment);
        }
    }
}

impl Print for Fragment {
    fn print_html_fragment(&self, out: &mut String, _fragment: &Fragment) {
        self.roots().print_html_fragment(out, self)
    }
}

impl Fragment {
    pub fn to_html_string(&self) -> String {
        self.to_html_fragment_string(self)
    }
}


fn print_open_tag(out: &mut String, tag_name: &str, attr: &[(kstring::KString, kstring::KString)]) {
    out.push('<');
    out.push_str(tag_name);
    for (k, v) in attr {
        push_attribute(out, k, v);
    }
}

impl Print for Element {
    fn print_html_fragment(&self, out: &mut String, fragment: &Fragment) {
        print_open_tag(out, &self.tag_name, &self.attr);
        if self.has_closing_tag() {
            out.push('>');
            self.body.print_html_fragment(out, fragment);
            out.push_str("</");
            out.push_str(&self.tag_name);
            out.push('>');
        } else {
            out.push_str("/>");
        }
    }
}

impl Print for RawContainer {
    fn print_html_fragment(&self, out: &mut String, _fragment: &Fragment) {
        print_open_tag(out, &self.tag_name, &self.attr);
        out.push('>');
        out.push_str(&self.content);
        out.push_str("</");
        out.push_str(&self.tag_name);
        out.push('>');
    }
}

/// The form used for all comments that are passed through to the
/// output.
pub fn print_comment(out: &mut String, text: &str) {
    out.push_str("<!-- ");
    out.push_str(text.trim());
    out.push_str(" -->");
}

impl Print for Node {
    fn print_html_fragment(&self, out: &mut String, fragment: &Fragment) {
        match self {
            Node::Element(e) => e.print_html_fragment(out, fragment),
            Node::Text(s) => out.push_str(&html_escape(s)),
            Node::Comment(s) => print_comment(out, s),
            Node::Raw(r) => r.print_html_fragment(out, fragment),
            Node::Directive(s) => {
                out.push('<');
                out.push_str(s);
                out.push('>');
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn t_print() -> Result<()> {
        let mut f = Fragment::new();
        f.append(None, Node::Directive("!DOCTYPE html".into()))?;
        let p = f.append(None, Node::Element(Element::new(
            "p".into(), vec![("class".into(), "a\"b".into())])))?;
        f.append(Some(p), Node::Text("1 < 2 & 3".into()))?;
        f.append(Some(p), Node::Element(Element::new("br".into(), vec![])))?;
        f.append(None, Node::Comment("  note ".into()))?;
        f.append(None, Node::Raw(RawContainer {
            tag_name: "script".into(),
            attr: vec![],
            content: "if (a < b) {}".into(),
        }))?;
        assert_eq!(
            f.to_html_string(),
            "<!DOCTYPE html><p class=\"a&quot;b\">1 &lt; 2 & 3<br/></p>\
             <!-- note --><script>if (a < b) {}</script>");
        Ok(())
    }
}
