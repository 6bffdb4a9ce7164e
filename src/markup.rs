//! Lenient HTML parsing into a `Fragment`. Entities are left alone
//! and attribute order is kept, so that serializing the result gives
//! back the source markup (modulo escaping of `<` and `>` in text).

use ahtml::{Fragment, Node, NodeId, Element, RawContainer, METADB};
use kstring::KString;


#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("unterminated comment starting at offset {0}")]
    UnterminatedComment(usize),
    #[error("unterminated <{tag}> tag starting at offset {position}")]
    UnterminatedTag { tag: KString, position: usize },
    #[error("missing </{tag}> for the <{tag}> starting at offset {position}")]
    UnterminatedRawText { tag: KString, position: usize },
    #[error("unterminated markup declaration starting at offset {0}")]
    UnterminatedDirective(usize),
    #[error("building the node tree: {0}")]
    Tree(String),
}


fn is_tag_name_char(c: char) -> bool {
    ! (c.is_whitespace() || c == '/' || c == '>')
}

fn is_attr_name_char(c: char) -> bool {
    ! (c.is_whitespace() || c == '/' || c == '>' || c == '=')
}

struct StartTag {
    name: KString,
    attr: Vec<(KString, KString)>,
    self_closing: bool,
}

struct TreeBuilder<'s> {
    input: &'s str,
    cursor: usize,
    text_start: usize,
    fragment: Fragment,
    // Open elements, innermost last.
    open: Vec<(NodeId, KString)>,
}

impl<'s> TreeBuilder<'s> {
    fn new(input: &'s str) -> Self {
        TreeBuilder {
            input,
            cursor: 0,
            text_start: 0,
            fragment: Fragment::new(),
            open: Vec::new(),
        }
    }

    fn remaining(&self) -> &'s str {
        &self.input[self.cursor..]
    }

    fn append(&mut self, node: Node) -> Result<NodeId, MarkupError> {
        let parent = self.open.last().map(|(id, _)| *id);
        self.fragment.append(parent, node).map_err(|e| MarkupError::Tree(e.to_string()))
    }

    fn flush_text(&mut self) -> Result<(), MarkupError> {
        if self.text_start < self.cursor {
            let text = &self.input[self.text_start..self.cursor];
            self.append(Node::Text(KString::from_ref(text)))?;
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        self.cursor += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'s str {
        let rest = self.remaining();
        let len = rest.find(|c: char| ! pred(c)).unwrap_or(rest.len());
        self.cursor += len;
        &rest[..len]
    }

    /// Reads from just after `<` up to and including the closing `>`.
    fn start_tag(&mut self, position: usize) -> Result<StartTag, MarkupError> {
        let name = KString::from_string(self.take_while(is_tag_name_char).to_ascii_lowercase());
        let unterminated = |name: &KString| MarkupError::UnterminatedTag {
            tag: name.clone(), position
        };
        let mut attr: Vec<(KString, KString)> = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = self.remaining();
            if rest.is_empty() {
                return Err(unterminated(&name))
            }
            if rest.starts_with('>') {
                self.cursor += 1;
                return Ok(StartTag { name, attr, self_closing: false })
            }
            if rest.starts_with("/>") {
                self.cursor += 2;
                return Ok(StartTag { name, attr, self_closing: true })
            }
            if rest.starts_with('/') {
                self.cursor += 1;
                continue
            }
            let mut key = self.take_while(is_attr_name_char);
            if key.is_empty() {
                // a stray '='
                key = &rest[..1];
                self.cursor += 1;
            }
            let key = KString::from_string(key.to_ascii_lowercase());
            self.skip_whitespace();
            let value = if self.remaining().starts_with('=') {
                self.cursor += 1;
                self.skip_whitespace();
                let rest = self.remaining();
                match rest.chars().next() {
                    Some(q) if q == '"' || q == '\'' => {
                        let end = rest[1..].find(q).ok_or_else(|| unterminated(&name))?;
                        self.cursor += end + 2;
                        &rest[1..end + 1]
                    }
                    _ => self.take_while(|c| ! (c.is_whitespace() || c == '>')),
                }
            } else {
                ""
            };
            if ! attr.iter().any(|(k, _)| *k == key) {
                attr.push((key, KString::from_ref(value)));
            }
        }
    }

    fn end_tag(&mut self, position: usize) -> Result<(), MarkupError> {
        let name = self.take_while(is_tag_name_char).to_ascii_lowercase();
        let end = self.remaining().find('>').ok_or_else(
            || MarkupError::UnterminatedTag { tag: KString::from_ref(&name), position })?;
        self.cursor += end + 1;
        if let Some(i) = self.open.iter().rposition(|(_, tag)| tag.as_str() == name) {
            self.open.truncate(i);
        }
        Ok(())
    }

    fn raw_text(&mut self, tag: StartTag, position: usize) -> Result<(), MarkupError> {
        let rest = self.remaining();
        let needle = format!("</{}", tag.name);
        let end = rest.to_ascii_lowercase().find(&needle).ok_or_else(
            || MarkupError::UnterminatedRawText { tag: tag.name.clone(), position })?;
        let content = KString::from_ref(&rest[..end]);
        self.cursor += end + needle.len();
        let close = self.remaining().find('>').ok_or_else(
            || MarkupError::UnterminatedRawText { tag: tag.name.clone(), position })?;
        self.cursor += close + 1;
        self.append(Node::Raw(RawContainer {
            tag_name: tag.name,
            attr: tag.attr,
            content,
        }))?;
        Ok(())
    }

    fn parse(mut self) -> Result<Fragment, MarkupError> {
        while let Some(lt) = self.remaining().find('<') {
            self.cursor += lt;
            let position = self.cursor;
            let rest = self.remaining();
            let next = rest[1..].chars().next();
            if rest.starts_with("<!--") {
                self.flush_text()?;
                let end = rest[4..].find("-->").ok_or(
                    MarkupError::UnterminatedComment(position))?;
                let text = KString::from_ref(&rest[4..4 + end]);
                self.cursor += 4 + end + 3;
                self.append(Node::Comment(text))?;
            } else if next == Some('!') || next == Some('?') {
                self.flush_text()?;
                let end = rest.find('>').ok_or(MarkupError::UnterminatedDirective(position))?;
                let text = KString::from_ref(&rest[1..end]);
                self.cursor += end + 1;
                self.append(Node::Directive(text))?;
            } else if next == Some('/')
                && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.flush_text()?;
                self.cursor += 2;
                self.end_tag(position)?;
            } else if next.map_or(false, |c| c.is_ascii_alphabetic()) {
                self.flush_text()?;
                self.cursor += 1;
                let tag = self.start_tag(position)?;
                if METADB.is_raw_text(&tag.name) && ! tag.self_closing {
                    self.raw_text(tag, position)?;
                } else {
                    let closes_immediately = tag.self_closing || METADB.is_void(&tag.name);
                    let name = tag.name.clone();
                    let id = self.append(Node::Element(Element::new(tag.name, tag.attr)))?;
                    if ! closes_immediately {
                        self.open.push((id, name));
                    }
                }
            } else {
                // not markup, stays part of the text
                self.cursor += 1;
                continue
            }
            self.text_start = self.cursor;
        }
        self.cursor = self.input.len();
        self.flush_text()?;
        Ok(self.fragment)
    }
}

pub fn parse_fragment(markup: &str) -> Result<Fragment, MarkupError> {
    TreeBuilder::new(markup).parse()
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn roundtrip(s: &str) -> Result<String> {
        Ok(parse_fragment(s)?.to_html_string())
    }

    #[test]
    fn t_structure() -> Result<()> {
        let f = parse_fragment("<div id=a><p>x</p><!-- c --><br>y</div>tail")?;
        assert_eq!(f.roots().len(), 2);
        let div = f.roots()[0];
        let e = f.node(div).as_element().unwrap();
        assert_eq!(e.tag_name, "div");
        assert_eq!(e.get_attribute("id").map(|s| s.as_str()), Some("a"));
        assert_eq!(f.children(div).len(), 4);
        assert_eq!(f.node(f.children(div)[1]).as_comment().map(|s| s.as_str()), Some(" c "));
        assert_eq!(f.node(f.roots()[1]), &Node::Text("tail".into()));
        Ok(())
    }

    #[test]
    fn t_roundtrip() -> Result<()> {
        assert_eq!(roundtrip(r#"<a href="/x?a=1&amp;b=2" class='c'>A &amp; B</a>"#)?,
                   r#"<a href="/x?a=1&amp;b=2" class="c">A &amp; B</a>"#);
        assert_eq!(roundtrip("<!DOCTYPE html><p>1 < 2</p>")?,
                   "<!DOCTYPE html><p>1 &lt; 2</p>");
        assert_eq!(roundtrip("<input disabled type=text><img src=x />")?,
                   "<input disabled=\"\" type=\"text\"/><img src=\"x\"/>");
        assert_eq!(roundtrip("<script>if (a<b) { x = '</p>' }</script>")?,
                   "<script>if (a<b) { x = '</p>' }</script>");
        Ok(())
    }

    #[test]
    fn t_lenient() -> Result<()> {
        // stray end tag dropped, unclosed element closed at the end
        assert_eq!(roundtrip("<div><span>a</div>b</i>")?, "<div><span>a</span></div>b");
        assert_eq!(roundtrip("<DIV CLASS=x></div>")?, "<div class=\"x\"></div>");
        assert_eq!(roundtrip("<p a=1 a=2></p>")?, "<p a=\"1\"></p>");
        Ok(())
    }

    #[test]
    fn t_errors() {
        assert_eq!(parse_fragment("x<!-- y").unwrap_err(), MarkupError::UnterminatedComment(1));
        assert!(matches!(parse_fragment("<div class=\"x>").unwrap_err(),
                         MarkupError::UnterminatedTag { .. }));
        assert!(matches!(parse_fragment("<style>a{}").unwrap_err(),
                         MarkupError::UnterminatedRawText { .. }));
        assert!(matches!(parse_fragment("<!DOCTYPE").unwrap_err(),
                         MarkupError::UnterminatedDirective(0)));
    }
}
