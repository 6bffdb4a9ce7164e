use anyhow::{bail, Result, anyhow};
use kstring::KString;
use ahtml_html::meta::{ElementMeta, METADB};


/// Index of a node within the `Fragment` that created it. Doubles as
/// the node's identity: two ids from the same fragment are equal iff
/// they denote the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag_name: KString,
    // In source order.
    pub attr: Vec<(KString, KString)>,
    pub body: Vec<NodeId>,
}

impl Element {
    pub fn new(tag_name: KString, attr: Vec<(KString, KString)>) -> Self {
        Element { tag_name, attr, body: Vec::new() }
    }

    pub fn meta(&self) -> Option<&'static ElementMeta> {
        METADB.get(&self.tag_name)
    }

    pub fn has_closing_tag(&self) -> bool {
        METADB.has_closing_tag(&self.tag_name)
    }

    pub fn get_attribute(&self, name: &str) -> Option<&KString> {
        self.attr.iter().find(|(k, _)| k.as_str() == name).map(|(_, v)| v)
    }
}


/// `script` and `style`: the content is kept as one opaque string.
#[derive(Debug, Clone, PartialEq)]
pub struct RawContainer {
    pub tag_name: KString,
    pub attr: Vec<(KString, KString)>,
    pub content: KString,
}


#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(KString),
    /// Raw comment text, without the `<!--` and `-->`.
    Comment(KString),
    Raw(RawContainer),
    /// Text between `<` and `>`, e.g. `!DOCTYPE html`.
    Directive(KString),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None
        }
    }

    pub fn as_comment(&self) -> Option<&KString> {
        match self {
            Node::Comment(s) => Some(s),
            _ => None
        }
    }
}


#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
}

/// An ordered forest of nodes. Nodes can only be appended; once
/// built, a fragment is never changed, and sub-sequences are passed
/// around as `&[NodeId]` slices of it.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    slots: Vec<Slot>,
    roots: Vec<NodeId>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `node` as the last child of `parent`, or as the last
    /// root node if `parent` is None. `parent` must be an element of
    /// this fragment.
    pub fn append(&mut self, parent: Option<NodeId>, node: Node) -> Result<NodeId> {
        let id = NodeId(u32::try_from(self.slots.len()).map_err(
            |_| anyhow!("Fragment: too many nodes"))?);
        match parent {
            Some(pid) => {
                let slot = self.slots.get_mut(pid.index()).ok_or_else(
                    || anyhow!("Fragment: invalid parent id {pid:?}"))?;
                match &mut slot.node {
                    Node::Element(e) => e.body.push(id),
                    _ => bail!("Fragment: parent {pid:?} is not an element"),
                }
            }
            None => self.roots.push(id),
        }
        self.slots.push(Slot { node, parent });
        Ok(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).map(|s| &s.node)
    }

    /// Panics if `id` was not created by this fragment.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.index()].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    /// Empty for anything but elements.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Node::Element(e) => &e.body,
            _ => &[]
        }
    }
}
