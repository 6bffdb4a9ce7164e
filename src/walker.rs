//! Document order traversal of a node sequence with open and close
//! events, steered by the callback's return value.

use ahtml::{Fragment, NodeId};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit the children (on open events), then go on.
    Descend,
    /// Skip the children and the close event of this node.
    Continue,
    /// Skip the children and remaining siblings; the close events of
    /// this node and its parent still fire.
    Break,
    /// Stop walking.
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub node: NodeId,
    /// None for the members of the walked sequence itself.
    pub parent: Option<NodeId>,
    pub is_open: bool,
}

struct Frame<'f> {
    parent: Option<NodeId>,
    siblings: &'f [NodeId],
    pos: usize,
}

/// Walk `nodes` (and their descendants) in `fragment`. Returns the
/// node at which the callback returned `Walk::Return`, if any.
pub fn walk<F>(fragment: &Fragment, nodes: &[NodeId], mut f: F) -> Option<NodeId>
    where F: FnMut(Visit) -> Walk
{
    let mut stack = vec![Frame { parent: None, siblings: nodes, pos: 0 }];
    // Close event for `node`, whose siblings are in the top frame.
    macro_rules! close {
        ($node:expr, $parent:expr) => {
            match f(Visit { node: $node, parent: $parent, is_open: false }) {
                Walk::Return => return Some($node),
                Walk::Break => {
                    if let Some(frame) = stack.last_mut() {
                        frame.pos = frame.siblings.len();
                    }
                }
                Walk::Descend | Walk::Continue => {}
            }
        }
    }
    while let Some(frame) = stack.last_mut() {
        if frame.pos >= frame.siblings.len() {
            let finished_parent = frame.parent;
            stack.pop();
            if let Some(node) = finished_parent {
                let grandparent = stack.last().and_then(|frame| frame.parent);
                close!(node, grandparent);
            }
            continue
        }
        let node = frame.siblings[frame.pos];
        frame.pos += 1;
        let parent = frame.parent;
        match f(Visit { node, parent, is_open: true }) {
            Walk::Return => return Some(node),
            Walk::Continue => {}
            Walk::Break => {
                frame.pos = frame.siblings.len();
                close!(node, parent);
            }
            Walk::Descend => {
                let children = fragment.children(node);
                if children.is_empty() {
                    close!(node, parent);
                } else {
                    stack.push(Frame { parent: Some(node), siblings: children, pos: 0 });
                }
            }
        }
    }
    None
}
