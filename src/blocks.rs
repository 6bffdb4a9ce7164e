//! Pairing of containerless start and end marker comments.

use std::collections::HashMap;

use ahtml::{Fragment, NodeId};
use chj_util::warn;
use kstring::KString;

use crate::binding::{parse_directive, Binding, Directive};
use crate::config::Config;
use crate::error::{CompileError, CompileErrorKind, Warning};
use crate::walker::{walk, Walk};


#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub binding: Binding,
    pub start: NodeId,
    pub end: NodeId,
    /// The siblings strictly between the markers.
    pub body: Vec<NodeId>,
}

/// All blocks of a template, by start marker.
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    blocks: HashMap<NodeId, Block>,
}

impl BlockIndex {
    pub fn get(&self, start: NodeId) -> Option<&Block> {
        self.blocks.get(&start)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

struct OpenBlock {
    binding: Binding,
    start: NodeId,
    parent: Option<NodeId>,
}

fn marker_text(fragment: &Fragment, id: NodeId) -> KString {
    match fragment.node(id).as_comment() {
        Some(s) => KString::from_ref(s.trim()),
        None => KString::new(),
    }
}

fn siblings<'f>(fragment: &'f Fragment, nodes: &'f [NodeId], parent: Option<NodeId>)
                -> &'f [NodeId]
{
    match parent {
        Some(p) => fragment.children(p),
        None => nodes,
    }
}

/// Find the blocks in `nodes` and all their descendants. Surplus end
/// markers are reported in `warnings` and otherwise ignored.
pub fn match_blocks(
    fragment: &Fragment,
    nodes: &[NodeId],
    config: &Config,
    warnings: &mut Vec<Warning>,
) -> Result<BlockIndex, CompileError> {
    let mut index = BlockIndex::default();
    let mut stack: Vec<OpenBlock> = Vec::new();
    let mut error: Option<CompileError> = None;
    walk(fragment, nodes, |visit| {
        if ! visit.is_open {
            return Walk::Descend
        }
        let directive = match fragment.node(visit.node).as_comment() {
            Some(text) => parse_directive(text, config),
            None => None
        };
        match directive {
            None => {}
            Some(Directive::Open(binding)) => {
                stack.push(OpenBlock { binding, start: visit.node, parent: visit.parent });
            }
            Some(Directive::Close) => match stack.pop() {
                None => {
                    let w = Warning::DanglingEnd { marker: marker_text(fragment, visit.node) };
                    warn!("{w}");
                    warnings.push(w);
                }
                Some(open) => {
                    if open.parent != visit.parent {
                        error = Some(CompileErrorKind::UnbalancedBlock {
                            start: marker_text(fragment, open.start)
                        }.into());
                        return Walk::Return
                    }
                    let sibs = siblings(fragment, nodes, visit.parent);
                    let from = sibs.iter().position(|id| *id == open.start);
                    let to = sibs.iter().position(|id| *id == visit.node);
                    let body = match (from, to) {
                        (Some(from), Some(to)) if from < to => sibs[from + 1..to].to_vec(),
                        _ => Vec::new()
                    };
                    index.blocks.insert(open.start, Block {
                        binding: open.binding,
                        start: open.start,
                        end: visit.node,
                        body,
                    });
                }
            }
        }
        Walk::Descend
    });
    if let Some(e) = error {
        return Err(e)
    }
    if let Some(open) = stack.last() {
        return Err(CompileErrorKind::UnclosedBlock {
            start: marker_text(fragment, open.start)
        }.into())
    }
    Ok(index)
}
