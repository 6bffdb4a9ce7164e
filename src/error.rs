use std::fmt;

use kstring::KString;

use crate::markup::MarkupError;
use crate::objlit::ObjectLiteralError;


def_boxed_thiserror!(CompileError, pub enum CompileErrorKind {
    #[error("invalid markup: {0}")]
    Markup(#[from] MarkupError),
    #[error("invalid binding {:?}: {error}", binding.as_str())]
    ObjectLiteral { binding: KString, error: ObjectLiteralError },
    #[error("cannot find closing comment tag to match: {:?}", start.as_str())]
    UnclosedBlock { start: KString },
    #[error("closing comment tag for {:?} is not under the same parent", start.as_str())]
    UnbalancedBlock { start: KString },
    #[error("multiple bindings ({0} and {1}) are trying to control descendant bindings \
             of the same element; you cannot use these bindings together on the same element")]
    ConflictingBindings(&'static str, &'static str),
});


/// Problems in a template that do not prevent compiling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An end marker comment without a start marker; dropped.
    DanglingEnd { marker: KString },
    /// A binding kind given twice on one element; all but the first
    /// are ignored.
    DuplicateBinding { tag_name: KString, kind: &'static str },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DanglingEnd { marker } =>
                write!(f, "ignoring closing comment tag {:?} without opening tag",
                       marker.as_str()),
            Warning::DuplicateBinding { tag_name, kind } =>
                write!(f, "ignoring repeated {kind:?} binding on <{tag_name}> element"),
        }
    }
}
