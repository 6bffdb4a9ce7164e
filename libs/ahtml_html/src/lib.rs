//! Metainfo about HTML elements, as needed by code that parses or
//! serializes HTML without understanding its semantics.

pub mod meta;
