//! # Formats
//!
//! Structured document representations of a [`crate::ContentGraph`].
//!
//! File I/O is left to callers; these are pure transformations.

pub mod document;

pub use document::{
    BlockRecord, DocumentHeader, EdgeRecord, SerializableGraph, graph_from_json, graph_to_json,
};
