//! Native reader for binary FBX files.
//!
//! `reader` turns the byte stream into a tree of [`Node`]s, `document` indexes
//! the object graph, and `transform` evaluates node transforms over time.

pub mod curve;
pub mod document;
pub mod node;
pub mod reader;
pub mod time;
pub mod transform;

pub use curve::AnimCurve;
pub use document::{AnimStack, AttributeKind, Document, Object, ObjectId, Properties, SkeletonKind};
pub use node::{Node, Property};
pub use reader::{FbxFile, parse};
pub use time::FbxTime;
pub use transform::{NodeTransform, RotationOrder, TransformEvaluator};

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FbxError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("not a binary FBX file")]
    BadMagic,
    #[error("ASCII FBX files are not supported")]
    Ascii,
    #[error("record at offset {offset} ends past the end of data ({len} bytes)")]
    Truncated { offset: u64, len: u64 },
    #[error("unknown property type '{code}' at offset {offset}")]
    UnknownPropertyType { code: char, offset: u64 },
    #[error("unknown array encoding {0}")]
    UnknownArrayEncoding(u32),
    #[error("array decompression failed: {0}")]
    Decompress(io::Error),
    #[error("array payload too short: expected {expected} bytes, got {actual}")]
    ArrayLength { expected: usize, actual: usize },
}
