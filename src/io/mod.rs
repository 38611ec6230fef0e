//! IO Abstractions for random-access byte reading.

mod byte_source;

pub use byte_source::{ByteSource, FileSource, MemorySource};
