//! # streamprep Parallel
//!
//! Parallel processing strategies for vector operations.
//!
//! This crate provides:
//! - Row-range chunking of tables into a fixed number of parts
//! - Scoped Rayon worker pools, one per call

pub mod chunked;
pub mod strategy;

pub use chunked::{ChunkIterator, RowChunk};
pub use strategy::{ParallelStrategy, ProcessingMode};
