#![deny(clippy::all)]

//! Cache-entry encoding and retrieval over an object store.
//!
//! Entries are framed as a fixed-width header plus an opaque payload and
//! written under time-bucketed key prefixes that line up with storage-side
//! lifecycle rules. Reads fetch only the header window to decide liveness,
//! so checking a 10 MB entry costs the same as checking an empty one.

pub mod buckets;
pub mod cache;
pub mod envelope;
pub mod lifecycle;
pub mod ports;
pub mod serializer;
