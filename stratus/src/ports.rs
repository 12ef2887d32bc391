use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use shared::Result;
use shared::config::Config;
use std::ops::Range;
use std::pin::Pin;
use std::sync::Arc;

/// Chunked object body. Chunk boundaries carry no meaning.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

// Ports are the pluggable extension points for underlying object stores

/// Port for object storage operations (e.g. S3-compatible services).
///
/// Implementations must signal a missing object with `Error::NotFound`,
/// distinct from every transport failure.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Whole-object write. No partial or append writes.
    async fn put(&self, key: &str, body: Bytes) -> Result<()>;

    /// Streamed whole-object read. Dropping the stream releases the
    /// underlying transport without draining the body.
    async fn get(&self, key: &str) -> Result<ByteStream>;

    /// Bounded byte-range read, end exclusive. A range past the end of
    /// the object yields the bytes that exist.
    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes>;

    /// Returns whether an object existed. Absence is not an error.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// HEAD-style existence probe.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Port for constructing a store handle from configuration.
///
/// Construction may be expensive (network, credential setup); callers
/// memoize the returned handle for their own lifetime.
#[async_trait]
pub trait StoreFactory: Send + Sync + 'static {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn ObjectStore>>;
}
