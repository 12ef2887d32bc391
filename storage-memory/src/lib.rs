use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream;
use shared::config::Config;
use shared::{Error, Result};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stratus::ports::{ByteStream, ObjectStore, StoreFactory};
use tracing::debug;

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Snapshot of a `MemoryStore`'s transfer accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub puts: u64,
    pub range_reads: u64,
    pub stream_reads: u64,
    pub deletes: u64,
    /// Bytes actually yielded by body streams, counted at poll time. A
    /// reader that drops a stream early leaves the tail uncounted.
    pub bytes_streamed: u64,
}

/// DashMap-backed object store with byte-accurate transfer accounting.
///
/// Serves as the reference backend and as the test double for asserting
/// that header-only reads really skip payload bytes.
pub struct MemoryStore {
    objects: DashMap<String, Bytes>,
    chunk_size: usize,
    puts: AtomicU64,
    range_reads: AtomicU64,
    stream_reads: AtomicU64,
    deletes: AtomicU64,
    bytes_streamed: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Body streams yield at most `chunk_size` bytes per chunk. Small
    /// values make early-exit reads observable down to the byte.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            objects: DashMap::new(),
            chunk_size: chunk_size.max(1),
            puts: AtomicU64::new(0),
            range_reads: AtomicU64::new(0),
            stream_reads: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            bytes_streamed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            puts: self.puts.load(Ordering::SeqCst),
            range_reads: self.range_reads.load(Ordering::SeqCst),
            stream_reads: self.stream_reads.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
            bytes_streamed: self.bytes_streamed.load(Ordering::SeqCst),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("objects", &self.objects.len())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        self.stream_reads.fetch_add(1, Ordering::SeqCst);
        let body = self
            .objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(Error::NotFound)?;

        let chunk_size = self.chunk_size;
        let counter = Arc::clone(&self.bytes_streamed);
        Ok(Box::pin(stream::unfold(body, move |mut rest| {
            let counter = Arc::clone(&counter);
            async move {
                if rest.is_empty() {
                    return None;
                }
                let take = chunk_size.min(rest.len());
                let chunk = rest.split_to(take);
                counter.fetch_add(chunk.len() as u64, Ordering::SeqCst);
                Some((Ok::<_, Error>(chunk), rest))
            }
        })))
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes> {
        self.range_reads.fetch_add(1, Ordering::SeqCst);
        let body = self
            .objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(Error::NotFound)?;

        let start = (range.start as usize).min(body.len());
        let end = (range.end as usize).min(body.len());
        Ok(body.slice(start..end.max(start)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }
}

/// Hands out one shared `MemoryStore` instance, letting callers observe
/// the cache client's lazy, memoized connect path.
pub struct MemoryStoreFactory {
    store: Arc<MemoryStore>,
    connects: AtomicU64,
}

impl MemoryStoreFactory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            connects: AtomicU64::new(0),
        }
    }

    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn ObjectStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        debug!(bucket = %config.store_bucket, "handing out in-memory store");
        Ok(Arc::clone(&self.store) as Arc<dyn ObjectStore>)
    }
}
