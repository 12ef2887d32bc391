use crate::buckets::{BucketLayout, PERSISTENT_BUCKET, namespaced_key};
use crate::envelope::{self, HEADER_SIZE, Header};
use crate::ports::{ByteStream, ObjectStore, StoreFactory};
use bytes::{Buf, Bytes, BytesMut};
use futures::StreamExt;
use shared::config::Config;
use shared::{Error, Result, TtlSecs};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Time source for expiration decisions, injectable so expiry paths are
/// testable without waiting out a ttl.
pub trait Clock: Send + Sync + 'static {
    /// UNIX seconds.
    fn now(&self) -> f64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Object-store-backed cache client with time-bucketed key namespacing
/// and header-only liveness reads.
///
/// The store handle is connected lazily on first use and memoized for
/// the lifetime of the client; concurrent first uses race on a single
/// initialization. No other state is shared between calls.
///
/// Reads do not know the ttl a key was written with, so every read path
/// probes the candidate bucket prefixes tightest-class-first, with the
/// persistent bucket last, and takes the first object found.
pub struct BucketedCache {
    config: Config,
    layout: BucketLayout,
    factory: Arc<dyn StoreFactory>,
    store: OnceCell<Arc<dyn ObjectStore>>,
    clock: Arc<dyn Clock>,
}

impl BucketedCache {
    pub fn new(config: Config, factory: Arc<dyn StoreFactory>) -> Result<Self> {
        Self::with_clock(config, factory, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Config,
        factory: Arc<dyn StoreFactory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let layout = BucketLayout::new(config.bucket_days.clone())?;
        Ok(Self {
            config,
            layout,
            factory,
            store: OnceCell::new(),
            clock,
        })
    }

    pub fn layout(&self) -> &BucketLayout {
        &self.layout
    }

    /// Store handle, connected on first use and reused by every later call.
    async fn store(&self) -> Result<&Arc<dyn ObjectStore>> {
        self.store
            .get_or_try_init(|| async {
                debug!(bucket = %self.config.store_bucket, "connecting object store");
                self.factory.connect(&self.config).await
            })
            .await
    }

    /// Candidate storage keys for a logical key, in probe order.
    fn candidates(&self, logical_key: &str) -> Vec<String> {
        self.layout
            .probe_labels()
            .into_iter()
            .map(|label| namespaced_key(&label, logical_key))
            .collect()
    }

    /// Write an entry as a whole-object PUT, then clear any copy the
    /// same logical key left in the other buckets so a rewrite under a
    /// different ttl class wins immediately.
    ///
    /// A ttl must fit one of the configured bucket classes; `None` routes
    /// the entry to the persistent bucket with a zero expiration.
    pub async fn set(&self, logical_key: &str, payload: Bytes, ttl: Option<TtlSecs>) -> Result<()> {
        let (label, expires_at) = match ttl {
            Some(ttl) => {
                let class = self.layout.resolve(ttl)?;
                (class.label(), self.clock.now() + ttl.as_secs() as f64)
            }
            None => (PERSISTENT_BUCKET.to_string(), envelope::NEVER_EXPIRES),
        };

        let header = Header::new(expires_at, self.config.header_version);
        let entry = envelope::encode(&header, &payload);
        let storage_key = namespaced_key(&label, logical_key);
        debug!(key = %storage_key, bytes = entry.len(), "writing cache entry");
        let store = self.store().await?;
        store.put(&storage_key, entry).await?;

        for candidate in self.candidates(logical_key) {
            if candidate != storage_key {
                store.delete(&candidate).await?;
            }
        }
        Ok(())
    }

    /// Liveness probe that reads exactly the header window of each
    /// candidate object. Payload bytes are never requested, so the cost
    /// is O(header size) regardless of entry size.
    pub async fn has_key(&self, logical_key: &str) -> Result<bool> {
        let store = self.store().await?;
        let now = self.clock.now();

        for storage_key in self.candidates(logical_key) {
            let head = match store.get_range(&storage_key, 0..HEADER_SIZE as u64).await {
                Ok(head) => head,
                Err(Error::NotFound) => continue,
                Err(err) => return Err(err),
            };
            if self.live_header(&storage_key, &head, now).is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Read an entry's payload.
    ///
    /// Expired, version-mismatched, and corrupt entries are misses; the
    /// body stream is dropped before any payload is pulled once the
    /// header rules an entry out. Transport errors propagate unchanged.
    pub async fn get(&self, logical_key: &str) -> Result<Option<Bytes>> {
        let store = self.store().await?;
        let now = self.clock.now();

        for storage_key in self.candidates(logical_key) {
            let stream = match store.get(&storage_key).await {
                Ok(stream) => stream,
                Err(Error::NotFound) => continue,
                Err(err) => return Err(err),
            };
            if let Some(payload) = self.read_live_payload(&storage_key, stream, now).await? {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Remove the entry from every bucket it could live under. Absence
    /// is not an error.
    pub async fn delete(&self, logical_key: &str) -> Result<bool> {
        let store = self.store().await?;
        let mut deleted = false;
        for storage_key in self.candidates(logical_key) {
            deleted |= store.delete(&storage_key).await?;
        }
        Ok(deleted)
    }

    /// Decode and gate a header window. Data-shape problems and dead
    /// entries come back as `None`; both are ordinary misses.
    fn live_header(&self, storage_key: &str, head: &[u8], now: f64) -> Option<Header> {
        let header = match envelope::decode_header(head) {
            Ok(header) => header,
            // decode errors are data-shape problems, absorbed as misses
            Err(err) => {
                warn!(key = %storage_key, %err, "unreadable entry header, treating as miss");
                return None;
            }
        };
        if !header.is_supported(self.config.header_version) {
            debug!(
                key = %storage_key,
                version = header.version,
                expected = self.config.header_version,
                "unexpected header version, treating as miss"
            );
            return None;
        }
        if header.is_expired(now) {
            debug!(key = %storage_key, expires_at = header.expires_at, "entry expired, treating as miss");
            return None;
        }
        Some(header)
    }

    /// Pull the header window off the stream, gate it, then consume the
    /// remainder only for live entries. Returning on the miss path drops
    /// the stream, which is the active early termination.
    async fn read_live_payload(
        &self,
        storage_key: &str,
        mut stream: ByteStream,
        now: f64,
    ) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::new();
        while buf.len() < HEADER_SIZE {
            match stream.next().await {
                Some(chunk) => buf.extend_from_slice(&chunk?),
                // object shorter than the header
                None => {
                    warn!(key = %storage_key, bytes = buf.len(), "truncated cache entry, treating as miss");
                    return Ok(None);
                }
            }
        }

        if self.live_header(storage_key, &buf[..HEADER_SIZE], now).is_none() {
            return Ok(None);
        }

        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let mut entry = buf.freeze();
        entry.advance(HEADER_SIZE);
        Ok(Some(entry))
    }
}

impl std::fmt::Debug for BucketedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketedCache")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .field("connected", &self.store.initialized())
            .finish()
    }
}
