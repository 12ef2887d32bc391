use crate::cache::BucketedCache;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result, TtlSecs};
use std::marker::PhantomData;

/// Injected payload codec. The envelope and store client never inspect
/// payload bytes; what a cached value "is" lives entirely behind this
/// trait.
pub trait Serializer<V>: Send + Sync + 'static {
    fn serialize(&self, value: &V) -> Result<Bytes>;
    fn deserialize(&self, bytes: Bytes) -> Result<V>;
}

/// serde_json-backed serializer for any serde value type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<V> Serializer<V> for JsonSerializer
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn serialize(&self, value: &V) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: Bytes) -> Result<V> {
        serde_json::from_slice(&bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Typed facade over `BucketedCache` that routes values through an
/// injected serializer.
///
/// Serialization failures surface as `Error::Serialization`; they are a
/// caller-side shape problem, not a stored-data problem, and are never
/// downgraded to misses.
pub struct TypedCache<V, S> {
    cache: BucketedCache,
    serializer: S,
    _value: PhantomData<fn() -> V>,
}

impl<V, S> TypedCache<V, S>
where
    S: Serializer<V>,
{
    pub fn new(cache: BucketedCache, serializer: S) -> Self {
        Self {
            cache,
            serializer,
            _value: PhantomData,
        }
    }

    pub fn inner(&self) -> &BucketedCache {
        &self.cache
    }

    pub async fn set(&self, logical_key: &str, value: &V, ttl: Option<TtlSecs>) -> Result<()> {
        let payload = self.serializer.serialize(value)?;
        self.cache.set(logical_key, payload, ttl).await
    }

    pub async fn get(&self, logical_key: &str) -> Result<Option<V>> {
        match self.cache.get(logical_key).await? {
            Some(payload) => Ok(Some(self.serializer.deserialize(payload)?)),
            None => Ok(None),
        }
    }

    pub async fn has_key(&self, logical_key: &str) -> Result<bool> {
        self.cache.has_key(logical_key).await
    }

    pub async fn delete(&self, logical_key: &str) -> Result<bool> {
        self.cache.delete(logical_key).await
    }
}
