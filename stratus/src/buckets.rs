use shared::{Error, Result, TtlSecs};

/// Label for entries with no expiration. Carries no lifecycle rule.
pub const PERSISTENT_BUCKET: &str = "persistent";

/// A ttl upper bound counted in whole days, matching one storage-side
/// lifecycle rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BucketClass {
    days: u32,
}

impl BucketClass {
    pub fn from_days(days: u32) -> Self {
        Self { days }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// The longest ttl this bucket may hold.
    pub fn capacity(&self) -> TtlSecs {
        TtlSecs::from_days(u64::from(self.days))
    }

    /// Storage-key prefix label, e.g. `1-day` or `7-days`.
    pub fn label(&self) -> String {
        if self.days == 1 {
            "1-day".to_string()
        } else {
            format!("{}-days", self.days)
        }
    }
}

/// Ascending, deduplicated set of bucket classes built from configuration.
#[derive(Debug, Clone)]
pub struct BucketLayout {
    classes: Vec<BucketClass>,
}

impl BucketLayout {
    pub fn new(mut days: Vec<u32>) -> Result<Self> {
        days.retain(|d| *d > 0);
        days.sort_unstable();
        days.dedup();
        if days.is_empty() {
            return Err(Error::Config(
                "at least one non-zero bucket class is required".to_string(),
            ));
        }
        Ok(Self {
            classes: days.into_iter().map(BucketClass::from_days).collect(),
        })
    }

    pub fn classes(&self) -> &[BucketClass] {
        &self.classes
    }

    /// Smallest configured class that can hold the requested ttl,
    /// boundary inclusive. A ttl larger than every class is a caller
    /// error, never silently clamped.
    pub fn resolve(&self, ttl: TtlSecs) -> Result<BucketClass> {
        self.classes
            .iter()
            .copied()
            .find(|class| class.capacity() >= ttl)
            .ok_or_else(|| Error::TtlExceedsAllBuckets {
                ttl_secs: ttl.as_secs(),
                largest_secs: self
                    .classes
                    .last()
                    .map(|class| class.capacity().as_secs())
                    .unwrap_or(0),
            })
    }

    /// Read-side probe order: tightest class first, persistent last.
    pub fn probe_labels(&self) -> Vec<String> {
        self.classes
            .iter()
            .map(BucketClass::label)
            .chain(std::iter::once(PERSISTENT_BUCKET.to_string()))
            .collect()
    }
}

/// Namespace a logical key under a bucket label.
pub fn namespaced_key(label: &str, logical_key: &str) -> String {
    format!("{label}/{logical_key}")
}

/// Recover the logical key by stripping the bucket prefix.
pub fn logical_key(storage_key: &str) -> Option<&str> {
    storage_key.split_once('/').map(|(_, rest)| rest)
}
