use tracing::warn;

/// Process-wide cache backend configuration, read once at construction
/// and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Storage container (bucket) the cache writes into.
    pub store_bucket: String,
    /// Header version stamped onto every written entry.
    pub header_version: u16,
    /// Duration classes in whole days, one per storage lifecycle rule.
    pub bucket_days: Vec<u32>,
}

impl Config {
    const DEFAULT_STORE_BUCKET: &str = "stratus-cache";
    const DEFAULT_HEADER_VERSION: u16 = 1;
    const DEFAULT_BUCKET_DAYS: [u32; 3] = [1, 7, 30];

    pub fn new(store_bucket: impl Into<String>, header_version: u16, bucket_days: Vec<u32>) -> Self {
        Self {
            store_bucket: store_bucket.into(),
            header_version,
            bucket_days,
        }
    }

    pub fn from_env() -> Self {
        let store_bucket = std::env::var("STRATUS_STORE_BUCKET")
            .unwrap_or_else(|_| Self::DEFAULT_STORE_BUCKET.to_string());
        let header_version = std::env::var("STRATUS_HEADER_VERSION")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(Self::DEFAULT_HEADER_VERSION);
        let bucket_days = std::env::var("STRATUS_BUCKET_DAYS")
            .ok()
            .map(|raw| parse_bucket_days(&raw))
            .filter(|days| !days.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_BUCKET_DAYS.to_vec());
        Self {
            store_bucket,
            header_version,
            bucket_days,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_STORE_BUCKET,
            Self::DEFAULT_HEADER_VERSION,
            Self::DEFAULT_BUCKET_DAYS.to_vec(),
        )
    }
}

fn parse_bucket_days(raw: &str) -> Vec<u32> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<u32>() {
            Ok(days) => Some(days),
            Err(_) => {
                warn!("ignoring unparseable bucket class '{}' in STRATUS_BUCKET_DAYS", entry);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.store_bucket, "stratus-cache");
        assert_eq!(config.header_version, 1);
        assert_eq!(config.bucket_days, vec![1, 7, 30]);
    }

    #[test]
    fn bucket_day_parsing_skips_garbage() {
        assert_eq!(parse_bucket_days("1, 7,30"), vec![1, 7, 30]);
        assert_eq!(parse_bucket_days("1,x,30"), vec![1, 30]);
        assert!(parse_bucket_days("").is_empty());
    }
}
