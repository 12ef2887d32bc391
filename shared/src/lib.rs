// shared/src/lib.rs

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("malformed header: need {need} bytes, got {got}")]
    MalformedHeader { need: usize, got: usize },
    #[error("unsupported header version {0}")]
    UnsupportedVersion(u16),
    #[error("ttl of {ttl_secs}s exceeds the largest configured bucket ({largest_secs}s)")]
    TtlExceedsAllBuckets { ttl_secs: u64, largest_secs: u64 },
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("config: {0}")]
    Config(String),
    #[error("storage transport: {0}")]
    Transport(String),
}

impl Error {
    /// Data-shape problems are absorbed as cache misses on read paths.
    /// Everything else must stay visible to the caller.
    pub fn is_data_shape(&self) -> bool {
        matches!(
            self,
            Error::MalformedHeader { .. } | Error::UnsupportedVersion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Time-to-live in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TtlSecs(pub u64);

impl TtlSecs {
    pub const SECS_PER_DAY: u64 = 86_400;

    pub const fn from_days(days: u64) -> Self {
        TtlSecs(days * Self::SECS_PER_DAY)
    }

    pub const fn from_hours(hours: u64) -> Self {
        TtlSecs(hours * 3_600)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }
}

pub mod config;
