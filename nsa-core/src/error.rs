//! Error taxonomy for location and sampling

/// Errors raised while locating or sampling an animation asset.
///
/// Location errors abort the whole asset load. Sampling errors are per call
/// and never touch the located data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NsaError {
    /// Malformed header, count or pointer
    #[error("corrupt asset: {0}")]
    CorruptAsset(String),

    /// Caller asked for a channel, bone or frame outside valid bounds
    #[error("{what} index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        what: &'static str,
        index: u64,
        limit: u64,
    },

    /// Structural shape this decoder does not recognise
    #[error("unsupported layout variant: {0}")]
    UnsupportedLayoutVariant(String),

    /// `locate` was called on a buffer that is already located
    #[error("asset buffer is already located")]
    AlreadyLocated,

    /// The buffer has not been located yet
    #[error("asset buffer has not been located")]
    NotLocated,

    /// No locate function is registered for this type id
    #[error("no locate function registered for type {0:#010x}")]
    UnknownType(u32),

    /// A located object had a different type than the caller expected
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    /// Sample time was NaN or infinite
    #[error("invalid sample time {0}")]
    InvalidTime(f32),
}

impl NsaError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptAsset(msg.into())
    }

    pub(crate) fn out_of_range(what: &'static str, index: u64, limit: u64) -> Self {
        Self::IndexOutOfRange { what, index, limit }
    }
}

pub type Result<T, E = NsaError> = std::result::Result<T, E>;
