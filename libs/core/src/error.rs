use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// Header bytes were empty, truncated or carried an impossible value
    #[error("malformed header: {0}")]
    Malformed(&'static str),
}

impl HeaderError {
    pub fn malformed(reason: &'static str) -> Self {
        Self::Malformed(reason)
    }
}

pub type Result<T> = std::result::Result<T, HeaderError>;
