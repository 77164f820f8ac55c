use std::fmt;

/// Body compression tag carried in every header
///
/// Any `u16` is representable so that a header naming an algorithm this side
/// does not know still decodes; the codec rejects it when it resolves the
/// compressor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompressType(pub u16);

impl CompressType {
    pub const RAW: Self = Self(0);
    pub const GZIP: Self = Self(1);
    pub const SNAPPY: Self = Self(2);
    pub const ZLIB: Self = Self(3);

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Human readable name for the built-in tags
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("raw"),
            1 => Some("gzip"),
            2 => Some("snappy"),
            3 => Some("zlib"),
            _ => None,
        }
    }
}

impl From<u16> for CompressType {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<CompressType> for u16 {
    fn from(value: CompressType) -> Self {
        value.0
    }
}

impl fmt::Display for CompressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown({})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_known_tags() {
        assert_eq!(CompressType::GZIP.to_string(), "gzip");
        assert_eq!(CompressType(42).to_string(), "unknown(42)");
    }

    #[test]
    fn default_is_raw() {
        assert_eq!(CompressType::default(), CompressType::RAW);
    }
}
