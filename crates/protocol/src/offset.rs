use std::fmt;

/// Position in the object the next request should start from.
///
/// `Resume` means the true position is unknown and the service has to be
/// asked for it (see [`ContentRange::Probe`](crate::ContentRange::Probe)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Offset {
    Known(u64),
    #[default]
    Resume,
}

impl Offset {
    /// Returns the byte position if known.
    pub fn known(self) -> Option<u64> {
        match self {
            Offset::Known(n) => Some(n),
            Offset::Resume => None,
        }
    }

    /// Returns `true` for the resume marker.
    pub fn is_resume(self) -> bool {
        matches!(self, Offset::Resume)
    }
}

impl From<u64> for Offset {
    fn from(n: u64) -> Self {
        Offset::Known(n)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Known(n) => write!(f, "{n}"),
            Offset::Resume => f.write_str("resume"),
        }
    }
}
