//! `Content-Range` request values and `Range` response parsing.

use std::fmt;

use crate::ProtocolError;

/// Value of the `Content-Range` header of a chunk PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRange {
    /// `bytes <start>-<end>/<total>`, `end` inclusive.
    Bytes { start: u64, end: u64, total: u64 },
    /// `bytes */<total>`: the request carries no bytes. Used for probes and
    /// for an empty final request.
    Probe { total: u64 },
}

impl ContentRange {
    /// Range for `len` bytes starting at `start`.
    ///
    /// An empty window has no valid `start-end` form and becomes a probe range.
    pub fn for_window(start: u64, len: u64, total: u64) -> Self {
        if len == 0 {
            ContentRange::Probe { total }
        } else {
            ContentRange::Bytes {
                start,
                end: start + len - 1,
                total,
            }
        }
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentRange::Bytes { start, end, total } => {
                write!(f, "bytes {start}-{end}/{total}")
            }
            ContentRange::Probe { total } => write!(f, "bytes */{total}"),
        }
    }
}

/// Parses the `Range` header of a 308 response and returns the last
/// persisted byte.
///
/// Accepts `<unit> 0-<n>` and `<unit>=0-<n>`. The service always reports a
/// prefix, so a start other than 0 is rejected.
pub fn parse_range_header(value: &str) -> Result<u64, ProtocolError> {
    let invalid = || ProtocolError::InvalidRangeHeader(value.to_string());

    let value = value.trim();
    let (unit, span) = value
        .split_once(['=', ' '])
        .ok_or_else(invalid)?;
    if unit.is_empty() {
        return Err(invalid());
    }

    let (start, end) = span.trim().split_once('-').ok_or_else(invalid)?;
    if start.trim() != "0" {
        return Err(invalid());
    }
    end.trim().parse::<u64>().map_err(|_| invalid())
}
