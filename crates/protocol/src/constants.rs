/// Default chunk size: 8 MiB.
///
/// Must stay a multiple of [`CHUNK_GRANULARITY`] for services that reject
/// unaligned intermediate chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Alignment most resumable-upload services require for non-final chunks.
pub const CHUNK_GRANULARITY: usize = 256 * 1024;

/// JSON key carrying the object name in the negotiation request.
pub const DEFAULT_FILE_KEY: &str = "fileName";

/// "Resume Incomplete": the service stored a prefix of the object.
pub const STATUS_RESUME_INCOMPLETE: u16 = 308;

/// Header names used by the chunk PUT exchange.
pub const HEADER_CONTENT_RANGE: &str = "Content-Range";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_RANGE: &str = "Range";

/// Returns `true` for the statuses that finalize an upload (200, 201).
pub fn is_final_status(status: u16) -> bool {
    status == 200 || status == 201
}
