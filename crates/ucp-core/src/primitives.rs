//! # Primitives
//!
//! Compiled-in constants for the UCP core.
//!
//! These values fix the observable contracts that callers validate against
//! without parsing: id shape, token estimation ratio, document format tags
//! and parser bounds.

/// Literal prefix of every issued block id.
pub const ID_PREFIX: &str = "blk_";

/// Number of lowercase hex digits following [`ID_PREFIX`].
pub const ID_HEX_WIDTH: usize = 12;

/// Total length of an issued block id (`blk_` + 12 hex digits).
pub const ID_LENGTH: usize = ID_PREFIX.len() + ID_HEX_WIDTH;

/// Largest value that fits the hex suffix of a sequential id.
pub const MAX_SEQUENTIAL_ID: u64 = (1 << (4 * ID_HEX_WIDTH)) - 1;

/// Approximate number of characters per LLM token.
///
/// Token estimates are integer-only: `ceil(chars / CHARS_PER_TOKEN)`.
pub const CHARS_PER_TOKEN: usize = 4;

/// Maximum characters shown for a block in a structural outline.
pub const EXCERPT_LENGTH: usize = 50;

// =============================================================================
// UCL LIMITS
// =============================================================================

/// Maximum accepted UCL source size in bytes (1 MiB).
///
/// Larger programs are rejected before tokenization.
pub const MAX_UCL_SOURCE_LEN: usize = 1024 * 1024;

/// Default upper bound on commands in a single execution run.
pub const DEFAULT_MAX_COMMANDS: usize = 10_000;

// =============================================================================
// DOCUMENT FORMAT
// =============================================================================

/// Format tag written into every serialized graph document.
pub const FORMAT_TAG: &str = "ucp-graph";

/// Current document format version.
///
/// Increment this when making breaking changes to the record layout.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum accepted serialized document size (256 MiB).
///
/// Validated BEFORE attempting deserialization.
pub const MAX_DOCUMENT_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;
