/// Entries in a byte class table: one per byte value plus the mode label.
pub const TABLE_SIZE: usize = 257;

/// Slot of a byte class table that holds the mode label.
pub const MODE_SLOT: usize = 256;

pub const DEFAULT_INDENT: usize = 0;

pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Strings up to this many bytes are stored inline in the node.
pub const INLINE_MAX: usize = 23;

/// Capacity of a pooled string block. Longer strings go to the heap.
pub const BSTR_CAPACITY: usize = 256;

/// Nodes the parser takes from the pool in one go.
pub const BATCH_SIZE: usize = 32;

/// Digits a fraction may bring the numeral to before it is kept as a big
/// number. Leading zeros count; trailing zeros do not. Numerals without a
/// fraction are not limited by it.
pub const DEC_MAX: usize = 14;

/// Exponent magnitude at which a numeral becomes a big number.
pub const EXP_MAX: i64 = 1023;

/// Limit on the fractional divisor; reaching it turns the numeral into a big number.
pub const DIV_MAX: u64 = 100_000_000_000_000_000;

/// Largest array index accepted in a path segment.
pub const MAX_INDEX: usize = 200_000_000;

/// Nesting handed to a serde serializer, which recurses once per level.
/// Matches the recursion limit of serde_json's deserializer.
pub const SERIALIZE_MAX_DEPTH: usize = 128;

/// Open containers the incremental wire builder tracks.
pub const WIRE_STACK_SIZE: usize = 256;

/// Slots in the queue between the parser and a caller worker.
pub const CALLER_QUEUE: usize = 16;

/// Initial Reader buffer size for streaming sources.
pub const READ_BUF_SIZE: usize = 4096;
