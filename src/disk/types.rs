/// Size of one logical block in bytes.
/// Every disk read and write moves exactly one block.
pub const BLOCK_SIZE: usize = 512;

/// Default number of blocks for a freshly created image (512 KB).
pub const DEFAULT_BLOCK_COUNT: u64 = 1024;

/// One logical block.
pub type Block = [u8; BLOCK_SIZE];

/// A block filled with zeros.
pub const ZERO_BLOCK: Block = [0; BLOCK_SIZE];
