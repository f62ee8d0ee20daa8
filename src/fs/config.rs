use crate::disk::BLOCK_SIZE;

pub const SUPER_BLOCK_BLOCK_ID: u64 = 0;
pub const BLOCK_BITMAP_START_BLOCK_ID: u64 = 1;

/// Identifies an image formatted by this file system.
pub const MAGIC: u64 = 0x4D69_6E69_4653_0001;

/// Bytes reserved per descriptor slot in the descriptor table.
pub const DESCRIPTOR_SLOT_SIZE: usize = 128;
pub const DESCRIPTORS_PER_BLOCK: u64 = (BLOCK_SIZE / DESCRIPTOR_SLOT_SIZE) as u64;

/// One descriptor slot is reserved for every this many blocks of the image.
pub const BLOCKS_PER_DESCRIPTOR: u64 = 4;

/// Direct block pointers held in each descriptor.
pub const DIRECT_PTRS: usize = 12;
/// Pointers held by the single indirect block (little-endian u32 each).
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / 4;
pub const MAX_FILE_BLOCKS: usize = DIRECT_PTRS + PTRS_PER_BLOCK;
pub const MAX_FILE_SIZE: u64 = (MAX_FILE_BLOCKS * BLOCK_SIZE) as u64;

/// Fixed width of one encoded directory entry: name bytes then a u32 id.
pub const DIR_ENTRY_SIZE: usize = 32;
pub const MAX_NAME_LEN: usize = DIR_ENTRY_SIZE - 4;

pub const ROOT_ID: u32 = 0;

/// Symlink dereferences allowed during a single lookup.
pub const MAX_SYMLINK_FOLLOWS: usize = 16;

/// Number of blocks needed to hold `size` bytes.
pub fn blocks_for(size: u64) -> usize {
    size.div_ceil(BLOCK_SIZE as u64) as usize
}
