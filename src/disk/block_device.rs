use thiserror::Error;

use crate::disk::types::Block;

/// Errors raised by a storage medium.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("block {block} out of range (capacity {capacity})")]
    OutOfRange { block: u64, capacity: u64 },

    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiskError>;

/// Indexed block storage. Last write wins and is visible to every later read.
pub trait BlockDevice: Send + Sync {
    fn block_count(&self) -> u64;
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()>;
    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()>;

    fn check_range(&self, block_id: u64) -> Result<()> {
        let capacity = self.block_count();
        if block_id >= capacity {
            return Err(DiskError::OutOfRange {
                block: block_id,
                capacity,
            });
        }
        Ok(())
    }
}
