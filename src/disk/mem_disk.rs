use std::sync::{Mutex, PoisonError};

use crate::disk::{
    block_device::{BlockDevice, Result},
    types::{Block, BLOCK_SIZE},
};

/// A disk image held in memory.
#[derive(Debug)]
pub struct MemDisk {
    bytes: Mutex<Vec<u8>>,
    block_count: u64,
}

impl MemDisk {
    pub fn new(block_count: u64) -> Self {
        Self {
            bytes: Mutex::new(vec![0; block_count as usize * BLOCK_SIZE]),
            block_count,
        }
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        self.check_range(block_id)?;
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        let start = block_id as usize * BLOCK_SIZE;
        buf.copy_from_slice(&bytes[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        self.check_range(block_id)?;
        let mut bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        let start = block_id as usize * BLOCK_SIZE;
        bytes[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskError;

    #[test]
    fn last_write_wins() {
        let disk = MemDisk::new(3);
        disk.write_block(1, &[1; BLOCK_SIZE]).unwrap();
        disk.write_block(1, &[2; BLOCK_SIZE]).unwrap();

        let mut buf = [0; BLOCK_SIZE];
        disk.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, [2; BLOCK_SIZE]);

        disk.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, [0; BLOCK_SIZE]);
    }

    #[test]
    fn read_past_capacity_fails() {
        let disk = MemDisk::new(2);
        let mut buf = [0; BLOCK_SIZE];
        assert!(matches!(
            disk.read_block(2, &mut buf),
            Err(DiskError::OutOfRange { .. })
        ));
    }
}
