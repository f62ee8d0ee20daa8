use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::error::Result,
};

const BITS_PER_BLOCK: u64 = 8 * BLOCK_SIZE as u64;

/// Free-block pool: one bit per block of the image, set when the block is used.
#[derive(Debug)]
pub struct BlockBitmap {
    pub bits: Vec<u8>,
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub start_block: u64,
    dirty: Vec<bool>, // per bitmap block
}

impl BlockBitmap {
    pub fn new(total_blocks: u64, start_block: u64) -> Self {
        let byte_len = total_blocks.div_ceil(8) as usize;
        let bitmap_blocks = total_blocks.div_ceil(BITS_PER_BLOCK) as usize;

        Self {
            bits: vec![0; byte_len],
            total_blocks,
            free_blocks: total_blocks,
            start_block,
            dirty: vec![true; bitmap_blocks],
        }
    }

    /// Allocates the lowest free block.
    pub fn alloc(&mut self) -> Option<u64> {
        for (byte_index, byte) in self.bits.iter_mut().enumerate() {
            if *byte != 0xFF {
                for bit in 0..8 {
                    let index = (byte_index * 8 + bit) as u64;
                    if index >= self.total_blocks {
                        return None;
                    }
                    if *byte & (1 << bit) == 0 {
                        *byte |= 1 << bit;
                        self.free_blocks -= 1;
                        self.mark_dirty(index);
                        return Some(index);
                    }
                }
            }
        }
        None
    }

    /// Marks a specific block used (metadata reservation).
    pub fn reserve(&mut self, index: u64) {
        if index >= self.total_blocks || self.is_used(index) {
            return;
        }
        self.bits[(index / 8) as usize] |= 1 << (index % 8);
        self.free_blocks -= 1;
        self.mark_dirty(index);
    }

    pub fn free(&mut self, index: u64) {
        if index >= self.total_blocks {
            return;
        }

        let byte_index = (index / 8) as usize;
        let bit_index = (index % 8) as u8;

        if self.bits[byte_index] & (1 << bit_index) != 0 {
            self.bits[byte_index] &= !(1 << bit_index);
            self.free_blocks += 1;
            self.mark_dirty(index);
        }
    }

    pub fn is_used(&self, index: u64) -> bool {
        if index >= self.total_blocks {
            return false;
        }
        self.bits[(index / 8) as usize] & (1 << (index % 8)) != 0
    }

    fn mark_dirty(&mut self, index: u64) {
        self.dirty[(index / BITS_PER_BLOCK) as usize] = true;
    }

    pub fn load<D: BlockDevice>(disk: &D, start_block: u64, total_blocks: u64) -> Result<Self> {
        let size_in_blocks = total_blocks.div_ceil(BITS_PER_BLOCK);
        let mut bits = Vec::with_capacity(size_in_blocks as usize * BLOCK_SIZE);
        let mut block_buf: Block = [0; BLOCK_SIZE];

        for i in 0..size_in_blocks {
            disk.read_block(start_block + i, &mut block_buf)?;
            bits.extend_from_slice(&block_buf);
        }

        // drop the padding after the last valid bit
        bits.truncate(total_blocks.div_ceil(8) as usize);
        if let Some(last) = bits.last_mut() {
            let valid = total_blocks % 8;
            if valid != 0 {
                *last &= (1u8 << valid) - 1;
            }
        }

        let used: u64 = bits.iter().map(|b| b.count_ones() as u64).sum();

        Ok(Self {
            bits,
            total_blocks,
            free_blocks: total_blocks - used,
            start_block,
            dirty: vec![false; size_in_blocks as usize],
        })
    }

    /// Writes every modified bitmap block back to disk.
    pub fn sync<D: BlockDevice>(&mut self, disk: &D) -> Result<()> {
        for i in 0..self.dirty.len() {
            if !self.dirty[i] {
                continue;
            }
            let start = i * BLOCK_SIZE;
            let end = (start + BLOCK_SIZE).min(self.bits.len());

            let mut block_buf: Block = [0; BLOCK_SIZE];
            block_buf[..end - start].copy_from_slice(&self.bits[start..end]);
            disk.write_block(self.start_block + i as u64, &block_buf)?;
            self.dirty[i] = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    #[test]
    fn allocates_lowest_free_block() {
        let mut bitmap = BlockBitmap::new(20, 1);
        bitmap.reserve(0);
        bitmap.reserve(1);
        assert_eq!(bitmap.alloc(), Some(2));
        assert_eq!(bitmap.alloc(), Some(3));

        bitmap.free(2);
        assert_eq!(bitmap.alloc(), Some(2));
        assert_eq!(bitmap.free_blocks, 16);
    }

    #[test]
    fn exhausts_at_total_blocks() {
        let mut bitmap = BlockBitmap::new(10, 1);
        for expected in 0..10 {
            assert_eq!(bitmap.alloc(), Some(expected));
        }
        assert_eq!(bitmap.alloc(), None);
        assert_eq!(bitmap.free_blocks, 0);
    }

    #[test]
    fn double_free_is_ignored() {
        let mut bitmap = BlockBitmap::new(8, 1);
        let block = bitmap.alloc().unwrap();
        bitmap.free(block);
        bitmap.free(block);
        assert_eq!(bitmap.free_blocks, 8);
    }

    #[test]
    fn reload_recounts_free_blocks() {
        let disk = MemDisk::new(4);
        let mut bitmap = BlockBitmap::new(13, 1);
        bitmap.reserve(0);
        bitmap.reserve(12);
        bitmap.alloc();
        bitmap.sync(&disk).unwrap();

        let loaded = BlockBitmap::load(&disk, 1, 13).unwrap();
        assert_eq!(loaded.free_blocks, 10);
        assert!(loaded.is_used(0));
        assert!(loaded.is_used(1));
        assert!(loaded.is_used(12));
        assert!(!loaded.is_used(2));
    }
}
