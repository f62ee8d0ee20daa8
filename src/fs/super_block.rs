use serde::{Deserialize, Serialize};

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::{
        config::{
            BLOCKS_PER_DESCRIPTOR, BLOCK_BITMAP_START_BLOCK_ID, DESCRIPTORS_PER_BLOCK, MAGIC,
            SUPER_BLOCK_BLOCK_ID,
        },
        error::{FileSystemError, Result},
    },
};

/// Image geometry, stored in block 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub magic: u64,
    pub block_size: u32,
    pub total_blocks: u64,
    /** block bitmap */
    pub bitmap_start: u64,
    pub bitmap_blocks: u64,
    /** descriptor table */
    pub table_start: u64,
    pub table_blocks: u64,
    pub descriptor_capacity: u64,
    /** content blocks */
    pub data_start: u64,
}

impl SuperBlock {
    /// Lays out an image of `total_blocks` blocks. Fails when the metadata plus
    /// the root directory's first content block do not fit.
    pub fn new(total_blocks: u64) -> Result<Self> {
        let bits_per_block = 8 * BLOCK_SIZE as u64;
        let bitmap_blocks = total_blocks.div_ceil(bits_per_block);

        let wanted = total_blocks.div_ceil(BLOCKS_PER_DESCRIPTOR).max(1);
        let table_blocks = wanted.div_ceil(DESCRIPTORS_PER_BLOCK);
        let descriptor_capacity = table_blocks * DESCRIPTORS_PER_BLOCK;

        let bitmap_start = BLOCK_BITMAP_START_BLOCK_ID;
        let table_start = bitmap_start + bitmap_blocks;
        let data_start = table_start + table_blocks;

        if total_blocks < data_start + 1 {
            return Err(FileSystemError::InvalidSize(total_blocks));
        }

        Ok(Self {
            magic: MAGIC,
            block_size: BLOCK_SIZE as u32,
            total_blocks,
            bitmap_start,
            bitmap_blocks,
            table_start,
            table_blocks,
            descriptor_capacity,
            data_start,
        })
    }

    pub fn load<D: BlockDevice>(disk: &D) -> Result<Self> {
        let mut block: Block = [0; BLOCK_SIZE];
        disk.read_block(SUPER_BLOCK_BLOCK_ID, &mut block)?;
        let sb: SuperBlock = bincode::deserialize(&block)?;

        if sb.magic != MAGIC {
            return Err(FileSystemError::Corrupted(
                "bad magic number, image is not formatted".to_string(),
            ));
        }
        if sb.block_size as usize != BLOCK_SIZE || sb.total_blocks > disk.block_count() {
            return Err(FileSystemError::Corrupted(format!(
                "geometry mismatch: {} blocks of {} bytes",
                sb.total_blocks, sb.block_size
            )));
        }
        Ok(sb)
    }

    pub fn sync<D: BlockDevice>(&self, disk: &D) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        let mut block: Block = [0; BLOCK_SIZE];
        block[..bytes.len()].copy_from_slice(&bytes);
        disk.write_block(SUPER_BLOCK_BLOCK_ID, &block)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    #[test]
    fn layout_for_small_image() {
        let sb = SuperBlock::new(500).unwrap();
        assert_eq!(sb.bitmap_blocks, 1);
        assert_eq!(sb.descriptor_capacity, 128);
        assert_eq!(sb.table_blocks, 32);
        assert_eq!(sb.data_start, 34);
    }

    #[test]
    fn too_small_images_are_rejected() {
        assert!(matches!(
            SuperBlock::new(3),
            Err(FileSystemError::InvalidSize(3))
        ));
        assert!(matches!(
            SuperBlock::new(0),
            Err(FileSystemError::InvalidSize(0))
        ));
        assert!(SuperBlock::new(4).is_ok());
    }

    #[test]
    fn round_trips_through_block_zero() {
        let disk = MemDisk::new(64);
        let sb = SuperBlock::new(64).unwrap();
        sb.sync(&disk).unwrap();
        assert_eq!(SuperBlock::load(&disk).unwrap(), sb);
    }

    #[test]
    fn blank_image_is_not_formatted() {
        let disk = MemDisk::new(64);
        assert!(matches!(
            SuperBlock::load(&disk),
            Err(FileSystemError::Corrupted(_))
        ));
    }
}
