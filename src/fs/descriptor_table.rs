use std::collections::BTreeSet;

use log::debug;

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::{
        config::{blocks_for, DESCRIPTORS_PER_BLOCK, DESCRIPTOR_SLOT_SIZE, DIRECT_PTRS, MAX_FILE_BLOCKS},
        descriptor::{DescriptorId, DiskSlot, FileDescriptor, FileType},
        error::{FileSystemError, Result},
        super_block::SuperBlock,
    },
};

#[derive(Debug, Clone)]
pub enum Slot {
    Free,
    Occupied(FileDescriptor),
}

/// Fixed-capacity arena of descriptors indexed by id. Ids are handed out
/// lowest-first and reused once freed.
#[derive(Debug)]
pub struct DescriptorTable {
    slots: Vec<Slot>,
    start_block: u64,
    dirty: BTreeSet<DescriptorId>,
}

impl DescriptorTable {
    pub fn new(capacity: u64, start_block: u64) -> Self {
        Self {
            slots: vec![Slot::Free; capacity as usize],
            start_block,
            dirty: BTreeSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count()
    }

    /// Occupies the lowest free slot with an empty descriptor.
    pub fn allocate(&mut self, file_type: FileType) -> Result<DescriptorId> {
        let index = self
            .slots
            .iter()
            .position(|s| matches!(s, Slot::Free))
            .ok_or(FileSystemError::NoSpace("descriptors"))?;

        let id = index as DescriptorId;
        self.slots[index] = Slot::Occupied(FileDescriptor::new(id, file_type));
        self.dirty.insert(id);
        debug!("allocated descriptor {} ({:?})", id, file_type);
        Ok(id)
    }

    /// Returns the slot to the pool. Content blocks must already be released.
    pub fn free(&mut self, id: DescriptorId) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            *slot = Slot::Free;
            self.dirty.insert(id);
            debug!("freed descriptor {}", id);
        }
    }

    pub fn get(&self, id: DescriptorId) -> Result<&FileDescriptor> {
        match self.slots.get(id as usize) {
            Some(Slot::Occupied(desc)) => Ok(desc),
            _ => Err(FileSystemError::NotFound(format!("descriptor {}", id))),
        }
    }

    pub fn get_mut(&mut self, id: DescriptorId) -> Result<&mut FileDescriptor> {
        match self.slots.get_mut(id as usize) {
            Some(Slot::Occupied(desc)) => {
                self.dirty.insert(id);
                Ok(desc)
            }
            _ => Err(FileSystemError::NotFound(format!("descriptor {}", id))),
        }
    }

    fn slot_position(&self, id: DescriptorId) -> (u64, usize) {
        let id = id as u64;
        (
            self.start_block + id / DESCRIPTORS_PER_BLOCK,
            (id % DESCRIPTORS_PER_BLOCK) as usize * DESCRIPTOR_SLOT_SIZE,
        )
    }

    pub fn load<D: BlockDevice>(disk: &D, sb: &SuperBlock) -> Result<Self> {
        let mut slots = Vec::with_capacity(sb.descriptor_capacity as usize);
        let mut block_buf: Block = [0; BLOCK_SIZE];

        for block in 0..sb.table_blocks {
            disk.read_block(sb.table_start + block, &mut block_buf)?;
            for chunk in block_buf.chunks_exact(DESCRIPTOR_SLOT_SIZE) {
                let id = slots.len() as DescriptorId;
                let slot = match bincode::deserialize::<DiskSlot>(chunk)? {
                    DiskSlot::Free => Slot::Free,
                    DiskSlot::Occupied(disk_desc) => {
                        let count = blocks_for(disk_desc.size);
                        if count > MAX_FILE_BLOCKS {
                            return Err(FileSystemError::Corrupted(format!(
                                "descriptor {} claims {} bytes",
                                id, disk_desc.size
                            )));
                        }
                        let mut indirect_ptrs = Vec::new();
                        if count > DIRECT_PTRS {
                            if disk_desc.indirect == 0 {
                                return Err(FileSystemError::Corrupted(format!(
                                    "descriptor {} has no indirect block",
                                    id
                                )));
                            }
                            let mut ptr_block: Block = [0; BLOCK_SIZE];
                            disk.read_block(disk_desc.indirect as u64, &mut ptr_block)?;
                            indirect_ptrs = decode_pointers(&ptr_block, count - DIRECT_PTRS);
                        }
                        Slot::Occupied(FileDescriptor::from_disk(id, &disk_desc, &indirect_ptrs))
                    }
                };
                slots.push(slot);
            }
        }
        slots.truncate(sb.descriptor_capacity as usize);

        Ok(Self {
            slots,
            start_block: sb.table_start,
            dirty: BTreeSet::new(),
        })
    }

    /// Writes every modified slot, and its indirect pointer block, back to disk.
    pub fn sync<D: BlockDevice>(&mut self, disk: &D) -> Result<()> {
        let dirty = std::mem::take(&mut self.dirty);
        for id in dirty {
            let (disk_slot, indirect) = match &self.slots[id as usize] {
                Slot::Free => (DiskSlot::Free, None),
                Slot::Occupied(desc) => {
                    let indirect = desc
                        .indirect
                        .filter(|_| desc.blocks.len() > DIRECT_PTRS)
                        .map(|ptr| (ptr, encode_pointers(&desc.blocks[DIRECT_PTRS..])));
                    (DiskSlot::Occupied(desc.to_disk()), indirect)
                }
            };

            if let Some((ptr, block)) = indirect {
                disk.write_block(ptr as u64, &block)?;
            }

            let bytes = bincode::serialize(&disk_slot)?;
            let (block_id, offset) = self.slot_position(id);
            let mut block_buf: Block = [0; BLOCK_SIZE];
            disk.read_block(block_id, &mut block_buf)?;
            let slot = &mut block_buf[offset..offset + DESCRIPTOR_SLOT_SIZE];
            slot.fill(0);
            slot[..bytes.len()].copy_from_slice(&bytes);
            disk.write_block(block_id, &block_buf)?;
        }
        Ok(())
    }
}

fn encode_pointers(ptrs: &[u32]) -> Block {
    let mut block: Block = [0; BLOCK_SIZE];
    for (chunk, ptr) in block.chunks_exact_mut(4).zip(ptrs) {
        chunk.copy_from_slice(&ptr.to_le_bytes());
    }
    block
}

fn decode_pointers(block: &Block, count: usize) -> Vec<u32> {
    block
        .chunks_exact(4)
        .take(count)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    #[test]
    fn ids_are_lowest_first_and_reused() {
        let mut table = DescriptorTable::new(4, 2);
        assert_eq!(table.allocate(FileType::Directory).unwrap(), 0);
        assert_eq!(table.allocate(FileType::Regular).unwrap(), 1);
        assert_eq!(table.allocate(FileType::Regular).unwrap(), 2);

        table.free(1);
        assert!(matches!(table.get(1), Err(FileSystemError::NotFound(_))));
        assert_eq!(table.allocate(FileType::Symlink).unwrap(), 1);
        assert_eq!(table.get(1).unwrap().file_type, FileType::Symlink);
    }

    #[test]
    fn exhausted_table_reports_no_space() {
        let mut table = DescriptorTable::new(2, 2);
        table.allocate(FileType::Regular).unwrap();
        table.allocate(FileType::Regular).unwrap();
        assert!(matches!(
            table.allocate(FileType::Regular),
            Err(FileSystemError::NoSpace("descriptors"))
        ));
    }

    #[test]
    fn slots_round_trip_with_indirect_pointers() {
        let disk = MemDisk::new(64);
        let sb = SuperBlock::new(64).unwrap();
        let mut table = DescriptorTable::new(sb.descriptor_capacity, sb.table_start);

        table.allocate(FileType::Directory).unwrap();
        let id = table.allocate(FileType::Regular).unwrap();
        {
            let desc = table.get_mut(id).unwrap();
            desc.blocks = (20..35).collect();
            desc.size = 15 * BLOCK_SIZE as u64 - 7;
            desc.hard_links = 3;
            desc.indirect = Some(40);
        }
        table.sync(&disk).unwrap();

        let loaded = DescriptorTable::load(&disk, &sb).unwrap();
        assert_eq!(loaded.capacity(), sb.descriptor_capacity as usize);
        assert_eq!(loaded.used(), 2);
        assert_eq!(loaded.get(id).unwrap(), table.get(id).unwrap());
        assert!(loaded.get(2).is_err());
    }
}
