//! Byte-range I/O over a descriptor's block map, and the grow/shrink
//! operations that keep `size` and the block map consistent.

use log::debug;

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE, ZERO_BLOCK},
    fs::{
        config::{blocks_for, DIRECT_PTRS, DIR_ENTRY_SIZE, MAX_FILE_BLOCKS, MAX_FILE_SIZE},
        descriptor::DescriptorId,
        directory::{self, DirEntry},
        error::{FileSystemError, Result},
        FileSystem,
    },
};

impl<D: BlockDevice> FileSystem<D> {
    fn physical_block(&self, id: DescriptorId, logical: usize) -> Result<u64> {
        self.table
            .get(id)?
            .blocks
            .get(logical)
            .map(|&b| b as u64)
            .ok_or_else(|| {
                FileSystemError::Corrupted(format!(
                    "descriptor {} has no logical block {}",
                    id, logical
                ))
            })
    }

    /// Fills `buf` from the content of `id` starting at `offset`.
    pub(crate) fn read_content(&self, id: DescriptorId, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut block: Block = [0; BLOCK_SIZE];
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done as u64;
            let logical = (pos / BLOCK_SIZE as u64) as usize;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let chunk = (BLOCK_SIZE - in_block).min(buf.len() - done);

            self.disk.read_block(self.physical_block(id, logical)?, &mut block)?;
            buf[done..done + chunk].copy_from_slice(&block[in_block..in_block + chunk]);
            done += chunk;
        }
        Ok(())
    }

    /// Writes `data` into the content of `id` at `offset`. The blocks must
    /// already be mapped.
    pub(crate) fn write_content(&self, id: DescriptorId, offset: u64, data: &[u8]) -> Result<()> {
        let mut block: Block = [0; BLOCK_SIZE];
        let mut done = 0;
        while done < data.len() {
            let pos = offset + done as u64;
            let logical = (pos / BLOCK_SIZE as u64) as usize;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let chunk = (BLOCK_SIZE - in_block).min(data.len() - done);
            let physical = self.physical_block(id, logical)?;

            if chunk < BLOCK_SIZE {
                self.disk.read_block(physical, &mut block)?;
            }
            block[in_block..in_block + chunk].copy_from_slice(&data[done..done + chunk]);
            self.disk.write_block(physical, &block)?;
            done += chunk;
        }
        Ok(())
    }

    fn zero_range(&self, id: DescriptorId, start: u64, end: u64) -> Result<()> {
        let mut pos = start;
        while pos < end {
            let len = (end - pos).min(BLOCK_SIZE as u64) as usize;
            self.write_content(id, pos, &ZERO_BLOCK[..len])?;
            pos += len as u64;
        }
        Ok(())
    }

    /// Appends zero-filled blocks until `id` maps `new_count` blocks. Either
    /// every block is allocated or none is.
    pub(crate) fn grow(&mut self, id: DescriptorId, new_count: usize) -> Result<()> {
        let desc = self.table.get(id)?;
        let current = desc.blocks.len();
        if new_count <= current {
            return Ok(());
        }
        if new_count > MAX_FILE_BLOCKS {
            return Err(FileSystemError::FileTooLarge((new_count * BLOCK_SIZE) as u64));
        }

        let needs_indirect = new_count > DIRECT_PTRS && desc.indirect.is_none();
        let needed = (new_count - current) as u64 + needs_indirect as u64;
        if self.block_bitmap.free_blocks < needed {
            return Err(FileSystemError::NoSpace("data blocks"));
        }

        let mut fresh = Vec::with_capacity(needed as usize);
        for _ in 0..needed {
            let block = self
                .block_bitmap
                .alloc()
                .ok_or(FileSystemError::NoSpace("data blocks"))?;
            self.disk.write_block(block, &ZERO_BLOCK)?;
            fresh.push(block as u32);
        }
        debug!("descriptor {}: {} -> {} blocks", id, current, new_count);

        let desc = self.table.get_mut(id)?;
        let mut fresh = fresh.into_iter();
        if needs_indirect {
            desc.indirect = fresh.next();
        }
        desc.blocks.extend(fresh);
        Ok(())
    }

    /// Frees every block of `id` past the first `new_count`.
    pub(crate) fn shrink(&mut self, id: DescriptorId, new_count: usize) -> Result<()> {
        let bitmap = &mut self.block_bitmap;
        let desc = self.table.get_mut(id)?;
        if new_count >= desc.blocks.len() {
            return Ok(());
        }

        debug!("descriptor {}: {} -> {} blocks", id, desc.blocks.len(), new_count);
        for block in desc.blocks.drain(new_count..) {
            bitmap.free(block as u64);
        }
        if desc.blocks.len() <= DIRECT_PTRS {
            if let Some(ptr) = desc.indirect.take() {
                bitmap.free(ptr as u64);
            }
        }
        Ok(())
    }

    /// Sets the content length of `id`. Bytes that become visible read as zero;
    /// bytes within the new length are untouched.
    pub(crate) fn resize(&mut self, id: DescriptorId, new_size: u64) -> Result<()> {
        if new_size > MAX_FILE_SIZE {
            return Err(FileSystemError::FileTooLarge(new_size));
        }
        let (old_size, old_blocks) = {
            let desc = self.table.get(id)?;
            (desc.size, desc.blocks.len())
        };
        let new_blocks = blocks_for(new_size);

        if new_size > old_size {
            self.grow(id, new_blocks)?;
            // stale tail of the previously last block
            let tail_end = new_size.min((old_blocks * BLOCK_SIZE) as u64);
            self.zero_range(id, old_size, tail_end)?;
        } else if new_size < old_size {
            self.shrink(id, new_blocks)?;
            let tail_end = old_size.min((new_blocks * BLOCK_SIZE) as u64);
            self.zero_range(id, new_size, tail_end)?;
        }

        let desc = self.table.get_mut(id)?;
        desc.size = new_size;
        desc.touch();
        Ok(())
    }

    /// Frees the blocks and the table slot of `id` and invalidates its handles.
    pub(crate) fn release(&mut self, id: DescriptorId) -> Result<()> {
        self.shrink(id, 0)?;
        self.table.free(id);
        let closed = self.handles.invalidate(id);
        if closed > 0 {
            debug!("descriptor {} released with {} open handles", id, closed);
        }
        Ok(())
    }

    pub(crate) fn read_dir(&self, id: DescriptorId) -> Result<Vec<DirEntry>> {
        let size = self.table.get(id)?.size as usize;
        let mut bytes = vec![0u8; size];
        self.read_content(id, 0, &mut bytes)?;
        directory::decode(&bytes)
    }

    pub(crate) fn find_entry(&self, dir: DescriptorId, name: &str) -> Result<Option<DirEntry>> {
        Ok(self.read_dir(dir)?.into_iter().find(|e| e.name == name))
    }

    pub(crate) fn append_entry(&mut self, dir: DescriptorId, entry: DirEntry) -> Result<()> {
        let size = self.table.get(dir)?.size;
        let new_size = size + DIR_ENTRY_SIZE as u64;
        self.grow(dir, blocks_for(new_size))?;
        self.write_content(dir, size, &entry.encode())?;

        let desc = self.table.get_mut(dir)?;
        desc.size = new_size;
        desc.touch();
        Ok(())
    }

    /// Removes `name` from `dir`, shifting later entries down one slot.
    pub(crate) fn remove_entry(&mut self, dir: DescriptorId, name: &str) -> Result<DirEntry> {
        let mut entries = self.read_dir(dir)?;
        let pos = entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;
        let removed = entries.remove(pos);

        let tail = directory::encode(&entries[pos..]);
        self.write_content(dir, (pos * DIR_ENTRY_SIZE) as u64, &tail)?;
        self.resize(dir, (entries.len() * DIR_ENTRY_SIZE) as u64)?;
        Ok(removed)
    }

    pub(crate) fn read_link(&self, id: DescriptorId) -> Result<String> {
        let size = self.table.get(id)?.size as usize;
        let mut bytes = vec![0u8; size];
        self.read_content(id, 0, &mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|e| FileSystemError::Corrupted(format!("symlink {} target: {}", id, e)))
    }
}
