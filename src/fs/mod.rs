use log::{info, warn};

use crate::{
    disk::{BlockDevice, ZERO_BLOCK},
    fs::{
        block_bitmap::BlockBitmap,
        config::ROOT_ID,
        descriptor_table::DescriptorTable,
        directory::DirEntry,
        error::{FileSystemError, Result},
        handle::HandleTable,
        super_block::SuperBlock,
    },
};

pub mod block_bitmap;
pub mod config;
pub mod content;
pub mod descriptor;
pub mod descriptor_table;
pub mod directory;
pub mod error;
pub mod handle;
pub mod namespace;
pub mod path;
pub mod super_block;

pub use descriptor::{DescriptorId, FileDescriptor, FileType};
pub use handle::FileHandle;

/// A mounted image. Owns the device, the free-block pool, the descriptor
/// table and the open handles; nothing is shared between instances.
///
/// Every public mutating operation either completes or leaves the in-memory
/// state exactly as it was, then writes the touched metadata back to disk.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    disk: D,
    super_block: SuperBlock,
    block_bitmap: BlockBitmap,
    table: DescriptorTable,
    handles: HandleTable,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Formats `disk` with `total_blocks` blocks and mounts the result.
    pub fn format(disk: D, total_blocks: u64) -> Result<Self> {
        let sb = Self::layout(&disk, total_blocks)?;
        let mut fs = Self {
            block_bitmap: BlockBitmap::new(sb.total_blocks, sb.bitmap_start),
            table: DescriptorTable::new(sb.descriptor_capacity, sb.table_start),
            handles: HandleTable::default(),
            super_block: sb,
            disk,
        };
        fs.initialize()?;
        Ok(fs)
    }

    /// Mounts an image written by an earlier `format`/`mkfs`.
    pub fn mount(disk: D) -> Result<Self> {
        let sb = SuperBlock::load(&disk)?;
        let block_bitmap = BlockBitmap::load(&disk, sb.bitmap_start, sb.total_blocks)?;
        let table = DescriptorTable::load(&disk, &sb)?;

        match table.get(ROOT_ID) {
            Ok(root) if root.is_dir() => {}
            _ => {
                return Err(FileSystemError::Corrupted(
                    "root directory missing".to_string(),
                ))
            }
        }

        info!(
            "mounted image: {} blocks ({} free), {}/{} descriptors in use",
            sb.total_blocks,
            block_bitmap.free_blocks,
            table.used(),
            table.capacity()
        );

        Ok(Self {
            disk,
            super_block: sb,
            block_bitmap,
            table,
            handles: HandleTable::default(),
        })
    }

    /// Resets the image to an empty file system of `total_blocks` blocks.
    /// All open handles are closed.
    pub fn mkfs(&mut self, total_blocks: u64) -> Result<()> {
        let sb = Self::layout(&self.disk, total_blocks)?;
        self.block_bitmap = BlockBitmap::new(sb.total_blocks, sb.bitmap_start);
        self.table = DescriptorTable::new(sb.descriptor_capacity, sb.table_start);
        self.handles.clear();
        self.super_block = sb;
        self.initialize()
    }

    fn layout(disk: &D, total_blocks: u64) -> Result<SuperBlock> {
        if total_blocks > disk.block_count() {
            warn!(
                "mkfs: {} blocks requested but the device holds {}",
                total_blocks,
                disk.block_count()
            );
            return Err(FileSystemError::InvalidSize(total_blocks));
        }
        SuperBlock::new(total_blocks)
    }

    fn initialize(&mut self) -> Result<()> {
        let data_start = self.super_block.data_start;
        for block in 0..data_start {
            self.disk.write_block(block, &ZERO_BLOCK)?;
            self.block_bitmap.reserve(block);
        }

        let root = self.table.allocate(FileType::Directory)?;
        if root != ROOT_ID {
            return Err(FileSystemError::Corrupted(format!(
                "root allocated as descriptor {}",
                root
            )));
        }
        self.table.get_mut(root)?.hard_links = 2;
        self.append_entry(root, DirEntry::new(".", root))?;
        self.append_entry(root, DirEntry::new("..", root))?;

        self.super_block.sync(&self.disk)?;
        self.sync()?;

        info!(
            "formatted {} blocks: {} metadata, {} descriptors",
            self.super_block.total_blocks, data_start, self.super_block.descriptor_capacity
        );
        Ok(())
    }

    /// Writes modified bitmap blocks and descriptor slots to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.block_bitmap.sync(&self.disk)?;
        self.table.sync(&self.disk)
    }

    /// Flushes after a failed operation without masking its error.
    fn sync_after_failure(&mut self, err: FileSystemError) -> FileSystemError {
        if let Err(sync_err) = self.sync() {
            warn!("metadata flush after failed operation: {}", sync_err);
        }
        err
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    pub fn free_blocks(&self) -> u64 {
        self.block_bitmap.free_blocks
    }

    pub fn free_descriptors(&self) -> usize {
        self.table.capacity() - self.table.used()
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn root(&self) -> Result<FileDescriptor> {
        self.get_descriptor(ROOT_ID)
    }

    pub fn get_descriptor(&self, id: DescriptorId) -> Result<FileDescriptor> {
        self.table.get(id).cloned()
    }

    /// Lists a directory in storage order.
    pub fn ls(&self, id: DescriptorId) -> Result<Vec<DirEntry>> {
        if !self.table.get(id)?.is_dir() {
            return Err(FileSystemError::NotADirectory(format!("descriptor {}", id)));
        }
        self.read_dir(id)
    }

    /// Opens the regular file at `path`, following a final symlink.
    pub fn open(&mut self, path: &str) -> Result<FileHandle> {
        let id = self.lookup(path, ROOT_ID, true)?;
        self.expect_regular(id, path)?;
        Ok(self.handles.open(id))
    }

    /// Opens `path` for the lifetime of the returned guard.
    pub fn open_scoped(&mut self, path: &str) -> Result<OpenFile<'_, D>> {
        let handle = self.open(path)?;
        Ok(OpenFile { fs: self, handle })
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        self.handles.close(handle)
    }

    /// Descriptor id behind an open handle.
    pub fn handle_descriptor(&self, handle: FileHandle) -> Result<DescriptorId> {
        self.handles.get(handle)
    }

    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Reads exactly `size` bytes at `offset`; the range must lie within the file.
    pub fn read(&self, handle: FileHandle, offset: u64, size: usize) -> Result<Vec<u8>> {
        let id = self.handles.get(handle)?;
        self.check_range(id, offset, size)?;
        let mut buf = vec![0u8; size];
        self.read_content(id, offset, &mut buf)?;
        Ok(buf)
    }

    /// Overwrites bytes at `offset`. Never extends the file: `truncate` first.
    pub fn write(&mut self, handle: FileHandle, offset: u64, data: &[u8]) -> Result<()> {
        let id = self.handles.get(handle)?;
        self.check_range(id, offset, data.len())?;
        self.write_content(id, offset, data)?;
        self.table.get_mut(id)?.touch();
        self.sync()
    }

    fn check_range(&self, id: DescriptorId, offset: u64, len: usize) -> Result<()> {
        let size = self.table.get(id)?.size;
        match offset.checked_add(len as u64) {
            Some(end) if end <= size => Ok(()),
            _ => Err(FileSystemError::OutOfRange(format!(
                "bytes {}..{} of a {}-byte file",
                offset,
                offset.saturating_add(len as u64),
                size
            ))),
        }
    }
}

/// An open handle that is closed when dropped.
pub struct OpenFile<'a, D: BlockDevice> {
    fs: &'a mut FileSystem<D>,
    handle: FileHandle,
}

impl<D: BlockDevice> OpenFile<'_, D> {
    pub fn handle(&self) -> FileHandle {
        self.handle
    }

    pub fn read(&self, offset: u64, size: usize) -> Result<Vec<u8>> {
        self.fs.read(self.handle, offset, size)
    }

    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.fs.write(self.handle, offset, data)
    }

    pub fn descriptor(&self) -> Result<FileDescriptor> {
        let id = self.fs.handle_descriptor(self.handle)?;
        self.fs.get_descriptor(id)
    }
}

impl<D: BlockDevice> Drop for OpenFile<'_, D> {
    fn drop(&mut self) {
        let _ = self.fs.close(self.handle);
    }
}
