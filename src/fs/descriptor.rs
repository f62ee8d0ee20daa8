use serde::{Deserialize, Serialize};

use crate::{
    fs::config::{blocks_for, DIRECT_PTRS},
    utils::current_timestamp,
};

/// Index of a slot in the descriptor table.
pub type DescriptorId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Regular,
    Directory,
    Symlink, // content is the target path
}

/// In-memory descriptor (inode analog).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub id: DescriptorId,
    pub file_type: FileType,
    /// Content length in bytes; for a symlink, the length of its target.
    pub size: u64,
    pub hard_links: u32,
    /// Logical block index -> physical block index.
    pub blocks: Vec<u32>,
    pub ctime: u64,
    pub mtime: u64,
    pub(crate) indirect: Option<u32>,
}

impl FileDescriptor {
    pub fn new(id: DescriptorId, file_type: FileType) -> Self {
        let now = current_timestamp();
        Self {
            id,
            file_type,
            size: 0,
            hard_links: 0,
            blocks: Vec::new(),
            ctime: now,
            mtime: now,
            indirect: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }

    pub fn touch(&mut self) {
        self.mtime = current_timestamp();
    }

    /// Records a status change such as a new link count.
    pub fn set_hard_links(&mut self, hard_links: u32) {
        self.hard_links = hard_links;
        self.ctime = current_timestamp();
    }

    pub(crate) fn to_disk(&self) -> DiskDescriptor {
        let mut direct = [0u32; DIRECT_PTRS];
        for (slot, block) in direct.iter_mut().zip(&self.blocks) {
            *slot = *block;
        }
        DiskDescriptor {
            file_type: self.file_type,
            hard_links: self.hard_links,
            size: self.size,
            ctime: self.ctime,
            mtime: self.mtime,
            direct,
            indirect: self.indirect.unwrap_or(0),
        }
    }

    /// Rebuilds a descriptor; `indirect_ptrs` are the pointers read from the
    /// indirect block, if the descriptor has one.
    pub(crate) fn from_disk(id: DescriptorId, disk: &DiskDescriptor, indirect_ptrs: &[u32]) -> Self {
        let count = blocks_for(disk.size);
        let mut blocks: Vec<u32> = disk.direct.iter().copied().take(count).collect();
        blocks.extend(indirect_ptrs.iter().copied().take(count.saturating_sub(DIRECT_PTRS)));

        Self {
            id,
            file_type: disk.file_type,
            size: disk.size,
            hard_links: disk.hard_links,
            blocks,
            ctime: disk.ctime,
            mtime: disk.mtime,
            indirect: (disk.indirect != 0).then_some(disk.indirect),
        }
    }
}

/// Persistent form of a descriptor slot. An all-zero slot decodes as `Free`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum DiskSlot {
    Free,
    Occupied(DiskDescriptor),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DiskDescriptor {
    pub file_type: FileType,
    pub hard_links: u32,
    pub size: u64,
    pub ctime: u64,
    pub mtime: u64,
    pub direct: [u32; DIRECT_PTRS],
    pub indirect: u32, // 0 = none; block 0 always holds the superblock
}
