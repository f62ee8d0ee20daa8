use std::{collections::HashMap, fmt};

use crate::fs::{
    descriptor::DescriptorId,
    error::{FileSystemError, Result},
};

/// Session-scoped open-file number, distinct from the on-disk descriptor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(pub u64);

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Open handles of one mounted image. Handles are never reused.
#[derive(Debug)]
pub struct HandleTable {
    next: u64,
    open: HashMap<FileHandle, DescriptorId>,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self {
            next: 1,
            open: HashMap::new(),
        }
    }
}

impl HandleTable {
    pub fn open(&mut self, id: DescriptorId) -> FileHandle {
        let handle = FileHandle(self.next);
        self.next += 1;
        self.open.insert(handle, id);
        handle
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        self.open
            .remove(&handle)
            .map(|_| ())
            .ok_or(FileSystemError::InvalidHandle(handle.0))
    }

    pub fn get(&self, handle: FileHandle) -> Result<DescriptorId> {
        self.open
            .get(&handle)
            .copied()
            .ok_or(FileSystemError::InvalidHandle(handle.0))
    }

    /// Drops every handle on `id`; returns how many were open.
    pub fn invalidate(&mut self, id: DescriptorId) -> usize {
        let before = self.open.len();
        self.open.retain(|_, open_id| *open_id != id);
        before - self.open.len()
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_distinct_per_open() {
        let mut table = HandleTable::default();
        let a = table.open(4);
        let b = table.open(4);
        assert_ne!(a, b);
        assert_eq!(table.get(a).unwrap(), 4);
        assert_eq!(table.get(b).unwrap(), 4);
    }

    #[test]
    fn closed_handle_is_invalid() {
        let mut table = HandleTable::default();
        let h = table.open(1);
        table.close(h).unwrap();
        assert!(matches!(table.get(h), Err(FileSystemError::InvalidHandle(_))));
        assert!(matches!(table.close(h), Err(FileSystemError::InvalidHandle(_))));

        let next = table.open(1);
        assert_ne!(next, h);
    }

    #[test]
    fn invalidate_drops_only_matching_handles() {
        let mut table = HandleTable::default();
        let a = table.open(1);
        let b = table.open(2);
        let c = table.open(1);
        assert_eq!(table.invalidate(1), 2);
        assert!(table.get(a).is_err());
        assert!(table.get(c).is_err());
        assert_eq!(table.get(b).unwrap(), 2);
        assert_eq!(table.len(), 1);
    }
}
