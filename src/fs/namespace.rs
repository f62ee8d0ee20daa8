//! Operations that change the directory tree or a file's length.

use log::{debug, warn};

use crate::{
    disk::BlockDevice,
    fs::{
        config::ROOT_ID,
        descriptor::{DescriptorId, FileType},
        directory::{self, DirEntry},
        error::{FileSystemError, Result},
        FileSystem,
    },
};

impl<D: BlockDevice> FileSystem<D> {
    /// Creates an empty regular file.
    pub fn create(&mut self, path: &str) -> Result<DescriptorId> {
        self.make_node(path, FileType::Regular, &[])
    }

    /// Creates a directory holding `.` and `..`; the parent gains one link.
    pub fn mkdir(&mut self, path: &str) -> Result<DescriptorId> {
        self.make_node(path, FileType::Directory, &[])
    }

    /// Creates a symlink whose content is `target`. Only an empty target is
    /// rejected; a dangling one is stored as is.
    pub fn symlink(&mut self, target: &str, path: &str) -> Result<DescriptorId> {
        if target.is_empty() {
            return Err(FileSystemError::InvalidPath(format!("{}: empty symlink target", path)));
        }
        self.make_node(path, FileType::Symlink, target.as_bytes())
    }

    fn make_node(&mut self, path: &str, file_type: FileType, content: &[u8]) -> Result<DescriptorId> {
        let (parent, name) = self.resolve_parent(path)?;
        directory::validate_name(name)?;
        if self.find_entry(parent, name)?.is_some() {
            return Err(FileSystemError::AlreadyExists(path.to_string()));
        }

        let id = self.table.allocate(file_type)?;
        let linked = self
            .populate(id, parent, file_type, content)
            .and_then(|_| self.append_entry(parent, DirEntry::new(name, id)));
        if let Err(e) = linked {
            warn!("{}: rolling back descriptor {}: {}", path, id, e);
            self.release(id)?;
            return Err(self.sync_after_failure(e));
        }

        if file_type == FileType::Directory {
            let parent_desc = self.table.get_mut(parent)?;
            parent_desc.set_hard_links(parent_desc.hard_links + 1);
        }
        debug!("{}: created {:?} descriptor {}", path, file_type, id);
        self.sync()?;
        Ok(id)
    }

    fn populate(
        &mut self,
        id: DescriptorId,
        parent: DescriptorId,
        file_type: FileType,
        content: &[u8],
    ) -> Result<()> {
        match file_type {
            FileType::Regular => {
                self.table.get_mut(id)?.hard_links = 1;
            }
            FileType::Directory => {
                self.table.get_mut(id)?.hard_links = 2;
                self.append_entry(id, DirEntry::new(".", id))?;
                self.append_entry(id, DirEntry::new("..", parent))?;
            }
            FileType::Symlink => {
                self.table.get_mut(id)?.hard_links = 1;
                self.resize(id, content.len() as u64)?;
                self.write_content(id, 0, content)?;
            }
        }
        Ok(())
    }

    /// Removes an empty directory; its parent loses one link.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.resolve_parent(path)?;
        if name == "." || name == ".." {
            return Err(FileSystemError::InvalidPath(path.to_string()));
        }
        let entry = self
            .find_entry(parent, name)?
            .ok_or_else(|| FileSystemError::NotFound(path.to_string()))?;
        let id = entry.descriptor_id;
        if !self.table.get(id)?.is_dir() {
            return Err(FileSystemError::NotADirectory(path.to_string()));
        }
        if self
            .read_dir(id)?
            .iter()
            .any(|e| e.name != "." && e.name != "..")
        {
            return Err(FileSystemError::NotEmpty(path.to_string()));
        }

        self.remove_entry(parent, name)?;
        self.release(id)?;
        let parent_desc = self.table.get_mut(parent)?;
        parent_desc.set_hard_links(parent_desc.hard_links.saturating_sub(1));
        debug!("{}: removed directory {}", path, id);
        self.sync()
    }

    /// Adds `new_path` as another name for the non-directory at `existing`.
    /// A final symlink in `existing` is linked itself, not followed.
    pub fn link(&mut self, existing: &str, new_path: &str) -> Result<()> {
        let target = self.lookup(existing, ROOT_ID, false)?;
        if self.table.get(target)?.is_dir() {
            return Err(FileSystemError::IsADirectory(existing.to_string()));
        }

        let (parent, name) = self.resolve_parent(new_path)?;
        directory::validate_name(name)?;
        if self.find_entry(parent, name)?.is_some() {
            return Err(FileSystemError::AlreadyExists(new_path.to_string()));
        }

        if let Err(e) = self.append_entry(parent, DirEntry::new(name, target)) {
            return Err(self.sync_after_failure(e));
        }
        let desc = self.table.get_mut(target)?;
        desc.set_hard_links(desc.hard_links + 1);
        debug!("{}: linked to descriptor {}", new_path, target);
        self.sync()
    }

    /// Removes one name of a non-directory. The descriptor and its content are
    /// freed when its last name goes.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.resolve_parent(path)?;
        let entry = self
            .find_entry(parent, name)?
            .ok_or_else(|| FileSystemError::NotFound(path.to_string()))?;
        let id = entry.descriptor_id;
        if self.table.get(id)?.is_dir() {
            return Err(FileSystemError::IsADirectory(path.to_string()));
        }

        self.remove_entry(parent, name)?;
        let desc = self.table.get_mut(id)?;
        desc.set_hard_links(desc.hard_links.saturating_sub(1));
        if desc.hard_links == 0 {
            self.release(id)?;
            debug!("{}: descriptor {} freed", path, id);
        }
        self.sync()
    }

    /// Sets the length of the regular file at `path`, following a final
    /// symlink. New bytes read as zero.
    pub fn truncate(&mut self, path: &str, new_size: u64) -> Result<()> {
        let id = self.lookup(path, ROOT_ID, true)?;
        self.expect_regular(id, path)?;
        if let Err(e) = self.resize(id, new_size) {
            return Err(self.sync_after_failure(e));
        }
        self.sync()
    }

    pub(crate) fn expect_regular(&self, id: DescriptorId, path: &str) -> Result<()> {
        match self.table.get(id)?.file_type {
            FileType::Regular => Ok(()),
            FileType::Directory => Err(FileSystemError::IsADirectory(path.to_string())),
            FileType::Symlink => Err(FileSystemError::NotFound(path.to_string())),
        }
    }

    /// Target string of the symlink at `path` (the final component is not followed).
    pub fn readlink(&self, path: &str) -> Result<String> {
        let id = self.lookup(path, ROOT_ID, false)?;
        if !self.table.get(id)?.is_symlink() {
            return Err(FileSystemError::InvalidPath(format!("{} is not a symlink", path)));
        }
        self.read_link(id)
    }
}
