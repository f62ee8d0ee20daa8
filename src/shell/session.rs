//! Session layer: keeps a current directory and turns relative paths into
//! absolute ones before they reach the driver.

use crate::{
    disk::BlockDevice,
    fs::{
        config::ROOT_ID,
        directory::DirEntry,
        error::{FileSystemError, Result},
        DescriptorId, FileDescriptor, FileHandle, FileSystem,
    },
};

pub struct Session<D: BlockDevice> {
    fs: FileSystem<D>,
    cwd: DescriptorId,
}

impl<D: BlockDevice> Session<D> {
    pub fn new(fs: FileSystem<D>) -> Self {
        Self { fs, cwd: ROOT_ID }
    }

    pub fn fs(&self) -> &FileSystem<D> {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut FileSystem<D> {
        &mut self.fs
    }

    pub fn cwd_id(&self) -> DescriptorId {
        self.cwd
    }

    pub fn mkfs(&mut self, total_blocks: u64) -> Result<()> {
        self.fs.mkfs(total_blocks)?;
        self.cwd = ROOT_ID;
        Ok(())
    }

    /// Absolute path of the current directory, rebuilt by walking `..` up
    /// to the root and finding each directory's name in its parent.
    pub fn cwd(&self) -> Result<String> {
        let mut names = Vec::new();
        let mut id = self.cwd;
        // a directory chain can never be longer than the descriptor table
        let max_depth = self.fs.super_block().descriptor_capacity;

        for _ in 0..max_depth {
            let parent = self.fs.lookup("..", id, false)?;
            if parent == id {
                break;
            }
            let name = self
                .fs
                .ls(parent)?
                .into_iter()
                .find(|e| e.descriptor_id == id && e.name != "." && e.name != "..")
                .map(|e| e.name)
                .ok_or_else(|| FileSystemError::NotFound(format!("descriptor {}", id)))?;
            names.push(name);
            id = parent;
        }

        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }

    pub fn absolute(&self, path: &str) -> Result<String> {
        if path.starts_with('/') {
            return Ok(path.to_string());
        }
        let dir = self.cwd()?;
        Ok(if dir == "/" {
            format!("/{}", path)
        } else {
            format!("{}/{}", dir, path)
        })
    }

    /// Changes the current directory, following symlinks.
    pub fn cd(&mut self, path: &str) -> Result<()> {
        let id = self.fs.lookup(path, self.cwd, true)?;
        if !self.fs.get_descriptor(id)?.is_dir() {
            return Err(FileSystemError::NotADirectory(path.to_string()));
        }
        self.cwd = id;
        Ok(())
    }

    pub fn ls(&self, path: &str) -> Result<Vec<DirEntry>> {
        let id = self.fs.lookup(&self.absolute(path)?, ROOT_ID, true)?;
        self.fs.ls(id)
    }

    pub fn stat(&self, path: &str) -> Result<FileDescriptor> {
        let id = self.fs.lookup(&self.absolute(path)?, ROOT_ID, false)?;
        self.fs.get_descriptor(id)
    }

    pub fn create(&mut self, path: &str) -> Result<DescriptorId> {
        let path = self.absolute(path)?;
        self.fs.create(&path)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<DescriptorId> {
        let path = self.absolute(path)?;
        self.fs.mkdir(&path)
    }

    /// Removing the current directory moves the session to its parent.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = self.absolute(path)?;
        let target = self.fs.lookup(&path, ROOT_ID, false).ok();
        let parent = self.fs.lookup("..", self.cwd, false)?;
        self.fs.rmdir(&path)?;
        if target == Some(self.cwd) {
            self.cwd = parent;
        }
        Ok(())
    }

    pub fn link(&mut self, existing: &str, new_path: &str) -> Result<()> {
        let existing = self.absolute(existing)?;
        let new_path = self.absolute(new_path)?;
        self.fs.link(&existing, &new_path)
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let path = self.absolute(path)?;
        self.fs.unlink(&path)
    }

    pub fn symlink(&mut self, target: &str, path: &str) -> Result<DescriptorId> {
        let path = self.absolute(path)?;
        self.fs.symlink(target, &path)
    }

    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let path = self.absolute(path)?;
        self.fs.truncate(&path, size)
    }

    pub fn open(&mut self, path: &str) -> Result<FileHandle> {
        let path = self.absolute(path)?;
        self.fs.open(&path)
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        self.fs.close(handle)
    }

    pub fn read(&self, handle: FileHandle, offset: u64, size: usize) -> Result<Vec<u8>> {
        self.fs.read(handle, offset, size)
    }

    pub fn write(&mut self, handle: FileHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.fs.write(handle, offset, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    fn session() -> Session<MemDisk> {
        Session::new(FileSystem::format(MemDisk::new(100), 100).unwrap())
    }

    #[test]
    fn cwd_tracks_nested_directories() {
        let mut s = session();
        assert_eq!(s.cwd().unwrap(), "/");

        s.mkdir("test_dir_1").unwrap();
        s.cd("test_dir_1").unwrap();
        s.mkdir("test_dir_2").unwrap();
        assert_eq!(s.cwd().unwrap(), "/test_dir_1");

        s.cd("test_dir_2").unwrap();
        assert_eq!(s.cwd().unwrap(), "/test_dir_1/test_dir_2");

        s.cd("..").unwrap();
        assert_eq!(s.cwd().unwrap(), "/test_dir_1");
    }

    #[test]
    fn relative_paths_land_in_cwd() {
        let mut s = session();
        s.mkdir("a").unwrap();
        s.cd("a").unwrap();
        let id = s.create("file").unwrap();

        assert_eq!(s.fs().lookup("/a/file", ROOT_ID, false).unwrap(), id);
        let names: Vec<_> = s.ls(".").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, [".", "..", "file"]);
    }

    #[test]
    fn cd_through_symlink_to_root() {
        let mut s = session();
        s.mkdir("d").unwrap();
        s.cd("d").unwrap();
        s.create("test_file").unwrap();
        s.symlink("/", "up").unwrap();

        s.cd("up").unwrap();
        assert_eq!(s.cwd_id(), ROOT_ID);
        assert_eq!(s.cwd().unwrap(), "/");
        let names: Vec<_> = s.ls(".").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, [".", "..", "d"]);
    }

    #[test]
    fn cd_into_a_file_fails() {
        let mut s = session();
        s.create("f").unwrap();
        assert!(matches!(s.cd("f"), Err(FileSystemError::NotADirectory(_))));
        assert_eq!(s.cwd_id(), ROOT_ID);
    }

    #[test]
    fn removing_cwd_moves_to_parent() {
        let mut s = session();
        s.mkdir("/a").unwrap();
        s.cd("/a").unwrap();
        s.rmdir("/a").unwrap();
        assert_eq!(s.cwd_id(), ROOT_ID);

        // the freed id is reused, but the session must not follow it
        let b = s.mkdir("/b").unwrap();
        assert_ne!(s.cwd_id(), b);
        assert_eq!(s.cwd().unwrap(), "/");
        s.create("f").unwrap();
        assert!(s.fs().lookup("/f", ROOT_ID, false).is_ok());
        assert!(s.fs().lookup("/b/f", ROOT_ID, false).is_err());
    }

    #[test]
    fn removing_cwd_by_relative_name() {
        let mut s = session();
        s.mkdir("outer").unwrap();
        s.cd("outer").unwrap();
        s.mkdir("inner").unwrap();
        s.cd("inner").unwrap();
        s.cd("..").unwrap();
        s.rmdir("inner").unwrap();
        assert_eq!(s.cwd().unwrap(), "/outer");

        s.cd("/outer").unwrap();
        s.mkdir("gone").unwrap();
        s.cd("gone").unwrap();
        s.rmdir(".").unwrap_err();
        s.rmdir("/outer/gone").unwrap();
        assert_eq!(s.cwd().unwrap(), "/outer");
    }

    #[test]
    fn mkfs_resets_cwd() {
        let mut s = session();
        s.mkdir("a").unwrap();
        s.cd("a").unwrap();
        s.mkfs(100).unwrap();
        assert_eq!(s.cwd().unwrap(), "/");
    }
}
