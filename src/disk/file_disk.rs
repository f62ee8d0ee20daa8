use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    sync::{Mutex, PoisonError},
};

use log::info;

use crate::disk::{
    block_device::{BlockDevice, Result},
    types::{Block, BLOCK_SIZE},
};

/// A disk image stored in a host file.
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
    block_count: u64,
}

impl FileDisk {
    /// Opens (or creates) `path`, extending it to hold `block_count` blocks.
    pub fn open(path: impl AsRef<Path>, block_count: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let wanted = block_count * BLOCK_SIZE as u64;
        let current = file.metadata()?.len();
        if current < wanted {
            info!(
                "allocating disk image {} ({} blocks)",
                path.display(),
                block_count
            );
            file.set_len(wanted)?;
        }

        Ok(Self {
            file: Mutex::new(file),
            block_count: current.max(wanted) / BLOCK_SIZE as u64,
        })
    }

    /// Opens an existing image, taking its size from the file length.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let block_count = file.metadata()?.len() / BLOCK_SIZE as u64;
        Ok(Self {
            file: Mutex::new(file),
            block_count,
        })
    }
}

impl BlockDevice for FileDisk {
    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        self.check_range(block_id)?;
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        self.check_range(block_id)?;
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.write_all(buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskError;

    fn temp_image(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("minifs-{}-{}.img", name, std::process::id()))
    }

    #[test]
    fn blocks_survive_reopen() {
        let path = temp_image("reopen");
        let _ = std::fs::remove_file(&path);

        let disk = FileDisk::open(&path, 8).unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xAB;
        block[BLOCK_SIZE - 1] = 0xCD;
        disk.write_block(5, &block).unwrap();
        drop(disk);

        let disk = FileDisk::open_existing(&path).unwrap();
        assert_eq!(disk.block_count(), 8);
        let mut read = [0u8; BLOCK_SIZE];
        disk.read_block(5, &mut read).unwrap();
        assert_eq!(read, block);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_out_of_range_blocks() {
        let path = temp_image("range");
        let _ = std::fs::remove_file(&path);

        let disk = FileDisk::open(&path, 4).unwrap();
        let block = [0u8; BLOCK_SIZE];
        assert!(matches!(
            disk.write_block(4, &block),
            Err(DiskError::OutOfRange {
                block: 4,
                capacity: 4
            })
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
