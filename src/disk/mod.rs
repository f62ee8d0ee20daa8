pub mod block_device;
pub mod file_disk;
pub mod mem_disk;
pub mod types;

pub use block_device::{BlockDevice, DiskError};
pub use file_disk::FileDisk;
pub use mem_disk::MemDisk;
pub use types::{Block, BLOCK_SIZE, DEFAULT_BLOCK_COUNT, ZERO_BLOCK};
