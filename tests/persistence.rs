use std::path::PathBuf;

use mini_blockfs::{FileDisk, FileSystem, FileSystemError, FileType, MemDisk};

struct TempImage(PathBuf);

impl TempImage {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "minifs-test-{}-{}.img",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        Self(path)
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[test]
fn image_survives_remount() {
    let _ = env_logger::builder().is_test(true).try_init();
    let image = TempImage::new("remount");

    {
        let disk = FileDisk::open(&image.0, 256).unwrap();
        let mut fs = FileSystem::format(disk, 256).unwrap();
        fs.mkdir("/docs").unwrap();
        fs.create("/docs/readme").unwrap();
        fs.truncate("/docs/readme", 9000).unwrap();
        let fd = fs.open("/docs/readme").unwrap();
        fs.write(fd, 8990, b"persistent").unwrap();
        fs.link("/docs/readme", "/readme").unwrap();
        fs.symlink("/docs", "/shortcut").unwrap();
        fs.create("/gone").unwrap();
        fs.unlink("/gone").unwrap();
    }

    let disk = FileDisk::open_existing(&image.0).unwrap();
    let mut fs = FileSystem::mount(disk).unwrap();

    let names: Vec<_> = fs.ls(0).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, [".", "..", "docs", "readme", "shortcut"]);
    assert_eq!(fs.root().unwrap().hard_links, 3);

    let file = fs.lookup("/shortcut/readme", 0, false).unwrap();
    let desc = fs.get_descriptor(file).unwrap();
    assert_eq!(desc.file_type, FileType::Regular);
    assert_eq!(desc.size, 9000);
    assert_eq!(desc.hard_links, 2);

    let fd = fs.open("/readme").unwrap();
    assert_eq!(fs.read(fd, 8990, 10).unwrap(), b"persistent");
    assert_eq!(fs.read(fd, 0, 4).unwrap(), [0, 0, 0, 0]);

    // the freed slot is reused after remount
    assert_eq!(fs.create("/new").unwrap(), 4);
}

#[test]
fn free_space_is_recounted_on_mount() {
    let disk = MemDisk::new(128);
    let mut fs = FileSystem::format(disk, 128).unwrap();
    fs.create("/f").unwrap();
    fs.truncate("/f", 5000).unwrap();
    let free_blocks = fs.free_blocks();
    let free_descriptors = fs.free_descriptors();

    // hand the same device to a fresh mount
    let image = snapshot(&fs);
    let remounted = FileSystem::mount(image).unwrap();
    assert_eq!(remounted.free_blocks(), free_blocks);
    assert_eq!(remounted.free_descriptors(), free_descriptors);
    assert_eq!(remounted.super_block(), fs.super_block());
}

#[test]
fn blank_image_does_not_mount() {
    let result = FileSystem::mount(MemDisk::new(32));
    assert!(matches!(result, Err(FileSystemError::Corrupted(_))));
}

fn snapshot(fs: &FileSystem<MemDisk>) -> MemDisk {
    use mini_blockfs::{disk::Block, BlockDevice};

    let source = fs.disk();
    let copy = MemDisk::new(source.block_count());
    let mut block: Block = [0; mini_blockfs::disk::BLOCK_SIZE];
    for i in 0..source.block_count() {
        source.read_block(i, &mut block).unwrap();
        copy.write_block(i, &block).unwrap();
    }
    copy
}
