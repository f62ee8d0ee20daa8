use std::path::PathBuf;

use clap::Parser;
use colored::*;
use log::info;

use mini_blockfs::{
    disk::{FileDisk, DEFAULT_BLOCK_COUNT},
    fs::{error::FileSystemError, FileSystem},
    shell::{start_shell, Session},
};

#[derive(Parser)]
#[command(author, version, about = "Interactive shell over a block-device file system image")]
struct Cli {
    /// Path to the disk image
    #[arg(short, long, default_value = "disk.img")]
    disk: PathBuf,

    /// Number of blocks when the image has to be created
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_COUNT)]
    blocks: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let disk = FileDisk::open(&cli.disk, cli.blocks)?;

    // a blank image has no superblock yet
    let fs = match FileSystem::mount(disk) {
        Ok(fs) => fs,
        Err(FileSystemError::Corrupted(reason)) => {
            info!("{}: {}, formatting", cli.disk.display(), reason);
            println!(
                "{}",
                "🔧 No file system found, formatting new image...".yellow()
            );
            let disk = FileDisk::open(&cli.disk, cli.blocks)?;
            FileSystem::format(disk, cli.blocks)?
        }
        Err(e) => return Err(e.into()),
    };

    start_shell(Session::new(fs));
    Ok(())
}
