use std::{error::Error, io::stdout, time::Duration};

use chrono::{DateTime, Local};
use colored::*;
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    disk::BlockDevice,
    fs::{DescriptorId, FileDescriptor, FileHandle, FileType},
    shell::session::Session,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Mkfs(u64),
    Ls(Option<String>),
    Pwd,
    Cd(String),
    Stat(String),
    Fstat(DescriptorId),
    Create(String),
    Mkdir(String),
    Rmdir(String),
    Link(String, String),
    Unlink(String),
    Symlink(String, String),
    Open(String),
    Close(u64),
    Read(u64, u64, usize),
    Write(u64, u64, String),
    Truncate(String, u64),
    Clear,
    Exit,
}

pub fn execute_command<D: BlockDevice>(
    cmd: &Command,
    session: &mut Session<D>,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Mkfs(blocks) => {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Erase the image and format {} blocks?",
                    blocks
                ))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Aborted.".bright_black());
                return Ok(());
            }

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.set_message("💾 Formatting virtual disk...");
            pb.enable_steady_tick(Duration::from_millis(80));
            let result = session.mkfs(*blocks);
            pb.finish_and_clear();
            result?;
            println!("{}", "✅ Disk formatted successfully!".green());
        }
        Command::Ls(path) => {
            let path = path.as_deref().unwrap_or(".");
            for entry in session.ls(path)? {
                let desc = session.fs().get_descriptor(entry.descriptor_id)?;
                match desc.file_type {
                    FileType::Directory => println!(
                        "📁  {:<28} {}",
                        entry.name.blue().bold(),
                        entry.descriptor_id.to_string().bright_black()
                    ),
                    FileType::Regular => println!(
                        "📄  {:<28} {}",
                        entry.name,
                        entry.descriptor_id.to_string().bright_black()
                    ),
                    FileType::Symlink => println!(
                        "🔗  {:<28} {} -> {}",
                        entry.name.cyan(),
                        entry.descriptor_id.to_string().bright_black(),
                        session.fs().read_link(entry.descriptor_id)?
                    ),
                }
            }
        }
        Command::Pwd => println!("📍 {}", session.cwd()?.cyan()),
        Command::Cd(path) => {
            session.cd(path)?;
            println!("📂 Moved to {}", session.cwd()?.blue());
        }
        Command::Stat(path) => print_descriptor(path, &session.stat(path)?),
        Command::Fstat(id) => {
            let desc = session.fs().get_descriptor(*id)?;
            print_descriptor(&format!("#{}", id), &desc);
        }
        Command::Create(path) => {
            let id = session.create(path)?;
            println!("📝 Created file: {} ({})", path.green(), id);
        }
        Command::Mkdir(path) => {
            let id = session.mkdir(path)?;
            println!("✅ Created directory: {} ({})", path.green(), id);
        }
        Command::Rmdir(path) => {
            session.rmdir(path)?;
            println!("🗑️ Removed directory: {}", path.red());
        }
        Command::Link(existing, new_path) => {
            session.link(existing, new_path)?;
            println!("🔗 Linked {} -> {}", new_path.green(), existing);
        }
        Command::Unlink(path) => {
            session.unlink(path)?;
            println!("❌ Unlinked: {}", path.red());
        }
        Command::Symlink(target, path) => {
            let id = session.symlink(target, path)?;
            println!("🔗 Created symlink: {} -> {} ({})", path.green(), target, id);
        }
        Command::Open(path) => {
            let handle = session.open(path)?;
            println!("📖 Opened {} as fd {}", path.cyan(), handle.to_string().yellow());
        }
        Command::Close(fd) => {
            session.close(FileHandle(*fd))?;
            println!("📕 Closed fd {}", fd);
        }
        Command::Read(fd, offset, size) => {
            let data = session.read(FileHandle(*fd), *offset, *size)?;
            let text: String = String::from_utf8_lossy(&data)
                .chars()
                .map(|c| if c == '\0' { '·' } else { c })
                .collect();
            println!("{}", text);
        }
        Command::Write(fd, offset, text) => {
            session.write(FileHandle(*fd), *offset, text.as_bytes())?;
            println!(
                "✏️  Wrote {} bytes at offset {}",
                text.len().to_string().green(),
                offset
            );
        }
        Command::Truncate(path, size) => {
            session.truncate(path, *size)?;
            println!("📏 {} is now {} bytes", path.cyan(), size);
        }
        Command::Clear => {
            execute!(stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        }
        Command::Exit => println!("{}", "👋 Exiting MiniFS shell...".yellow().bold()),
    }

    Ok(())
}

fn format_time(secs: u64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

fn print_descriptor(name: &str, desc: &FileDescriptor) {
    println!("{}", "📊 File Info".bright_yellow().bold());
    println!("{}: {}", "Name".blue(), name);
    println!("{}: {}", "Descriptor".blue(), desc.id);
    println!("{}: {:?}", "Type".blue(), desc.file_type);
    println!("{}: {} bytes", "Size".blue(), desc.size);
    println!("{}: {}", "Links".blue(), desc.hard_links);
    println!("{}: {:?}", "Blocks".blue(), desc.blocks);
    println!("{}: {}", "Created".blue(), format_time(desc.ctime));
    println!("{}: {}", "Modified".blue(), format_time(desc.mtime));
}

fn print_help() {
    println!("{}", "📘 MiniFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  mkfs <blocks>             Format the image with <blocks> blocks
  ls [path]                 List a directory
  pwd                       Print current path
  cd [path]                 Change directory (default /)
  stat <path>               Show descriptor of path (symlinks not followed)
  fstat <id>                Show descriptor by id
  create <file>             Create an empty file
  mkdir <dir>               Create directory
  rmdir <dir>               Remove empty directory
  link <existing> <new>     Add a hard link
  unlink <path>             Remove a name
  symlink <target> <path>   Create a symbolic link
  open <file>               Open a file, prints its fd
  close <fd>                Close an fd
  read <fd> <offset> <size> Read bytes
  write <fd> <offset> <str> Write a string (file must be large enough)
  truncate <file> <size>    Set file size
  clear                     Clear the screen
  help                      Show this help message
  exit                      Quit the shell
"
        .bright_black()
    );
}
