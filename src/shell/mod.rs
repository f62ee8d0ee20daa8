pub mod command;
pub mod parse;
pub mod session;

use std::path::PathBuf;

use colored::*;
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};

use crate::{
    disk::BlockDevice,
    shell::{
        command::{execute_command, Command},
        parse::parse_command,
    },
};

pub use session::Session;

const COMMANDS: &[&str] = &[
    "help", "mkfs", "ls", "pwd", "cd", "stat", "fstat", "create", "mkdir", "rmdir", "link",
    "unlink", "symlink", "open", "close", "read", "write", "truncate", "clear", "exit",
];

pub fn start_shell<D: BlockDevice>(mut session: Session<D>) {
    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    println!("{}", "Welcome to MiniFS".bright_cyan().bold());
    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minifs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => log::warn!("command history disabled: {}", e),
    }

    let words = COMMANDS.iter().map(|c| c.to_string()).collect();
    let completer = DefaultCompleter::new_with_wordlen(words, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let cwd = session.cwd().unwrap_or_else(|_| "?".to_string());
        let full_prompt = format!(
            "{}:{}",
            format!("{}@{}", username, hostname).green(),
            cwd.blue()
        );

        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(full_prompt),
            DefaultPromptSegment::Basic("MiniFS".bright_blue().bold().to_string()),
        );

        let input = line_editor.read_line(&prompt);

        match input {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut session) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if cmd == Command::Exit {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command or missing arguments. Type 'help' for command list."
                            .yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting MiniFS...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    if let Err(e) = session.fs_mut().sync() {
        println!("{} {}", "❌ Error flushing image:".red().bold(), e);
    }
    println!("{}", "GoodBye!".bright_yellow());
}
