use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    let (&cmd, args) = tokens.split_first()?;

    let arg = |i: usize| args.get(i).map(|s| s.to_string());
    let num = |i: usize| args.get(i).and_then(|s| s.parse::<u64>().ok());

    match cmd {
        "help" => Some(Command::Help),
        "mkfs" => num(0).map(Command::Mkfs),
        "ls" => Some(Command::Ls(arg(0))),
        "pwd" => Some(Command::Pwd),
        "cd" => Some(Command::Cd(arg(0).unwrap_or_else(|| "/".to_string()))),
        "stat" => arg(0).map(Command::Stat),
        "fstat" => num(0).map(|id| Command::Fstat(id as u32)),
        "create" | "touch" => arg(0).map(Command::Create),
        "mkdir" => arg(0).map(Command::Mkdir),
        "rmdir" => arg(0).map(Command::Rmdir),
        "link" => Some(Command::Link(arg(0)?, arg(1)?)),
        "unlink" | "rm" => arg(0).map(Command::Unlink),
        "symlink" => Some(Command::Symlink(arg(0)?, arg(1)?)),
        "open" => arg(0).map(Command::Open),
        "close" => num(0).map(Command::Close),
        "read" => Some(Command::Read(num(0)?, num(1)?, num(2)? as usize)),
        "write" => {
            if args.len() >= 3 {
                Some(Command::Write(num(0)?, num(1)?, args[2..].join(" ")))
            } else {
                None
            }
        }
        "truncate" => Some(Command::Truncate(arg(0)?, num(1)?)),
        "clear" => Some(Command::Clear),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(parse_command("mkfs 500"), Some(Command::Mkfs(500)));
        assert_eq!(parse_command("ls"), Some(Command::Ls(None)));
        assert_eq!(
            parse_command("  link a  b "),
            Some(Command::Link("a".into(), "b".into()))
        );
        assert_eq!(
            parse_command("read 3 10 5"),
            Some(Command::Read(3, 10, 5))
        );
        assert_eq!(
            parse_command("truncate /f 300"),
            Some(Command::Truncate("/f".into(), 300))
        );
        assert_eq!(parse_command("cd"), Some(Command::Cd("/".into())));
    }

    #[test]
    fn write_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse_command("write 1 0 hello big world"),
            Some(Command::Write(1, 0, "hello big world".into()))
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_commands() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("frobnicate"), None);
        assert_eq!(parse_command("mkfs lots"), None);
        assert_eq!(parse_command("link only-one"), None);
        assert_eq!(parse_command("write 1 0"), None);
    }
}
