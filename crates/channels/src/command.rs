//! Chat command grammar.
//!
//! A command is the prefix, a command word, and an optional argument
//! (`!grabitem golden_apple`). Command words are case-insensitive.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ScanChests,
    ReadReference,
    PlaceShulkers,
    FillShulkers,
    GrabItem(String),
    BreakItemShulker,
    BreakShulkers,
    Sequence,
    SetKit(Vec<String>),
    Kit,
    Cancel,
    Status,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type !help for a list of commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    MissingArgument(&'static str),
}

pub const HELP_TEXT: &str = "\
Available commands:
!scanchests - Scan nearby double chests and rebuild the item index
!readreference - Load the reference kit from the reference chest
!placeshulkers - Withdraw empty shulkers and place them
!grabitem <item> - Place a shulker containing <item> as the working source
!fillshulkers - Fill the placed shulkers from the working source
!breakitemshulker - Break the working source and discard it
!breakshulkers - Break the filled shulkers and store them
!sequence - Run the full kit sequence
!setkit <a,b,c> - Set the reference kit
!kit - Show the reference kit
!cancel - Cancel the running operation
!status - Show what is running
!help - Show this message";

impl Command {
    /// Parse `content` as a command.
    ///
    /// Returns `None` when the message does not start with `prefix`, so
    /// ordinary chat is ignored.
    pub fn parse(prefix: &str, content: &str) -> Option<Result<Self, CommandError>> {
        let body = content.trim().strip_prefix(prefix)?;
        let (word, rest) = match body.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (body, ""),
        };
        if word.is_empty() {
            return None;
        }

        let command = match word.to_ascii_lowercase().as_str() {
            "scanchests" => Self::ScanChests,
            "readreference" => Self::ReadReference,
            "placeshulkers" => Self::PlaceShulkers,
            "fillshulkers" => Self::FillShulkers,
            "grabitem" => match rest.split_whitespace().next() {
                Some(item) => Self::GrabItem(item.to_string()),
                None => return Some(Err(CommandError::MissingArgument("!grabitem <item>"))),
            },
            "breakitemshulker" => Self::BreakItemShulker,
            "breakshulkers" => Self::BreakShulkers,
            "sequence" => Self::Sequence,
            "setkit" => {
                let items: Vec<String> = rest
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if items.is_empty() {
                    return Some(Err(CommandError::MissingArgument("!setkit <a,b,c>")));
                }
                Self::SetKit(items)
            }
            "kit" => Self::Kit,
            "cancel" => Self::Cancel,
            "status" => Self::Status,
            "help" => Self::Help,
            other => return Some(Err(CommandError::Unknown(other.to_string()))),
        };
        Some(Ok(command))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanChests => f.write_str("scanchests"),
            Self::ReadReference => f.write_str("readreference"),
            Self::PlaceShulkers => f.write_str("placeshulkers"),
            Self::FillShulkers => f.write_str("fillshulkers"),
            Self::GrabItem(item) => write!(f, "grabitem {item}"),
            Self::BreakItemShulker => f.write_str("breakitemshulker"),
            Self::BreakShulkers => f.write_str("breakshulkers"),
            Self::Sequence => f.write_str("sequence"),
            Self::SetKit(items) => write!(f, "setkit {}", items.join(",")),
            Self::Kit => f.write_str("kit"),
            Self::Cancel => f.write_str("cancel"),
            Self::Status => f.write_str("status"),
            Self::Help => f.write_str("help"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Option<Result<Command, CommandError>> {
        Command::parse("!", content)
    }

    #[test]
    fn plain_chat_is_ignored() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("!"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn stage_commands() {
        assert_eq!(parse("!scanchests"), Some(Ok(Command::ScanChests)));
        assert_eq!(parse("  !placeShulkers  "), Some(Ok(Command::PlaceShulkers)));
        assert_eq!(parse("!breakshulkers"), Some(Ok(Command::BreakShulkers)));
        assert_eq!(parse("!sequence"), Some(Ok(Command::Sequence)));
    }

    #[test]
    fn grabitem_takes_an_item() {
        assert_eq!(
            parse("!grabitem golden_apple"),
            Some(Ok(Command::GrabItem("golden_apple".into())))
        );
        assert_eq!(
            parse("!grabitem"),
            Some(Err(CommandError::MissingArgument("!grabitem <item>")))
        );
    }

    #[test]
    fn setkit_splits_on_commas() {
        assert_eq!(
            parse("!setkit golden_apple, ender_pearl,,arrow"),
            Some(Ok(Command::SetKit(vec![
                "golden_apple".into(),
                "ender_pearl".into(),
                "arrow".into()
            ])))
        );
        assert!(matches!(parse("!setkit  , "), Some(Err(CommandError::MissingArgument(_)))));
    }

    #[test]
    fn unknown_command_points_at_help() {
        let err = parse("!dance").unwrap().unwrap_err();
        assert_eq!(err, CommandError::Unknown("dance".into()));
        assert!(err.to_string().contains("!help"));
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(Command::parse("ks:", "ks:kit"), Some(Ok(Command::Kit)));
        assert_eq!(Command::parse("ks:", "!kit"), None);
    }

    #[test]
    fn help_lists_every_command() {
        for word in [
            "scanchests",
            "readreference",
            "placeshulkers",
            "grabitem",
            "fillshulkers",
            "breakitemshulker",
            "breakshulkers",
            "sequence",
            "setkit",
            "kit",
            "cancel",
            "status",
            "help",
        ] {
            assert!(HELP_TEXT.contains(&format!("!{word}")), "missing {word}");
            assert!(parse(&format!("!{word} x")).unwrap().is_ok());
        }
    }
}
