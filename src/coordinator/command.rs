use std::str::FromStr;

use crate::shared::CommandError;

/// Operator commands. The numbers match the menu printed by `help`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddRequest { origin: u8, destination: u8 },
    Status,
    Statistics,
    Quit,
    Help,
}

pub const MENU: &str = "\
1 <from> <to> | add <from> <to>   Add a passenger request
2 | status                        Show current elevator status
3 | stats                         Show work statistics
4 | quit | exit                   Stop and exit
help                              Show this menu";

fn parse_floor(token: &str) -> Result<u8, CommandError> {
    token
        .parse::<u8>()
        .map_err(|_| CommandError::InvalidFloor(token.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Command, CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Err(CommandError::Empty);
        };

        match keyword.to_lowercase().as_str() {
            "1" | "add" => {
                let (Some(origin), Some(destination), None) = (tokens.next(), tokens.next(), tokens.next())
                else {
                    return Err(CommandError::Usage);
                };
                Ok(Command::AddRequest {
                    origin: parse_floor(origin)?,
                    destination: parse_floor(destination)?,
                })
            }
            "2" | "status" => Ok(Command::Status),
            "3" | "stats" | "statistics" => Ok(Command::Statistics),
            "4" | "quit" | "exit" => Ok(Command::Quit),
            "help" | "?" => Ok(Command::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
