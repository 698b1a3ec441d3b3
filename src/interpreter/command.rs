//! Command Line Parsing for Interpreter Scripts
//!
//! Splits a script line into whitespace separated words and maps the first
//! word onto a [`Command`]. Blank lines and `#` comments produce no command.

use thiserror::Error;

/// Errors raised while parsing a script line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("{command} needs an argument: {usage}")]
    MissingArgument { command: &'static str, usage: &'static str },

    #[error("Invalid repeat count '{value}' for {command}")]
    InvalidCount { command: &'static str, value: String },

    #[error("Too many arguments for {command}: {usage}")]
    TooManyArguments { command: &'static str, usage: &'static str },
}

/// A single interpreter command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    Free,
    InsertHead { text: String, count: usize },
    InsertTail { text: String, count: usize },
    /// Remove the head and print it, optionally comparing with an expected value
    RemoveHead { expected: Option<String> },
    RemoveHeadQuiet,
    Size { count: usize },
    Reverse,
    Sort,
    Show,
    /// List options, or set `name` to `value`
    Option { setting: Option<(String, String)> },
    Help,
    Quit,
}

/// Usage line per command, in help order
pub const COMMAND_HELP: &[(&str, &str)] = &[
    ("new", "Create new queue"),
    ("free", "Delete queue and check for leaked allocations"),
    ("ih str [n]", "Insert string str at head of queue n times (default: n = 1)"),
    ("it str [n]", "Insert string str at tail of queue n times (default: n = 1)"),
    ("rh [str]", "Remove from head of queue, optionally compare to expected value str"),
    ("rhq", "Remove from head of queue without reporting value"),
    ("size [n]", "Compute queue size n times (default: n = 1)"),
    ("reverse", "Reverse queue"),
    ("sort", "Sort queue in ascending order"),
    ("show", "Display queue contents"),
    ("option [name val]", "Display or set options"),
    ("help", "Show documentation"),
    ("quit", "Exit program"),
];

impl Command {
    /// Parse one script line; `Ok(None)` for blank lines and comments
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let name = match words.next() {
            None => return Ok(None),
            Some(word) if word.starts_with('#') => return Ok(None),
            Some(word) => word,
        };
        let args: Vec<&str> = words.collect();

        let command = match name {
            "new" => no_args("new", &args, Command::New)?,
            "free" => no_args("free", &args, Command::Free)?,
            "ih" => {
                let (text, count) = text_and_count("ih", "ih str [n]", &args)?;
                Command::InsertHead { text, count }
            }
            "it" => {
                let (text, count) = text_and_count("it", "it str [n]", &args)?;
                Command::InsertTail { text, count }
            }
            "rh" => match args.as_slice() {
                [] => Command::RemoveHead { expected: None },
                [expected] => Command::RemoveHead { expected: Some(expected.to_string()) },
                _ => {
                    return Err(CommandError::TooManyArguments { command: "rh", usage: "rh [str]" })
                }
            },
            "rhq" => no_args("rhq", &args, Command::RemoveHeadQuiet)?,
            "size" => match args.as_slice() {
                [] => Command::Size { count: 1 },
                [count] => Command::Size { count: parse_count("size", count)? },
                _ => {
                    return Err(CommandError::TooManyArguments { command: "size", usage: "size [n]" })
                }
            },
            "reverse" => no_args("reverse", &args, Command::Reverse)?,
            "sort" => no_args("sort", &args, Command::Sort)?,
            "show" => no_args("show", &args, Command::Show)?,
            "option" => match args.as_slice() {
                [] => Command::Option { setting: None },
                [name, value] => Command::Option {
                    setting: Some((name.to_string(), value.to_string())),
                },
                [_] => {
                    return Err(CommandError::MissingArgument {
                        command: "option",
                        usage: "option [name val]",
                    })
                }
                _ => {
                    return Err(CommandError::TooManyArguments {
                        command: "option",
                        usage: "option [name val]",
                    })
                }
            },
            "help" => Command::Help,
            "quit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }

    /// True for commands that change the queue
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::New
                | Command::InsertHead { .. }
                | Command::InsertTail { .. }
                | Command::RemoveHead { .. }
                | Command::RemoveHeadQuiet
                | Command::Reverse
                | Command::Sort
        )
    }
}

fn no_args(command: &'static str, args: &[&str], parsed: Command) -> Result<Command, CommandError> {
    if args.is_empty() {
        Ok(parsed)
    } else {
        Err(CommandError::TooManyArguments { command, usage: command })
    }
}

fn text_and_count(
    command: &'static str,
    usage: &'static str,
    args: &[&str],
) -> Result<(String, usize), CommandError> {
    match args {
        [] => Err(CommandError::MissingArgument { command, usage }),
        [text] => Ok((text.to_string(), 1)),
        [text, count] => Ok((text.to_string(), parse_count(command, count)?)),
        _ => Err(CommandError::TooManyArguments { command, usage }),
    }
}

fn parse_count(command: &'static str, value: &str) -> Result<usize, CommandError> {
    value
        .parse::<usize>()
        .map_err(|_| CommandError::InvalidCount { command, value: value.to_string() })
}
