//! Line parser turning raw input into a [`CommandDescriptor`].
//!
//! Tokens are separated by whitespace. Recognized operators:
//! - `|` connects exactly two commands
//! - `< file` reads standard input from `file` (applies to the first command)
//! - `> file` / `>> file` write standard output to `file` (applies to the last command)
//!
//! `quit` as the first token ends the session.

use std::path::PathBuf;

use super::command::{ArgVector, CommandDescriptor, OutputMode, OutputTarget, Strategy};
use crate::error::ParseError;

const QUIT: &str = "quit";

/// Result of parsing one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    /// `quit` was entered.
    Quit,
    /// Nothing but whitespace.
    Empty,
    Command(CommandDescriptor),
}

impl ParsedLine {
    /// Strategy code for this line; `None` for a blank line.
    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            ParsedLine::Quit => Some(Strategy::Quit),
            ParsedLine::Empty => None,
            ParsedLine::Command(desc) => Some(desc.strategy()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Pipe,
    Input,
    Output(OutputMode),
}

impl<'a> Token<'a> {
    fn classify(raw: &'a str) -> Self {
        match raw {
            "|" => Token::Pipe,
            "<" => Token::Input,
            ">" => Token::Output(OutputMode::Overwrite),
            ">>" => Token::Output(OutputMode::Append),
            word => Token::Word(word),
        }
    }

    fn operator(self) -> &'static str {
        match self {
            Token::Word(_) => "",
            Token::Pipe => "|",
            Token::Input => "<",
            Token::Output(mode) => mode.operator(),
        }
    }
}

/// Parses a single line of input.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    let mut tokens = line.split_whitespace().map(Token::classify);

    let mut first: Vec<String> = Vec::new();
    let mut second: Option<Vec<String>> = None;
    let mut input: Option<PathBuf> = None;
    let mut output: Option<OutputTarget> = None;

    let mut seen_any = false;
    while let Some(token) = tokens.next() {
        if !seen_any {
            seen_any = true;
            if token == Token::Word(QUIT) {
                return Ok(ParsedLine::Quit);
            }
        }

        match token {
            Token::Word(word) => match second.as_mut() {
                Some(args) => args.push(word.to_string()),
                None => first.push(word.to_string()),
            },
            Token::Pipe => {
                if second.is_some() {
                    return Err(ParseError::TooManyStages);
                }
                if first.is_empty() {
                    return Err(ParseError::EmptyStage("left"));
                }
                second = Some(Vec::new());
            }
            Token::Input => {
                // A repeated `<` replaces the earlier one.
                input = Some(PathBuf::from(target(token, tokens.next())?));
            }
            Token::Output(mode) => {
                output = Some(OutputTarget::new(target(token, tokens.next())?, mode));
            }
        }
    }

    if !seen_any {
        return Ok(ParsedLine::Empty);
    }

    let second = match second {
        Some(args) => Some(ArgVector::new(args).ok_or(ParseError::EmptyStage("right"))?),
        None => None,
    };
    let first = ArgVector::new(first).ok_or(ParseError::MissingCommand)?;

    Ok(ParsedLine::Command(CommandDescriptor::build(
        first, second, input, output,
    )))
}

fn target<'a>(operator: Token<'a>, next: Option<Token<'a>>) -> Result<&'a str, ParseError> {
    match next {
        Some(Token::Word(word)) => Ok(word),
        Some(other) => Err(ParseError::UnexpectedOperator {
            operator: operator.operator(),
            found: other.operator().to_string(),
        }),
        None => Err(ParseError::MissingTarget(operator.operator())),
    }
}
