//! Command-line tokenizer, consumed by the command loop as an opaque
//! `parse(line)`. Handles quoted tokens, `<`/`>` redirection, a trailing
//! `&`, and classification of the leading word as a builtin.

use std::fmt;

pub const MAXARGS: usize = 128;

/// Builtin classification of a command's leading word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    None,
    Quit,
    Jobs,
    Bg,
    Fg,
}

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandLine {
    /// Command and its arguments.
    pub argv: Vec<String>,
    /// Input redirection file, if any.
    pub infile: Option<String>,
    /// Output redirection file, if any.
    pub outfile: Option<String>,
    pub builtin: Builtin,
    /// True when the line ends with `&`.
    pub background: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    /// Blank line; the caller just continues.
    Empty,
    Cmd(CommandLine),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    UnmatchedQuote(char),
    AmbiguousRedirect,
    MissingRedirectFile,
    MisplacedAmp,
    TooManyArgs,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnmatchedQuote(q) => write!(f, "unmatched {}", q),
            ParseError::AmbiguousRedirect => write!(f, "ambiguous I/O redirection"),
            ParseError::MissingRedirectFile => {
                write!(f, "must provide file name for redirection")
            }
            ParseError::MisplacedAmp => write!(f, "misplaced &"),
            ParseError::TooManyArgs => write!(f, "too many arguments"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    InRedirect,
    OutRedirect,
    Amp,
}

/// Parses one input line.
pub fn parse(line: &str) -> Result<Parsed, ParseError> {
    let tokens = tokenize(line)?;

    let mut argv: Vec<String> = Vec::new();
    let mut infile: Option<String> = None;
    let mut outfile: Option<String> = None;
    let mut background = false;

    let total = tokens.len();
    let mut iter = tokens.into_iter().enumerate();
    while let Some((index, token)) = iter.next() {
        match token {
            Token::InRedirect | Token::OutRedirect => {
                let slot = if token == Token::InRedirect {
                    &mut infile
                } else {
                    &mut outfile
                };
                if slot.is_some() {
                    return Err(ParseError::AmbiguousRedirect);
                }
                match iter.next() {
                    Some((_, Token::Word(file))) => *slot = Some(file),
                    _ => return Err(ParseError::MissingRedirectFile),
                }
            }
            Token::Amp => {
                if index + 1 != total {
                    return Err(ParseError::MisplacedAmp);
                }
                background = true;
            }
            Token::Word(word) => {
                if argv.len() >= MAXARGS - 1 {
                    return Err(ParseError::TooManyArgs);
                }
                argv.push(word);
            }
        }
    }

    if argv.is_empty() {
        return Ok(Parsed::Empty);
    }

    let builtin = match argv[0].as_str() {
        "quit" => Builtin::Quit,
        "jobs" => Builtin::Jobs,
        "bg" => Builtin::Bg,
        "fg" => Builtin::Fg,
        _ => Builtin::None,
    };

    Ok(Parsed::Cmd(CommandLine {
        argv,
        infile,
        outfile,
        builtin,
        background,
    }))
}

/// Splits the line into words and operator tokens. Single- and
/// double-quoted runs form one word; an unmatched quote is an error.
fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        match ch {
            '"' | '\'' => {
                chars.next();
                let mut word = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ch {
                        closed = true;
                        break;
                    }
                    word.push(c);
                }
                if !closed {
                    return Err(ParseError::UnmatchedQuote(ch));
                }
                tokens.push(Token::Word(word));
            }
            '<' => {
                chars.next();
                tokens.push(Token::InRedirect);
            }
            '>' => {
                chars.next();
                tokens.push(Token::OutRedirect);
            }
            '&' => {
                chars.next();
                tokens.push(Token::Amp);
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '<' | '>' | '&' | '"' | '\'') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}
