//! Shell-word tokenizer and command grouping.
//!
//! Splits a raw command line into tokens under POSIX-style quoting rules,
//! keeping control and redirection operators distinct from words. A quoted
//! `";"` is a word; a bare `;` is an operator. Separator operators then split
//! the token stream into simple commands. Redirections are not separators:
//! the operator and its target are spelled back into the command's word
//! list, so path extraction sees the target like any other operand.
//!
//! The tokenizer removes quotes but performs no expansion, so `$VAR`, `$(…)`
//! and glob characters survive into the tokens where the resolver can reject
//! them.

use thiserror::Error;

/// Errors from tokenizing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A quote opened with the given character was never closed.
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    /// The line ended in the middle of a backslash escape.
    #[error("dangling backslash escape")]
    DanglingEscape,
}

/// Control and redirection operators recognized by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Semicolon,
    Pipe,
    OrIf,
    AndIf,
    Background,
    Newline,
    RedirectOut,
    AppendOut,
    RedirectIn,
    RedirectErr,
    AppendErr,
    RedirectBoth,
    AppendBoth,
}

impl Operator {
    /// True for operators that end the current simple command.
    #[must_use]
    pub fn is_separator(self) -> bool {
        matches!(
            self,
            Operator::Semicolon
                | Operator::Pipe
                | Operator::OrIf
                | Operator::AndIf
                | Operator::Background
                | Operator::Newline
        )
    }

    fn is_redirection(self) -> bool {
        !self.is_separator()
    }

    /// The operator's shell spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Semicolon => ";",
            Operator::Pipe => "|",
            Operator::OrIf => "||",
            Operator::AndIf => "&&",
            Operator::Background => "&",
            Operator::Newline => "\n",
            Operator::RedirectOut => ">",
            Operator::AppendOut => ">>",
            Operator::RedirectIn => "<",
            Operator::RedirectErr => "2>",
            Operator::AppendErr => "2>>",
            Operator::RedirectBoth => "&>",
            Operator::AppendBoth => "&>>",
        }
    }
}

/// A lexed token: a shell word after quote removal, or an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Op(Operator),
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    tokens: Vec<Token>,
    word: String,
    /// A word is in progress, even if empty (`''` is a real argument).
    word_open: bool,
    /// Any part of the current word came from inside quotes.
    word_quoted: bool,
}

impl<'a> Lexer<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            chars: line.chars().peekable(),
            tokens: Vec::new(),
            word: String::new(),
            word_open: false,
            word_quoted: false,
        }
    }

    fn push_char(&mut self, c: char) {
        self.word_open = true;
        self.word.push(c);
    }

    fn flush_word(&mut self) {
        if self.word_open {
            self.tokens.push(Token::Word(std::mem::take(&mut self.word)));
            self.word_open = false;
            self.word_quoted = false;
        }
    }

    fn push_op(&mut self, op: Operator) {
        self.flush_word();
        self.tokens.push(Token::Op(op));
    }

    fn consume_if(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn single_quoted(&mut self) -> Result<(), ParseError> {
        self.word_open = true;
        self.word_quoted = true;
        loop {
            match self.chars.next() {
                Some('\'') => return Ok(()),
                Some(c) => self.word.push(c),
                None => return Err(ParseError::UnterminatedQuote('\'')),
            }
        }
    }

    fn double_quoted(&mut self) -> Result<(), ParseError> {
        self.word_open = true;
        self.word_quoted = true;
        loop {
            match self.chars.next() {
                Some('"') => return Ok(()),
                Some('\\') => match self.chars.next() {
                    // Backslash is special only before these inside double
                    // quotes; elsewhere it stays literal.
                    Some(c @ ('$' | '`' | '"' | '\\')) => self.word.push(c),
                    Some('\n') => {}
                    Some(c) => {
                        self.word.push('\\');
                        self.word.push(c);
                    }
                    None => return Err(ParseError::UnterminatedQuote('"')),
                },
                Some(c) => self.word.push(c),
                None => return Err(ParseError::UnterminatedQuote('"')),
            }
        }
    }

    fn escape(&mut self) -> Result<(), ParseError> {
        match self.chars.next() {
            // Line continuation
            Some('\n') => Ok(()),
            Some(c) => {
                self.push_char(c);
                Ok(())
            }
            None => Err(ParseError::DanglingEscape),
        }
    }

    fn comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn greater_than(&mut self) {
        // An unquoted `2` directly before `>` is a file-descriptor number,
        // not an argument.
        let stderr = self.word_open && !self.word_quoted && self.word == "2";
        if stderr {
            self.word.clear();
            self.word_open = false;
        } else {
            self.flush_word();
        }
        let append = self.consume_if('>');
        let op = match (stderr, append) {
            (true, true) => Operator::AppendErr,
            (true, false) => Operator::RedirectErr,
            (false, true) => Operator::AppendOut,
            (false, false) => Operator::RedirectOut,
        };
        self.tokens.push(Token::Op(op));
    }

    fn ampersand(&mut self) {
        if self.consume_if('&') {
            self.push_op(Operator::AndIf);
        } else if self.consume_if('>') {
            let op = if self.consume_if('>') {
                Operator::AppendBoth
            } else {
                Operator::RedirectBoth
            };
            self.push_op(op);
        } else if !self.word_open && self.last_is_redirection() {
            // `2>&1` style descriptor duplication: the `&` belongs to the
            // redirection, the digit after it lexes as an ordinary word.
        } else {
            self.push_op(Operator::Background);
        }
    }

    fn last_is_redirection(&self) -> bool {
        matches!(self.tokens.last(), Some(Token::Op(op)) if op.is_redirection())
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(c) = self.chars.next() {
            match c {
                ' ' | '\t' => self.flush_word(),
                '\n' => self.push_op(Operator::Newline),
                '\'' => self.single_quoted()?,
                '"' => self.double_quoted()?,
                '\\' => self.escape()?,
                '#' if !self.word_open => self.comment(),
                ';' => self.push_op(Operator::Semicolon),
                '|' => {
                    let op = if self.consume_if('|') {
                        Operator::OrIf
                    } else {
                        Operator::Pipe
                    };
                    self.push_op(op);
                }
                '&' => self.ampersand(),
                '<' => self.push_op(Operator::RedirectIn),
                '>' => self.greater_than(),
                _ => self.push_char(c),
            }
        }
        self.flush_word();
        Ok(self.tokens)
    }
}

/// Tokenizes a command line.
///
/// # Errors
///
/// Returns `ParseError` for unterminated quotes or a dangling escape. The
/// caller treats a parse failure as a reason to block, never to allow.
pub fn tokenize(line: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(line).run()
}

/// Splits a token stream into simple commands on separator operators.
///
/// Redirection operators stay in the command as plain words next to their
/// targets, so a redirection target is checked like any other operand. The
/// operator word itself resolves as a relative path inside the working
/// directory and never blocks.
#[must_use]
pub fn split_commands(tokens: &[Token]) -> Vec<Vec<String>> {
    let mut commands = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for token in tokens {
        match token {
            Token::Op(op) if op.is_separator() => {
                if !current.is_empty() {
                    commands.push(std::mem::take(&mut current));
                }
            }
            Token::Op(op) => current.push(op.as_str().to_string()),
            Token::Word(word) => current.push(word.clone()),
        }
    }
    if !current.is_empty() {
        commands.push(current);
    }
    commands
}

/// Tokenizes a line and groups it into simple commands.
///
/// # Errors
///
/// Returns `ParseError` when the line fails to tokenize.
pub fn parse_line(line: &str) -> Result<Vec<Vec<String>>, ParseError> {
    Ok(split_commands(&tokenize(line)?))
}
