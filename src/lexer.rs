use std::char;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::{ParserError, ParserErrorKind};

/// Token types
#[derive(PartialEq, Clone)]
pub enum Token {
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `#(`
    OpenVectorParen,
    /// `.`
    Dot,
    /// `'`
    Quote,
    /// `` ` ``
    QuasiQuote,
    /// `,`
    Comma,
    /// `,@`
    CommaAt,
    Identifier(String),
    /// `#t`
    True,
    /// `#f`
    False,
    /// `#\<String>`
    Character(String),
    String(String),
    Numeric(String),
    /// End of character stream
    EOF,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Token::OpenParen => write!(f, "OpenParen"),
            Token::OpenVectorParen => write!(f, "OpenVectorParen"),
            Token::CloseParen => write!(f, "CloseParen"),
            Token::Dot => write!(f, "Dot"),
            Token::Quote => write!(f, "Quote"),
            Token::QuasiQuote => write!(f, "QuasiQuote"),
            Token::Comma => write!(f, "Comma"),
            Token::CommaAt => write!(f, "CommaAt"),
            Token::Identifier(ref name) => write!(f, "Identifier({})", name),
            Token::True => write!(f, "#t"),
            Token::False => write!(f, "#f"),
            Token::Character(ref name) => write!(f, "#\\{}", name),
            Token::Numeric(ref rep) => rep.fmt(f),
            Token::String(ref rep) => write!(f, "{:?}", rep),
            Token::EOF => write!(f, "EOF"),
        }
    }
}

/// TokenWrapper provides positional information to each token
#[derive(Debug)]
pub struct TokenWrapper {
    pub line: usize,
    pub column: usize,
    pub token: Token,
}

fn wrap(line: usize, column: usize, t: Token) -> TokenWrapper {
    TokenWrapper { line: line, column: column, token: t }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0b' | '\x0c' | '\r' | ' ')
}

fn is_initial(c: char) -> bool {
    match c {
        'a'..='z' | 'A'..='Z' | '!' | '$' | '%' | '&' | '*' | '/' | ':' | '<' | '=' | '>' | '?' | '^' | '_' | '~' => true,
        _ => !c.is_ascii() && c.is_alphabetic(),
    }
}

pub fn is_subsequent(c: char) -> bool {
    is_initial(c) || matches!(c, '0'..='9' | '+' | '-' | '.' | '@')
}

fn is_delim(c: char) -> bool {
    match c {
        '(' | ')' | '[' | ']' | '"' | ';' | '\'' | '`' | ',' => true,
        _ => c.is_whitespace(),
    }
}

/// Lexer transforms character stream into a token stream
pub struct Lexer<'a> {
    line: usize,
    column: usize,
    stream: Peekable<Chars<'a>>,
}

macro_rules! try_consume {
    ($this:ident) => (
        match $this.consume() {
            Some(c) => c,
            None => return Err($this.make_error(ParserErrorKind::UnexpectedEOF)),
        }
    )
}

impl<'a> Lexer<'a> {
    /// Creates new Lexer over source text
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer { line: 1, column: 1, stream: source.chars().peekable() }
    }

    /// return next token
    pub fn lex_token(&mut self) -> Result<TokenWrapper, ParserError> {
        self.consume_whitespace();

        let line = self.line;
        let col = self.column;
        let c = match self.consume() {
            Some(c) => c,
            None => return Ok(wrap(line, col, Token::EOF)),
        };

        let end_of_token = self.is_end_of_token();

        if is_initial(c) {
            let mut init = String::new();
            init.push(c);
            Ok(wrap(line, col, Token::Identifier(self.lex_ident(init))))
        } else if c == '+' || c == '-' {
            if end_of_token {
                Ok(wrap(line, col, Token::Identifier(c.to_string())))
            } else if c == '-' && self.lookahead() == Some('>') {
                Ok(wrap(line, col, Token::Identifier(self.lex_ident(c.to_string()))))
            } else {
                Ok(wrap(line, col, Token::Numeric(self.lex_numeric(c.to_string()))))
            }
        } else if c == '(' || c == '[' {
            Ok(wrap(line, col, Token::OpenParen))
        } else if c == ')' || c == ']' {
            Ok(wrap(line, col, Token::CloseParen))
        } else if c == '.' {
            if end_of_token {
                Ok(wrap(line, col, Token::Dot))
            } else {
                // `.5` is a number, `...` an identifier; the parser tells them apart
                Ok(wrap(line, col, Token::Numeric(self.lex_numeric(c.to_string()))))
            }
        } else if c == '\'' {
            Ok(wrap(line, col, Token::Quote))
        } else if c == '`' {
            Ok(wrap(line, col, Token::QuasiQuote))
        } else if c == ',' {
            if self.lookahead() == Some('@') {
                self.consume();
                Ok(wrap(line, col, Token::CommaAt))
            } else {
                Ok(wrap(line, col, Token::Comma))
            }
        } else if c == '#' {
            let c0 = try_consume!(self);
            match c0 {
                't' | 'T' | 'f' | 'F' => {
                    let rest = self.read_while(|c| c.is_ascii_alphabetic()).to_ascii_lowercase();
                    match (c0.to_ascii_lowercase(), rest.as_ref()) {
                        ('t', "") | ('t', "rue") => Ok(wrap(line, col, Token::True)),
                        ('f', "") | ('f', "alse") => Ok(wrap(line, col, Token::False)),
                        _ => Err(self.make_error(ParserErrorKind::InvalidToken(format!("#{}{}", c0, rest)))),
                    }
                }
                'b' | 'B' | 'o' | 'O' | 'd' | 'D' | 'x' | 'X' | 'i' | 'I' | 'e' | 'E' => {
                    let s = format!("{}{}", c, c0);
                    Ok(wrap(line, col, Token::Numeric(self.lex_numeric(s))))
                }
                '\\' => self.lex_char().map(|s| wrap(line, col, Token::Character(s))),
                '(' => Ok(wrap(line, col, Token::OpenVectorParen)),
                _ => Err(self.make_error(ParserErrorKind::InvalidCharacter(c0))),
            }
        } else if c == '"' {
            self.lex_string().map(|s| wrap(line, col, Token::String(s)))
        } else if c.is_ascii_digit() {
            Ok(wrap(line, col, Token::Numeric(self.lex_numeric(c.to_string()))))
        } else {
            Err(self.make_error(ParserErrorKind::InvalidCharacter(c)))
        }
    }

    fn is_end_of_token(&mut self) -> bool {
        match self.lookahead() {
            Some(c) => is_whitespace(c) || is_delim(c),
            None => true,
        }
    }

    fn lex_ident(&mut self, initial: String) -> String {
        let mut s = initial;
        s.push_str(&self.read_while(is_subsequent));
        s
    }

    fn lex_char(&mut self) -> Result<String, ParserError> {
        let c = try_consume!(self);

        let mut s = String::new();
        s.push(c);
        if c.is_alphanumeric() {
            s.push_str(&self.read_while(|c| c.is_alphanumeric()));
        }
        Ok(s)
    }

    fn lex_string(&mut self) -> Result<String, ParserError> {
        let mut s = String::new();
        loop {
            match try_consume!(self) {
                '"' => return Ok(s),
                '\\' => match try_consume!(self) {
                    'a' => s.push('\x07'),
                    'b' => s.push('\x08'),
                    't' => s.push('\t'),
                    'n' => s.push('\n'),
                    'v' => s.push('\x0b'),
                    'f' => s.push('\x0c'),
                    'r' => s.push('\r'),
                    '0' => s.push('\0'),
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'x' => {
                        let hex_str = self.read_while(|c| c != ';' && c != '"');
                        if self.consume() != Some(';') {
                            return Err(self.make_error(ParserErrorKind::InvalidStringEscape(format!("x{}", hex_str))));
                        }
                        let c = u32::from_str_radix(&hex_str, 16).ok().and_then(char::from_u32);
                        match c {
                            Some(c) => s.push(c),
                            None => return Err(self.make_error(ParserErrorKind::InvalidStringEscape(format!("x{};", hex_str)))),
                        }
                    }
                    '\n' => {
                        // line continuation: skip leading whitespace on the next line
                        self.read_while(|c| c != '\n' && c.is_whitespace());
                    }
                    c => return Err(self.make_error(ParserErrorKind::InvalidStringEscape(c.to_string()))),
                },
                c => s.push(c),
            }
        }
    }

    fn lex_numeric(&mut self, init: String) -> String {
        let mut s = init;
        s.push_str(&self.read_while(|c| !is_delim(c)));
        s
    }

    fn make_error(&self, kind: ParserErrorKind) -> ParserError {
        ParserError { line: self.line, column: self.column, kind: kind }
    }

    fn lookahead(&mut self) -> Option<char> {
        self.stream.peek().cloned()
    }

    fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn read_while<F>(&mut self, f: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut s = String::new();
        while let Some(c) = self.lookahead() {
            if !f(c) {
                break;
            }
            self.consume();
            s.push(c);
        }
        s
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.stream.next();
        if let Some(ch) = c {
            self.advance(ch);
        }
        c
    }

    fn consume_whitespace(&mut self) {
        loop {
            self.read_while(|c| c.is_whitespace());
            match self.lookahead() {
                Some(';') => {
                    self.read_while(|c| c != '\n');
                }
                _ => return,
            }
        }
    }
}
