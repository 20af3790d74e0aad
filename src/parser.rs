use std::char;
use std::sync::LazyLock;

use num::bigint::BigInt;
use num::complex::Complex64;
use num::rational::Ratio;
use num::traits::One;
use phf::phf_map;
use regex::{Captures, Regex};

use crate::datum::Datum;
use crate::error::{ParserError, ParserErrorKind};
use crate::lexer::{is_subsequent, Lexer, Token, TokenWrapper};
use crate::number::Number;

/// Parser parses character stream into a Datum
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    token_buf: Option<TokenWrapper>,
}

fn unexpected_token(tok: &TokenWrapper, expected: &str) -> ParserError {
    let kind = match tok.token {
        Token::EOF => ParserErrorKind::UnexpectedEOF,
        _ => ParserErrorKind::UnexpectedToken(format!("{:?}", tok.token), expected.to_string()),
    };
    ParserError { line: tok.line, column: tok.column, kind: kind }
}

fn token_error(tok: &TokenWrapper, kind: ParserErrorKind) -> ParserError {
    ParserError { line: tok.line, column: tok.column, kind: kind }
}

static CHAR_MAP: phf::Map<&'static str, char> = phf_map! {
    "nul" => '\0',
    "null" => '\0',
    "alarm" => '\x07',
    "backspace" => '\x08',
    "tab" => '\t',
    "newline" => '\n',
    "linefeed" => '\n',
    "vtab" => '\x0b',
    "page" => '\x0c',
    "return" => '\r',
    "escape" => '\x1b',
    "esc" => '\x1b',
    "space" => ' ',
    "delete" => '\x7f',
};

fn parse_char(ch: &str) -> Option<char> {
    if let Some(c) = CHAR_MAP.get(ch) {
        return Some(*c);
    }

    let mut chars = ch.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        (Some('x'), Some(_)) => u32::from_str_radix(&ch[1..], 16).ok().and_then(char::from_u32),
        _ => None,
    }
}

/// Why a numeric literal was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    /// Not a number in the requested radix
    Invalid,
    /// A rational or decimal written in a radix other than ten
    UnsupportedBase,
}

#[derive(Clone, Copy, PartialEq)]
enum Exactness {
    Exact,
    Inexact,
    Unspecified,
}

static PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(#[iebodx]){0,2}").expect("prefix pattern"));

static BIN_REAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])?([01]+)(/[01]+)?").expect("binary pattern"));
static OCT_REAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])?([0-7]+)(/[0-7]+)?").expect("octal pattern"));
static HEX_REAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])?([0-9a-fA-F]+)(/[0-9a-fA-F]+)?").expect("hex pattern"));

//                                              1         2     3      45                    6               7         8
static DEC_REAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?(?:(\d+)/(\d+)|((\d+\.\d*|\.\d+|\d+)([eE][+-]?\d+)?)|(nan\.0)|(inf\.0))")
        .expect("decimal pattern")
});

fn parse_prefix(prefix: &str) -> Result<(Exactness, u32), NumberError> {
    let mut exactness = Exactness::Unspecified;
    let mut radix = 0;
    for c in prefix.chars().filter(|&c| c != '#') {
        match c.to_ascii_lowercase() {
            'i' if exactness == Exactness::Unspecified => exactness = Exactness::Inexact,
            'e' if exactness == Exactness::Unspecified => exactness = Exactness::Exact,
            'b' if radix == 0 => radix = 2,
            'o' if radix == 0 => radix = 8,
            'd' if radix == 0 => radix = 10,
            'x' if radix == 0 => radix = 16,
            _ => return Err(NumberError::Invalid),
        }
    }
    Ok((exactness, radix))
}

/// Parses a numeric literal. `default_radix` applies unless the literal carries a radix prefix.
pub fn parse_number(rep: &str, default_radix: u32) -> Result<Number, NumberError> {
    let num_start = PREFIX_PATTERN.find(rep).map_or(0, |m| m.end());
    let (exactness, radix) = parse_prefix(&rep[..num_start])?;
    let radix = if radix == 0 { default_radix } else { radix };
    parse_numerical_tower(exactness, radix, &rep[num_start..])
}

fn parse_numerical_tower(exactness: Exactness, radix: u32, rep: &str) -> Result<Number, NumberError> {
    match rep {
        "+i" => return Ok(Number::complex(0.0, 1.0)),
        "-i" => return Ok(Number::complex(0.0, -1.0)),
        _ => (),
    }

    let (re, re_end) = parse_real(exactness, radix, rep)?;
    if re_end == rep.len() {
        return Ok(re);
    }

    let rest = &rep[re_end..];
    if rest == "i" {
        return Ok(Number::complex(0.0, re.to_f64()));
    }

    if let Some(arg_part) = rest.strip_prefix('@') {
        let (arg, arg_end) = parse_real(exactness, radix, arg_part)?;
        if arg_end != arg_part.len() {
            return Err(NumberError::Invalid);
        }
        let c = Complex64::from_polar(re.to_f64(), arg.to_f64());
        return Ok(Number::Complex(c));
    }

    let im = match rest {
        "+i" => 1.0,
        "-i" => -1.0,
        _ if rest.starts_with('+') || rest.starts_with('-') => {
            let (im, im_end) = parse_real(exactness, radix, rest)?;
            if &rest[im_end..] != "i" {
                return Err(NumberError::Invalid);
            }
            im.to_f64()
        }
        _ => return Err(NumberError::Invalid),
    };
    Ok(Number::complex(re.to_f64(), im))
}

fn parse_real(exactness: Exactness, radix: u32, rep: &str) -> Result<(Number, usize), NumberError> {
    let pattern = match radix {
        2 => &BIN_REAL_PATTERN,
        8 => &OCT_REAL_PATTERN,
        10 => &DEC_REAL_PATTERN,
        16 => &HEX_REAL_PATTERN,
        _ => return Err(NumberError::UnsupportedBase),
    };

    let captures = pattern.captures(rep).ok_or(NumberError::Invalid)?;
    let end = captures.get(0).map_or(0, |m| m.end());
    let negative = captures.get(1).map(|m| m.as_str()) == Some("-");

    let n = if radix != 10 {
        if captures.get(3).is_some() {
            return Err(NumberError::UnsupportedBase);
        }
        let digits = captures.get(2).ok_or(NumberError::Invalid)?.as_str();
        let abs = BigInt::parse_bytes(digits.as_bytes(), radix).ok_or(NumberError::Invalid)?;
        // A decimal point or exponent after the digits cannot be read in this radix.
        if rep[end..].starts_with('.') {
            return Err(NumberError::UnsupportedBase);
        }
        Number::from_bigint(if negative { -abs } else { abs })
    } else {
        parse_decimal(exactness, negative, &captures)?
    };

    let n = match exactness {
        Exactness::Inexact => n.to_inexact(),
        _ => n,
    };
    Ok((n, end))
}

fn parse_decimal(exactness: Exactness, negative: bool, captures: &Captures) -> Result<Number, NumberError> {
    let signed = captures.get(1).is_some();

    if captures.get(7).is_some() || captures.get(8).is_some() {
        // +nan.0 and -inf.0 need their sign, and have no exact counterpart
        if !signed || exactness == Exactness::Exact {
            return Err(NumberError::Invalid);
        }
        let f = if captures.get(7).is_some() {
            f64::NAN
        } else if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Ok(Number::Real(f));
    }

    if let (Some(numer), Some(denom)) = (captures.get(2), captures.get(3)) {
        let numer: BigInt = numer.as_str().parse().map_err(|_| NumberError::Invalid)?;
        let denom: BigInt = denom.as_str().parse().map_err(|_| NumberError::Invalid)?;
        let numer = if negative { -numer } else { numer };
        return Number::rational(numer, denom).map_err(|_| NumberError::Invalid);
    }

    let mantissa = captures.get(5).ok_or(NumberError::Invalid)?.as_str();
    let exponent = captures.get(6).map(|m| m.as_str());

    if exponent.is_none() && !mantissa.contains('.') {
        let abs: BigInt = mantissa.parse().map_err(|_| NumberError::Invalid)?;
        return Ok(Number::from_bigint(if negative { -abs } else { abs }));
    }

    if exactness != Exactness::Exact {
        let literal = captures.get(0).ok_or(NumberError::Invalid)?.as_str();
        return literal.parse::<f64>().map(Number::Real).map_err(|_| NumberError::Invalid);
    }

    // #e1.25e2: digits over a power of ten, scaled by the exponent
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
        None => (mantissa, ""),
    };
    let digits = format!("{}{}", int_part, frac_part);
    let abs: BigInt = if digits.is_empty() { BigInt::from(0) } else {
        digits.parse().map_err(|_| NumberError::Invalid)?
    };
    let exp: i64 = match exponent {
        Some(e) => e[1..].parse().map_err(|_| NumberError::Invalid)?,
        None => 0,
    };
    let exp = exp - frac_part.len() as i64;
    if exp.abs() > 4096 {
        return Err(NumberError::Invalid);
    }
    let scale = BigInt::from(10).pow(exp.unsigned_abs() as u32);
    let value = if exp < 0 {
        Ratio::new(abs, scale)
    } else {
        Ratio::new(abs * scale, BigInt::one())
    };
    Ok(Number::from_ratio(if negative { -value } else { value }))
}

/// Identifiers such as `...`, `-foo` or `+x` start out looking like numbers
fn is_peculiar_identifier(rep: &str) -> bool {
    let mut chars = rep.chars();
    matches!(chars.next(), Some('+') | Some('-') | Some('.')) && rep.chars().all(is_subsequent)
}

impl<'a> Parser<'a> {
    /// Create new parser over source text
    pub fn new(source: &'a str) -> Parser<'a> {
        Parser { lexer: Lexer::new(source), token_buf: None }
    }

    /// Parse next datum, failing with `UnexpectedEOF` at the end of input
    pub fn parse_datum(&mut self) -> Result<Datum, ParserError> {
        let tok = self.consume_token()?;
        match tok.token {
            Token::Identifier(ref ident) => Ok(Datum::sym(ident)),
            Token::OpenParen => self.parse_list(),
            Token::OpenVectorParen => self.parse_vector(),
            Token::True => Ok(Datum::Bool(true)),
            Token::False => Ok(Datum::Bool(false)),
            Token::Character(ref ch) => match parse_char(ch) {
                Some(c) => Ok(Datum::Char(c)),
                None => Err(token_error(&tok, ParserErrorKind::InvalidToken(format!("{:?}", tok.token)))),
            },
            Token::String(ref s) => Ok(Datum::string(s)),
            Token::Numeric(ref rep) => match parse_number(rep, 10) {
                Ok(n) => Ok(Datum::Num(n)),
                Err(_) if is_peculiar_identifier(rep) => Ok(Datum::sym(rep)),
                Err(NumberError::Invalid) =>
                    Err(token_error(&tok, ParserErrorKind::InvalidNumber(rep.clone()))),
                Err(NumberError::UnsupportedBase) =>
                    Err(token_error(&tok, ParserErrorKind::UnsupportedBase(rep.clone()))),
            },
            Token::Quote => self.parse_abbreviation("quote"),
            Token::QuasiQuote => self.parse_abbreviation("quasiquote"),
            Token::Comma => self.parse_abbreviation("unquote"),
            Token::CommaAt => self.parse_abbreviation("unquote-splicing"),
            _ => Err(unexpected_token(&tok, "Datum or OpenParen")),
        }
    }

    /// Parse next datum, or `None` when the input is exhausted
    pub fn parse_next(&mut self) -> Result<Option<Datum>, ParserError> {
        if self.lookahead_token()?.token == Token::EOF {
            return Ok(None);
        }
        self.parse_datum().map(Some)
    }

    /// Parse exactly one datum spanning the whole input
    pub fn parse_full(&mut self) -> Result<Datum, ParserError> {
        let datum = self.parse_datum()?;
        let tok = self.consume_token()?;
        if tok.token == Token::EOF {
            Ok(datum)
        } else {
            Err(token_error(&tok, ParserErrorKind::TrailingInput))
        }
    }

    fn parse_abbreviation(&mut self, keyword: &str) -> Result<Datum, ParserError> {
        let datum = self.parse_datum()?;
        Ok(Datum::list_with_tail(vec![Datum::sym(keyword), datum], Datum::Nil))
    }

    fn consume_token(&mut self) -> Result<TokenWrapper, ParserError> {
        match self.token_buf.take() {
            Some(t) => Ok(t),
            None => self.lexer.lex_token(),
        }
    }

    fn lookahead_token(&mut self) -> Result<&TokenWrapper, ParserError> {
        let tok = match self.token_buf.take() {
            Some(t) => t,
            None => self.lexer.lex_token()?,
        };
        Ok(self.token_buf.insert(tok))
    }

    fn expect(&mut self, tok: &Token) -> Result<(), ParserError> {
        let t = self.consume_token()?;
        if t.token == *tok {
            Ok(())
        } else {
            Err(unexpected_token(&t, &format!("{:?}", tok)))
        }
    }

    fn parse_list(&mut self) -> Result<Datum, ParserError> {
        let mut items = Vec::new();
        loop {
            let token = self.lookahead_token()?.token.clone();
            match token {
                Token::CloseParen => {
                    self.consume_token()?;
                    return Ok(Datum::list_with_tail(items, Datum::Nil));
                }
                Token::Dot if !items.is_empty() => {
                    self.consume_token()?;
                    let tail = self.parse_datum()?;
                    self.expect(&Token::CloseParen)?;
                    return Ok(Datum::list_with_tail(items, tail));
                }
                _ => items.push(self.parse_datum()?),
            }
        }
    }

    fn parse_vector(&mut self) -> Result<Datum, ParserError> {
        let mut items = Vec::new();
        loop {
            if self.lookahead_token()?.token == Token::CloseParen {
                self.consume_token()?;
                return Ok(Datum::vector(items));
            }
            items.push(self.parse_datum()?);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(src: &str) -> Datum {
        Parser::new(src).parse_full().unwrap()
    }

    fn rat(n: i64, d: i64) -> Number {
        Number::rational(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_number("42", 10), Ok(Number::Fixnum(42)));
        assert_eq!(parse_number("-6/4", 10), Ok(rat(-3, 2)));
        assert_eq!(parse_number("1.5", 10), Ok(Number::Real(1.5)));
        assert_eq!(parse_number(".5e1", 10), Ok(Number::Real(5.0)));
        assert_eq!(parse_number("#e1.25", 10), Ok(rat(5, 4)));
        assert_eq!(parse_number("#e1e3", 10), Ok(Number::Fixnum(1000)));
        assert_eq!(parse_number("#i3/4", 10), Ok(Number::Real(0.75)));
        assert_eq!(parse_number("#xff", 10), Ok(Number::Fixnum(255)));
        assert_eq!(parse_number("ff", 16), Ok(Number::Fixnum(255)));
        assert_eq!(parse_number("#b-101", 10), Ok(Number::Fixnum(-5)));
        assert_eq!(parse_number("-inf.0", 10), Ok(Number::Real(f64::NEG_INFINITY)));
        assert_eq!(parse_number("1+2i", 10), Ok(Number::complex(1.0, 2.0)));
        assert_eq!(parse_number("-i", 10), Ok(Number::complex(0.0, -1.0)));
        assert_eq!(parse_number("99999999999999999999", 10).map(|n| n.level()),
                   Ok(crate::number::Level::Bignum));
    }

    #[test]
    fn test_parse_number_errors() {
        assert_eq!(parse_number("1/0", 10), Err(NumberError::Invalid));
        assert_eq!(parse_number("#x1/2", 10), Err(NumberError::UnsupportedBase));
        assert_eq!(parse_number("abc", 10), Err(NumberError::Invalid));
        assert_eq!(parse_number("nan.0", 10), Err(NumberError::Invalid));
        assert_eq!(parse_number("1.5", 7), Err(NumberError::UnsupportedBase));
    }

    #[test]
    fn test_parse_chars() {
        assert_eq!(parse_char("a"), Some('a'));
        assert_eq!(parse_char("space"), Some(' '));
        assert_eq!(parse_char("x41"), Some('A'));
        assert_eq!(parse_char("x"), Some('x'));
        assert_eq!(parse_char("nonsense"), None);
    }

    #[test]
    fn test_parse_peculiar() {
        assert_eq!(parse("..."), Datum::sym("..."));
        assert_eq!(parse("-foo"), Datum::sym("-foo"));
        assert_eq!(parse("->x"), Datum::sym("->x"));
        assert_eq!(parse("-"), Datum::sym("-"));
    }

    #[test]
    fn test_parse_lists() {
        assert_eq!(parse("(+ 1 2)"), list![sym!("+"), num!(1), num!(2)]);
        assert_eq!(parse("[a (b)]"), list![sym!("a"), list![sym!("b")]]);
        assert_eq!(parse("'x"), list![sym!("quote"), sym!("x")]);
        assert_eq!(parse("`(a ,b ,@c)"), list![
            sym!("quasiquote"),
            list![sym!("a"), list![sym!("unquote"), sym!("b")], list![sym!("unquote-splicing"), sym!("c")]]
        ]);
        assert_eq!(parse("(1 . 2)"), Datum::list_with_tail(vec![num!(1)], num!(2)));
        assert_eq!(parse("#(1 #\\a)"), Datum::vector(vec![num!(1), Datum::Char('a')]));
    }

    #[test]
    fn test_parse_next() {
        let mut parser = Parser::new("1 (2)  ");
        assert_eq!(parser.parse_next(), Ok(Some(Datum::Num(Number::Fixnum(1)))));
        assert!(parser.parse_next().unwrap().is_some());
        assert_eq!(parser.parse_next(), Ok(None));
    }
}
