//! Recursive-descent parser for JavaScript-style object literals.
//!
//! Accepts a superset of JSON: bare and numeric keys, single-quoted strings,
//! JS string escapes, comments, trailing commas, array holes, `undefined`,
//! hex integers and loose decimal points. Input is only ever read as data.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at byte {position}")]
pub struct LenientError {
    pub message: String,
    pub position: usize,
}

/// Parse a permissive object literal into a JSON value.
pub fn parse_lenient(text: &str) -> Result<Value, LenientError> {
    let mut parser = LiteralParser { src: text, pos: 0, depth: 0 };

    parser.skip_trivia()?;
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    while parser.eat(';') {
        parser.skip_trivia()?;
    }

    if parser.pos < text.len() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn error(&self, message: &str) -> LenientError {
        LenientError {
            message: message.to_string(),
            position: self.pos,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LenientError> {
        loop {
            let rest = self.rest();
            let space = rest.chars().next().filter(|c| c.is_whitespace() || *c == '\u{feff}');
            if let Some(ch) = space {
                self.pos += ch.len_utf8();
            } else if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(self.error("unterminated block comment")),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LenientError> {
        match self.peek() {
            Some('{') => self.nested(Self::parse_object),
            Some('[') => self.nested(Self::parse_array),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.parse_number()
            }
            Some(c) if is_ident_start(c) => self.parse_keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        f: fn(&mut Self) -> Result<Value, LenientError>,
    ) -> Result<Value, LenientError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_object(&mut self) -> Result<Value, LenientError> {
        self.bump();
        let mut map = Map::new();

        loop {
            self.skip_trivia()?;
            if self.eat('}') {
                return Ok(Value::Object(map));
            }

            let key = self.parse_key()?;
            self.skip_trivia()?;
            if !self.eat(':') {
                return Err(self.error("expected ':' after object key"));
            }
            self.skip_trivia()?;
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_trivia()?;
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            return Err(self.error("expected ',' or '}' in object"));
        }
    }

    fn parse_key(&mut self) -> Result<String, LenientError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.parse_string(q),
            Some(c) if is_ident_start(c) => Ok(self.take_identifier().to_string()),
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.bump();
                }
                Ok(self.src[start..self.pos].to_string())
            }
            _ => Err(self.error("expected object key")),
        }
    }

    fn parse_array(&mut self) -> Result<Value, LenientError> {
        self.bump();
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            // A hole like `[1,,2]` reads as null.
            if self.eat(',') {
                items.push(Value::Null);
                continue;
            }

            items.push(self.parse_value()?);

            self.skip_trivia()?;
            if self.eat(',') {
                continue;
            }
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            return Err(self.error("expected ',' or ']' in array"));
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LenientError> {
        self.bump();
        let mut out = String::new();

        loop {
            let Some(ch) = self.bump() else {
                return Err(self.error("unterminated string"));
            };
            if ch == quote {
                return Ok(out);
            }
            if ch != '\\' {
                out.push(ch);
                continue;
            }

            let Some(escaped) = self.bump() else {
                return Err(self.error("unterminated string"));
            };
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'b' => out.push('\u{08}'),
                'f' => out.push('\u{0c}'),
                'v' => out.push('\u{0b}'),
                '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
                'x' => {
                    let code = self.take_hex(2)?;
                    out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                'u' => out.push(self.parse_unicode_escape()?),
                // Line continuation.
                '\n' | '\u{2028}' | '\u{2029}' => {}
                '\r' => {
                    self.eat('\n');
                }
                other => out.push(other),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char, LenientError> {
        if self.eat('{') {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.src[start..self.pos];
            if !self.eat('}') || digits.is_empty() {
                return Err(self.error("invalid unicode escape"));
            }
            let code = u32::from_str_radix(digits, 16)
                .map_err(|_| self.error("invalid unicode escape"))?;
            return Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        }

        let high = self.take_hex(4)?;
        if (0xD800..0xDC00).contains(&high) && self.rest().starts_with("\\u") {
            let save = self.pos;
            self.pos += 2;
            let low = self.take_hex(4)?;
            if (0xDC00..0xE000).contains(&low) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            self.pos = save;
        }
        Ok(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn take_hex(&mut self, len: usize) -> Result<u32, LenientError> {
        let digits = self
            .rest()
            .get(..len)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid hex escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += len;
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<Value, LenientError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let magnitude = i64::from_str_radix(&self.src[digits_start..self.pos], 16)
                .map_err(|_| self.error("invalid hex number"))?;
            return Ok(Value::from(if negative { -magnitude } else { magnitude }));
        }

        if self.rest().starts_with("Infinity") {
            return Err(self.error("non-finite number"));
        }

        let int_part = self.take_digits();
        let frac_part = if self.eat('.') { Some(self.take_digits()) } else { None };
        let exp_part = if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            self.bump();
            let sign = match self.peek() {
                Some(s @ ('+' | '-')) => {
                    self.bump();
                    s.to_string()
                }
                _ => String::new(),
            };
            let digits = self.take_digits();
            if digits.is_empty() {
                return Err(self.error("invalid exponent"));
            }
            Some(format!("{}{}", sign, digits))
        } else {
            None
        };

        if int_part.is_empty() && frac_part.as_deref().is_none_or(str::is_empty) {
            self.pos = start;
            return Err(self.error("invalid number"));
        }

        let sign = if negative { "-" } else { "" };
        let is_integer = frac_part.as_deref().is_none_or(str::is_empty) && exp_part.is_none();
        if is_integer {
            let literal = format!("{}{}", sign, int_part);
            if let Ok(n) = literal.parse::<i64>() {
                return Ok(Value::from(n));
            }
            if let Ok(n) = literal.parse::<u64>() {
                return Ok(Value::from(n));
            }
        }

        let literal = format!(
            "{}{}.{}e{}",
            sign,
            if int_part.is_empty() { "0" } else { int_part },
            frac_part.filter(|f| !f.is_empty()).unwrap_or("0"),
            exp_part.as_deref().unwrap_or("0"),
        );
        let float: f64 = literal.parse().map_err(|_| self.error("invalid number"))?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| self.error("non-finite number"))
    }

    fn take_digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn take_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn parse_keyword(&mut self) -> Result<Value, LenientError> {
        let start = self.pos;
        match self.take_identifier() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" | "undefined" => Ok(Value::Null),
            "NaN" | "Infinity" => {
                self.pos = start;
                Err(self.error("non-finite number"))
            }
            _ => {
                self.pos = start;
                Err(self.error("unexpected identifier"))
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
