//! Parser for the PowerShell data-file subset used by module manifests.
//!
//! Supported: hashtables `@{ k = v }`, arrays `@( ... )` and bare comma
//! lists, single- and double-quoted strings with their escapes,
//! here-strings, `$true` / `$false` / `$null`, bare words and numbers (kept
//! as text so `5.10` stays `5.10`), `#` line comments and `<# #>` block
//! comments. The result is a `serde_json::Value`.

use serde_json::{Map, Value};

use crate::errors::{MetaError, Result};

/// Parse a `.psd1` document into a JSON value.
///
/// # Errors
///
/// Returns [`MetaError::Manifest`] with the offending line on syntax errors.
pub fn parse_data_file(src: &str) -> Result<Value> {
    let mut p = Parser {
        chars: src.chars().collect(),
        pos: 0,
    };
    p.skip_trivia(true);
    let value = p.parse_expression()?;
    p.skip_trivia(true);
    if p.pos < p.chars.len() {
        return Err(p.error("unexpected content after document"));
    }
    Ok(value)
}

/// Case-insensitive key lookup, since data-file keys are case-insensitive.
#[must_use]
pub fn get_ci<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn line(&self) -> usize {
        self.chars[..self.pos.min(self.chars.len())]
            .iter()
            .filter(|c| **c == '\n')
            .count()
            + 1
    }

    fn error(&self, message: &str) -> MetaError {
        MetaError::Manifest {
            message: format!("line {}: {message}", self.line()),
        }
    }

    /// Skip whitespace and comments; newlines only when `newlines` is set.
    fn skip_trivia(&mut self, newlines: bool) {
        while let Some(c) = self.peek() {
            if c == '\n' && !newlines {
                return;
            }
            if c.is_whitespace() || c == '\u{feff}' {
                self.pos += 1;
            } else if self.starts_with("<#") {
                self.pos += 2;
                while self.pos < self.chars.len() && !self.starts_with("#>") {
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(self.chars.len());
            } else if c == '#' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else if c == '`' && matches!(self.peek_at(1), Some('\n') | Some('\r')) {
                // line continuation
                self.pos += 1;
                while self.peek().is_some_and(|c| c == '\r' || c == '\n') {
                    self.pos += 1;
                }
            } else {
                return;
            }
        }
    }

    /// A value optionally followed by `, value, ...` (a bare array).
    fn parse_expression(&mut self) -> Result<Value> {
        let first = self.parse_value()?;
        self.skip_trivia(false);
        if self.peek() != Some(',') {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.peek() == Some(',') {
            self.pos += 1;
            self.skip_trivia(true);
            items.push(self.parse_value()?);
            self.skip_trivia(false);
        }
        Ok(Value::Array(items))
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_trivia(true);
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('@') => match self.peek_at(1) {
                Some('{') => self.parse_hashtable(),
                Some('(') => self.parse_array(),
                Some('\'') | Some('"') => self.parse_here_string(),
                _ => Err(self.error("expected '@{', '@(' or a here-string")),
            },
            Some('\'') => self.parse_single_quoted().map(Value::String),
            Some('"') => self.parse_double_quoted().map(Value::String),
            Some('$') => {
                self.pos += 1;
                let word = self.read_bare_word();
                Ok(match word.to_ascii_lowercase().as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ => Value::String(format!("${word}")),
                })
            }
            Some(_) => {
                let word = self.read_bare_word();
                if word.is_empty() {
                    Err(self.error("expected a value"))
                } else {
                    Ok(Value::String(word))
                }
            }
        }
    }

    fn read_bare_word(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, ',' | ';' | ')' | '}' | '=' | '#') {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_hashtable(&mut self) -> Result<Value> {
        self.pos += 2;
        let mut map = Map::new();
        loop {
            self.skip_separators();
            match self.peek() {
                None => return Err(self.error("unterminated hashtable")),
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => {}
            }
            let key = match self.peek() {
                Some('\'') => self.parse_single_quoted()?,
                Some('"') => self.parse_double_quoted()?,
                _ => self.read_bare_word(),
            };
            if key.is_empty() {
                return Err(self.error("expected a hashtable key"));
            }
            self.skip_trivia(false);
            if self.peek() != Some('=') {
                return Err(self.error(&format!("expected '=' after key '{key}'")));
            }
            self.pos += 1;
            let value = self.parse_expression()?;
            self.skip_trivia(false);
            if !matches!(self.peek(), None | Some('\n') | Some(';') | Some('}')) {
                return Err(self.error(&format!("unexpected content after value of '{key}'")));
            }
            map.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.pos += 2;
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            while self.peek() == Some(',') {
                self.pos += 1;
                self.skip_separators();
            }
            match self.peek() {
                None => return Err(self.error("unterminated array")),
                Some(')') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => {}
            }
            // commas between items are consumed at the top of the loop, so
            // `@('a', 'b')` flattens into a single array
            items.push(self.parse_value()?);
        }
    }

    fn skip_separators(&mut self) {
        loop {
            self.skip_trivia(true);
            if self.peek() == Some(';') {
                self.pos += 1;
            } else {
                return;
            }
        }
    }

    fn parse_single_quoted(&mut self) -> Result<String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\'') if self.peek_at(1) == Some('\'') => {
                    out.push('\'');
                    self.pos += 2;
                }
                Some('\'') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_double_quoted(&mut self) -> Result<String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('"') if self.peek_at(1) == Some('"') => {
                    out.push('"');
                    self.pos += 2;
                }
                Some('"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('`') => {
                    let escaped = match self.peek_at(1) {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('0') => '\0',
                        Some(c) => c,
                        None => return Err(self.error("unterminated string")),
                    };
                    out.push(escaped);
                    self.pos += 2;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_here_string(&mut self) -> Result<Value> {
        let quote = self.peek_at(1).unwrap_or('\'');
        self.pos += 2;
        // rest of the opening line must be blank
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
        self.pos += 1;
        let start = self.pos;
        let terminator: String = [quote, '@'].iter().collect();
        loop {
            if self.pos >= self.chars.len() {
                return Err(self.error("unterminated here-string"));
            }
            let at_line_start = self.pos == start || self.chars[self.pos - 1] == '\n';
            if at_line_start && self.starts_with(&terminator) {
                let mut body: String = self.chars[start..self.pos].iter().collect();
                if body.ends_with('\n') {
                    body.pop();
                }
                if body.ends_with('\r') {
                    body.pop();
                }
                self.pos += 2;
                return Ok(Value::String(body));
            }
            self.pos += 1;
        }
    }
}
