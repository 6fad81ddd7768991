//! CFI Parser
//!
//! Parses EPUB CFI strings into structured [`Cfi`] values. Purely lexical: no
//! document is consulted.
//!
//! Grammar (simplified):
//! ```text
//! cfi       = "epubcfi(" package "!" content ")"
//! package   = step+
//! content   = path ["," path "," path]
//! path      = step* [offset]
//! step      = "/" integer ["[" id "]"]
//! offset    = ":" integer ["[" assertion "]"] | "~" number ["@" number ":" number] | "@" number ":" number
//! integer   = "0" | [1-9][0-9]*
//! ```
//!
//! Inside brackets, `^` escapes the next character.

use tracing::trace;

use crate::error::{CfiError, Result};
use crate::types::*;

/// Longest slice of input quoted in a syntax error
const FRAGMENT_LEN: usize = 16;

/// Parser state
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> CfiError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> CfiError {
        CfiError::Syntax {
            message: message.into(),
            position,
            fragment: self.input[position..].chars().take(FRAGMENT_LEN).collect(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char, message: &str) -> Result<()> {
        if self.skip_if(expected) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn skip_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn take_digits(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Parse an integer without leading zeros
    fn parse_integer<N: std::str::FromStr>(&mut self) -> Result<N> {
        let start = self.pos;
        let digits = self.take_digits();

        if digits.is_empty() {
            return Err(self.error_at(start, "expected a number"));
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(self.error_at(start, "numbers cannot have leading zeros"));
        }

        digits
            .parse()
            .map_err(|_| self.error_at(start, "number is too large"))
    }

    /// Parse a floating point number
    fn parse_float(&mut self) -> Result<f64> {
        let start = self.pos;

        self.skip_if('-');
        self.take_digits();
        if self.skip_if('.') {
            self.take_digits();
        }

        self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error_at(start, "expected a number"))
    }

    /// Read an assertion value up to an unescaped `]` or stop character
    fn parse_value(&mut self, stops: &[char]) -> Result<String> {
        let start = self.pos;
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            match ch {
                '^' => {
                    self.advance();
                    match self.advance() {
                        Some(escaped) => value.push(escaped),
                        None => return Err(self.error_at(start, "dangling escape character")),
                    }
                }
                ']' => return Ok(value),
                '[' => return Err(self.error("unescaped '[' inside assertion")),
                _ if stops.contains(&ch) => return Ok(value),
                _ => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error_at(start.saturating_sub(1), "unclosed bracket"))
    }

    /// Parse an ID assertion [id]
    fn parse_id_assertion(&mut self) -> Result<Option<String>> {
        if !self.skip_if('[') {
            return Ok(None);
        }

        let id = self.parse_value(&[',', ';'])?;
        if id.is_empty() {
            return Err(self.error("empty id assertion"));
        }
        self.expect(']', "unexpected character in id assertion")?;

        Ok(Some(id))
    }

    /// Parse a text location assertion [prefix,suffix;key=value]
    fn parse_text_assertion(&mut self) -> Result<Option<TextAssertion>> {
        if !self.skip_if('[') {
            return Ok(None);
        }

        let mut assertion = TextAssertion::default();

        let prefix = self.parse_value(&[',', ';'])?;
        if !prefix.is_empty() {
            assertion.prefix = Some(prefix);
        }
        if self.skip_if(',') {
            let suffix = self.parse_value(&[',', ';'])?;
            if !suffix.is_empty() {
                assertion.suffix = Some(suffix);
            }
        }
        while self.skip_if(';') {
            let key = self.parse_value(&['=', ',', ';'])?;
            self.expect('=', "expected '=' in assertion parameter")?;
            let value = self.parse_value(&[',', ';'])?;
            if key.is_empty() {
                return Err(self.error("empty assertion parameter name"));
            }
            assertion.parameters.push((key, value));
        }
        self.expect(']', "unexpected character in text assertion")?;

        Ok(Some(assertion))
    }

    /// Parse a single step
    fn parse_step(&mut self) -> Result<CfiStep> {
        self.expect('/', "expected '/'")?;
        let index = self.parse_integer()?;
        let id_assertion = self.parse_id_assertion()?;

        Ok(CfiStep {
            index,
            id_assertion,
        })
    }

    /// Parse a path (sequence of steps with optional offset)
    fn parse_path(&mut self) -> Result<CfiPath> {
        let mut steps = Vec::new();

        while self.peek() == Some('/') {
            steps.push(self.parse_step()?);
        }

        let mut path = CfiPath::with_steps(steps);

        if self.skip_if(':') {
            let offset = self.parse_integer()?;
            let assertion = self.parse_text_assertion()?;
            path.character_offset = Some(CharacterOffset { offset, assertion });
        } else {
            if self.skip_if('~') {
                let seconds = self.parse_float()?;
                path.temporal_offset = Some(TemporalOffset { seconds });
            }
            if self.skip_if('@') {
                let x = self.parse_float()?;
                self.expect(':', "expected ':' in spatial offset")?;
                let y = self.parse_float()?;
                path.spatial_offset = Some(SpatialOffset { x, y });
            }
        }

        Ok(path)
    }

    /// Parse the content document part: a path or a range triple
    fn parse_content(&mut self) -> Result<ContentComponent> {
        let start = self.pos;
        let path = self.parse_path()?;

        if self.peek() == Some('!') {
            return Err(self.error("nested indirection is not supported"));
        }

        if !self.skip_if(',') {
            return Ok(ContentComponent::Path(path));
        }

        if path.has_terminus() {
            return Err(self.error_at(start, "range common ancestor cannot carry an offset"));
        }

        let range_start = self.parse_path()?;
        self.expect(',', "expected ',' between range start and end")?;
        let range_end = self.parse_path()?;

        if range_start.is_empty() && range_end.is_empty() {
            return Err(self.error_at(start, "range start and end cannot both be empty"));
        }

        Ok(ContentComponent::Range(RangeComponent {
            common_ancestor: path,
            start: range_start,
            end: range_end,
        }))
    }

    /// Parse a complete CFI
    fn parse_cfi(&mut self) -> Result<Cfi> {
        if !self.skip_str("epubcfi(") {
            return Err(self.error("CFI must start with 'epubcfi('"));
        }

        let package_start = self.pos;
        let package = self.parse_path()?;
        if package.steps.is_empty() {
            return Err(self.error_at(package_start, "empty package document path"));
        }
        if package.has_terminus() {
            return Err(self.error_at(package_start, "package document path cannot carry an offset"));
        }
        self.expect('!', "expected '!' after the package document path")?;

        let content = self.parse_content()?;

        self.expect(')', "CFI must end with ')'")?;

        Ok(Cfi {
            package: PackageComponent::new(package),
            content,
        })
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }
}

/// Parse a CFI string into a Cfi struct
pub fn parse(input: &str) -> Result<Cfi> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CfiError::Syntax {
            message: "empty CFI string".to_string(),
            position: 0,
            fragment: String::new(),
        });
    }

    let mut parser = Parser::new(input);
    let cfi = parser.parse_cfi()?;
    parser.finish()?;

    trace!(cfi = %cfi, "parsed CFI");
    Ok(cfi)
}

/// Parse a bare content component such as `/4/2[p],/1:0,/1:9`
pub fn parse_content(input: &str) -> Result<ContentComponent> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CfiError::Syntax {
            message: "empty path".to_string(),
            position: 0,
            fragment: String::new(),
        });
    }

    let mut parser = Parser::new(input);
    let content = parser.parse_content()?;
    parser.finish()?;

    Ok(content)
}

/// Parse a CFI string, discarding the error
pub fn try_parse(input: &str) -> Option<Cfi> {
    parse(input).ok()
}
