//! PDF object parser - converts tokens to [`PdfValue`]s.
//!
//! Handles `int int R` references by two-token look-ahead in every value
//! position, including inside arrays and dictionaries.

use tracing::debug;

use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjectRef, PdfValue};
use crate::parser::lexer::{is_whitespace, Keyword, Lexer, Token};

/// Maximum nesting of arrays and dictionaries.
pub const MAX_DEPTH: usize = 256;

/// A token with its start and end offsets.
type Spanned = (usize, usize, Token);

/// Header and body of an indirect object (`N G obj ... endobj`).
#[derive(Debug, Clone)]
pub struct IndirectObject {
    pub id: ObjectRef,
    pub value: PdfValue,
    /// Offset of the first stream data byte when the value is followed by
    /// the `stream` keyword. The value is then the stream dictionary.
    pub stream_start: Option<usize>,
}

/// PDF Parser - parses PDF object syntax
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    /// Lookahead buffer for tokens (top of stack is the next token)
    lookahead: Vec<Spanned>,
    /// End offset of the last token handed out
    last_end: usize,
    depth: usize,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Create a parser positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            lexer: Lexer::at(data, pos),
            lookahead: Vec::new(),
            last_end: pos,
            depth: 0,
        }
    }

    /// Offset just past the last consumed token.
    pub fn tell(&self) -> usize {
        self.last_end
    }

    fn next_token(&mut self) -> Option<Spanned> {
        let spanned = match self.lookahead.pop() {
            Some(tok) => tok,
            None => {
                let (start, tok) = self.lexer.next_token()?;
                (start, self.lexer.tell(), tok)
            }
        };
        self.last_end = spanned.1;
        Some(spanned)
    }

    fn push_back(&mut self, tok: Spanned) {
        self.lookahead.push(tok);
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Option<&Token> {
        if self.lookahead.is_empty() {
            let (start, tok) = self.lexer.next_token()?;
            let end = self.lexer.tell();
            self.lookahead.push((start, end, tok));
        }
        self.lookahead.last().map(|(_, _, t)| t)
    }

    /// Consume the next token if it is the given keyword.
    pub fn eat_keyword(&mut self, kw: &Keyword) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(kw)) {
            self.next_token();
            return true;
        }
        false
    }

    /// Discard the next token. Returns false at end of data.
    pub fn skip(&mut self) -> bool {
        self.next_token().is_some()
    }

    /// Parse next PDF object
    pub fn parse_object(&mut self) -> Result<PdfValue> {
        let tok = self.next_token().ok_or(PdfError::UnexpectedEof)?;
        self.token_to_object(tok)
    }

    /// Convert a token to a PDF object
    fn token_to_object(&mut self, (start, end, token): Spanned) -> Result<PdfValue> {
        match token {
            Token::Int(n) => Ok(self.maybe_reference(n)),
            Token::Real(r) => Ok(PdfValue::from(r)),
            Token::Bool(b) => Ok(PdfValue::Bool(b)),
            Token::Name(s) => Ok(PdfValue::Name(s)),
            Token::LiteralString(s) => Ok(PdfValue::LiteralString(s)),
            Token::HexString(s) => Ok(PdfValue::HexString(s)),
            Token::Keyword(Keyword::Null) => Ok(PdfValue::Null),
            Token::Keyword(Keyword::ArrayStart) => self.nested(Self::parse_array),
            Token::Keyword(Keyword::DictStart) => self.nested(Self::parse_dict),
            Token::Keyword(kw) if !is_structural(&kw) => {
                debug!(pos = start, keyword = %kw.as_operator(), "stray keyword read as null");
                Ok(PdfValue::Null)
            }
            Token::Keyword(kw) => {
                // leave structural keywords for the caller
                self.push_back((start, end, Token::Keyword(kw.clone())));
                Err(PdfError::TokenError {
                    pos: start,
                    msg: format!("unexpected keyword: {}", kw.as_operator()),
                })
            }
        }
    }

    /// `n` was an integer; look ahead for `gen R`.
    fn maybe_reference(&mut self, n: i64) -> PdfValue {
        let Some(second) = self.next_token() else {
            return PdfValue::from(n);
        };
        if let Token::Int(generation) = second.2 {
            if let Some(third) = self.next_token() {
                if third.2.is_keyword(&Keyword::R) {
                    if let (Ok(number), Ok(generation)) =
                        (u32::try_from(n), u32::try_from(generation))
                    {
                        return PdfValue::Reference(ObjectRef::new(number, generation));
                    }
                    debug!(n, generation, "reference with out-of-range numbers");
                    return PdfValue::Null;
                }
                self.push_back(third);
            }
        }
        self.push_back(second);
        PdfValue::from(n)
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<PdfValue>) -> Result<PdfValue> {
        if self.depth >= MAX_DEPTH {
            return Err(PdfError::SyntaxError(format!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse array contents until ]
    fn parse_array(&mut self) -> Result<PdfValue> {
        let mut arr = Vec::new();
        while let Some(tok) = self.next_token() {
            if tok.2.is_keyword(&Keyword::ArrayEnd) {
                return Ok(PdfValue::Array(arr));
            }
            match self.token_to_object(tok) {
                Ok(value) => arr.push(value),
                Err(PdfError::TokenError { pos, .. }) => {
                    debug!(pos, "array closed by structural keyword");
                    return Ok(PdfValue::Array(arr));
                }
                Err(e) => return Err(e),
            }
        }
        debug!("array truncated at end of data");
        Ok(PdfValue::Array(arr))
    }

    /// Parse dict contents until >>
    fn parse_dict(&mut self) -> Result<PdfValue> {
        let mut dict = Dict::new();
        while let Some(tok) = self.next_token() {
            let key = match tok.2 {
                Token::Keyword(Keyword::DictEnd) => return Ok(PdfValue::Dict(dict)),
                Token::Name(name) => name,
                _ => {
                    debug!(pos = tok.0, "skipping non-name dictionary key");
                    continue;
                }
            };
            if self.peek().is_some_and(|t| t.is_keyword(&Keyword::DictEnd)) {
                dict.insert(key, PdfValue::Null);
                continue;
            }
            if self.eat_keyword(&Keyword::ArrayEnd) {
                debug!("unbalanced ']' as dictionary value");
                dict.insert(key, PdfValue::Null);
                continue;
            }
            match self.parse_object() {
                Ok(value) => {
                    dict.insert(key, value);
                }
                Err(PdfError::TokenError { pos, .. }) => {
                    debug!(pos, "dictionary closed by structural keyword");
                    return Ok(PdfValue::Dict(dict));
                }
                Err(e) => return Err(e),
            }
        }
        debug!("dictionary truncated at end of data");
        Ok(PdfValue::Dict(dict))
    }

    /// Parse `N G obj <value> [stream]`.
    ///
    /// Stops after the value, or after the `stream` keyword and its end of
    /// line. `endobj` is not required.
    pub fn parse_indirect(&mut self) -> Result<IndirectObject> {
        let number = self.expect_uint()?;
        let generation = self.expect_uint()?;
        if !self.eat_keyword(&Keyword::Obj) {
            return Err(PdfError::SyntaxError(format!(
                "missing 'obj' after {number} {generation}"
            )));
        }
        let id = ObjectRef::new(number, generation);

        // `N G obj endobj` is an empty object
        let value = if self.peek().is_some_and(|t| t.is_keyword(&Keyword::EndObj)) {
            PdfValue::Null
        } else {
            self.parse_object()?
        };

        let mut stream_start = None;
        if matches!(value, PdfValue::Dict(_)) && self.eat_keyword(&Keyword::Stream) {
            let data = self.lexer.data();
            let mut pos = self.tell();
            if data.get(pos) == Some(&b'\r') {
                pos += 1;
            }
            if data.get(pos) == Some(&b'\n') {
                pos += 1;
            }
            stream_start = Some(pos);
        }

        Ok(IndirectObject {
            id,
            value,
            stream_start,
        })
    }

    fn expect_uint(&mut self) -> Result<u32> {
        match self.next_token() {
            Some((_, _, Token::Int(n))) => u32::try_from(n).map_err(|_| PdfError::TokenError {
                pos: self.last_end,
                msg: format!("object number out of range: {n}"),
            }),
            Some((pos, _, tok)) => Err(PdfError::TokenError {
                pos,
                msg: format!("expected integer, got {tok:?}"),
            }),
            None => Err(PdfError::UnexpectedEof),
        }
    }
}

/// End offset of stream data that starts at `start`.
///
/// A declared `/Length` is trusted when it fits in the buffer and is followed
/// by `endstream`; otherwise the data runs up to the next `endstream`, minus
/// the end-of-line marker before it. Without any `endstream` the data runs to
/// the end of the buffer.
pub fn stream_end(data: &[u8], start: usize, declared: Option<usize>) -> usize {
    const ENDSTREAM: &[u8] = b"endstream";

    let start = start.min(data.len());
    if let Some(end) = declared.and_then(|len| start.checked_add(len)) {
        if end <= data.len() {
            let mut after = end;
            while data.get(after).copied().is_some_and(is_whitespace) {
                after += 1;
            }
            if data[after..].starts_with(ENDSTREAM) {
                return end;
            }
        }
        debug!(start, "stream /Length does not match endstream");
    }

    match find_bytes(&data[start..], ENDSTREAM) {
        Some(rel) => {
            let mut end = start + rel;
            if end > start && data[end - 1] == b'\n' {
                end -= 1;
            }
            if end > start && data[end - 1] == b'\r' {
                end -= 1;
            }
            end
        }
        None => data.len(),
    }
}

/// Keywords that end or frame an object or inline image rather than stand
/// in for a value.
fn is_structural(kw: &Keyword) -> bool {
    matches!(
        kw,
        Keyword::ArrayEnd
            | Keyword::DictEnd
            | Keyword::Obj
            | Keyword::EndObj
            | Keyword::Stream
            | Keyword::EndStream
            | Keyword::Xref
            | Keyword::Trailer
            | Keyword::StartXref
            | Keyword::BI
            | Keyword::ID
            | Keyword::EI
    )
}

pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a single value from `data`.
pub fn parse_value(data: &[u8]) -> Result<PdfValue> {
    ObjectParser::new(data).parse_object()
}
