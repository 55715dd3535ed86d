//! PDF primitive tokenizer.
//!
//! Turns a byte window into numbers, names, strings, booleans, delimiters and
//! keywords. The tokenizer never fails: anything it cannot classify becomes a
//! [`Keyword::Unknown`] token, and an unterminated string yields whatever was
//! collected before the end of the data.

/// PDF keyword enum. Keywords the engine acts on are zero-allocation variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Structural
    ArrayStart, // [
    ArrayEnd,   // ]
    DictStart,  // <<
    DictEnd,    // >>
    BraceOpen,  // {
    BraceClose, // }

    Null,

    // Object structure
    Obj,
    EndObj,
    R,
    Stream,
    EndStream,
    Xref,
    Trailer,
    StartXref,

    // Inline images
    BI,
    ID,
    EI,

    /// Any other keyword or operator
    Unknown(Vec<u8>),
}

impl Keyword {
    pub fn from_bytes(b: &[u8]) -> Self {
        match b {
            b"[" => Self::ArrayStart,
            b"]" => Self::ArrayEnd,
            b"<<" => Self::DictStart,
            b">>" => Self::DictEnd,
            b"{" => Self::BraceOpen,
            b"}" => Self::BraceClose,
            b"null" => Self::Null,
            b"obj" => Self::Obj,
            b"endobj" => Self::EndObj,
            b"R" => Self::R,
            b"stream" => Self::Stream,
            b"endstream" => Self::EndStream,
            b"xref" => Self::Xref,
            b"trailer" => Self::Trailer,
            b"startxref" => Self::StartXref,
            b"BI" => Self::BI,
            b"ID" => Self::ID,
            b"EI" => Self::EI,
            other => Self::Unknown(other.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::ArrayStart => b"[",
            Self::ArrayEnd => b"]",
            Self::DictStart => b"<<",
            Self::DictEnd => b">>",
            Self::BraceOpen => b"{",
            Self::BraceClose => b"}",
            Self::Null => b"null",
            Self::Obj => b"obj",
            Self::EndObj => b"endobj",
            Self::R => b"R",
            Self::Stream => b"stream",
            Self::EndStream => b"endstream",
            Self::Xref => b"xref",
            Self::Trailer => b"trailer",
            Self::StartXref => b"startxref",
            Self::BI => b"BI",
            Self::ID => b"ID",
            Self::EI => b"EI",
            Self::Unknown(bytes) => bytes.as_slice(),
        }
    }

    /// Operator name as text (Latin-1 for non-ASCII bytes).
    pub fn as_operator(&self) -> String {
        name_from_bytes(self.as_bytes())
    }
}

/// PDF token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer value
    Int(i64),
    /// Floating point value
    Real(f64),
    /// Boolean value
    Bool(bool),
    /// Name (e.g., /Name), `#xx` escapes decoded, without the slash
    Name(String),
    /// Literal string (...)
    LiteralString(Vec<u8>),
    /// Hex string <...>
    HexString(Vec<u8>),
    /// Keyword, operator or delimiter
    Keyword(Keyword),
}

impl Token {
    pub fn is_keyword(&self, kw: &Keyword) -> bool {
        matches!(self, Self::Keyword(k) if k == kw)
    }
}

/// PDF tokenizer over a borrowed byte window.
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Tokenize one token starting at `start`.
///
/// Returns the token and the offset just past it, or `None` at end of data.
pub fn tokenize(buffer: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut lexer = Lexer::at(buffer, start);
    let (_, token) = lexer.next_token()?;
    Some((token, lexer.tell()))
}

pub(crate) const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

pub(crate) const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

const fn is_keyword_end(b: u8) -> bool {
    is_whitespace(b) || is_delimiter(b)
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a lexer positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    /// Current position in stream
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Set current position in stream.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Get remaining unparsed data
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Skip whitespace and comments
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'%' {
                self.pos += 1;
                match find_line_end(&self.data[self.pos..]) {
                    Some(offset) => self.pos += offset + 1,
                    None => self.pos = self.data.len(),
                }
                continue;
            }
            if !is_whitespace(b) {
                return;
            }
            self.pos += 1;
        }
    }

    /// Parse a name (/Name)
    fn parse_name(&mut self) -> Token {
        self.advance(); // '/'
        let mut name = Vec::new();

        while let Some(b) = self.peek() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let escaped = self
                    .peek()
                    .and_then(hex_value)
                    .zip(self.peek_at(1).and_then(hex_value));
                if let Some((hi, lo)) = escaped {
                    self.pos += 2;
                    name.push((hi << 4) | lo);
                    continue;
                }
            }
            name.push(b);
        }

        Token::Name(name_from_bytes(&name))
    }

    /// Parse a number (integer or real)
    fn parse_number(&mut self) -> Token {
        let start = self.pos;
        let mut has_dot = false;

        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }

        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && !has_dot {
                has_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        // The scanned bytes are ASCII sign, digits and at most one dot.
        let text = String::from_utf8_lossy(&self.data[start..self.pos]);
        if !has_dot {
            if let Ok(n) = text.parse::<i64>() {
                return Token::Int(n);
            }
        }
        let real = match text.as_ref() {
            "." | "+." | "-." => 0.0,
            t => t.parse::<f64>().unwrap_or(0.0),
        };
        Token::Real(real)
    }

    /// Parse a literal string (...)
    fn parse_string(&mut self) -> Token {
        self.advance(); // '('
        let mut result = Vec::new();
        let mut depth = 1usize;

        while let Some(c) = self.advance() {
            match c {
                b'(' => {
                    depth += 1;
                    result.push(b'(');
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    result.push(b')');
                }
                b'\\' => match self.advance() {
                    Some(b'n') => result.push(b'\n'),
                    Some(b'r') => result.push(b'\r'),
                    Some(b't') => result.push(b'\t'),
                    Some(b'b') => result.push(0x08),
                    Some(b'f') => result.push(0x0c),
                    Some(b'\r') => {
                        // line continuation
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'\n') => {}
                    Some(d @ b'0'..=b'7') => {
                        let mut octal = u32::from(d - b'0');
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d @ b'0'..=b'7') => {
                                    self.pos += 1;
                                    octal = octal * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xFF) as u8);
                    }
                    // \( \) \\ and unknown escapes keep the character
                    Some(other) => result.push(other),
                    None => break,
                },
                other => result.push(other),
            }
        }

        Token::LiteralString(result)
    }

    /// Parse a hex string <...>
    fn parse_hex_string(&mut self) -> Token {
        self.advance(); // '<'
        let mut result = Vec::new();
        let mut pending: Option<u8> = None;

        while let Some(c) = self.peek() {
            if c == b'>' {
                self.pos += 1;
                break;
            }
            if let Some(nibble) = hex_value(c) {
                match pending.take() {
                    Some(high) => result.push((high << 4) | nibble),
                    None => pending = Some(nibble),
                }
            } else if !is_whitespace(c) {
                break;
            }
            self.pos += 1;
        }

        // odd digit count: the missing final digit is 0
        if let Some(high) = pending {
            result.push(high << 4);
        }

        Token::HexString(result)
    }

    /// Parse a keyword
    fn parse_keyword(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_keyword_end(b) {
                break;
            }
            self.pos += 1;
        }

        match &self.data[start..self.pos] {
            b"true" => Token::Bool(true),
            b"false" => Token::Bool(false),
            bytes => Token::Keyword(Keyword::from_bytes(bytes)),
        }
    }

    fn single(&mut self, kw: Keyword) -> Token {
        self.pos += 1;
        Token::Keyword(kw)
    }

    /// Get next token together with its start offset.
    pub fn next_token(&mut self) -> Option<(usize, Token)> {
        self.skip_whitespace();
        if self.at_end() {
            return None;
        }

        let start = self.pos;
        let b = self.peek()?;

        let token = match b {
            b'/' => self.parse_name(),
            b'(' => self.parse_string(),
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                Token::Keyword(Keyword::DictStart)
            }
            b'<' => self.parse_hex_string(),
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Token::Keyword(Keyword::DictEnd)
            }
            b'>' | b')' => self.single(Keyword::Unknown(vec![b])),
            b'[' => self.single(Keyword::ArrayStart),
            b']' => self.single(Keyword::ArrayEnd),
            b'{' => self.single(Keyword::BraceOpen),
            b'}' => self.single(Keyword::BraceClose),
            b'+' | b'-' => match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() || c == b'.' => self.parse_number(),
                _ => self.parse_keyword(),
            },
            b'.' => match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => self.parse_number(),
                _ => self.parse_keyword(),
            },
            c if c.is_ascii_digit() => self.parse_number(),
            _ => self.parse_keyword(),
        };

        Some((start, token))
    }
}

impl Iterator for Lexer<'_> {
    type Item = (usize, Token);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

pub(crate) const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn find_line_end(data: &[u8]) -> Option<usize> {
    data.iter().position(|&b| b == b'\r' || b == b'\n')
}

pub(crate) fn name_from_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(data: &[u8]) -> Vec<Token> {
        Lexer::new(data).map(|(_, t)| t).collect()
    }

    #[test]
    fn test_keyword_from_bytes_known() {
        assert_eq!(Keyword::from_bytes(b"obj"), Keyword::Obj);
        assert_eq!(Keyword::from_bytes(b"endobj"), Keyword::EndObj);
        assert_eq!(Keyword::from_bytes(b"R"), Keyword::R);
        assert_eq!(Keyword::from_bytes(b"<<"), Keyword::DictStart);
        assert_eq!(Keyword::from_bytes(b"BI"), Keyword::BI);
    }

    #[test]
    fn test_keyword_from_bytes_unknown() {
        assert_eq!(
            Keyword::from_bytes(b"cm"),
            Keyword::Unknown(b"cm".to_vec())
        );
        assert_eq!(Keyword::Unknown(b"Tj".to_vec()).as_operator(), "Tj");
    }

    #[test]
    fn test_escaped_paren_stays_in_string() {
        assert_eq!(
            tokens(br"(Hello \) World)"),
            vec![Token::LiteralString(b"Hello ) World".to_vec())]
        );
    }

    #[test]
    fn test_balanced_parens_nest() {
        assert_eq!(
            tokens(b"(a (b) c) x"),
            vec![
                Token::LiteralString(b"a (b) c".to_vec()),
                Token::Keyword(Keyword::Unknown(b"x".to_vec())),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(b"(\\101\\n\\\\\\\nx)"),
            vec![Token::LiteralString(b"A\n\\x".to_vec())]
        );
    }

    #[test]
    fn test_unterminated_string_keeps_bytes() {
        assert_eq!(tokens(b"(abc"), vec![Token::LiteralString(b"abc".to_vec())]);
    }

    #[test]
    fn test_odd_hex_is_zero_padded() {
        assert_eq!(tokens(b"<4F3>"), vec![Token::HexString(vec![0x4F, 0x30])]);
        assert_eq!(
            tokens(b"<48 65\n6C>"),
            vec![Token::HexString(b"Hel".to_vec())]
        );
    }

    #[test]
    fn test_name_escapes_and_terminators() {
        assert_eq!(
            tokens(b"/A#20B/C[/D"),
            vec![
                Token::Name("A B".into()),
                Token::Name("C".into()),
                Token::Keyword(Keyword::ArrayStart),
                Token::Name("D".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(b"12 -3 +4.5 .25 -.5 99999999999999999999"),
            vec![
                Token::Int(12),
                Token::Int(-3),
                Token::Real(4.5),
                Token::Real(0.25),
                Token::Real(-0.5),
                Token::Real(1e20),
            ]
        );
    }

    #[test]
    fn test_lone_sign_is_keyword() {
        assert_eq!(
            tokens(b"- +"),
            vec![
                Token::Keyword(Keyword::Unknown(b"-".to_vec())),
                Token::Keyword(Keyword::Unknown(b"+".to_vec())),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokens(b"% header\n1 %trailing\n2"),
            vec![Token::Int(1), Token::Int(2)]
        );
    }

    #[test]
    fn test_booleans_and_null() {
        assert_eq!(
            tokens(b"true false null"),
            vec![
                Token::Bool(true),
                Token::Bool(false),
                Token::Keyword(Keyword::Null),
            ]
        );
    }

    #[test]
    fn test_stray_delimiters_make_progress() {
        assert_eq!(
            tokens(b") >"),
            vec![
                Token::Keyword(Keyword::Unknown(b")".to_vec())),
                Token::Keyword(Keyword::Unknown(b">".to_vec())),
            ]
        );
    }

    #[test]
    fn test_tokenize_returns_next_offset() {
        let buf = b"  << /Type";
        let (tok, next) = tokenize(buf, 0).unwrap();
        assert_eq!(tok, Token::Keyword(Keyword::DictStart));
        assert_eq!(next, 4);
        let (tok, next) = tokenize(buf, next).unwrap();
        assert_eq!(tok, Token::Name("Type".into()));
        assert_eq!(next, buf.len());
        assert!(tokenize(buf, next).is_none());
    }
}
