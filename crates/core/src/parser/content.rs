//! PDF content stream parser.
//!
//! Splits decoded page content into `(operator, operands)` records. Tokens
//! are enumerated, never executed.

use tracing::debug;

use crate::model::{ContentOp, Dict, InlineImage, Operand, PdfValue};
use crate::parser::lexer::{is_whitespace, Keyword, Lexer, Token};
use crate::parser::object_parser::ObjectParser;

/// Open array or dictionary while collecting operands.
enum Frame {
    Array(Vec<PdfValue>),
    Dict(Vec<PdfValue>),
}

/// Iterator over the operations of a content stream.
pub struct ContentParser<'a> {
    lexer: Lexer<'a>,
    operands: Vec<Operand>,
    frames: Vec<Frame>,
}

impl<'a> ContentParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            operands: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn push_value(&mut self, value: PdfValue) {
        match self.frames.last_mut() {
            Some(Frame::Array(items) | Frame::Dict(items)) => items.push(value),
            None => self.operands.push(Operand::Value(value)),
        }
    }

    fn close_array(&mut self) {
        match self.frames.pop() {
            Some(Frame::Array(items)) => self.push_value(PdfValue::Array(items)),
            Some(other) => self.frames.push(other),
            None => debug!("ignoring unbalanced ']' in content stream"),
        }
    }

    fn close_dict(&mut self) {
        match self.frames.pop() {
            Some(Frame::Dict(items)) => {
                let dict = pairs_to_dict(items);
                self.push_value(PdfValue::Dict(dict));
            }
            Some(other) => self.frames.push(other),
            None => debug!("ignoring unbalanced '>>' in content stream"),
        }
    }

    /// Read the inline image that starts after `BI`.
    fn inline_image(&mut self) -> InlineImage {
        let data = self.lexer.data();
        let mut parser = ObjectParser::at(data, self.lexer.tell());
        let mut header = Dict::new();

        loop {
            let at_data = match parser.peek() {
                None => break,
                Some(t) => t.is_keyword(&Keyword::ID),
            };
            if at_data {
                parser.eat_keyword(&Keyword::ID);
                break;
            }
            match (parser.parse_object(), parser.parse_object()) {
                (Ok(PdfValue::Name(key)), Ok(value)) => {
                    header.insert(key, value);
                }
                _ => {
                    // malformed header: resynchronize on ID
                    if parser.eat_keyword(&Keyword::ID) || !parser.skip() {
                        break;
                    }
                }
            }
        }

        // a single whitespace byte separates ID from the payload
        let mut start = parser.tell();
        if data.get(start).copied().is_some_and(is_whitespace) {
            start += 1;
        }
        let (payload_len, resume) = match find_inline_end(data, start) {
            Some(ei) => (ei.saturating_sub(1).max(start) - start, ei + 2),
            None => {
                debug!(start, "inline image without EI");
                (data.len().saturating_sub(start), data.len())
            }
        };
        self.lexer.set_pos(resume);

        InlineImage {
            header,
            payload_len,
        }
    }
}

impl Iterator for ContentParser<'_> {
    type Item = ContentOp;

    fn next(&mut self) -> Option<ContentOp> {
        while let Some((_, token)) = self.lexer.next_token() {
            let keyword = match token {
                Token::Int(n) => {
                    self.push_value(PdfValue::from(n));
                    continue;
                }
                Token::Real(r) => {
                    self.push_value(PdfValue::from(r));
                    continue;
                }
                Token::Bool(b) => {
                    self.push_value(PdfValue::Bool(b));
                    continue;
                }
                Token::Name(n) => {
                    self.push_value(PdfValue::Name(n));
                    continue;
                }
                Token::LiteralString(s) => {
                    self.push_value(PdfValue::LiteralString(s));
                    continue;
                }
                Token::HexString(s) => {
                    self.push_value(PdfValue::HexString(s));
                    continue;
                }
                Token::Keyword(kw) => kw,
            };

            match keyword {
                Keyword::Null => self.push_value(PdfValue::Null),
                Keyword::ArrayStart => self.frames.push(Frame::Array(Vec::new())),
                Keyword::DictStart => self.frames.push(Frame::Dict(Vec::new())),
                Keyword::ArrayEnd => self.close_array(),
                Keyword::DictEnd => self.close_dict(),
                Keyword::BI => {
                    self.frames.clear();
                    self.operands.clear();
                    let image = self.inline_image();
                    return Some(ContentOp {
                        operator: "BI".to_string(),
                        operands: vec![Operand::InlineImage(image)],
                    });
                }
                kw => {
                    // an operator closes anything left open
                    while !self.frames.is_empty() {
                        match self.frames.last() {
                            Some(Frame::Array(_)) => self.close_array(),
                            _ => self.close_dict(),
                        }
                    }
                    return Some(ContentOp {
                        operator: kw.as_operator(),
                        operands: std::mem::take(&mut self.operands),
                    });
                }
            }
        }
        None
    }
}

/// Parse at most `max_ops` operations from decoded content.
pub fn parse_ops(data: &[u8], max_ops: usize) -> Vec<ContentOp> {
    ContentParser::new(data).take(max_ops).collect()
}

fn pairs_to_dict(items: Vec<PdfValue>) -> Dict {
    let mut dict = Dict::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        if let PdfValue::Name(name) = key {
            dict.insert(name, iter.next().unwrap_or(PdfValue::Null));
        }
    }
    dict
}

/// Offset of the `EI` that ends an inline image payload starting at `start`:
/// preceded by whitespace and followed by whitespace or end of data.
fn find_inline_end(data: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i + 1 < data.len() {
        if data[i] == b'E'
            && data[i + 1] == b'I'
            && (i == start || is_whitespace(data[i - 1]))
            && data.get(i + 2).is_none_or(|&b| is_whitespace(b))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Operand {
        Operand::Value(PdfValue::from(n))
    }

    #[test]
    fn test_cm_operands() {
        let ops = parse_ops(b"1 0 0 1 50 50 cm", 100);
        assert_eq!(
            ops,
            vec![ContentOp {
                operator: "cm".into(),
                operands: vec![num(1), num(0), num(0), num(1), num(50), num(50)],
            }]
        );
    }

    #[test]
    fn test_array_and_dict_operands() {
        let ops = parse_ops(b"[(A) -120 (B)] TJ /Span << /MCID 3 >> BDC EMC", 100);
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].operator, "TJ");
        assert_eq!(ops[0].operands[0].as_value().and_then(|v| v.as_array()).map(<[_]>::len), Some(3));
        assert_eq!(ops[1].operator, "BDC");
        let props = ops[1].operands[1].as_value().and_then(PdfValue::as_dict).unwrap();
        assert_eq!(props["MCID"], PdfValue::from(3));
        assert!(ops[2].operands.is_empty());
    }

    #[test]
    fn test_inline_image_payload_is_skipped() {
        let data = b"q BI /W 2 /H 2 /BPC 1 /CS /G ID \x00EI\xffQ EI Q";
        let ops = parse_ops(data, 100);
        let names: Vec<_> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, ["q", "BI", "Q"]);
        let image = ops[1].inline_image().unwrap();
        assert_eq!(image.header["W"], PdfValue::from(2));
        assert_eq!(image.payload_len, 5);
    }

    #[test]
    fn test_inline_image_at_end_of_data() {
        let ops = parse_ops(b"BI /W 1 /H 1 ID \x80 EI", 10);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].inline_image().map(|i| i.payload_len), Some(1));
    }

    #[test]
    fn test_inline_header_missing_value_stops_at_id() {
        let ops = parse_ops(b"BI /W 2 /H ID \x00\x01 EI Q", 10);
        let names: Vec<_> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, ["BI", "Q"]);
        let image = ops[0].inline_image().unwrap();
        assert_eq!(image.header["W"], PdfValue::from(2));
        assert_eq!(image.payload_len, 2);
    }

    #[test]
    fn test_max_ops_caps_output() {
        let ops = parse_ops(b"q Q q Q q Q", 4);
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn test_unbalanced_delimiters_are_ignored() {
        let ops = parse_ops(b"] >> 1 w", 10);
        assert_eq!(ops, vec![ContentOp { operator: "w".into(), operands: vec![num(1)] }]);
    }

    #[test]
    fn test_booleans_and_null_are_operands() {
        let ops = parse_ops(b"true null false x", 10);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operands.len(), 3);
    }
}
