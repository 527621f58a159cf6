//! PDF text recovery from content streams.
//!
//! The extractor never builds an object graph. It treats the file as a
//! Latin-1 byte string and runs a small lexer over every `BT … ET` text
//! object, keeping an operand stack so that the text-showing operators can
//! pick up the strings that precede them:
//!
//! | Operator | Operands | Result |
//! |----------|----------|--------|
//! | `Tj`, `'` | `(literal)` or `<hex>` | one line |
//! | `"` | `aw ac (string)` | one line |
//! | `TJ` | `[(a) -120 (b) …]` | string pieces concatenated, numbers dropped |
//!
//! When the text objects yield fewer than [`FALLBACK_MIN_CHARS`] characters,
//! the raw bodies of `stream … endstream` blocks that held no text object
//! are scanned for printable runs. Compressed content streams are not
//! inflated, so a PDF whose page content is all `FlateDecode` comes back
//! empty; callers read that as an image-only document, not an error.

use crate::bytes::ByteReader;
use crate::text::{dedupe_consecutive, latin1};

/// Below this many characters the raw stream fallback is consulted.
pub const FALLBACK_MIN_CHARS: usize = 50;

/// Recover drawn text from a PDF. Never fails; empty output means "nothing found".
pub fn extract_text(pdf_bytes: &[u8]) -> String {
    let mut lines = Vec::new();
    let covered = scan_text_objects(pdf_bytes, &mut lines);

    let found: usize = lines.iter().map(|l: &String| l.chars().count()).sum();
    if found < FALLBACK_MIN_CHARS {
        lines.extend(scan_raw_streams(pdf_bytes, &covered));
    }

    let cleaned = lines
        .iter()
        .map(|l| strip_controls(l))
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    dedupe_consecutive(cleaned).join("\n")
}

// ============ Lexer ============

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Literal or hex string, already unescaped.
    Str(Vec<u8>),
    /// Array contents; only the string elements are kept.
    Array(Vec<Vec<u8>>),
    /// Number, name, dictionary bracket or anything else that is only an operand.
    Operand,
    /// Bare keyword: an operator such as `Tj`, `TJ`, `ET`.
    Operator(Vec<u8>),
}

struct Lexer<'a> {
    r: ByteReader<'a>,
}

impl<'a> Lexer<'a> {
    fn at(buf: &'a [u8], pos: usize) -> Self {
        let mut r = ByteReader::new(buf);
        r.seek(pos);
        Self { r }
    }

    fn position(&self) -> usize {
        self.r.position()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(b) = self.r.peek() {
            if is_whitespace(b) {
                self.r.next_byte();
            } else if b == b'%' {
                while let Some(c) = self.r.next_byte() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        let b = self.r.peek()?;
        match b {
            b'(' => {
                self.r.next_byte();
                Some(Token::Str(self.literal_string()))
            }
            b'<' if self.r.peek_at(1) == Some(b'<') => {
                self.r.seek(self.r.position() + 2);
                Some(Token::Operand)
            }
            b'<' => {
                self.r.next_byte();
                Some(Token::Str(self.hex_string()))
            }
            b'>' => {
                self.r.next_byte();
                if self.r.peek() == Some(b'>') {
                    self.r.next_byte();
                }
                Some(Token::Operand)
            }
            b'[' => {
                self.r.next_byte();
                Some(Token::Array(self.array()))
            }
            b'/' => {
                self.r.next_byte();
                self.regular_run();
                Some(Token::Operand)
            }
            b']' | b'{' | b'}' | b')' => {
                self.r.next_byte();
                Some(Token::Operand)
            }
            _ => {
                let word = self.regular_run();
                let is_number = word
                    .iter()
                    .all(|c| c.is_ascii_digit() || matches!(c, b'.' | b'-' | b'+'));
                if is_number {
                    Some(Token::Operand)
                } else {
                    Some(Token::Operator(word))
                }
            }
        }
    }

    fn regular_run(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = self.r.peek() {
            if !is_regular(b) {
                break;
            }
            out.push(b);
            self.r.next_byte();
        }
        out
    }

    /// Body of `( … )` after the opening parenthesis.
    fn literal_string(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut depth = 1usize;
        while let Some(b) = self.r.next_byte() {
            match b {
                b'\\' => self.escape(&mut out),
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                _ => out.push(b),
            }
        }
        out
    }

    fn escape(&mut self, out: &mut Vec<u8>) {
        let Some(b) = self.r.next_byte() else {
            return;
        };
        match b {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'(' | b')' | b'\\' => out.push(b),
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.r.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.r.next_byte();
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xff) as u8);
            }
            // Line continuation: backslash-EOL is dropped.
            b'\r' => {
                if self.r.peek() == Some(b'\n') {
                    self.r.next_byte();
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
    }

    /// Body of `< … >` after the opening angle bracket.
    fn hex_string(&mut self) -> Vec<u8> {
        let mut nibbles = Vec::new();
        while let Some(b) = self.r.next_byte() {
            if b == b'>' {
                break;
            }
            if let Some(v) = (b as char).to_digit(16) {
                nibbles.push(v as u8);
            }
        }
        if nibbles.len() % 2 == 1 {
            nibbles.push(0);
        }
        nibbles.chunks(2).map(|p| (p[0] << 4) | p[1]).collect()
    }

    /// Contents of `[ … ]` after the opening bracket; nested arrays flatten.
    fn array(&mut self) -> Vec<Vec<u8>> {
        let mut pieces = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.r.peek() {
                None => break,
                Some(b']') => {
                    self.r.next_byte();
                    break;
                }
                Some(_) => match self.next_token() {
                    Some(Token::Str(s)) => pieces.push(s),
                    Some(Token::Array(inner)) => pieces.extend(inner),
                    Some(_) => {}
                    None => break,
                },
            }
        }
        pieces
    }
}

// ============ Text objects ============

/// Byte range `[start, end)` of one `BT … ET` object.
type Span = (usize, usize);

/// Collect lines from every text object; returns the spans that were read.
fn scan_text_objects(buf: &[u8], lines: &mut Vec<String>) -> Vec<Span> {
    let reader = ByteReader::new(buf);
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(bt) = reader.find_from(from, b"BT") {
        let before_ok = bt == 0 || !is_regular(buf[bt - 1]);
        let after_ok = buf.get(bt + 2).map_or(true, |&b| !is_regular(b));
        if !(before_ok && after_ok) {
            from = bt + 2;
            continue;
        }
        let end = read_text_object(buf, bt + 2, lines);
        spans.push((bt, end));
        from = end.max(bt + 2);
    }
    spans
}

/// Interpret operators from `pos` until `ET` or end of input; returns the end offset.
fn read_text_object(buf: &[u8], pos: usize, lines: &mut Vec<String>) -> usize {
    let mut lexer = Lexer::at(buf, pos);
    let mut operands: Vec<Token> = Vec::new();

    while let Some(token) = lexer.next_token() {
        let Token::Operator(op) = token else {
            operands.push(token);
            continue;
        };
        match op.as_slice() {
            b"ET" => return lexer.position(),
            b"Tj" | b"'" | b"\"" => {
                if let Some(Token::Str(s)) = operands.last() {
                    lines.push(latin1(s));
                }
            }
            b"TJ" => {
                if let Some(Token::Array(pieces)) = operands.last() {
                    lines.push(latin1(&pieces.concat()));
                }
            }
            _ => {}
        }
        operands.clear();
    }
    lexer.position()
}

// ============ Raw stream fallback ============

fn scan_raw_streams(buf: &[u8], covered: &[Span]) -> Vec<String> {
    let reader = ByteReader::new(buf);
    let mut lines = Vec::new();
    let mut from = 0;

    while let Some(kw) = reader.find_from(from, b"stream") {
        from = kw + b"stream".len();
        if kw > 0 && is_regular(buf[kw - 1]) {
            // `endstream`, or `stream` inside some other word.
            continue;
        }
        let mut start = from;
        if reader.starts_with_at(start, b"\r\n") {
            start += 2;
        } else if reader.starts_with_at(start, b"\n") || reader.starts_with_at(start, b"\r") {
            start += 1;
        }
        let end = reader.find_from(start, b"endstream").unwrap_or(buf.len());
        from = end;

        let holds_text_object = covered.iter().any(|&(s, e)| s < end && e > start);
        if holds_text_object {
            continue;
        }
        lines.extend(printable_lines(&buf[start..end]));
    }
    lines
}

/// Keep printable bytes; runs of three or more spaces become line breaks.
fn printable_lines(body: &[u8]) -> Vec<String> {
    let printable: String = body
        .iter()
        .filter_map(|&b| match b {
            0x20..=0x7e => Some(b as char),
            0xc0..=0xff => Some(b as char),
            b'\n' | b'\r' | b'\t' => Some(' '),
            _ => None,
        })
        .collect();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;
    for c in printable.chars() {
        if c == ' ' {
            spaces += 1;
            continue;
        }
        if spaces >= 3 {
            lines.push(std::mem::take(&mut current));
        } else if spaces > 0 {
            current.extend(std::iter::repeat(' ').take(spaces));
        }
        spaces = 0;
        current.push(c);
    }
    lines.push(current);

    lines
        .into_iter()
        .filter(|l| l.chars().filter(|c| c.is_alphanumeric()).count() >= 2)
        .collect()
}

fn strip_controls(s: &str) -> String {
    s.chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}
