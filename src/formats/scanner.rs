//! Lexical scanner for FASTA-style record streams.
//!
//! The scanner walks a byte slice and hands out one token per call to
//! [`Scanner::scan`]:
//!
//! - `>` starts an identifier that runs to the end of the line
//! - a letter, digit, `-`, `?` or `[` starts sequence data, which runs until
//!   the next `>` or the end of input; line breaks inside it are dropped
//! - any other run of whitespace is a whitespace token
//!
//! Sequence data may contain ambiguity groups such as `[AG]`. A group is
//! kept verbatim and counts as one position of logical length.
//!
//! Errors never escape as panics or `Err` values; they come back as
//! [`Token::Invalid`] and the caller decides whether to stop.

use thiserror::Error;

/// Errors reported inside an [`Token::Invalid`] token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Unrecognized character '{ch}' at line {line}")]
    InvalidCharacter { ch: char, line: usize },

    #[error("Multi-byte character '{ch}' at line {line} is not allowed in sequence data")]
    MultiByteCharacter { ch: char, line: usize },

    #[error("Undecodable byte 0x{byte:02x} at line {line}")]
    Undecodable { byte: u8, line: usize },

    #[error("Unbalanced [] in sequence data opened at line {line}")]
    UnbalancedGroup { line: usize },
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    EndOfInput,
    /// Text after `>` up to the end of the line; `length` counts characters.
    Identifier { literal: String, length: usize },
    /// Sequence data with line breaks removed; `length` is the logical length.
    Data { literal: Vec<u8>, length: usize },
    Whitespace(Vec<u8>),
    Invalid(ScanError),
}

/// One decoded unit of input.
enum Unit {
    Ascii(u8),
    Wide(char),
    Bad(u8),
}

/// Returns true for characters that may appear in sequence data.
///
/// Digits are accepted because morphological matrices code states as 0..9.
#[inline]
pub fn is_sequence_data(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'?'
}

/// Returns true for ASCII whitespace, vertical tab included.
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Tokenizer over an in-memory byte slice.
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner positioned at the start of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    /// Current 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the next token and advances past everything it consumed.
    pub fn scan(&mut self) -> Token {
        match self.peek_unit() {
            None => Token::EndOfInput,
            Some(Unit::Bad(byte)) => Token::Invalid(ScanError::Undecodable {
                byte,
                line: self.line,
            }),
            Some(Unit::Wide(ch)) => Token::Invalid(ScanError::MultiByteCharacter {
                ch,
                line: self.line,
            }),
            Some(Unit::Ascii(b'>')) => {
                self.pos += 1;
                self.scan_identifier()
            }
            Some(Unit::Ascii(b)) if is_sequence_data(b) || b == b'[' => self.scan_data(),
            Some(Unit::Ascii(b)) if is_whitespace(b) => self.scan_whitespace(),
            Some(Unit::Ascii(b)) => Token::Invalid(ScanError::InvalidCharacter {
                ch: b as char,
                line: self.line,
            }),
        }
    }

    /// Decodes the unit at the current position without consuming it.
    fn peek_unit(&self) -> Option<Unit> {
        let lead = *self.input.get(self.pos)?;
        if lead.is_ascii() {
            return Some(Unit::Ascii(lead));
        }
        let width = match lead {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Some(Unit::Bad(lead)),
        };
        let end = (self.pos + width).min(self.input.len());
        match std::str::from_utf8(&self.input[self.pos..end])
            .ok()
            .and_then(|s| s.chars().next())
        {
            Some(ch) => Some(Unit::Wide(ch)),
            None => Some(Unit::Bad(lead)),
        }
    }

    /// Consumes one ASCII byte.
    #[inline]
    fn advance(&mut self, b: u8) {
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
    }

    /// Scans the rest of a `>` line. The newline is consumed but not kept.
    fn scan_identifier(&mut self) -> Token {
        let input = self.input;
        let rest = &input[self.pos..];
        let (mut text, has_newline) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], true),
            None => (rest, false),
        };
        let consumed = text.len() + usize::from(has_newline);
        if let Some(stripped) = text.strip_suffix(b"\r") {
            text = stripped;
        }

        let literal = match std::str::from_utf8(text) {
            Ok(s) => s.to_string(),
            Err(e) => {
                return Token::Invalid(ScanError::Undecodable {
                    byte: text[e.valid_up_to()],
                    line: self.line,
                })
            }
        };

        self.pos += consumed;
        if has_newline {
            self.line += 1;
        }

        let length = literal.chars().count();
        Token::Identifier { literal, length }
    }

    /// Scans sequence data up to the next `>` or the end of input.
    ///
    /// Plain data and the inside of a `[...]` group are two states of the
    /// same loop; `group_line` is set while a group is open.
    fn scan_data(&mut self) -> Token {
        let mut literal = Vec::new();
        let mut length = 0;
        let mut group_line: Option<usize> = None;

        while let Some(unit) = self.peek_unit() {
            let b = match unit {
                Unit::Ascii(b) => b,
                Unit::Wide(ch) => {
                    return Token::Invalid(ScanError::MultiByteCharacter {
                        ch,
                        line: self.line,
                    })
                }
                Unit::Bad(byte) => {
                    return Token::Invalid(ScanError::Undecodable {
                        byte,
                        line: self.line,
                    })
                }
            };

            match b {
                b'>' => break,
                b if is_whitespace(b) => {}
                b if is_sequence_data(b) => {
                    literal.push(b);
                    if group_line.is_none() {
                        length += 1;
                    }
                }
                b'[' if group_line.is_none() => {
                    literal.push(b);
                    group_line = Some(self.line);
                }
                b']' if group_line.is_some() => {
                    literal.push(b);
                    length += 1;
                    group_line = None;
                }
                _ => {
                    return Token::Invalid(ScanError::InvalidCharacter {
                        ch: b as char,
                        line: self.line,
                    })
                }
            }
            self.advance(b);
        }

        if let Some(line) = group_line {
            return Token::Invalid(ScanError::UnbalancedGroup { line });
        }
        Token::Data { literal, length }
    }

    /// Scans a maximal run of whitespace.
    fn scan_whitespace(&mut self) -> Token {
        let mut literal = Vec::new();
        while let Some(&b) = self.input.get(self.pos) {
            if !is_whitespace(b) {
                break;
            }
            literal.push(b);
            self.advance(b);
        }
        Token::Whitespace(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_one(input: &str) -> Token {
        Scanner::new(input.as_bytes()).scan()
    }

    fn data(literal: &str, length: usize) -> Token {
        Token::Data {
            literal: literal.as_bytes().to_vec(),
            length,
        }
    }

    #[test]
    fn test_identifier() {
        let mut scanner = Scanner::new(b">Sequence Identifier\n");
        assert_eq!(
            scanner.scan(),
            Token::Identifier {
                literal: "Sequence Identifier".to_string(),
                length: 19
            }
        );
        assert_eq!(scanner.scan(), Token::EndOfInput);
        assert_eq!(scanner.line(), 2);
    }

    #[test]
    fn test_identifier_without_newline() {
        assert_eq!(
            scan_one(">Bob"),
            Token::Identifier {
                literal: "Bob".to_string(),
                length: 3
            }
        );
    }

    #[test]
    fn test_empty_identifier() {
        assert_eq!(
            scan_one(">\nACGT"),
            Token::Identifier {
                literal: String::new(),
                length: 0
            }
        );
    }

    #[test]
    fn test_identifier_strips_carriage_return() {
        assert_eq!(
            scan_one(">seq1\r\nACGT"),
            Token::Identifier {
                literal: "seq1".to_string(),
                length: 4
            }
        );
    }

    #[test]
    fn test_plain_data() {
        assert_eq!(scan_one("ATGCGTA"), data("ATGCGTA", 7));
        assert_eq!(scan_one("AT-AGC"), data("AT-AGC", 6));
        assert_eq!(scan_one("AT?AGC"), data("AT?AGC", 6));
        assert_eq!(scan_one("0110?1"), data("0110?1", 6));
    }

    #[test]
    fn test_data_across_lines() {
        assert_eq!(scan_one("ATG\nCGTA"), data("ATGCGTA", 7));
        assert_eq!(scan_one("ATG\r\nCG TA\n\n"), data("ATGCGTA", 7));
    }

    #[test]
    fn test_data_stops_at_identifier() {
        let mut scanner = Scanner::new(b"ATG\nCGTA\n>Bob");
        assert_eq!(scanner.scan(), data("ATGCGTA", 7));
        assert_eq!(
            scanner.scan(),
            Token::Identifier {
                literal: "Bob".to_string(),
                length: 3
            }
        );
        assert_eq!(scanner.scan(), Token::EndOfInput);
    }

    #[test]
    fn test_group_counts_once() {
        assert_eq!(scan_one("AT[AG]C"), data("AT[AG]C", 4));
        assert_eq!(scan_one("A[C\nGT]"), data("A[CGT]", 2));
        assert_eq!(scan_one("[AG]T"), data("[AG]T", 2));
    }

    #[test]
    fn test_unbalanced_group() {
        assert_eq!(
            scan_one("AT[AG"),
            Token::Invalid(ScanError::UnbalancedGroup { line: 1 })
        );
        assert_eq!(
            scan_one("AT\n[AG\n>next\nACGT"),
            Token::Invalid(ScanError::UnbalancedGroup { line: 2 })
        );
    }

    #[test]
    fn test_nested_or_stray_brackets() {
        assert!(matches!(
            scan_one("A[C[G]]"),
            Token::Invalid(ScanError::InvalidCharacter { ch: '[', .. })
        ));
        assert!(matches!(
            scan_one("AC]G"),
            Token::Invalid(ScanError::InvalidCharacter { ch: ']', .. })
        ));
    }

    #[test]
    fn test_invalid_character_in_data() {
        assert_eq!(
            scan_one("ACGT\nAC*T"),
            Token::Invalid(ScanError::InvalidCharacter { ch: '*', line: 2 })
        );
    }

    #[test]
    fn test_multi_byte_character() {
        assert_eq!(
            scan_one("𠜎"),
            Token::Invalid(ScanError::MultiByteCharacter { ch: '𠜎', line: 1 })
        );
        assert!(matches!(
            scan_one("ACGé"),
            Token::Invalid(ScanError::MultiByteCharacter { ch: 'é', .. })
        ));
    }

    #[test]
    fn test_undecodable_bytes() {
        let mut scanner = Scanner::new(&[0xFF, b'A']);
        assert_eq!(
            scanner.scan(),
            Token::Invalid(ScanError::Undecodable { byte: 0xFF, line: 1 })
        );
        // truncated three-byte sequence
        let mut scanner = Scanner::new(&[b'A', 0xE2, 0x82]);
        assert!(matches!(
            scanner.scan(),
            Token::Invalid(ScanError::Undecodable { byte: 0xE2, .. })
        ));
    }

    #[test]
    fn test_identifier_encoding() {
        let mut scanner = Scanner::new(b">ab\xFFc\nACGT");
        assert_eq!(
            scanner.scan(),
            Token::Invalid(ScanError::Undecodable { byte: 0xFF, line: 1 })
        );

        // valid UTF-8 is free text in names
        let mut scanner = Scanner::new(">Homo é\n".as_bytes());
        assert_eq!(
            scanner.scan(),
            Token::Identifier {
                literal: "Homo é".to_string(),
                length: 6
            }
        );
    }

    #[test]
    fn test_whitespace_token() {
        let mut scanner = Scanner::new(b" \n\t>id\n");
        assert_eq!(scanner.scan(), Token::Whitespace(b" \n\t".to_vec()));
        assert!(matches!(scanner.scan(), Token::Identifier { .. }));
    }

    #[test]
    fn test_end_of_input() {
        assert_eq!(scan_one(""), Token::EndOfInput);
    }

    #[test]
    fn test_unexpected_top_level_character() {
        assert!(matches!(
            scan_one(";"),
            Token::Invalid(ScanError::InvalidCharacter { ch: ';', .. })
        ));
    }
}
