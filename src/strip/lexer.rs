//! Lexical scanner for PHP source.
//!
//! Only classifies what the stripper needs to know about: inline HTML, open and
//! close tags, whitespace, comments, and string literals (so that comment-like
//! text inside a string is never touched). Everything else is opaque `Code`.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Text outside of `<?php ... ?>`.
    InlineHtml,
    /// `<?php` plus its single trailing whitespace character, `<?=`, or `<?`.
    OpenTag,
    /// `?>` plus an optional trailing newline.
    CloseTag,
    Whitespace,
    /// `// ...` or `# ...`, not including the line break.
    LineComment,
    BlockComment,
    DocComment,
    /// Single-quoted, double-quoted or backtick literal.
    StringLiteral,
    /// Heredoc or nowdoc, from `<<<` through the closing label.
    Heredoc,
    Code,
}

impl TokenKind {
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::DocComment
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },

    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("unterminated heredoc starting at byte {offset}")]
    UnterminatedHeredoc { offset: usize },

    #[error("malformed heredoc header at byte {offset}")]
    MalformedHeredoc { offset: usize },
}

/// Split `src` into tokens. Concatenating the token texts yields `src`.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token<'a>>,
}

struct HeredocHeader {
    /// Offset of the first byte of the body.
    body_start: usize,
    label_start: usize,
    label_end: usize,
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_label_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_label_char(b: u8) -> bool {
    is_label_start(b) || b.is_ascii_digit()
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), LexError> {
        while self.pos < self.bytes.len() {
            self.lex_inline_html();
            if self.pos >= self.bytes.len() {
                break;
            }
            self.lex_php()?;
        }
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        if end > start {
            let src = self.src;
            self.tokens.push(Token {
                kind,
                text: &src[start..end],
            });
        }
    }

    fn at(&self, i: usize) -> Option<u8> {
        self.bytes.get(i).copied()
    }

    fn starts_with_at(&self, i: usize, needle: &[u8]) -> bool {
        self.bytes
            .get(i..i + needle.len())
            .is_some_and(|s| s == needle)
    }

    /// Length of the line break at `i`, if any.
    fn newline_len(&self, i: usize) -> usize {
        match self.at(i) {
            Some(b'\r') if self.at(i + 1) == Some(b'\n') => 2,
            Some(b'\r') | Some(b'\n') => 1,
            _ => 0,
        }
    }

    /// Length of an open tag at `i`, if one starts there.
    fn open_tag_len(&self, i: usize) -> Option<usize> {
        if !self.starts_with_at(i, b"<?") {
            return None;
        }
        let long = self
            .bytes
            .get(i + 2..i + 5)
            .is_some_and(|s| s.eq_ignore_ascii_case(b"php"));
        if long {
            return match self.at(i + 5) {
                None => Some(5),
                Some(b) if is_ws(b) => Some(5 + self.newline_len(i + 5).max(1)),
                Some(_) => None,
            };
        }
        match self.at(i + 2) {
            Some(b'=') => Some(3),
            Some(b) if is_ws(b) => Some(2),
            _ => None,
        }
    }

    fn lex_inline_html(&mut self) {
        let start = self.pos;
        let mut i = self.pos;
        while i < self.bytes.len() {
            if self.bytes[i] == b'<' {
                if let Some(len) = self.open_tag_len(i) {
                    self.push(TokenKind::InlineHtml, start, i);
                    self.push(TokenKind::OpenTag, i, i + len);
                    self.pos = i + len;
                    return;
                }
            }
            i += 1;
        }
        self.push(TokenKind::InlineHtml, start, i);
        self.pos = i;
    }

    /// Lex PHP code until a close tag or end of input.
    fn lex_php(&mut self) -> Result<(), LexError> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let b = self.bytes[start];

            if is_ws(b) {
                let mut end = start;
                while end < self.bytes.len() && is_ws(self.bytes[end]) {
                    end += 1;
                }
                self.push(TokenKind::Whitespace, start, end);
                self.pos = end;
            } else if self.starts_with_at(start, b"?>") {
                let end = start + 2 + self.newline_len(start + 2);
                self.push(TokenKind::CloseTag, start, end);
                self.pos = end;
                return Ok(());
            } else if self.starts_with_at(start, b"//")
                || (b == b'#' && self.at(start + 1) != Some(b'['))
            {
                let end = self.line_comment_end(start);
                self.push(TokenKind::LineComment, start, end);
                self.pos = end;
            } else if self.starts_with_at(start, b"/*") {
                let end = self.find(start + 2, b"*/").map(|i| i + 2).ok_or(
                    LexError::UnterminatedComment { offset: start },
                )?;
                let doc = self.starts_with_at(start, b"/**")
                    && self.at(start + 3).is_some_and(is_ws);
                let kind = if doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::BlockComment
                };
                self.push(kind, start, end);
                self.pos = end;
            } else if b == b'\'' {
                let end = self.skip_single_quoted(start)?;
                self.push(TokenKind::StringLiteral, start, end);
                self.pos = end;
            } else if b == b'"' || b == b'`' {
                let end = self.skip_interpolated(start, b)?;
                self.push(TokenKind::StringLiteral, start, end);
                self.pos = end;
            } else if self.starts_with_at(start, b"<<<") {
                // `<<<` only ever opens a heredoc; anything after the label
                // on its line makes the header unreadable.
                let header = self
                    .heredoc_header(start)
                    .ok_or(LexError::MalformedHeredoc { offset: start })?;
                let end = self.heredoc_end(start, &header)?;
                self.push(TokenKind::Heredoc, start, end);
                self.pos = end;
            } else {
                let end = self.code_end(start);
                self.push(TokenKind::Code, start, end);
                self.pos = end;
            }
        }
        Ok(())
    }

    fn find(&self, from: usize, needle: &[u8]) -> Option<usize> {
        self.bytes
            .get(from..)?
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|p| from + p)
    }

    fn line_comment_end(&self, start: usize) -> usize {
        let mut i = start;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\n' | b'\r' => break,
                b'?' if self.at(i + 1) == Some(b'>') => break,
                _ => i += 1,
            }
        }
        i
    }

    /// True when a token other than `Code` starts at `i`.
    fn starts_special(&self, i: usize) -> bool {
        let b = self.bytes[i];
        match b {
            b' ' | b'\t' | b'\n' | b'\r' | b'\'' | b'"' | b'`' => true,
            b'#' => self.at(i + 1) != Some(b'['),
            b'?' => self.at(i + 1) == Some(b'>'),
            b'/' => matches!(self.at(i + 1), Some(b'/') | Some(b'*')),
            b'<' => self.starts_with_at(i, b"<<<"),
            _ => false,
        }
    }

    fn code_end(&self, start: usize) -> usize {
        // `#[` opens an attribute; take both bytes so `#` is not rescanned.
        let mut i = if self.starts_with_at(start, b"#[") {
            start + 2
        } else {
            start + 1
        };
        while i < self.bytes.len() && !self.starts_special(i) {
            i += 1;
        }
        i
    }

    fn skip_single_quoted(&self, start: usize) -> Result<usize, LexError> {
        let mut i = start + 1;
        while let Some(b) = self.at(i) {
            match b {
                b'\\' => i += 2,
                b'\'' => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(LexError::UnterminatedString { offset: start })
    }

    /// Skip a double-quoted or backtick literal, including `{$...}` and
    /// `${...}` interpolations that may contain nested quotes.
    fn skip_interpolated(&self, start: usize, quote: u8) -> Result<usize, LexError> {
        let mut i = start + 1;
        while let Some(b) = self.at(i) {
            if b == b'\\' {
                i += 2;
            } else if b == quote {
                return Ok(i + 1);
            } else if (b == b'{' && self.at(i + 1) == Some(b'$'))
                || (b == b'$' && self.at(i + 1) == Some(b'{'))
            {
                let brace = if b == b'{' { i } else { i + 1 };
                i = self.skip_braced(brace, start)?;
            } else {
                i += 1;
            }
        }
        Err(LexError::UnterminatedString { offset: start })
    }

    /// Skip a balanced `{ ... }` block of code starting at `open`.
    fn skip_braced(&self, open: usize, literal_start: usize) -> Result<usize, LexError> {
        let mut depth = 0usize;
        let mut i = open;
        while let Some(b) = self.at(i) {
            match b {
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                b'}' => {
                    depth -= 1;
                    i += 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                b'\'' => i = self.skip_single_quoted(i)?,
                b'"' | b'`' => i = self.skip_interpolated(i, b)?,
                _ => i += 1,
            }
        }
        Err(LexError::UnterminatedString {
            offset: literal_start,
        })
    }

    fn heredoc_header(&self, start: usize) -> Option<HeredocHeader> {
        if !self.starts_with_at(start, b"<<<") {
            return None;
        }
        let mut i = start + 3;
        while matches!(self.at(i), Some(b' ') | Some(b'\t')) {
            i += 1;
        }
        let quote = match self.at(i) {
            Some(q @ (b'"' | b'\'')) => {
                i += 1;
                Some(q)
            }
            _ => None,
        };
        let label_start = i;
        if !self.at(i).is_some_and(is_label_start) {
            return None;
        }
        while self.at(i).is_some_and(is_label_char) {
            i += 1;
        }
        let label_end = i;
        if let Some(q) = quote {
            if self.at(i) != Some(q) {
                return None;
            }
            i += 1;
        }
        let nl = self.newline_len(i);
        if nl == 0 {
            return None;
        }
        Some(HeredocHeader {
            body_start: i + nl,
            label_start,
            label_end,
        })
    }

    fn heredoc_end(&self, start: usize, header: &HeredocHeader) -> Result<usize, LexError> {
        let label = &self.bytes[header.label_start..header.label_end];
        let mut line = header.body_start;
        while line <= self.bytes.len() {
            let mut i = line;
            while matches!(self.at(i), Some(b' ') | Some(b'\t')) {
                i += 1;
            }
            if self.starts_with_at(i, label)
                && !self.at(i + label.len()).is_some_and(is_label_char)
            {
                return Ok(i + label.len());
            }
            // Advance to the start of the next line.
            let mut j = i;
            loop {
                match self.at(j) {
                    None => return Err(LexError::UnterminatedHeredoc { offset: start }),
                    Some(b'\n') | Some(b'\r') => {
                        j += self.newline_len(j);
                        break;
                    }
                    Some(_) => j += 1,
                }
            }
            line = j;
        }
        Err(LexError::UnterminatedHeredoc { offset: start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn tokens_concatenate_to_source() {
        let src = "<html>\n<?php\n// hi\n$a = 'x'; /* b */ echo \"{$a['k']}\";\n?>\ntail";
        let joined: String = tokenize(src).unwrap().iter().map(|t| t.text).collect();
        assert_eq!(joined, src);
    }

    #[test]
    fn open_tag_takes_one_whitespace_character() {
        let toks = kinds("<?php\r\n  $a;");
        assert_eq!(toks[0], (TokenKind::OpenTag, "<?php\r\n"));
        assert_eq!(toks[1], (TokenKind::Whitespace, "  "));
    }

    #[test]
    fn line_comment_stops_before_close_tag() {
        let toks = kinds("<?php // note ?>\nafter");
        assert_eq!(toks[1], (TokenKind::LineComment, "// note "));
        assert_eq!(toks[2], (TokenKind::CloseTag, "?>\n"));
        assert_eq!(toks[3], (TokenKind::InlineHtml, "after"));
    }

    #[test]
    fn hash_bracket_is_an_attribute_not_a_comment() {
        let toks = kinds("<?php #[Attr]\nfunction f() {}");
        assert_eq!(toks[1].0, TokenKind::Code);
        assert!(toks[1].1.starts_with("#[Attr]"));
        assert!(!toks.iter().any(|(k, _)| k.is_comment()));
    }

    #[test]
    fn comment_markers_inside_strings_are_literal() {
        let toks = kinds("<?php $u = 'http://x/*y*/'; $v = \"# {$a[\"/*\"]}\";");
        assert!(!toks.iter().any(|(k, _)| k.is_comment()));
        let strings: Vec<_> = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::StringLiteral)
            .map(|(_, t)| *t)
            .collect();
        assert_eq!(strings, vec!["'http://x/*y*/'", "\"# {$a[\"/*\"]}\""]);
    }

    #[test]
    fn doc_comment_is_distinguished() {
        let toks = kinds("<?php /** doc */ /**/");
        assert_eq!(toks[1], (TokenKind::DocComment, "/** doc */"));
        assert_eq!(toks[3], (TokenKind::BlockComment, "/**/"));
    }

    #[test]
    fn heredoc_and_nowdoc_bodies_are_opaque() {
        let src = "<?php $a = <<<EOT\n  // not a comment\n  EOT;\n$b = <<<'RAW'\n/* raw */\nRAW;\n";
        let toks = kinds(src);
        let docs: Vec<_> = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::Heredoc)
            .map(|(_, t)| *t)
            .collect();
        assert_eq!(
            docs,
            vec!["<<<EOT\n  // not a comment\n  EOT", "<<<'RAW'\n/* raw */\nRAW"]
        );
        assert!(!toks.iter().any(|(k, _)| k.is_comment()));
    }

    #[test]
    fn unterminated_constructs_are_errors() {
        assert_eq!(
            tokenize("<?php /* open"),
            Err(LexError::UnterminatedComment { offset: 6 })
        );
        assert_eq!(
            tokenize("<?php $a = 'open"),
            Err(LexError::UnterminatedString { offset: 11 })
        );
        assert_eq!(
            tokenize("<?php $a = <<<EOT\nbody\n"),
            Err(LexError::UnterminatedHeredoc { offset: 11 })
        );
    }

    #[test]
    fn junk_after_heredoc_label_is_an_error() {
        assert_eq!(
            tokenize("<?php\n<<<EOT//\n'\nEOT//'"),
            Err(LexError::MalformedHeredoc { offset: 6 })
        );
        assert_eq!(
            tokenize("<?php $a = <<< \n"),
            Err(LexError::MalformedHeredoc { offset: 11 })
        );
    }

    #[test]
    fn text_without_open_tag_is_inline_html() {
        let toks = kinds("/* just text */\n<?xml version=\"1.0\"?>");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].0, TokenKind::InlineHtml);
    }
}
