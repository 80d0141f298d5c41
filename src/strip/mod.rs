//! Comment and whitespace stripping for packaged PHP sources.
//!
//! The output always has the same number of line breaks as the input, so line
//! numbers reported by the runtime for a packaged file still point at the
//! right line of the unstripped source.

pub mod lexer;

use lexer::{tokenize, TokenKind};

/// Count line breaks, treating `\r\n`, `\r` and `\n` as one break each.
pub fn count_line_breaks(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                count += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => count += 1,
            _ => {}
        }
        i += 1;
    }
    count
}

/// Normalize a whitespace run: `[ \t]+` becomes one space, every line break
/// becomes `\n`, and spaces directly after a `\n` are dropped.
pub fn normalize_whitespace(ws: &str) -> String {
    let mut out = String::with_capacity(ws.len());
    let mut chars = ws.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\n' => out.push('\n'),
            ' ' | '\t' => {
                while matches!(chars.peek(), Some(' ') | Some('\t')) {
                    chars.next();
                }
                if !out.ends_with('\n') {
                    out.push(' ');
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Strip comments and collapse whitespace in PHP source.
///
/// Falls back to returning `source` unchanged when it cannot be tokenized.
pub fn strip_whitespace(source: &str) -> String {
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!("not stripping source: {}", e);
            return source.to_string();
        }
    };

    let mut out = String::with_capacity(source.len());
    let mut trivia = Trivia::default();

    for token in tokens {
        match token.kind {
            TokenKind::Whitespace => trivia.push_whitespace(token.text),
            kind if kind.is_comment() => trivia.push_comment(token.text),
            TokenKind::OpenTag | TokenKind::CloseTag => {
                trivia.flush(&mut out, true);
                push_tag(&mut out, token.text);
            }
            _ => {
                trivia.flush(&mut out, true);
                out.push_str(token.text);
            }
        }
    }
    trivia.flush(&mut out, false);

    out
}

/// Emit an open or close tag with its trailing line break as `\n`.
///
/// A lone `\r` left in place would pair with a `\n` emitted right after it
/// and two line breaks would read as one.
fn push_tag(out: &mut String, tag: &str) {
    let bare = tag.trim_end_matches(['\r', '\n']);
    out.push_str(bare);
    if bare.len() < tag.len() {
        out.push('\n');
    }
}

/// A run of adjacent whitespace and comment tokens awaiting output.
///
/// Runs are normalized as a whole so that removing a comment between two
/// whitespace tokens does not leave a double space behind.
#[derive(Default)]
struct Trivia {
    text: String,
    had_comment: bool,
}

impl Trivia {
    fn push_whitespace(&mut self, ws: &str) {
        // Normalized per token first so a CR ending one token never pairs with
        // an LF contributed by a following comment.
        self.text.push_str(&normalize_whitespace(ws));
    }

    fn push_comment(&mut self, comment: &str) {
        for _ in 0..count_line_breaks(comment) {
            self.text.push('\n');
        }
        self.had_comment = true;
    }

    fn flush(&mut self, out: &mut String, before_token: bool) {
        let normalized = normalize_whitespace(&self.text);
        if normalized.is_empty() {
            // A comment with no line breaks still separated two tokens.
            let glued = out
                .chars()
                .last()
                .is_some_and(|c| !c.is_ascii_whitespace());
            if self.had_comment && before_token && glued {
                out.push(' ');
            }
        } else {
            out.push_str(&normalized);
        }
        self.text.clear();
        self.had_comment = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn block_comment_becomes_its_newlines() {
        let src = "<?php\n/*\n * block\n */\nfoo();\nbar();\n";
        assert_eq!(strip_whitespace(src), "<?php\n\n\n\nfoo();\nbar();\n");
    }

    #[test]
    fn doc_comment_without_newlines_vanishes() {
        assert_eq!(
            strip_whitespace("<?php\n/** @var int */\n$a = 1;"),
            "<?php\n\n$a = 1;"
        );
    }

    #[test]
    fn indentation_and_wide_spaces_collapse() {
        let src = "<?php\nclass A {\n    public  function\tf()\n    {\n\t\treturn 1;\n    }\n}\n";
        let expected = "<?php\nclass A {\npublic function f()\n{\nreturn 1;\n}\n}\n";
        assert_eq!(strip_whitespace(src), expected);
    }

    #[test]
    fn line_endings_are_normalized() {
        assert_eq!(
            strip_whitespace("<?php\r\n$a = 1;\r\n$b = 2;\r$c = 3;"),
            "<?php\n$a = 1;\n$b = 2;\n$c = 3;"
        );
    }

    #[test]
    fn line_comment_keeps_its_line_break() {
        assert_eq!(
            strip_whitespace("<?php\n$a = 1; // one\n# two\n$b = 2;"),
            "<?php\n$a = 1; \n\n$b = 2;"
        );
    }

    #[test]
    fn inline_comment_between_words_leaves_a_space() {
        assert_eq!(strip_whitespace("<?php new/**/Foo;"), "<?php new Foo;");
        assert_eq!(strip_whitespace("<?php $a = 1 /* x */ + 2;"), "<?php $a = 1 + 2;");
    }

    #[test]
    fn strings_and_inline_html_are_untouched() {
        let src = "<p>  keep   me  </p>\n<?php echo '  /* no */  ', \"a\t\tb\"; ?>\n  <b> // nor </b>";
        let expected = "<p>  keep   me  </p>\n<?php echo '  /* no */  ', \"a\t\tb\"; ?>\n  <b> // nor </b>";
        assert_eq!(strip_whitespace(src), expected);
    }

    #[test]
    fn heredoc_body_is_untouched() {
        let src = "<?php\n$s = <<<EOT\n    indented  // text\n    EOT;\n";
        assert_eq!(strip_whitespace(src), src);
    }

    #[test]
    fn untokenizable_source_is_returned_unchanged() {
        let src = "<?php\n/* never closed\n   $a  =  1;";
        assert_eq!(strip_whitespace(src), src);
    }

    #[test]
    fn carriage_return_after_open_tag_keeps_its_line() {
        let src = "<?php\r\r// note\r$a = 1;\r";
        let stripped = strip_whitespace(src);
        assert_eq!(stripped, "<?php\n\n\n$a = 1;\n");
        assert_eq!(count_line_breaks(&stripped), count_line_breaks(src));

        let src = "<?php\r//\r<?php";
        assert_eq!(count_line_breaks(&strip_whitespace(src)), 2);
    }

    #[test]
    fn close_tag_line_break_is_normalized() {
        assert_eq!(strip_whitespace("<?php $a; ?>\r<p>"), "<?php $a; ?>\n<p>");
    }

    #[test]
    fn malformed_heredoc_header_is_left_alone() {
        let src = "<?php\n<<<EOT//\n'\nEOT//'";
        assert_eq!(strip_whitespace(src), src);
        assert_eq!(strip_whitespace(&strip_whitespace(src)), src);
    }

    #[test]
    fn count_line_breaks_treats_crlf_as_one() {
        assert_eq!(count_line_breaks("a\r\nb\rc\nd"), 3);
        assert_eq!(count_line_breaks(""), 0);
    }

    fn php_fragment() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "<?php\n",
            "<?php\r",
            "<?php ",
            "?>\n",
            "<div>\n",
            "$a = 1;",
            "foo($b, 'c');",
            "new",
            "Bar",
            " ",
            "\t\t",
            "\n",
            "\r\n",
            "\r",
            "    ",
            "// line comment\n",
            "// trailing",
            "# hash comment\r\n",
            "/* block */",
            "/* multi\r\n * line\n */",
            "/** @doc\n */",
            "'single // quoted'",
            "\"double {$x['k']} /* q */\"",
            "`cmd`",
            "#[Attr]",
            "<<<EOT\n  body /* x */\n  EOT;\n",
            "<<<'RAW'\nraw\nRAW;\n",
        ])
    }

    fn php_source() -> impl Strategy<Value = String> {
        prop::collection::vec(php_fragment(), 0..40).prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn stripping_preserves_line_breaks(src in php_source()) {
            let stripped = strip_whitespace(&src);
            prop_assert_eq!(count_line_breaks(&stripped), count_line_breaks(&src));
        }

        #[test]
        fn stripping_is_idempotent(src in php_source()) {
            prop_assume!(tokenize(&src).is_ok());
            let once = strip_whitespace(&src);
            prop_assert_eq!(strip_whitespace(&once), once);
        }
    }
}
