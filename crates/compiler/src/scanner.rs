//! Character source and lexer.
//!
//! The scanner reads one character at a time, mirrors every character into
//! the listing buffer (prefixing each line with its right-aligned number),
//! and assembles tokens on demand. There is no token stream up front: the
//! parser pulls the next lexeme exactly when it needs it, so the listing
//! stops at the point of the first error.
//!
//! End of input is represented by the sentinel character `$`; a literal
//! `$` in the source is indistinguishable from end of file, which is why
//! the language forbids it.

use crate::error::CompileError;

/// Sentinel substituted for every read past the end of the source.
pub const END_OF_FILE: char = '$';

/// Token returned once the input is exhausted.
pub const EOF_TOKEN: &str = "$";

#[derive(Debug)]
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    /// One character of lookahead; always the next character to consume.
    current: char,
    line_number: u32,
    /// Set by a newline; the next echoed character is preceded by the
    /// prefix for the new line.
    print_line_number: bool,
    /// Listing body: raw source text with `{:>5}|` line prefixes.
    listing: String,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Scanner {
            chars: source.chars().collect(),
            pos: 0,
            current: '\0',
            line_number: 0,
            print_line_number: false,
            listing: String::new(),
        }
    }

    /// Line number of the most recently echoed character (1-based once
    /// reading has started).
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// Listing text accumulated so far.
    pub fn listing(&self) -> &str {
        &self.listing
    }

    /// Read the next character, echoing it to the listing.
    ///
    /// Returns [`END_OF_FILE`] once the source is exhausted. The first read
    /// emits the prefix for line 1 even when the source is empty, so the
    /// listing always shows at least one numbered line.
    pub fn next_char(&mut self) -> char {
        self.current = match self.chars.get(self.pos) {
            Some(&c) => {
                self.pos += 1;
                c
            }
            None => END_OF_FILE,
        };

        if self.line_number == 0 {
            self.line_number = 1;
            self.push_line_prefix();
            if self.current == END_OF_FILE {
                return self.current;
            }
        }

        if self.current != END_OF_FILE {
            if self.print_line_number {
                self.line_number += 1;
                self.push_line_prefix();
                self.print_line_number = false;
            }
            if self.current == '\n' {
                self.print_line_number = true;
            }
            self.listing.push(self.current);
        }

        self.current
    }

    fn push_line_prefix(&mut self) {
        self.listing.push_str(&format!("{:>5}|", self.line_number));
    }

    /// Assemble and return the next token.
    ///
    /// Skips whitespace and braced comments. Returns [`EOF_TOKEN`] at end
    /// of input. The scanner keeps one character of lookahead in
    /// `self.current`, which lets the compound operators `:=`, `<>`, `<=`,
    /// and `>=` be recognized without backup.
    pub fn next_token(&mut self) -> Result<String, CompileError> {
        let mut token = String::new();

        while token.is_empty() {
            match self.current {
                '{' => {
                    // Comment runs to the closing brace; no nesting.
                    self.next_char();
                    while self.current != END_OF_FILE && self.current != '}' {
                        self.next_char();
                    }
                    if self.current == END_OF_FILE {
                        return Err(CompileError::Lexical(
                            "unexpected end of file.".to_string(),
                        ));
                    }
                    self.next_char();
                }
                '}' => {
                    return Err(CompileError::Lexical(
                        "'}' cannot begin token".to_string(),
                    ));
                }
                c if c.is_ascii_whitespace() => {
                    self.next_char();
                }
                '=' | ',' | ';' | '+' | '-' | '.' | '*' | '(' | ')' => {
                    token.push(self.current);
                    self.next_char();
                }
                ':' => {
                    token.push(self.current);
                    self.next_char();
                    if self.current == '=' {
                        token.push(self.current);
                        self.next_char();
                    }
                }
                '<' => {
                    token.push(self.current);
                    self.next_char();
                    if self.current == '>' || self.current == '=' {
                        token.push(self.current);
                        self.next_char();
                    }
                }
                '>' => {
                    token.push(self.current);
                    self.next_char();
                    if self.current == '=' {
                        token.push(self.current);
                        self.next_char();
                    }
                }
                c if c.is_ascii_lowercase() => {
                    token.push(c);
                    self.next_char();
                    while self.current.is_ascii_lowercase()
                        || self.current.is_ascii_digit()
                        || self.current == '_'
                    {
                        token.push(self.current);
                        self.next_char();
                    }
                    if token.ends_with('_') {
                        return Err(CompileError::Lexical(
                            "'_' cannot end token".to_string(),
                        ));
                    }
                }
                c if c.is_ascii_digit() => {
                    token.push(c);
                    while self.next_char().is_ascii_digit() {
                        token.push(self.current);
                    }
                }
                END_OF_FILE => {
                    token.push(END_OF_FILE);
                }
                _ => {
                    return Err(CompileError::Lexical("illegal symbol".to_string()));
                }
            }
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collect tokens until EOF for a source snippet.
    fn tokens(source: &str) -> Vec<String> {
        let mut scanner = Scanner::new(source);
        scanner.next_char();
        let mut out = Vec::new();
        loop {
            let tok = scanner.next_token().unwrap();
            if tok == EOF_TOKEN {
                break;
            }
            out.push(tok);
        }
        out
    }

    fn first_error(source: &str) -> CompileError {
        let mut scanner = Scanner::new(source);
        scanner.next_char();
        loop {
            match scanner.next_token() {
                Ok(tok) if tok == EOF_TOKEN => panic!("expected an error"),
                Ok(_) => {}
                Err(e) => return e,
            }
        }
    }

    #[test]
    fn test_basic_token_stream() {
        assert_eq!(
            tokens("program p; begin end."),
            vec!["program", "p", ";", "begin", "end", "."]
        );
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            tokens("x := a <> b <= c >= d < e > f : g"),
            vec![
                "x", ":=", "a", "<>", "b", "<=", "c", ">=", "d", "<", "e", ">", "f", ":", "g"
            ]
        );
    }

    #[test]
    fn test_identifiers_and_numbers() {
        assert_eq!(
            tokens("alpha_2 007 b2b"),
            vec!["alpha_2", "007", "b2b"]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokens("a { this is ignored } b"),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let err = first_error("a { never closed");
        assert_eq!(err.to_string(), "unexpected end of file.");
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = first_error("a } b");
        assert_eq!(err.to_string(), "'}' cannot begin token");
    }

    #[test]
    fn test_trailing_underscore() {
        let err = first_error("bad_ ");
        assert_eq!(err.to_string(), "'_' cannot end token");
    }

    #[test]
    fn test_illegal_symbol() {
        let err = first_error("a ? b");
        assert_eq!(err.to_string(), "illegal symbol");
    }

    #[test]
    fn test_eof_token() {
        let mut scanner = Scanner::new("");
        scanner.next_char();
        assert_eq!(scanner.next_token().unwrap(), EOF_TOKEN);
        // Repeated reads stay at EOF.
        assert_eq!(scanner.next_token().unwrap(), EOF_TOKEN);
    }

    #[test]
    fn test_listing_prefixes_lines() {
        let mut scanner = Scanner::new("ab\ncd\n");
        scanner.next_char();
        while scanner.next_token().unwrap() != EOF_TOKEN {}
        assert_eq!(scanner.listing(), "    1|ab\n    2|cd\n");
        assert_eq!(scanner.line_number(), 2);
    }

    #[test]
    fn test_listing_for_empty_source() {
        let mut scanner = Scanner::new("");
        scanner.next_char();
        assert_eq!(scanner.listing(), "    1|");
        assert_eq!(scanner.line_number(), 1);
    }

    #[test]
    fn test_line_number_tracks_errors() {
        let mut scanner = Scanner::new("ok\n?\n");
        scanner.next_char();
        assert_eq!(scanner.next_token().unwrap(), "ok");
        assert!(scanner.next_token().is_err());
        assert_eq!(scanner.line_number(), 2);
    }
}
