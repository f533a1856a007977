use std::fmt;

use mws_core::SourceLocation;

use crate::diagnostics::Diagnostics;
use crate::extensions::Extensions;
use crate::session::Session;

/// Returned once a problem has been reported to the diagnostics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort;

pub type ParseResult<T> = Result<T, Abort>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Begin,
    End,
    Short,
    Long,
    Float,
    Ref,
    If,
    Elseif,
    Else,
    Endif,
    While,
    Endwhile,
    Return,
    Messagebox,
    Set,
    To,
    /// A name registered in the extension table.
    Extension(usize),
}

impl Keyword {
    fn builtin(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "begin" => Self::Begin,
            "end" => Self::End,
            "short" => Self::Short,
            "long" => Self::Long,
            "float" => Self::Float,
            "ref" => Self::Ref,
            "if" => Self::If,
            "elseif" => Self::Elseif,
            "else" => Self::Else,
            "endif" => Self::Endif,
            "while" => Self::While,
            "endwhile" => Self::Endwhile,
            "return" => Self::Return,
            "messagebox" => Self::Messagebox,
            "set" => Self::Set,
            "to" => Self::To,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
    Open,
    Close,
    Comma,
    /// `.` or `->`
    Member,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i32),
    Float(f32),
    Name { text: String, quoted: bool },
    Keyword(Keyword),
    Special(Special),
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLoc {
    pub line: usize,
    pub column: usize,
    /// Source text of the token.
    pub literal: String,
}

impl TokenLoc {
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: TokenLoc,
}

impl Token {
    pub fn location(&self) -> SourceLocation {
        self.loc.location()
    }

    pub fn is_special(&self, special: Special) -> bool {
        self.kind == TokenKind::Special(special)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Newline or end of file.
    pub fn ends_line(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Special(Special::Newline) | TokenKind::Eof
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Special(Special::Newline) => f.write_str("end of line"),
            TokenKind::Eof => f.write_str("end of file"),
            _ => write!(f, "`{}`", self.loc.literal),
        }
    }
}

/// Whether the scanner should keep feeding the same parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// A consumer of tokens driven by [`Scanner::scan`]. A parser that finds a
/// token it does not own puts it back and stops. Parsers may also pull
/// further tokens from the scanner directly.
pub trait Parser {
    fn on_token(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Flow>;
}

pub struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    put_back: Option<Token>,
    extensions: &'a Extensions,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &str, extensions: &'a Extensions) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            put_back: None,
            extensions,
        }
    }

    /// Feeds tokens to `parser` until it asks to stop. A malformed token has
    /// already been reported; the rest of its line is dropped.
    pub fn scan(&mut self, parser: &mut dyn Parser, session: &mut Session<'_>) -> ParseResult<()> {
        loop {
            let token = match self.next_token(session.diagnostics) {
                Ok(token) => token,
                Err(Abort) => {
                    self.skip_line();
                    continue;
                }
            };
            if parser.on_token(token, self, session)? == Flow::Stop {
                return Ok(());
            }
        }
    }

    /// Makes `token` the next one returned. Only one token can be held.
    pub fn put_back(&mut self, token: Token) {
        debug_assert!(self.put_back.is_none(), "only one token can be put back");
        self.put_back = Some(token);
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self, diagnostics: &mut Diagnostics) -> ParseResult<Token> {
        let token = self.next_token(diagnostics)?;
        self.put_back = Some(token.clone());
        Ok(token)
    }

    /// Discards everything up to and including the next newline.
    pub fn skip_line(&mut self) {
        if let Some(token) = self.put_back.take() {
            match token.kind {
                TokenKind::Special(Special::Newline) => return,
                TokenKind::Eof => {
                    self.put_back = Some(token);
                    return;
                }
                _ => {}
            }
        }
        while let Some(c) = self.current() {
            self.advance();
            if c == '\n' {
                return;
            }
        }
    }

    pub fn next_token(&mut self, diagnostics: &mut Diagnostics) -> ParseResult<Token> {
        if let Some(token) = self.put_back.take() {
            return Ok(token);
        }

        self.skip_blanks();
        let line = self.line;
        let column = self.column;
        let start = self.pos;

        let Some(c) = self.current() else {
            return Ok(self.token(TokenKind::Eof, line, column, start));
        };

        let kind = if c == '\n' {
            self.advance();
            TokenKind::Special(Special::Newline)
        } else if c.is_ascii_digit() || (c == '.' && self.lookahead(1).is_some_and(|n| n.is_ascii_digit())) {
            self.scan_number(diagnostics, line, column)?
        } else if c.is_ascii_alphabetic() || c == '_' {
            let text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            self.classify_name(text)
        } else if c == '"' {
            self.scan_quoted(diagnostics, line, column)?
        } else {
            self.scan_special(diagnostics, c, line, column)?
        };

        Ok(self.token(kind, line, column, start))
    }

    fn token(&self, kind: TokenKind, line: usize, column: usize, start: usize) -> Token {
        let literal = match &kind {
            TokenKind::Special(Special::Newline) | TokenKind::Eof => String::new(),
            _ => self.chars[start..self.pos].iter().collect(),
        };
        Token {
            kind,
            loc: TokenLoc {
                line,
                column,
                literal,
            },
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn lookahead(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.current() {
            if !accept(c) {
                break;
            }
            text.push(c);
            self.advance();
        }
        text
    }

    fn skip_blanks(&mut self) {
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\r' => self.advance(),
                ';' => {
                    while self.current().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn classify_name(&self, text: String) -> TokenKind {
        if let Some(keyword) = Keyword::builtin(&text) {
            return TokenKind::Keyword(keyword);
        }
        match self.extensions.search(&text) {
            Some(id) => TokenKind::Keyword(Keyword::Extension(id)),
            None => TokenKind::Name {
                text,
                quoted: false,
            },
        }
    }

    fn scan_number(
        &mut self,
        diagnostics: &mut Diagnostics,
        line: usize,
        column: usize,
    ) -> ParseResult<TokenKind> {
        let location = SourceLocation { line, column };
        let mut text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');

        // Names such as `1000gold` start with digits.
        if text.chars().any(|c| !c.is_ascii_digit()) {
            return Ok(TokenKind::Name {
                text,
                quoted: false,
            });
        }

        if self.current() == Some('.') {
            text.push('.');
            self.advance();
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
            return match text.parse::<f32>() {
                Ok(value) => Ok(TokenKind::Float(value)),
                Err(_) => {
                    diagnostics.error(format!("Invalid float literal `{}`.", text), location);
                    Err(Abort)
                }
            };
        }

        match text.parse::<i32>() {
            Ok(value) => Ok(TokenKind::Int(value)),
            Err(_) => {
                diagnostics.error(format!("Integer literal `{}` is out of range.", text), location);
                Err(Abort)
            }
        }
    }

    fn scan_quoted(
        &mut self,
        diagnostics: &mut Diagnostics,
        line: usize,
        column: usize,
    ) -> ParseResult<TokenKind> {
        self.advance();
        let text = self.take_while(|c| c != '"' && c != '\n');
        if self.current() != Some('"') {
            diagnostics.error("Unterminated string.", SourceLocation { line, column });
            return Err(Abort);
        }
        self.advance();
        Ok(TokenKind::Name { text, quoted: true })
    }

    fn scan_special(
        &mut self,
        diagnostics: &mut Diagnostics,
        c: char,
        line: usize,
        column: usize,
    ) -> ParseResult<TokenKind> {
        let next = self.lookahead(1);
        let (special, width) = match (c, next) {
            ('(', _) => (Special::Open, 1),
            (')', _) => (Special::Close, 1),
            (',', _) => (Special::Comma, 1),
            ('.', _) => (Special::Member, 1),
            ('-', Some('>')) => (Special::Member, 2),
            ('+', _) => (Special::Plus, 1),
            ('-', _) => (Special::Minus, 1),
            ('*', _) => (Special::Star, 1),
            ('/', _) => (Special::Slash, 1),
            ('=', Some('=')) => (Special::Eq, 2),
            ('=', _) => {
                diagnostics.warning(
                    "Single `=` used as comparison; treating it as `==`.",
                    SourceLocation { line, column },
                );
                (Special::Eq, 1)
            }
            ('!', Some('=')) => (Special::Ne, 2),
            ('<', Some('=')) => (Special::Le, 2),
            ('<', _) => (Special::Lt, 1),
            ('>', Some('=')) => (Special::Ge, 2),
            ('>', _) => (Special::Gt, 1),
            ('&', Some('&')) => (Special::And, 2),
            ('|', Some('|')) => (Special::Or, 2),
            _ => {
                self.advance();
                diagnostics.error(
                    format!("Unexpected character `{}`.", c),
                    SourceLocation { line, column },
                );
                return Err(Abort);
            }
        };
        for _ in 0..width {
            self.advance();
        }
        Ok(TokenKind::Special(special))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mws_core::ValueType;

    fn kinds(source: &str, extensions: &Extensions) -> Vec<TokenKind> {
        let mut diagnostics = Diagnostics::default();
        let mut scanner = Scanner::new(source, extensions);
        let mut kinds = Vec::new();
        loop {
            let token = scanner.next_token(&mut diagnostics).expect("token");
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                return kinds;
            }
        }
    }

    fn name(text: &str) -> TokenKind {
        TokenKind::Name {
            text: text.to_string(),
            quoted: false,
        }
    }

    #[test]
    fn scans_numbers_names_and_keywords() {
        let extensions = Extensions::new();
        assert_eq!(
            kinds("SET x To 12 ; comment\n1.5 .5", &extensions),
            vec![
                TokenKind::Keyword(Keyword::Set),
                name("x"),
                TokenKind::Keyword(Keyword::To),
                TokenKind::Int(12),
                TokenKind::Special(Special::Newline),
                TokenKind::Float(1.5),
                TokenKind::Float(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn registered_extensions_scan_as_keywords() {
        let mut extensions = Extensions::new();
        let id = extensions
            .register_function("GetDisabled", ValueType::Integer, "", 0x100, Some(0x101))
            .expect("register");
        assert_eq!(
            kinds("fargoth->getdisabled", &extensions),
            vec![
                name("fargoth"),
                TokenKind::Special(Special::Member),
                TokenKind::Keyword(Keyword::Extension(id)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_two_character_operators() {
        let extensions = Extensions::new();
        assert_eq!(
            kinds("a>=b!=c&&d||e<=f", &extensions)
                .into_iter()
                .filter(|kind| matches!(kind, TokenKind::Special(_)))
                .collect::<Vec<_>>(),
            vec![
                TokenKind::Special(Special::Ge),
                TokenKind::Special(Special::Ne),
                TokenKind::Special(Special::And),
                TokenKind::Special(Special::Or),
                TokenKind::Special(Special::Le),
            ]
        );
    }

    #[test]
    fn quoted_names_never_become_keywords() {
        let extensions = Extensions::new();
        assert_eq!(
            kinds("\"begin\"", &extensions)[0],
            TokenKind::Name {
                text: "begin".to_string(),
                quoted: true
            }
        );
    }

    #[test]
    fn unterminated_string_reports_the_opening_quote() {
        let extensions = Extensions::new();
        let mut diagnostics = Diagnostics::default();
        let mut scanner = Scanner::new("x \"abc\ny", &extensions);
        scanner.next_token(&mut diagnostics).expect("x");
        assert_eq!(scanner.next_token(&mut diagnostics), Err(Abort));
        assert_eq!(
            diagnostics.entries()[0].location,
            SourceLocation { line: 1, column: 3 }
        );
        scanner.skip_line();
        let token = scanner.next_token(&mut diagnostics).expect("y");
        assert_eq!(token.kind, name("y"));
        assert_eq!(token.loc.line, 2);
    }

    #[test]
    fn put_back_returns_the_same_token() {
        let extensions = Extensions::new();
        let mut diagnostics = Diagnostics::default();
        let mut scanner = Scanner::new("a b", &extensions);
        let first = scanner.next_token(&mut diagnostics).expect("a");
        scanner.put_back(first.clone());
        assert_eq!(scanner.next_token(&mut diagnostics).expect("again"), first);
        assert_eq!(scanner.peek(&mut diagnostics).expect("peek").kind, name("b"));
        assert_eq!(scanner.next_token(&mut diagnostics).expect("b").kind, name("b"));
    }

    #[test]
    fn integer_overflow_is_lexical_error() {
        let extensions = Extensions::new();
        let mut diagnostics = Diagnostics::default();
        let mut scanner = Scanner::new("99999999999", &extensions);
        assert_eq!(scanner.next_token(&mut diagnostics), Err(Abort));
        assert!(!diagnostics.is_good());
    }
}
