use mws_core::{CompiledBlock, Locals, VarType};

use crate::control::ControlParser;
use crate::diagnostics::{Diagnostics, WarningsMode};
use crate::extensions::Extensions;
use crate::line::{expect_end_of_line, LineParser};
use crate::scanner::{Abort, Flow, Keyword, ParseResult, Parser, Scanner, Special, Token, TokenKind};
use crate::session::Session;

/// Parses one statement starting with `token` and returns its code.
pub fn parse_statement(
    token: Token,
    scanner: &mut Scanner<'_>,
    session: &mut Session<'_>,
) -> ParseResult<Vec<u32>> {
    match token.kind {
        TokenKind::Keyword(Keyword::If | Keyword::While) => {
            let mut parser = ControlParser::new();
            parser.on_token(token, scanner, session)?;
            Ok(parser.into_code())
        }
        _ => {
            let mut parser = LineParser::new();
            parser.on_token(token, scanner, session)?;
            Ok(parser.into_code())
        }
    }
}

/// Statement loop of a block or of a control construct body.
///
/// A top-level block ends at `end` or end of file. A nested body ends at one
/// of its terminators; `end` or end of file there is an error and is left in
/// the stream for the enclosing block.
pub struct ScriptParser {
    code: Vec<u32>,
    terminators: Vec<Keyword>,
    construct: Option<&'static str>,
    ended_by: Option<Token>,
}

impl ScriptParser {
    pub fn block() -> Self {
        Self {
            code: Vec::new(),
            terminators: Vec::new(),
            construct: None,
            ended_by: None,
        }
    }

    pub fn nested(terminators: &[Keyword], construct: &'static str) -> Self {
        Self {
            code: Vec::new(),
            terminators: terminators.to_vec(),
            construct: Some(construct),
            ended_by: None,
        }
    }

    /// The block code and the token that ended it, if it ended properly.
    pub fn finish(self) -> (Vec<u32>, Option<Token>) {
        (self.code, self.ended_by)
    }
}

impl Parser for ScriptParser {
    fn on_token(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Flow> {
        match &token.kind {
            TokenKind::Special(Special::Newline) => return Ok(Flow::Continue),
            TokenKind::Keyword(keyword) if self.terminators.contains(keyword) => {
                self.ended_by = Some(token);
                return Ok(Flow::Stop);
            }
            TokenKind::Keyword(Keyword::End) | TokenKind::Eof => {
                match self.construct {
                    Some(construct) => {
                        session.diagnostics.error(format!("Missing `{}`.", construct), token.location());
                        scanner.put_back(token);
                    }
                    None if token.kind == TokenKind::Eof => {
                        session.warn("Missing `end` at end of script.", token.location());
                        scanner.put_back(token);
                    }
                    None => self.ended_by = Some(token),
                }
                return Ok(Flow::Stop);
            }
            TokenKind::Keyword(Keyword::Endif) => {
                session.warn("Ignoring `endif` without matching `if`.", token.location());
                scanner.skip_line();
                return Ok(Flow::Continue);
            }
            TokenKind::Keyword(Keyword::Begin) => {
                session.diagnostics.error("Nested `begin`.", token.location());
                scanner.skip_line();
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        match parse_statement(token, scanner, session) {
            Ok(code) => self.code.extend(code),
            Err(Abort) => scanner.skip_line(),
        }
        Ok(Flow::Continue)
    }
}

/// Top level of a script: declarations, `begin NAME ... end [NAME]` blocks
/// and statements outside any block, which form the block named `""`.
#[derive(Debug, Default)]
pub struct FileParser {
    blocks: Vec<CompiledBlock>,
    implicit: Option<usize>,
}

impl FileParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_blocks(self) -> Vec<CompiledBlock> {
        self.blocks
    }

    fn begin(&mut self, scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<()> {
        let token = scanner.next_token(session.diagnostics)?;
        let name = match &token.kind {
            TokenKind::Name { text, .. } => text.clone(),
            TokenKind::Keyword(_) => token.loc.literal.clone(),
            _ => {
                scanner.put_back(token);
                String::new()
            }
        };
        expect_end_of_line(scanner, session, true)?;

        let mut body = ScriptParser::block();
        scanner.scan(&mut body, session)?;
        let (code, ended_by) = body.finish();
        if ended_by.is_some() {
            // `end` may repeat the block name.
            let next = scanner.next_token(session.diagnostics)?;
            if !next.ends_line() {
                scanner.skip_line();
            } else if next.kind == TokenKind::Eof {
                scanner.put_back(next);
            }
        }
        self.blocks.push(CompiledBlock { name, code });
        Ok(())
    }

    fn implicit_block(&mut self) -> &mut CompiledBlock {
        let index = match self.implicit {
            Some(index) => index,
            None => {
                self.blocks.push(CompiledBlock::new(""));
                let index = self.blocks.len() - 1;
                self.implicit = Some(index);
                index
            }
        };
        &mut self.blocks[index]
    }
}

impl Parser for FileParser {
    fn on_token(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Flow> {
        match &token.kind {
            TokenKind::Eof => return Ok(Flow::Stop),
            TokenKind::Special(Special::Newline) => return Ok(Flow::Continue),
            TokenKind::Keyword(Keyword::Begin) => {
                if self.begin(scanner, session).is_err() {
                    scanner.skip_line();
                }
                return Ok(Flow::Continue);
            }
            TokenKind::Keyword(Keyword::End) => {
                session.warn("Ignoring `end` without matching `begin`.", token.location());
                scanner.skip_line();
                return Ok(Flow::Continue);
            }
            TokenKind::Keyword(Keyword::Endif) => {
                session.warn("Ignoring `endif` without matching `if`.", token.location());
                scanner.skip_line();
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        let declaration = matches!(
            token.kind,
            TokenKind::Keyword(Keyword::Short | Keyword::Long | Keyword::Float | Keyword::Ref)
        );
        match parse_statement(token, scanner, session) {
            Ok(code) if !declaration => self.implicit_block().code.extend(code),
            Ok(_) => {}
            Err(Abort) => scanner.skip_line(),
        }
        Ok(Flow::Continue)
    }
}

/// Collects the local declarations of `source` without compiling it.
pub fn scan_locals(source: &str, extensions: &Extensions) -> Locals {
    let mut diagnostics = Diagnostics::new(WarningsMode::Ignore);
    let mut scanner = Scanner::new(source, extensions);
    let mut locals = Locals::new();

    loop {
        let token = match scanner.next_token(&mut diagnostics) {
            Ok(token) => token,
            Err(Abort) => {
                scanner.skip_line();
                continue;
            }
        };
        let var_type = match token.kind {
            TokenKind::Eof => break,
            TokenKind::Special(Special::Newline) => continue,
            TokenKind::Keyword(Keyword::Short) => VarType::Short,
            TokenKind::Keyword(Keyword::Long) => VarType::Long,
            TokenKind::Keyword(Keyword::Float) => VarType::Float,
            TokenKind::Keyword(Keyword::Ref) => VarType::Ref,
            _ => {
                scanner.skip_line();
                continue;
            }
        };

        let Ok(name) = scanner.next_token(&mut diagnostics) else {
            scanner.skip_line();
            continue;
        };
        let text = match &name.kind {
            TokenKind::Name {
                text,
                quoted: false,
            } => Some(text.clone()),
            TokenKind::Keyword(Keyword::Extension(_)) => Some(name.loc.literal.clone()),
            _ => None,
        };
        if let Some(text) = text {
            // Duplicates keep their first declaration, as in a full compile.
            let _ = locals.declare(var_type, &text);
        }
        if name.ends_line() {
            scanner.put_back(name);
        }
        scanner.skip_line();
    }
    locals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_locals_finds_declarations_anywhere() {
        let source = "short a\nbegin foo\n  long b ; counter\n  if ( a )\n    float c\n  endif\nend\nref d";
        let locals = scan_locals(source, &Extensions::new());
        assert_eq!(locals.lookup("a"), Some((VarType::Short, 0)));
        assert_eq!(locals.lookup("b"), Some((VarType::Long, 0)));
        assert_eq!(locals.lookup("c"), Some((VarType::Float, 0)));
        assert_eq!(locals.lookup("d"), Some((VarType::Ref, 0)));
    }

    #[test]
    fn scan_locals_survives_malformed_lines() {
        let source = "short\nlong \"unterminated\nfloat f\nshort 5\n";
        let locals = scan_locals(source, &Extensions::new());
        assert_eq!(locals.len(), 1);
        assert_eq!(locals.get_type("f"), Some(VarType::Float));
    }
}
