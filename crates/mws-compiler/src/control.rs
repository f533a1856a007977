use crate::expr::ExprParser;
use crate::generator;
use crate::line::expect_end_of_line;
use crate::scanner::{Flow, Keyword, ParseResult, Parser, Scanner, Token, TokenKind};
use crate::script::ScriptParser;
use crate::session::Session;

/// Parses `if/elseif/else/endif` and `while/endwhile` constructs.
#[derive(Debug, Default)]
pub struct ControlParser {
    code: Vec<u32>,
}

impl ControlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_code(self) -> Vec<u32> {
        self.code
    }

    /// Condition expression up to the end of the line, as an integer.
    fn condition(&mut self, scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<()> {
        let expression = ExprParser::new(false).parse(scanner, session)?;
        self.code.extend(expression.code);
        generator::to_condition(&mut self.code, &mut session.literals, expression.value_type);
        expect_end_of_line(scanner, session, false)
    }

    fn body(
        &mut self,
        terminators: &[Keyword],
        construct: &'static str,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Option<Token>> {
        let mut body = ScriptParser::nested(terminators, construct);
        scanner.scan(&mut body, session)?;
        let (code, terminator) = body.finish();
        self.code.extend(code);
        Ok(terminator)
    }

    fn parse_if(&mut self, scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<()> {
        const BRANCH_END: [Keyword; 3] = [Keyword::Elseif, Keyword::Else, Keyword::Endif];
        let mut exits = Vec::new();

        self.condition(scanner, session)?;
        loop {
            let skip = generator::jump_on_zero(&mut self.code, 0);
            let terminator = self.body(&BRANCH_END, "endif", scanner, session)?;
            match terminator.map(|token| token.kind) {
                Some(TokenKind::Keyword(Keyword::Elseif)) => {
                    exits.push(self.placeholder_jump());
                    let next = self.code.len();
                    generator::patch_jump(&mut self.code, skip, next);
                    self.condition(scanner, session)?;
                }
                Some(TokenKind::Keyword(Keyword::Else)) => {
                    exits.push(self.placeholder_jump());
                    let next = self.code.len();
                    generator::patch_jump(&mut self.code, skip, next);
                    expect_end_of_line(scanner, session, true)?;
                    if self.body(&[Keyword::Endif], "endif", scanner, session)?.is_some() {
                        expect_end_of_line(scanner, session, true)?;
                    }
                    break;
                }
                Some(_) => {
                    let next = self.code.len();
                    generator::patch_jump(&mut self.code, skip, next);
                    expect_end_of_line(scanner, session, true)?;
                    break;
                }
                None => {
                    let next = self.code.len();
                    generator::patch_jump(&mut self.code, skip, next);
                    break;
                }
            }
        }

        let end = self.code.len();
        for exit in exits {
            generator::patch_jump(&mut self.code, exit, end);
        }
        Ok(())
    }

    fn parse_while(&mut self, scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<()> {
        let start = self.code.len();
        self.condition(scanner, session)?;
        let skip = generator::jump_on_zero(&mut self.code, 0);
        let terminator = self.body(&[Keyword::Endwhile], "endwhile", scanner, session)?;
        let back = self.code.len();
        generator::jump(&mut self.code, start as i32 - back as i32);
        let end = self.code.len();
        generator::patch_jump(&mut self.code, skip, end);
        if terminator.is_some() {
            expect_end_of_line(scanner, session, true)?;
        }
        Ok(())
    }

    fn placeholder_jump(&mut self) -> usize {
        let at = self.code.len();
        generator::jump(&mut self.code, 0);
        at
    }
}

impl Parser for ControlParser {
    fn on_token(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Flow> {
        match token.kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if(scanner, session)?,
            TokenKind::Keyword(Keyword::While) => self.parse_while(scanner, session)?,
            _ => scanner.put_back(token),
        }
        Ok(Flow::Stop)
    }
}
