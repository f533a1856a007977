use mws_core::{ValueType, VarType};

use crate::expr::{
    self, explicit_target, member_lookup, parse_arguments, parse_call, string_value, ExprParser,
    ExplicitTarget, Expression,
};
use crate::generator;
use crate::scanner::{Flow, Keyword, ParseResult, Parser, Scanner, Special, Token, TokenKind};
use crate::session::Session;

/// Parses one simple statement: a declaration, `set`, `messagebox`,
/// `return`, an instruction call or a bare expression.
#[derive(Debug, Default)]
pub struct LineParser {
    code: Vec<u32>,
}

enum Assignment {
    Local(VarType, usize),
    Global(VarType, String),
    Member {
        name: String,
        owner: String,
        var_type: VarType,
        global: bool,
    },
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_code(self) -> Vec<u32> {
        self.code
    }

    fn declaration(
        &mut self,
        var_type: VarType,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<()> {
        let token = scanner.next_token(session.diagnostics)?;
        let name = match &token.kind {
            TokenKind::Name {
                text,
                quoted: false,
            } => text.clone(),
            TokenKind::Keyword(Keyword::Extension(_)) => {
                session.warn(
                    format!("Local variable `{}` shadows a function.", token.loc.literal),
                    token.location(),
                );
                token.loc.literal.clone()
            }
            _ => {
                let message = format!("Expected a variable name, found {}.", token);
                return session.reject(scanner, token, message);
            }
        };
        if let Err(error) = session.locals.declare(var_type, &name) {
            session.warn(error.message, token.location());
        }
        expect_end_of_line(scanner, session, false)
    }

    fn assignment(&mut self, scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<()> {
        let token = scanner.next_token(session.diagnostics)?;
        let (name, quoted) = match &token.kind {
            TokenKind::Name { text, quoted } => (text.clone(), *quoted),
            TokenKind::Keyword(Keyword::Extension(_)) => (token.loc.literal.clone(), false),
            _ => {
                let message = format!("Expected a variable after `set`, found {}.", token);
                return session.reject(scanner, token, message);
            }
        };

        let assignment = if let Some(target) = explicit_target(&name, quoted, scanner, session)? {
            let member = scanner.next_token(session.diagnostics)?;
            match member_lookup(&target, &member, session) {
                Some((name, owner, var_type, global)) => Assignment::Member {
                    name,
                    owner,
                    var_type,
                    global,
                },
                None => {
                    let message = format!(
                        "{} is not a member variable of {}.",
                        member,
                        expr::describe(&target)
                    );
                    return session.reject(scanner, member, message);
                }
            }
        } else if let Some((var_type, index)) =
            session.locals.lookup(&name).filter(|_| !quoted)
        {
            Assignment::Local(var_type, index)
        } else if let Some(var_type) = session.context.global_type(&name).filter(|_| !quoted) {
            Assignment::Global(var_type, name.to_ascii_lowercase())
        } else {
            return session.fail(format!("Unknown variable `{}`.", name), token.location());
        };

        let to = scanner.next_token(session.diagnostics)?;
        if !to.is_keyword(Keyword::To) {
            let message = format!("Expected `to`, found {}.", to);
            return session.reject(scanner, to, message);
        }

        let Expression { value_type, code } = ExprParser::new(false).parse(scanner, session)?;
        match assignment {
            Assignment::Local(var_type, index) => {
                generator::assign_to_local(&mut self.code, var_type, index, &code, value_type);
            }
            Assignment::Global(var_type, name) => generator::assign_to_global(
                &mut self.code,
                &mut session.literals,
                &name,
                var_type,
                &code,
                value_type,
            ),
            Assignment::Member {
                name,
                owner,
                var_type,
                global,
            } => generator::assign_to_member(
                &mut self.code,
                &mut session.literals,
                &name,
                &owner,
                var_type,
                global,
                &code,
                value_type,
            ),
        }
        expect_end_of_line(scanner, session, false)
    }

    fn message_box(&mut self, scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<()> {
        let token = scanner.next_token(session.diagnostics)?;
        let Some(format) = string_value(&token) else {
            let message = format!("Expected a message format string, found {}.", token);
            return session.reject(scanner, token, message);
        };

        let arguments = parse_arguments(&format_signature(&format), None, scanner, session)?;
        for argument in arguments.values.iter().rev() {
            self.code.extend_from_slice(argument);
        }

        let mut buttons = Vec::new();
        loop {
            let token = scanner.next_token(session.diagnostics)?;
            if token.ends_line() {
                scanner.put_back(token);
                break;
            }
            if token.is_special(Special::Comma) {
                continue;
            }
            match string_value(&token) {
                Some(button) => buttons.push(button),
                None => {
                    let message = format!("Expected a button label, found {}.", token);
                    return session.reject(scanner, token, message);
                }
            }
        }
        if buttons.len() > 0xff {
            return session.fail("A message box takes at most 255 buttons.", token.location());
        }
        generator::message(&mut self.code, &mut session.literals, &format, &buttons);
        expect_end_of_line(scanner, session, false)
    }

    fn instruction(
        &mut self,
        id: usize,
        explicit: Option<ExplicitTarget>,
        token: &Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<()> {
        let entry = expr::extension(id, token, session)?;
        let call = parse_call(&entry, explicit.as_ref(), token, scanner, session)?;
        self.code.extend(call);
        expect_end_of_line(scanner, session, true)
    }

    /// A statement that leaves a value: reported in console mode, dropped otherwise.
    fn value_statement(
        &mut self,
        expression: Expression,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<()> {
        self.code.extend(expression.code);
        if session.options.console {
            let format = match expression.value_type {
                ValueType::Integer => "%d",
                ValueType::Float => "%f",
            };
            generator::report(&mut self.code, &mut session.literals, format, 1);
        } else {
            generator::pop(&mut self.code);
        }
        expect_end_of_line(scanner, session, false)
    }

    fn name_statement(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<()> {
        let (name, quoted) = match &token.kind {
            TokenKind::Name { text, quoted } => (text.clone(), *quoted),
            _ => (token.loc.literal.clone(), false),
        };

        if let Some(target) = explicit_target(&name, quoted, scanner, session)? {
            let next = scanner.peek(session.diagnostics)?;
            if let TokenKind::Keyword(Keyword::Extension(id)) = next.kind {
                let is_instruction = session
                    .extensions
                    .get(id)
                    .is_some_and(|entry| !entry.is_function());
                if is_instruction && member_lookup(&target, &next, session).is_none() {
                    scanner.next_token(session.diagnostics)?;
                    return self.instruction(id, Some(target), &next, scanner, session);
                }
            }
            let expression = ExprParser::new(false).parse_from_target(target, scanner, session)?;
            return self.value_statement(expression, scanner, session);
        }

        if let TokenKind::Keyword(Keyword::Extension(id)) = token.kind {
            let shadowed = session.locals.contains(&name);
            let is_instruction = session
                .extensions
                .get(id)
                .is_some_and(|entry| !entry.is_function());
            if is_instruction && !shadowed {
                return self.instruction(id, None, &token, scanner, session);
            }
        }

        scanner.put_back(token);
        let expression = ExprParser::new(false).parse(scanner, session)?;
        self.value_statement(expression, scanner, session)
    }
}

impl Parser for LineParser {
    fn on_token(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Flow> {
        match &token.kind {
            TokenKind::Special(Special::Newline) => {}
            TokenKind::Eof => scanner.put_back(token),
            TokenKind::Keyword(Keyword::Short) => self.declaration(VarType::Short, scanner, session)?,
            TokenKind::Keyword(Keyword::Long) => self.declaration(VarType::Long, scanner, session)?,
            TokenKind::Keyword(Keyword::Float) => self.declaration(VarType::Float, scanner, session)?,
            TokenKind::Keyword(Keyword::Ref) => self.declaration(VarType::Ref, scanner, session)?,
            TokenKind::Keyword(Keyword::Set) => self.assignment(scanner, session)?,
            TokenKind::Keyword(Keyword::Messagebox) => self.message_box(scanner, session)?,
            TokenKind::Keyword(Keyword::Return) => {
                generator::exit(&mut self.code);
                expect_end_of_line(scanner, session, false)?;
            }
            TokenKind::Name { .. } | TokenKind::Keyword(Keyword::Extension(_)) => {
                self.name_statement(token, scanner, session)?;
            }
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Special(Special::Open | Special::Minus | Special::Plus) => {
                scanner.put_back(token);
                let expression = ExprParser::new(false).parse(scanner, session)?;
                self.value_statement(expression, scanner, session)?;
            }
            _ => {
                let message = format!("Unexpected {} at the start of a statement.", token);
                return session.reject(scanner, token, message);
            }
        }
        Ok(Flow::Stop)
    }
}

/// Consumes the line end. Extra tokens after an instruction are a warning
/// when `lenient`, an error otherwise.
pub fn expect_end_of_line(
    scanner: &mut Scanner<'_>,
    session: &mut Session<'_>,
    lenient: bool,
) -> ParseResult<()> {
    let token = scanner.next_token(session.diagnostics)?;
    match token.kind {
        TokenKind::Special(Special::Newline) => Ok(()),
        TokenKind::Eof => {
            scanner.put_back(token);
            Ok(())
        }
        _ if lenient => {
            session.warn(format!("Ignoring extra argument {}.", token), token.location());
            scanner.skip_line();
            Ok(())
        }
        _ => {
            let message = format!("Expected end of line, found {}.", token);
            session.reject(scanner, token, message)
        }
    }
}

/// Argument signature implied by a printf-style format.
pub fn format_signature(format: &str) -> String {
    let mut signature = String::new();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        while chars.peek().is_some_and(|c| c.is_ascii_digit() || *c == '.') {
            chars.next();
        }
        match chars.next() {
            Some('s') => signature.push('S'),
            Some('d' | 'i') => signature.push('l'),
            Some('f' | 'g' | 'e') => signature.push('f'),
            _ => {}
        }
    }
    signature
}
