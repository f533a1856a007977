//! Operator-precedence expression parser plus the call and explicit
//! reference machinery shared with the statement parsers.

use mws_core::{ValueType, VarType};

use crate::extensions::ExtensionEntry;
use crate::generator::{self, BinaryOp, CompareOp};
use crate::scanner::{Keyword, ParseResult, Scanner, Special, Token, TokenKind};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Open,
    Or,
    And,
    Compare(CompareOp),
    Add,
    Sub,
    Mul,
    Div,
    Negate,
}

impl Operator {
    fn priority(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Or => 1,
            Self::And => 2,
            Self::Compare(_) => 3,
            Self::Add | Self::Sub => 4,
            Self::Mul | Self::Div => 5,
            Self::Negate => 6,
        }
    }

    fn binary(special: Special) -> Option<Self> {
        Some(match special {
            Special::Or => Self::Or,
            Special::And => Self::And,
            Special::Eq => Self::Compare(CompareOp::Eq),
            Special::Ne => Self::Compare(CompareOp::Ne),
            Special::Lt => Self::Compare(CompareOp::Lt),
            Special::Le => Self::Compare(CompareOp::Le),
            Special::Gt => Self::Compare(CompareOp::Gt),
            Special::Ge => Self::Compare(CompareOp::Ge),
            Special::Plus => Self::Add,
            Special::Minus => Self::Sub,
            Special::Star => Self::Mul,
            Special::Slash => Self::Div,
            _ => return None,
        })
    }

    /// Operators that close an unparenthesized function argument.
    fn ends_argument(self) -> bool {
        !matches!(self, Self::Mul | Self::Div)
    }
}

/// The object a member access or function call is redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplicitTarget {
    Reference { id: String, handle: i32 },
    Script { name: String },
    Local { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub value_type: ValueType,
    pub code: Vec<u32>,
}

pub struct ExprParser {
    code: Vec<u32>,
    operands: Vec<ValueType>,
    operators: Vec<Operator>,
    next_operand: bool,
    argument: bool,
}

impl ExprParser {
    /// In argument mode the expression also ends at `+`, `-`, comparisons
    /// and boolean operators outside parentheses, and at a comma.
    pub fn new(argument: bool) -> Self {
        Self {
            code: Vec::new(),
            operands: Vec::new(),
            operators: Vec::new(),
            next_operand: true,
            argument,
        }
    }

    pub fn parse(
        mut self,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Expression> {
        let start = scanner.peek(session.diagnostics)?.location();
        loop {
            let token = scanner.next_token(session.diagnostics)?;
            if self.next_operand {
                if token.ends_line() && self.operands.is_empty() && self.operators.is_empty() {
                    scanner.put_back(token);
                    break;
                }
                self.expect_operand(token, scanner, session)?;
                continue;
            }

            match token.kind {
                TokenKind::Special(Special::Close) if self.is_open() => self.close(),
                TokenKind::Special(Special::Comma) if self.argument && !self.is_open() => break,
                TokenKind::Special(special) => match Operator::binary(special) {
                    Some(op) if !(self.argument && !self.is_open() && op.ends_argument()) => {
                        self.push_binary(op);
                    }
                    _ => {
                        scanner.put_back(token);
                        break;
                    }
                },
                _ => {
                    scanner.put_back(token);
                    break;
                }
            }
        }

        if self.operands.is_empty() && self.operators.is_empty() {
            return session.fail("Missing expression.", start);
        }
        while let Some(op) = self.operators.last().copied() {
            if op == Operator::Open {
                return session.fail("Missing `)`.", start);
            }
            self.pop_operator(op);
        }
        let value_type = self.pop_operand();
        Ok(Expression {
            value_type,
            code: self.code,
        })
    }

    /// Starts the expression with a member access or call on `target`.
    pub fn parse_from_target(
        mut self,
        target: ExplicitTarget,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<Expression> {
        let value_type = self.member_or_call(target, scanner, session)?;
        self.operand(value_type);
        self.parse(scanner, session)
    }

    fn expect_operand(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<()> {
        match &token.kind {
            TokenKind::Int(value) => {
                generator::push_int(&mut self.code, &mut session.literals, *value);
                self.operand(ValueType::Integer);
            }
            TokenKind::Float(value) => {
                generator::push_float(&mut self.code, &mut session.literals, *value);
                self.operand(ValueType::Float);
            }
            TokenKind::Special(Special::Open) => self.operators.push(Operator::Open),
            TokenKind::Special(Special::Minus) => self.operators.push(Operator::Negate),
            TokenKind::Special(Special::Plus) => {}
            TokenKind::Special(Special::Comma)
                if self.argument && self.operands.is_empty() && self.operators.is_empty() => {}
            TokenKind::Name { .. } | TokenKind::Keyword(Keyword::Extension(_)) => {
                let value_type = self.identifier(token, scanner, session)?;
                self.operand(value_type);
            }
            _ => {
                let message = format!("Expected an operand, found {}.", token);
                return session.reject(scanner, token, message);
            }
        }
        Ok(())
    }

    fn identifier(
        &mut self,
        token: Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<ValueType> {
        let (text, quoted) = match &token.kind {
            TokenKind::Name { text, quoted } => (text.clone(), *quoted),
            _ => (token.loc.literal.clone(), false),
        };

        if let Some(target) = explicit_target(&text, quoted, scanner, session)? {
            return self.member_or_call(target, scanner, session);
        }

        if !quoted {
            if let Some((var_type, index)) = session.locals.lookup(&text) {
                generator::fetch_local(&mut self.code, var_type, index);
                return Ok(var_type.value_type());
            }
        }

        if !quoted {
            if let Some(var_type) = session.context.global_type(&text) {
                generator::fetch_global(&mut self.code, &mut session.literals, &text.to_ascii_lowercase(), var_type);
                return Ok(var_type.value_type());
            }
        }

        if let Some(handle) = session.context.lookup_reference(&text) {
            generator::push_int(&mut self.code, &mut session.literals, handle);
            return Ok(ValueType::Integer);
        }

        if let TokenKind::Keyword(Keyword::Extension(id)) = token.kind {
            return self.function(id, None, &token, scanner, session);
        }

        session.fail(format!("Unknown identifier `{}`.", text), token.location())
    }

    fn member_or_call(
        &mut self,
        target: ExplicitTarget,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<ValueType> {
        let token = scanner.next_token(session.diagnostics)?;
        if let Some((name, owner, var_type, global)) = member_lookup(&target, &token, session) {
            generator::fetch_member(&mut self.code, &mut session.literals, &name, &owner, var_type, global);
            return Ok(var_type.value_type());
        }
        match token.kind {
            TokenKind::Keyword(Keyword::Extension(id)) => {
                self.function(id, Some(&target), &token, scanner, session)
            }
            TokenKind::Name { ref text, .. } => {
                let message = format!("`{}` is not a member variable or function of {}.", text, describe(&target));
                session.fail(message, token.location())
            }
            _ => {
                let message = format!("Expected a member or function name, found {}.", token);
                session.reject(scanner, token, message)
            }
        }
    }

    fn function(
        &mut self,
        id: usize,
        explicit: Option<&ExplicitTarget>,
        token: &Token,
        scanner: &mut Scanner<'_>,
        session: &mut Session<'_>,
    ) -> ParseResult<ValueType> {
        let entry = extension(id, token, session)?;
        let Some(return_type) = entry.return_type else {
            return session.fail(
                format!("Instruction `{}` does not return a value.", entry.name),
                token.location(),
            );
        };
        let call = parse_call(&entry, explicit, token, scanner, session)?;
        self.code.extend(call);
        Ok(return_type)
    }

    fn operand(&mut self, value_type: ValueType) {
        self.operands.push(value_type);
        self.next_operand = false;
    }

    fn pop_operand(&mut self) -> ValueType {
        self.operands.pop().unwrap_or(ValueType::Integer)
    }

    fn is_open(&self) -> bool {
        self.operators.contains(&Operator::Open)
    }

    fn push_binary(&mut self, op: Operator) {
        while let Some(top) = self.operators.last().copied() {
            if top == Operator::Open || top.priority() < op.priority() {
                break;
            }
            self.pop_operator(top);
        }
        self.operators.push(op);
        self.next_operand = true;
    }

    fn close(&mut self) {
        while let Some(op) = self.operators.last().copied() {
            if op == Operator::Open {
                self.operators.pop();
                return;
            }
            self.pop_operator(op);
        }
    }

    /// Pops `op` off the operator stack and emits it.
    fn pop_operator(&mut self, op: Operator) {
        self.operators.pop();
        let code = &mut self.code;
        match op {
            Operator::Open => {}
            Operator::Negate => {
                let value_type = self.operands.last().copied().unwrap_or(ValueType::Integer);
                generator::negate(code, value_type);
            }
            Operator::Compare(compare) => {
                let right = self.operands.pop().unwrap_or(ValueType::Integer);
                let left = self.operands.pop().unwrap_or(ValueType::Integer);
                generator::compare(code, compare, left, right);
                self.operands.push(ValueType::Integer);
            }
            binary => {
                let right = self.operands.pop().unwrap_or(ValueType::Integer);
                let left = self.operands.pop().unwrap_or(ValueType::Integer);
                let op = match binary {
                    Operator::Or => BinaryOp::Or,
                    Operator::And => BinaryOp::And,
                    Operator::Add => BinaryOp::Add,
                    Operator::Sub => BinaryOp::Sub,
                    Operator::Mul => BinaryOp::Mul,
                    _ => BinaryOp::Div,
                };
                let result = generator::binary(code, op, left, right);
                self.operands.push(result);
            }
        }
    }
}

/// Parses a complete expression and converts it to `value_type`.
pub fn parse_typed(
    value_type: ValueType,
    argument: bool,
    scanner: &mut Scanner<'_>,
    session: &mut Session<'_>,
) -> ParseResult<Vec<u32>> {
    let expression = ExprParser::new(argument).parse(scanner, session)?;
    let mut code = expression.code;
    generator::convert(&mut code, expression.value_type, value_type);
    Ok(code)
}

/// If `name` is followed by a member marker and names something that can
/// own members or receive calls, consumes the marker and returns the target.
pub fn explicit_target(
    name: &str,
    quoted: bool,
    scanner: &mut Scanner<'_>,
    session: &mut Session<'_>,
) -> ParseResult<Option<ExplicitTarget>> {
    let next = scanner.peek(session.diagnostics)?;
    if !next.is_special(Special::Member) {
        return Ok(None);
    }

    let local = if quoted { None } else { session.locals.lookup(name) };
    let target = match local {
        Some((VarType::Ref, index)) => ExplicitTarget::Local { index },
        Some(_) => return Ok(None),
        None => {
            if let Some(handle) = session.context.lookup_reference(name) {
                ExplicitTarget::Reference {
                    id: name.to_ascii_lowercase(),
                    handle,
                }
            } else if session.context.is_script(name) {
                ExplicitTarget::Script {
                    name: name.to_ascii_lowercase(),
                }
            } else {
                return Ok(None);
            }
        }
    };
    scanner.next_token(session.diagnostics)?;
    Ok(Some(target))
}

/// Member variable designated by `token` on `target`:
/// `(variable, owner, type, owner is a global script)`.
pub fn member_lookup(
    target: &ExplicitTarget,
    token: &Token,
    session: &Session<'_>,
) -> Option<(String, String, VarType, bool)> {
    let name = match &token.kind {
        TokenKind::Name { text, .. } => text.to_ascii_lowercase(),
        TokenKind::Keyword(_) => token.loc.literal.to_ascii_lowercase(),
        _ => return None,
    };
    let owner = match target {
        ExplicitTarget::Reference { id, .. } => id.clone(),
        ExplicitTarget::Script { name } => name.clone(),
        ExplicitTarget::Local { .. } => return None,
    };
    let (var_type, global) = session.context.member_type(&name, &owner)?;
    Some((name, owner, var_type, global))
}

pub fn describe(target: &ExplicitTarget) -> String {
    match target {
        ExplicitTarget::Reference { id, .. } => format!("reference `{}`", id),
        ExplicitTarget::Script { name } => format!("script `{}`", name),
        ExplicitTarget::Local { index } => format!("local reference #{}", index),
    }
}

pub fn extension(id: usize, token: &Token, session: &mut Session<'_>) -> ParseResult<ExtensionEntry> {
    match session.extensions.get(id) {
        Some(entry) => Ok(entry.clone()),
        None => session.fail(format!("Unknown extension keyword {}.", id), token.location()),
    }
}

/// Pushes the target handle on top of the stack.
fn emit_target(
    code: &mut Vec<u32>,
    target: &ExplicitTarget,
    token: &Token,
    session: &mut Session<'_>,
) -> ParseResult<()> {
    match target {
        ExplicitTarget::Reference { handle, .. } => {
            generator::push_int(code, &mut session.literals, *handle);
            Ok(())
        }
        ExplicitTarget::Local { index } => {
            generator::fetch_local(code, VarType::Ref, *index);
            Ok(())
        }
        ExplicitTarget::Script { name } => session.fail(
            format!("Script `{}` cannot be used as an object reference.", name),
            token.location(),
        ),
    }
}

/// Parses the arguments of `entry` and returns the complete call sequence:
/// arguments with the first one on top, then the target, then the opcode.
pub fn parse_call(
    entry: &ExtensionEntry,
    explicit: Option<&ExplicitTarget>,
    token: &Token,
    scanner: &mut Scanner<'_>,
    session: &mut Session<'_>,
) -> ParseResult<Vec<u32>> {
    if explicit.is_some() && !entry.accepts_explicit() {
        return session.fail(
            format!("`{}` does not accept an explicit reference.", entry.name),
            token.location(),
        );
    }

    let arguments = parse_arguments(&entry.signature, Some(entry.keyword), scanner, session)?;
    let mut code = Vec::new();
    for argument in arguments.values.iter().rev() {
        code.extend_from_slice(argument);
    }
    if let Some(target) = explicit {
        emit_target(&mut code, target, token, session)?;
    }
    match entry.code_word(explicit.is_some(), arguments.optional) {
        Ok(word) => code.push(word),
        Err(error) => return session.fail(error.message, token.location()),
    }
    Ok(code)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    /// Code of each supplied argument in source order.
    pub values: Vec<Vec<u32>>,
    /// Number of optional arguments actually supplied.
    pub optional: u32,
}

/// Parses arguments following `signature`. `keyword` is the call's own
/// keyword, which a `j` slot may swallow.
pub fn parse_arguments(
    signature: &str,
    keyword: Option<usize>,
    scanner: &mut Scanner<'_>,
    session: &mut Session<'_>,
) -> ParseResult<Arguments> {
    let mut arguments = Arguments::default();
    let mut optional = false;

    for code in signature.chars() {
        match code {
            '/' => optional = true,
            'l' | 's' | 'f' => {
                if optional && !starts_operand(scanner, session)? {
                    break;
                }
                let value_type = if code == 'f' {
                    ValueType::Float
                } else {
                    ValueType::Integer
                };
                arguments.values.push(parse_typed(value_type, true, scanner, session)?);
                arguments.optional += u32::from(optional);
            }
            'S' | 'c' => {
                let token = next_skipping_comma(scanner, session)?;
                let Some(text) = string_value(&token) else {
                    if optional {
                        scanner.put_back(token);
                        break;
                    }
                    let message = format!("Expected a string argument, found {}.", token);
                    return session.reject(scanner, token, message);
                };
                let text = if code == 'c' {
                    text.to_ascii_lowercase()
                } else {
                    text
                };
                let mut value = Vec::new();
                generator::push_string(&mut value, &mut session.literals, &text);
                arguments.values.push(value);
                arguments.optional += u32::from(optional);
            }
            'x' => {
                let token = next_skipping_comma(scanner, session)?;
                if string_value(&token).is_none() {
                    scanner.put_back(token);
                }
            }
            'z' => {
                let token = next_skipping_comma(scanner, session)?;
                if !matches!(token.kind, TokenKind::Int(_) | TokenKind::Float(_)) {
                    scanner.put_back(token);
                }
            }
            'j' => {
                let token = scanner.next_token(session.diagnostics)?;
                let junk = token.is_special(Special::Member)
                    || matches!((token.kind.clone(), keyword), (TokenKind::Keyword(Keyword::Extension(id)), Some(own)) if id == own);
                if junk {
                    session.warn(format!("Ignoring stray {}.", token), token.location());
                } else {
                    scanner.put_back(token);
                }
            }
            _ => {}
        }
    }
    Ok(arguments)
}

fn next_skipping_comma(scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<Token> {
    let token = scanner.next_token(session.diagnostics)?;
    if token.is_special(Special::Comma) {
        return scanner.next_token(session.diagnostics);
    }
    Ok(token)
}

/// Text of a token usable as a string argument.
pub fn string_value(token: &Token) -> Option<String> {
    match &token.kind {
        TokenKind::Name { text, .. } => Some(text.clone()),
        TokenKind::Keyword(_) | TokenKind::Int(_) | TokenKind::Float(_) => {
            Some(token.loc.literal.clone())
        }
        _ => None,
    }
}

/// Whether the next token can begin an operand. A leading comma is consumed.
fn starts_operand(scanner: &mut Scanner<'_>, session: &mut Session<'_>) -> ParseResult<bool> {
    let mut token = scanner.peek(session.diagnostics)?;
    if token.is_special(Special::Comma) {
        scanner.next_token(session.diagnostics)?;
        token = scanner.peek(session.diagnostics)?;
    }
    Ok(matches!(
        token.kind,
        TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Name { .. }
            | TokenKind::Keyword(Keyword::Extension(_))
            | TokenKind::Special(Special::Open | Special::Minus | Special::Plus)
    ))
}
