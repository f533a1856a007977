use mws_core::{Literals, Locals, SourceLocation};

use crate::context::{CompileOptions, CompilerContext};
use crate::diagnostics::Diagnostics;
use crate::extensions::Extensions;
use crate::scanner::{Abort, ParseResult, Scanner, Token};

/// State shared by every parser working on one script.
pub struct Session<'a> {
    pub diagnostics: &'a mut Diagnostics,
    pub extensions: &'a Extensions,
    pub context: &'a dyn CompilerContext,
    pub options: CompileOptions,
    pub literals: Literals,
    pub locals: Locals,
}

impl<'a> Session<'a> {
    pub fn new(
        diagnostics: &'a mut Diagnostics,
        extensions: &'a Extensions,
        context: &'a dyn CompilerContext,
        options: CompileOptions,
    ) -> Self {
        Self {
            diagnostics,
            extensions,
            context,
            options,
            literals: Literals::new(),
            locals: Locals::new(),
        }
    }

    /// Reports an error and aborts the current statement.
    pub fn fail<T>(&mut self, message: impl Into<String>, location: SourceLocation) -> ParseResult<T> {
        self.diagnostics.error(message, location);
        Err(Abort)
    }

    pub fn warn(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.diagnostics.warning(message, location);
    }

    /// Fails on `token`. A rejected line end is put back so that error
    /// recovery does not swallow the following line.
    pub fn reject<T>(
        &mut self,
        scanner: &mut Scanner<'_>,
        token: Token,
        message: impl Into<String>,
    ) -> ParseResult<T> {
        let location = token.location();
        if token.ends_line() {
            scanner.put_back(token);
        }
        self.fail(message, location)
    }
}
