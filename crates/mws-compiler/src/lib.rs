pub mod context;
pub mod control;
pub mod diagnostics;
pub mod expr;
pub mod extensions;
pub mod generator;
pub mod line;
pub mod scanner;
pub mod script;
pub mod session;

use mws_core::{CompiledScript, ScriptError};
use tracing::debug;

pub use context::{CompileOptions, CompilerContext, EmptyContext};
pub use diagnostics::{Diagnostic, Diagnostics, Severity, WarningsMode};
pub use extensions::{ExtensionEntry, Extensions};
pub use script::scan_locals;

use scanner::Scanner;
use script::FileParser;
use session::Session;

/// Compiles one script. Problems are reported to `diagnostics`; the call
/// fails with `COMPILE_FAILED` when any of them was an error.
pub fn compile_script(
    name: &str,
    source: &str,
    extensions: &Extensions,
    context: &dyn CompilerContext,
    options: CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<CompiledScript, ScriptError> {
    let previous_context = diagnostics.context().map(str::to_string);
    diagnostics.set_mode(options.warnings);
    diagnostics.set_context(Some(name.to_string()));
    let errors_before = diagnostics.error_count();

    let (blocks, literals, locals, aborted) = {
        let mut session = Session::new(diagnostics, extensions, context, options);
        let mut scanner = Scanner::new(source, extensions);
        let mut parser = FileParser::new();
        let aborted = scanner.scan(&mut parser, &mut session).is_err();
        (parser.into_blocks(), session.literals, session.locals, aborted)
    };

    diagnostics.set_context(previous_context);
    check_outcome(name, diagnostics.error_count() - errors_before, aborted)?;

    let compiled = CompiledScript {
        name: name.to_ascii_lowercase(),
        blocks,
        literals,
        locals,
    };
    debug!(
        script = %name,
        blocks = compiled.blocks.len(),
        words = compiled.blocks.iter().map(|block| block.code.len()).sum::<usize>(),
        "compiled script"
    );
    Ok(compiled)
}

/// A parse that stopped early fails even when nothing was reported.
fn check_outcome(name: &str, errors: usize, aborted: bool) -> Result<(), ScriptError> {
    if errors == 0 && !aborted {
        return Ok(());
    }
    let message = if errors > 0 {
        format!("{}: compilation failed with {} error(s).", name, errors)
    } else {
        format!("{}: compilation stopped before the end of the script.", name)
    };
    Err(ScriptError::new("COMPILE_FAILED", message))
}

#[cfg(test)]
mod tests;
