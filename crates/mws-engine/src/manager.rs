use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use mws_compiler::{compile_script, CompileOptions, CompilerContext, Diagnostics, Extensions};
use mws_content::ContentStore;
use mws_core::CompiledScript;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::{Binding, CompileContext, Host, ScriptContext};

#[derive(Debug, Clone)]
enum CacheEntry {
    Compiled(Rc<CompiledScript>),
    /// Compilation failed; the script is not retried until invalidated.
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<String>,
}

/// Compiles scripts on first use and keeps the result.
///
/// A script whose execution raises an error has its bytecode cleared so it
/// never runs again before the next reload.
#[derive(Debug, Clone, Default)]
pub struct ScriptManager {
    options: CompileOptions,
    cache: HashMap<String, CacheEntry>,
    quarantined: BTreeSet<String>,
    diagnostics: Diagnostics,
    compile_count: usize,
}

impl ScriptManager {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            diagnostics: Diagnostics::new(options.warnings),
            ..Self::default()
        }
    }

    /// The compiled script `name`, compiling it on a cache miss. The
    /// diagnostics then hold only the messages of that compilation.
    pub fn fetch(
        &mut self,
        name: &str,
        content: &ContentStore,
        extensions: &Extensions,
        context: &dyn CompilerContext,
    ) -> Option<Rc<CompiledScript>> {
        self.lookup(name, content, extensions, context, true)
    }

    fn lookup(
        &mut self,
        name: &str,
        content: &ContentStore,
        extensions: &Extensions,
        context: &dyn CompilerContext,
        fresh_diagnostics: bool,
    ) -> Option<Rc<CompiledScript>> {
        let key = name.to_ascii_lowercase();
        if let Some(entry) = self.cache.get(&key) {
            return match entry {
                CacheEntry::Compiled(script) => Some(Rc::clone(script)),
                CacheEntry::Failed => None,
            };
        }

        let entry = match content.script(&key) {
            None => {
                error!(script = %name, "script does not exist");
                CacheEntry::Failed
            }
            Some(record) => {
                if fresh_diagnostics {
                    self.diagnostics.reset();
                }
                self.compile_count += 1;
                match compile_script(
                    &key,
                    &record.source,
                    extensions,
                    context,
                    self.options,
                    &mut self.diagnostics,
                ) {
                    Ok(script) => CacheEntry::Compiled(Rc::new(script)),
                    Err(compile_error) => {
                        warn!(script = %name, "{}", compile_error);
                        CacheEntry::Failed
                    }
                }
            }
        };
        let script = match &entry {
            CacheEntry::Compiled(script) => Some(Rc::clone(script)),
            CacheEntry::Failed => None,
        };
        self.cache.insert(key, entry);
        script
    }

    /// Runs the default block of `name`. Returns false when the script could
    /// not be compiled or failed while running; a script without code counts
    /// as executed.
    pub fn run(&mut self, name: &str, host: Host<'_>, binding: Binding<'_>) -> bool {
        let registry = host.registry;
        let script = {
            let context = CompileContext {
                content: host.content,
                world: &*host.world,
                extensions: registry.extensions(),
            };
            self.fetch(name, host.content, registry.extensions(), &context)
        };
        let Some(script) = script else {
            return false;
        };
        let Some(block) = script.default_block() else {
            return true;
        };
        if block.code.is_empty() {
            return true;
        }

        let mut context = ScriptContext::new(host, binding);
        match registry
            .interpreter()
            .run(&block.code, &script.literals, &mut context)
        {
            Ok(()) => true,
            Err(run_error) => {
                error!(script = %name, code = %run_error.code, "{}", run_error.message);
                self.quarantine(name);
                false
            }
        }
    }

    /// Clears the bytecode of `name` so it does nothing from now on.
    pub fn quarantine(&mut self, name: &str) {
        let key = name.to_ascii_lowercase();
        if let Some(CacheEntry::Compiled(script)) = self.cache.get_mut(&key) {
            Rc::make_mut(script).deactivate(None);
        }
        self.quarantined.insert(key);
    }

    pub fn is_quarantined(&self, name: &str) -> bool {
        self.quarantined.contains(&name.to_ascii_lowercase())
    }

    /// Compiles every script of `content` that is not cached yet. The
    /// diagnostics then hold the messages of this batch only.
    pub fn compile_all(
        &mut self,
        content: &ContentStore,
        extensions: &Extensions,
        context: &dyn CompilerContext,
    ) -> CompileSummary {
        self.diagnostics.reset();
        let mut summary = CompileSummary::default();
        for name in content.scripts.keys() {
            summary.total += 1;
            if self.lookup(name, content, extensions, context, false).is_some() {
                summary.succeeded += 1;
            } else {
                summary.failed.push(name.clone());
            }
        }
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "compiled all scripts"
        );
        summary
    }

    /// Drops the cached result for `name` so the next use recompiles it.
    pub fn invalidate(&mut self, name: &str) {
        let key = name.to_ascii_lowercase();
        self.cache.remove(&key);
        self.quarantined.remove(&key);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.quarantined.clear();
        self.diagnostics.reset();
    }

    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
