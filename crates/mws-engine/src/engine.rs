use mws_compiler::{compile_script, CompileOptions, Diagnostics, WarningsMode};
use mws_content::{ConditionRecord, ContentStore, InfoRecord};
use mws_core::{CompiledScript, ObjectHandle, ScriptError};
use tracing::{debug, info, warn};

use crate::condition::ConditionEvaluator;
use crate::context::{Binding, CompileContext, Host, ScriptContext};
use crate::globals::{GlobalScripts, GlobalScriptsSnapshot, ScriptTarget};
use crate::manager::{CompileSummary, ScriptManager};
use crate::registry::Registry;
use crate::world::{Output, ScriptLocals, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub warnings: WarningsMode,
    pub random_seed: u32,
    /// Start the content's startup scripts when the engine is created.
    pub startup_scripts: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            warnings: WarningsMode::Normal,
            random_seed: 0,
            startup_scripts: true,
        }
    }
}

/// Loaded content plus everything needed to run its scripts.
pub struct Engine {
    content: ContentStore,
    registry: Registry,
    world: World,
    globals: GlobalScripts,
    manager: ScriptManager,
    options: EngineOptions,
}

impl Engine {
    pub fn new(content: ContentStore, options: EngineOptions) -> Result<Self, ScriptError> {
        let registry = Registry::new()?;
        let world = World::from_content(&content, registry.extensions(), options.random_seed);
        let manager = ScriptManager::new(CompileOptions {
            warnings: options.warnings,
            console: false,
        });
        let mut engine = Self {
            content,
            registry,
            world,
            globals: GlobalScripts::new(),
            manager,
            options,
        };
        if options.startup_scripts {
            engine.start_startup_scripts();
        }
        Ok(engine)
    }

    fn start_startup_scripts(&mut self) {
        for name in self.content.startup.clone() {
            let started = self.globals.add_script(
                &name,
                ScriptTarget::Resolved(None),
                &self.content,
                self.registry.extensions(),
            );
            if let Err(error) = started {
                warn!(script = %name, "startup script not started: {}", error);
            }
        }
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn globals(&self) -> &GlobalScripts {
        &self.globals
    }

    pub fn manager(&self) -> &ScriptManager {
        &self.manager
    }

    /// Advances the world by one frame: the scripts of enabled objects run
    /// first, then every running global script.
    pub fn tick(&mut self, seconds: f32) {
        self.world.seconds_passed = seconds;
        let local_scripts = self
            .world
            .objects()
            .filter(|object| !object.disabled)
            .filter_map(|object| object.script.clone().map(|script| (object.handle, script)))
            .collect::<Vec<_>>();

        for (handle, script) in local_scripts {
            // Earlier scripts this frame may have disabled the object.
            if self.world.object(handle).map_or(true, |object| object.disabled) {
                continue;
            }
            let host = Host {
                world: &mut self.world,
                globals: &mut self.globals,
                content: &self.content,
                registry: &self.registry,
            };
            if !self.manager.run(&script, host, Binding::Object(handle)) {
                debug!(script = %script, object = %handle, "local script did not run");
            }
        }

        self.globals
            .run(&mut self.world, &mut self.manager, &self.content, &self.registry);
    }

    /// Starts a global script, optionally bound to the object with id `target`.
    pub fn start_script(&mut self, name: &str, target: Option<&str>) -> Result<(), ScriptError> {
        let target = match target {
            Some(id) => ScriptTarget::Deferred { id: id.to_ascii_lowercase() },
            None => ScriptTarget::Resolved(None),
        };
        self.globals
            .add_script(name, target, &self.content, self.registry.extensions())
    }

    pub fn stop_script(&mut self, name: &str) {
        self.globals.remove_script(name);
    }

    /// Compiles `name` through the cache.
    pub fn compile(&mut self, name: &str) -> Result<CompiledScript, ScriptError> {
        let context = CompileContext {
            content: &self.content,
            world: &self.world,
            extensions: self.registry.extensions(),
        };
        self.manager
            .fetch(name, &self.content, self.registry.extensions(), &context)
            .map(|script| script.as_ref().clone())
            .ok_or_else(|| {
                ScriptError::new(
                    "ENGINE_COMPILE_FAILED",
                    format!("Script `{}` is missing or does not compile.", name),
                )
            })
    }

    pub fn compile_all(&mut self) -> CompileSummary {
        let context = CompileContext {
            content: &self.content,
            world: &self.world,
            extensions: self.registry.extensions(),
        };
        self.manager
            .compile_all(&self.content, self.registry.extensions(), &context)
    }

    /// Compiles and runs one console line. Bare expressions are reported;
    /// instructions act on `target` when one is given.
    pub fn eval(&mut self, source: &str, target: Option<&str>) -> Result<(), ScriptError> {
        let target = match target {
            Some(id) => Some(self.world.find(id).ok_or_else(|| {
                ScriptError::new("ENGINE_UNKNOWN_OBJECT", format!("No object with id `{}`.", id))
            })?),
            None => None,
        };

        let mut diagnostics = Diagnostics::new(self.options.warnings);
        let compiled = {
            let context = CompileContext {
                content: &self.content,
                world: &self.world,
                extensions: self.registry.extensions(),
            };
            let options = CompileOptions {
                warnings: self.options.warnings,
                console: true,
            };
            compile_script("console", source, self.registry.extensions(), &context, options, &mut diagnostics)
        };
        let compiled = compiled.map_err(|error| {
            let details = diagnostics
                .errors()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            ScriptError::new(error.code, format!("{} {}", error.message, details))
        })?;
        let Some(block) = compiled.default_block() else {
            return Ok(());
        };

        let mut locals = ScriptLocals::new(compiled.locals.clone());
        let host = Host {
            world: &mut self.world,
            globals: &mut self.globals,
            content: &self.content,
            registry: &self.registry,
        };
        let mut context = ScriptContext::new(
            host,
            Binding::Detached {
                locals: &mut locals,
                target,
            },
        );
        self.registry
            .interpreter()
            .run(&block.code, &compiled.literals, &mut context)
    }

    fn conditions(&mut self) -> ConditionEvaluator<'_> {
        ConditionEvaluator {
            registry: &self.registry,
            content: &self.content,
            world: &mut self.world,
            globals: &mut self.globals,
        }
    }

    pub fn evaluate_conditions(
        &mut self,
        conditions: &[ConditionRecord],
        subject: ObjectHandle,
        target: Option<ObjectHandle>,
    ) -> Result<bool, ScriptError> {
        self.conditions().evaluate(conditions, subject, target)
    }

    /// Ids of the entries of `topic` whose conditions pass for `subject`.
    pub fn filter_topic(
        &mut self,
        topic: &str,
        subject: ObjectHandle,
        target: Option<ObjectHandle>,
    ) -> Result<Vec<InfoRecord>, ScriptError> {
        let passing = self.conditions().filter_topic(topic, subject, target)?;
        Ok(passing.into_iter().cloned().collect())
    }

    pub fn take_output(&mut self) -> Vec<Output> {
        self.world.take_output()
    }

    pub fn snapshot(&self) -> GlobalScriptsSnapshot {
        self.globals.snapshot()
    }

    pub fn restore(&mut self, snapshot: &GlobalScriptsSnapshot) -> Result<(), ScriptError> {
        self.globals
            .restore(snapshot, &self.content, self.registry.extensions())
    }

    /// Replaces the content. Caches, the world and global scripts start over.
    pub fn reload(&mut self, content: ContentStore) {
        self.content = content;
        self.world = World::from_content(&self.content, self.registry.extensions(), self.options.random_seed);
        self.globals.clear();
        self.manager.clear();
        if self.options.startup_scripts {
            self.start_startup_scripts();
        }
        info!(scripts = self.content.scripts.len(), "content reloaded");
    }
}
