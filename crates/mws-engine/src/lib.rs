//! Host side of the script system: the world scripts act on, compiled
//! script caching, global scripts, host extensions and condition
//! evaluation, driven one tick at a time by [`Engine`].

pub mod condition;
pub mod context;
pub mod engine;
pub mod extensions;
pub mod globals;
pub mod manager;
pub mod registry;
pub mod rng;
pub mod world;

pub use condition::ConditionEvaluator;
pub use context::{Binding, CompileContext, Host, ScriptContext};
pub use engine::{Engine, EngineOptions};
pub use globals::{GlobalScriptDesc, GlobalScripts, GlobalScriptsSnapshot, ScriptTarget};
pub use manager::{CompileSummary, ScriptManager};
pub use registry::Registry;
pub use world::{Output, ScriptLocals, World, WorldObject};
