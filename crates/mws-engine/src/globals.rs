use std::collections::BTreeMap;

use mws_compiler::{scan_locals, Extensions};
use mws_content::ContentStore;
use mws_core::{LocalValues, ObjectHandle, ScriptError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::{Binding, Host};
use crate::manager::ScriptManager;
use crate::registry::Registry;
use crate::world::{ScriptLocals, World};

/// The object a global script acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptTarget {
    Resolved(Option<ObjectHandle>),
    /// Looked up by object id on first use, then kept as `Resolved`.
    Deferred { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalScriptDesc {
    pub running: bool,
    pub locals: ScriptLocals,
    pub target: ScriptTarget,
}

/// Scripts that are not attached to an object, keyed by lower-case name.
/// Stopping a script keeps its locals for the next start.
#[derive(Debug, Clone, Default)]
pub struct GlobalScripts {
    scripts: BTreeMap<String, GlobalScriptDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalScriptsSnapshot {
    pub scripts: Vec<GlobalScriptState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalScriptState {
    pub name: String,
    pub running: bool,
    pub target: ScriptTarget,
    pub locals: LocalValues,
}

impl GlobalScripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `name`. An untracked script gets locals sized from its
    /// declarations; a stopped one resumes with its old locals and the new
    /// target. Starting a running script does nothing.
    pub fn add_script(
        &mut self,
        name: &str,
        target: ScriptTarget,
        content: &ContentStore,
        extensions: &Extensions,
    ) -> Result<(), ScriptError> {
        let desc = self.ensure(name, content, extensions)?;
        if !desc.running {
            desc.running = true;
            desc.target = target;
            debug!(script = %name, "global script started");
        }
        Ok(())
    }

    pub fn remove_script(&mut self, name: &str) {
        if let Some(desc) = self.scripts.get_mut(&name.to_ascii_lowercase()) {
            if desc.running {
                debug!(script = %name, "global script stopped");
            }
            desc.running = false;
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.scripts
            .get(&name.to_ascii_lowercase())
            .is_some_and(|desc| desc.running)
    }

    pub fn running(&self) -> Vec<String> {
        self.scripts
            .iter()
            .filter(|(_, desc)| desc.running)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&GlobalScriptDesc> {
        self.scripts.get(&name.to_ascii_lowercase())
    }

    pub fn locals_of(&self, name: &str) -> Option<&ScriptLocals> {
        self.get(name).map(|desc| &desc.locals)
    }

    pub fn locals_of_mut(&mut self, name: &str) -> Option<&mut ScriptLocals> {
        self.scripts
            .get_mut(&name.to_ascii_lowercase())
            .map(|desc| &mut desc.locals)
    }

    /// The entry for `name`, configured but not running when it was not
    /// tracked yet. Member access to a never-started script goes through here.
    pub fn ensure(
        &mut self,
        name: &str,
        content: &ContentStore,
        extensions: &Extensions,
    ) -> Result<&mut GlobalScriptDesc, ScriptError> {
        let key = name.to_ascii_lowercase();
        if !self.scripts.contains_key(&key) {
            let record = content.script(&key).ok_or_else(|| {
                ScriptError::new("ENGINE_UNKNOWN_SCRIPT", format!("Script `{}` does not exist.", name))
            })?;
            let desc = GlobalScriptDesc {
                running: false,
                locals: ScriptLocals::new(scan_locals(&record.source, extensions)),
                target: ScriptTarget::Resolved(None),
            };
            self.scripts.insert(key.clone(), desc);
        }
        self.scripts.get_mut(&key).ok_or_else(|| {
            ScriptError::new("ENGINE_UNKNOWN_SCRIPT", format!("Script `{}` is not tracked.", name))
        })
    }

    /// Handle of the object `name` acts on. A deferred target is looked up
    /// on first use and the outcome, object or none, is kept from then on.
    pub fn resolve_target(&mut self, name: &str, world: &World) -> Option<ObjectHandle> {
        let desc = self.scripts.get_mut(&name.to_ascii_lowercase())?;
        match &desc.target {
            ScriptTarget::Resolved(handle) => *handle,
            ScriptTarget::Deferred { id } => {
                let handle = world.find(id);
                if handle.is_none() {
                    warn!(script = %name, id = %id, "global script target does not exist");
                }
                desc.target = ScriptTarget::Resolved(handle);
                handle
            }
        }
    }

    pub fn clear(&mut self) {
        self.scripts.clear();
    }

    /// Runs every running script once. A script whose execution fails is
    /// stopped and stays stopped.
    pub fn run(
        &mut self,
        world: &mut World,
        manager: &mut ScriptManager,
        content: &ContentStore,
        registry: &Registry,
    ) {
        for name in self.running() {
            // An earlier script this tick may have stopped it.
            if !self.is_running(&name) {
                continue;
            }
            let host = Host {
                world: &mut *world,
                globals: &mut *self,
                content,
                registry,
            };
            if !manager.run(&name, host, Binding::Global(&name)) {
                warn!(script = %name, "global script disabled after a failed run");
                self.remove_script(&name);
            }
        }
    }

    pub fn snapshot(&self) -> GlobalScriptsSnapshot {
        GlobalScriptsSnapshot {
            scripts: self
                .scripts
                .iter()
                .map(|(name, desc)| GlobalScriptState {
                    name: name.clone(),
                    running: desc.running,
                    target: desc.target.clone(),
                    locals: desc.locals.values.clone(),
                })
                .collect(),
        }
    }

    /// Replaces the tracked scripts with `snapshot`. Declarations come from
    /// the current content; saved values whose shape no longer matches them
    /// are dropped in favor of fresh ones.
    pub fn restore(
        &mut self,
        snapshot: &GlobalScriptsSnapshot,
        content: &ContentStore,
        extensions: &Extensions,
    ) -> Result<(), ScriptError> {
        let mut scripts = BTreeMap::new();
        for state in &snapshot.scripts {
            let record = content.script(&state.name).ok_or_else(|| {
                ScriptError::new(
                    "ENGINE_SNAPSHOT_MISMATCH",
                    format!("Snapshot names script `{}` which does not exist.", state.name),
                )
            })?;
            let mut locals = ScriptLocals::new(scan_locals(&record.source, extensions));
            if same_shape(&locals.values, &state.locals) {
                locals.values = state.locals.clone();
            } else {
                warn!(script = %state.name, "saved locals no longer match the declarations");
            }
            scripts.insert(
                state.name.to_ascii_lowercase(),
                GlobalScriptDesc {
                    running: state.running,
                    locals,
                    target: state.target.clone(),
                },
            );
        }
        self.scripts = scripts;
        Ok(())
    }
}

fn same_shape(left: &LocalValues, right: &LocalValues) -> bool {
    left.shorts.len() == right.shorts.len()
        && left.longs.len() == right.longs.len()
        && left.floats.len() == right.floats.len()
        && left.refs.len() == right.refs.len()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use mws_core::Value;

    const CONTENT: &str = r#"<content>
  <script name="counter"><![CDATA[short count
set count to count + 1]]></script>
  <reference handle="2" id="chest" x="0" y="0" z="0"/>
</content>"#;

    fn content() -> ContentStore {
        ContentStore::load_xml_map(&BTreeMap::from([("a.xml".to_string(), CONTENT.to_string())]))
            .expect("content")
    }

    #[test]
    fn stopping_keeps_locals_for_the_next_start() {
        let content = content();
        let extensions = Extensions::new();
        let mut scripts = GlobalScripts::new();
        scripts
            .add_script("Counter", ScriptTarget::Resolved(None), &content, &extensions)
            .expect("start");
        assert!(scripts.is_running("counter"));
        scripts
            .locals_of_mut("counter")
            .expect("locals")
            .set("count", Value::Integer(4))
            .expect("set");

        scripts.remove_script("counter");
        assert!(!scripts.is_running("counter"));
        scripts
            .add_script("counter", ScriptTarget::Resolved(Some(ObjectHandle(2))), &content, &extensions)
            .expect("restart");
        let desc = scripts.get("counter").expect("tracked");
        assert_eq!(desc.locals.get("count").expect("count"), Value::Integer(4));
        assert_eq!(desc.target, ScriptTarget::Resolved(Some(ObjectHandle(2))));
    }

    #[test]
    fn unknown_scripts_are_rejected() {
        let error = GlobalScripts::new()
            .add_script("missing", ScriptTarget::Resolved(None), &content(), &Extensions::new())
            .expect_err("missing");
        assert_eq!(error.code, "ENGINE_UNKNOWN_SCRIPT");
    }

    #[test]
    fn deferred_targets_resolve_once() {
        let content = content();
        let extensions = Extensions::new();
        let world = World::from_content(&content, &extensions, 0);
        let mut scripts = GlobalScripts::new();
        let target = ScriptTarget::Deferred { id: "Chest".to_string() };
        scripts.add_script("counter", target, &content, &extensions).expect("start");
        assert_eq!(scripts.resolve_target("counter", &world), Some(ObjectHandle(2)));
        assert_eq!(
            scripts.get("counter").expect("tracked").target,
            ScriptTarget::Resolved(Some(ObjectHandle(2)))
        );
    }

    #[test]
    fn missing_deferred_target_resolves_to_no_object_once() {
        let content = content();
        let extensions = Extensions::new();
        let mut world = World::from_content(&content, &extensions, 0);
        let mut scripts = GlobalScripts::new();
        let target = ScriptTarget::Deferred { id: "ghost".to_string() };
        scripts.add_script("counter", target, &content, &extensions).expect("start");
        assert_eq!(scripts.resolve_target("counter", &world), None);
        assert_eq!(scripts.get("counter").expect("tracked").target, ScriptTarget::Resolved(None));

        // A matching object appearing later does not change the outcome.
        world.object_mut(ObjectHandle(2)).expect("chest").id = "ghost".to_string();
        assert_eq!(scripts.resolve_target("counter", &world), None);
    }

    #[test]
    fn snapshot_restores_running_flags_and_locals() {
        let content = content();
        let extensions = Extensions::new();
        let mut scripts = GlobalScripts::new();
        scripts
            .add_script("counter", ScriptTarget::Resolved(None), &content, &extensions)
            .expect("start");
        scripts
            .locals_of_mut("counter")
            .expect("locals")
            .set("count", Value::Integer(9))
            .expect("set");
        let snapshot = scripts.snapshot();

        let mut restored = GlobalScripts::new();
        restored.restore(&snapshot, &content, &extensions).expect("restore");
        assert!(restored.is_running("counter"));
        assert_eq!(
            restored.locals_of("counter").expect("locals").get("count").expect("count"),
            Value::Integer(9)
        );
    }
}
