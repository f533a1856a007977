//! In-memory host world: global variables, placed objects, the journal and
//! the output queue scripts write to.

use std::collections::BTreeMap;

use mws_compiler::{scan_locals, Extensions};
use mws_content::{ActorRecord, ContentStore};
use mws_core::{coerce_to, LocalValues, Locals, ObjectHandle, ScriptError, Value, VarType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rng::Rng;

/// Declarations and values of one script instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptLocals {
    pub declarations: Locals,
    pub values: LocalValues,
}

impl ScriptLocals {
    pub fn new(declarations: Locals) -> Self {
        Self {
            values: LocalValues::configure(&declarations),
            declarations,
        }
    }

    pub fn get(&self, name: &str) -> Result<Value, ScriptError> {
        self.values.get_named(&self.declarations, name)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        self.values.set_named(&self.declarations, name, value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub handle: ObjectHandle,
    pub id: String,
    pub script: Option<String>,
    pub position: [f32; 3],
    pub disabled: bool,
    pub actor: Option<ActorRecord>,
    pub stats: BTreeMap<String, f32>,
    /// Present when the attached script exists.
    pub locals: Option<ScriptLocals>,
}

/// Something a script showed to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Output {
    Message { text: String, buttons: Vec<String> },
    Report { text: String },
}

#[derive(Debug, Clone)]
pub struct World {
    globals: BTreeMap<String, (VarType, Value)>,
    objects: BTreeMap<ObjectHandle, WorldObject>,
    journal: BTreeMap<String, i32>,
    pub seconds_passed: f32,
    pub menu_mode: bool,
    output: Vec<Output>,
    rng: Rng,
    next_handle: i32,
}

impl World {
    pub fn from_content(content: &ContentStore, extensions: &Extensions, seed: u32) -> Self {
        let globals = content
            .globals
            .values()
            .map(|record| {
                let value = coerce_to(record.var_type, Value::Float(record.value));
                (record.name.clone(), (record.var_type, value))
            })
            .collect();

        let objects = content
            .references
            .values()
            .map(|record| {
                let locals = record.script.as_deref().and_then(|name| match content.script(name) {
                    Some(script) => Some(ScriptLocals::new(scan_locals(&script.source, extensions))),
                    None => {
                        warn!(object = %record.id, script = %name, "attached script does not exist");
                        None
                    }
                });
                let object = WorldObject {
                    handle: record.handle,
                    id: record.id.clone(),
                    script: record.script.clone(),
                    position: record.position,
                    disabled: record.disabled,
                    actor: record.actor.clone(),
                    stats: record.stats.clone(),
                    locals,
                };
                (record.handle, object)
            })
            .collect::<BTreeMap<_, _>>();

        let next_handle = objects.keys().map(|handle| handle.0).max().unwrap_or(0) + 1;
        debug!(globals = content.globals.len(), objects = objects.len(), "world populated");
        Self {
            globals,
            objects,
            journal: BTreeMap::new(),
            seconds_passed: 0.0,
            menu_mode: false,
            output: Vec::new(),
            rng: Rng::new(seed),
            next_handle,
        }
    }

    pub fn global_type(&self, name: &str) -> Option<VarType> {
        self.globals.get(&name.to_ascii_lowercase()).map(|(var_type, _)| *var_type)
    }

    pub fn global(&self, name: &str) -> Result<Value, ScriptError> {
        self.globals
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| *value)
            .ok_or_else(|| unknown_global(name))
    }

    /// Stores `value` converted to the global's declared type.
    pub fn set_global(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        let (var_type, slot) = self
            .globals
            .get_mut(&name.to_ascii_lowercase())
            .ok_or_else(|| unknown_global(name))?;
        *slot = coerce_to(*var_type, value);
        Ok(())
    }

    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    pub fn object(&self, handle: ObjectHandle) -> Result<&WorldObject, ScriptError> {
        self.objects.get(&handle).ok_or_else(|| unknown_object(handle))
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> Result<&mut WorldObject, ScriptError> {
        self.objects.get_mut(&handle).ok_or_else(|| unknown_object(handle))
    }

    /// First placed object with `id`. Copies placed at runtime come after the
    /// content references.
    pub fn find(&self, id: &str) -> Option<ObjectHandle> {
        self.objects
            .values()
            .find(|object| object.id.eq_ignore_ascii_case(id))
            .map(|object| object.handle)
    }

    pub fn distance(&self, from: ObjectHandle, to: &str) -> Result<f32, ScriptError> {
        let to = self
            .find(to)
            .ok_or_else(|| ScriptError::new("CONTEXT_UNKNOWN_OBJECT", format!("No object with id `{}`.", to)))?;
        let [ax, ay, az] = self.object(from)?.position;
        let [bx, by, bz] = self.object(to)?.position;
        Ok(((ax - bx).powi(2) + (ay - by).powi(2) + (az - bz).powi(2)).sqrt())
    }

    /// Places `count` copies of the object `id` around `near`. Directions are
    /// 0 front (+y), 1 back, 2 left (-x) and 3 right.
    pub fn place_at(
        &mut self,
        near: ObjectHandle,
        id: &str,
        count: i32,
        distance: f32,
        direction: i32,
    ) -> Result<Vec<ObjectHandle>, ScriptError> {
        let offset = match direction {
            0 => [0.0, distance, 0.0],
            1 => [0.0, -distance, 0.0],
            2 => [-distance, 0.0, 0.0],
            3 => [distance, 0.0, 0.0],
            other => {
                return Err(ScriptError::new(
                    "RUNTIME_INVALID_ARGUMENT",
                    format!("Placement direction {} is not one of 0..=3.", other),
                ))
            }
        };
        let template = self
            .find(id)
            .ok_or_else(|| ScriptError::new("CONTEXT_UNKNOWN_OBJECT", format!("No object with id `{}` to copy.", id)))?;
        let template = self.object(template)?.clone();
        let origin = self.object(near)?.position;

        let mut placed = Vec::new();
        for _ in 0..count.max(0) {
            let handle = ObjectHandle(self.next_handle);
            self.next_handle += 1;
            let object = WorldObject {
                handle,
                position: [origin[0] + offset[0], origin[1] + offset[1], origin[2] + offset[2]],
                disabled: false,
                locals: template
                    .locals
                    .as_ref()
                    .map(|locals| ScriptLocals::new(locals.declarations.clone())),
                ..template.clone()
            };
            self.objects.insert(handle, object);
            placed.push(handle);
        }
        debug!(id = %id, count = placed.len(), "placed objects");
        Ok(placed)
    }

    pub fn journal(&self, quest: &str) -> i32 {
        self.journal.get(&quest.to_ascii_lowercase()).copied().unwrap_or(0)
    }

    pub fn set_journal(&mut self, quest: &str, index: i32) {
        self.journal.insert(quest.to_ascii_lowercase(), index);
    }

    /// Uniform integer in `0..limit`; zero when `limit` is not positive.
    pub fn random(&mut self, limit: i32) -> i32 {
        if limit <= 0 {
            return 0;
        }
        self.rng.below(limit.unsigned_abs()) as i32
    }

    pub fn push_output(&mut self, output: Output) {
        self.output.push(output);
    }

    pub fn take_output(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.output)
    }
}

fn unknown_global(name: &str) -> ScriptError {
    ScriptError::new("CONTEXT_UNKNOWN_GLOBAL", format!("Global variable `{}` is not declared.", name))
}

fn unknown_object(handle: ObjectHandle) -> ScriptError {
    ScriptError::new("CONTEXT_UNKNOWN_OBJECT", format!("No object with handle {}.", handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"<content>
  <global name="Gold" type="short" value="10.7"/>
  <script name="guard"><![CDATA[short alerted
float timer]]></script>
  <reference handle="3" id="guard" script="guard" x="0" y="0" z="0"/>
  <reference handle="4" id="crate" x="3" y="4" z="0"/>
</content>"#;

    fn world() -> World {
        let content = ContentStore::load_xml_map(&BTreeMap::from([("a.xml".to_string(), CONTENT.to_string())]))
            .expect("content");
        World::from_content(&content, &Extensions::new(), 1)
    }

    #[test]
    fn globals_keep_their_declared_type() {
        let mut world = world();
        assert_eq!(world.global("gold").expect("gold"), Value::Integer(10));
        world.set_global("GOLD", Value::Float(3.9)).expect("set");
        assert_eq!(world.global("gold").expect("gold"), Value::Integer(3));
        let error = world.global("silver").expect_err("unknown");
        assert_eq!(error.code, "CONTEXT_UNKNOWN_GLOBAL");
    }

    #[test]
    fn objects_get_locals_from_their_script() {
        let world = world();
        let guard = world.object(ObjectHandle(3)).expect("guard");
        let locals = guard.locals.as_ref().expect("locals");
        assert_eq!(locals.get("timer").expect("timer"), Value::Float(0.0));
        assert!(world.object(ObjectHandle(4)).expect("crate").locals.is_none());
        assert_eq!(world.distance(ObjectHandle(3), "crate").expect("distance"), 5.0);
    }

    #[test]
    fn placed_copies_get_fresh_handles_and_locals() {
        let mut world = world();
        world
            .object_mut(ObjectHandle(3))
            .expect("guard")
            .locals
            .as_mut()
            .expect("locals")
            .set("alerted", Value::Integer(1))
            .expect("set");
        let placed = world.place_at(ObjectHandle(4), "guard", 2, 10.0, 3).expect("place");
        assert_eq!(placed, vec![ObjectHandle(5), ObjectHandle(6)]);
        let copy = world.object(ObjectHandle(5)).expect("copy");
        assert_eq!(copy.position, [13.0, 4.0, 0.0]);
        assert_eq!(copy.locals.as_ref().expect("locals").get("alerted").expect("alerted"), Value::Integer(0));
        assert_eq!(world.find("guard"), Some(ObjectHandle(3)));
        assert!(world.place_at(ObjectHandle(4), "guard", 1, 1.0, 9).is_err());
    }
}
