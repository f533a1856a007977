use mws_compiler::{scan_locals, CompilerContext, Extensions};
use mws_content::{ActorRecord, ContentStore};
use mws_core::{ObjectHandle, ScriptError, Value, VarType};
use mws_interpreter::Context;
use tracing::debug;

use crate::globals::{GlobalScripts, ScriptTarget};
use crate::registry::Registry;
use crate::world::{Output, ScriptLocals, World, WorldObject};

/// Mutable engine state a running script can reach.
pub struct Host<'a> {
    pub world: &'a mut World,
    pub globals: &'a mut GlobalScripts,
    pub content: &'a ContentStore,
    pub registry: &'a Registry,
}

/// Where a script's locals and implicit target come from.
pub enum Binding<'a> {
    /// A local script attached to a placed object.
    Object(ObjectHandle),
    /// A global script tracked in [`GlobalScripts`].
    Global(&'a str),
    /// Console lines and condition scripts own their locals.
    Detached {
        locals: &'a mut ScriptLocals,
        target: Option<ObjectHandle>,
    },
}

pub struct ScriptContext<'a> {
    host: Host<'a>,
    binding: Binding<'a>,
}

impl<'a> ScriptContext<'a> {
    pub fn new(host: Host<'a>, binding: Binding<'a>) -> Self {
        Self { host, binding }
    }

    fn locals(&self) -> Result<&ScriptLocals, ScriptError> {
        match &self.binding {
            Binding::Object(handle) => self
                .host
                .world
                .object(*handle)?
                .locals
                .as_ref()
                .ok_or_else(|| no_locals(&handle.to_string())),
            Binding::Global(name) => self.host.globals.locals_of(*name).ok_or_else(|| no_locals(name)),
            Binding::Detached { locals, .. } => Ok(&**locals),
        }
    }

    fn locals_mut(&mut self) -> Result<&mut ScriptLocals, ScriptError> {
        match &mut self.binding {
            Binding::Object(handle) => self
                .host
                .world
                .object_mut(*handle)?
                .locals
                .as_mut()
                .ok_or_else(|| no_locals(&handle.to_string())),
            Binding::Global(name) => self
                .host
                .globals
                .locals_of_mut(*name)
                .ok_or_else(|| no_locals(name)),
            Binding::Detached { locals, .. } => Ok(&mut **locals),
        }
    }

    /// Locals of the member owner: a placed object by id, or a global script.
    fn owner_locals(&mut self, owner: &str, global: bool) -> Result<&mut ScriptLocals, ScriptError> {
        if global {
            let desc = self
                .host
                .globals
                .ensure(owner, self.host.content, self.host.registry.extensions())?;
            return Ok(&mut desc.locals);
        }
        let handle = self.host.world.find(owner).ok_or_else(|| {
            ScriptError::new("CONTEXT_UNKNOWN_OBJECT", format!("No object with id `{}`.", owner))
        })?;
        self.host
            .world
            .object_mut(handle)?
            .locals
            .as_mut()
            .ok_or_else(|| no_locals(owner))
    }

    fn object(&self, handle: ObjectHandle) -> Result<&WorldObject, ScriptError> {
        self.host.world.object(handle)
    }

    fn actor(&self, handle: ObjectHandle) -> Result<&ActorRecord, ScriptError> {
        let object = self.object(handle)?;
        object.actor.as_ref().ok_or_else(|| {
            ScriptError::new(
                "CONTEXT_NOT_AN_ACTOR",
                format!("Object `{}` is not an actor.", object.id),
            )
        })
    }
}

impl Context for ScriptContext<'_> {
    fn local(&self, var_type: VarType, index: usize) -> Result<Value, ScriptError> {
        self.locals()?.values.get(var_type, index)
    }

    fn set_local(&mut self, var_type: VarType, index: usize, value: Value) -> Result<(), ScriptError> {
        self.locals_mut()?.values.set(var_type, index, value)
    }

    fn global(&self, name: &str) -> Result<Value, ScriptError> {
        self.host.world.global(name)
    }

    fn set_global(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        self.host.world.set_global(name, value)
    }

    fn member(&mut self, owner: &str, name: &str, global: bool) -> Result<Value, ScriptError> {
        self.owner_locals(owner, global)?.get(name)
    }

    fn set_member(&mut self, owner: &str, name: &str, global: bool, value: Value) -> Result<(), ScriptError> {
        self.owner_locals(owner, global)?.set(name, value)
    }

    fn message_box(&mut self, message: &str, buttons: &[String]) -> Result<(), ScriptError> {
        self.host.world.push_output(Output::Message {
            text: message.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }

    fn report(&mut self, message: &str) -> Result<(), ScriptError> {
        self.host.world.push_output(Output::Report {
            text: message.to_string(),
        });
        Ok(())
    }

    fn target(&mut self, explicit: Option<ObjectHandle>) -> Result<ObjectHandle, ScriptError> {
        if let Some(handle) = explicit {
            self.object(handle)?;
            return Ok(handle);
        }
        let implicit = match &self.binding {
            Binding::Object(handle) => Some(*handle),
            Binding::Global(name) => self.host.globals.resolve_target(name, &*self.host.world),
            Binding::Detached { target, .. } => *target,
        };
        implicit.ok_or_else(|| {
            ScriptError::new(
                "CONTEXT_NO_TARGET",
                "The instruction needs an object but the script is not bound to one.",
            )
        })
    }

    fn object_id(&self, object: ObjectHandle) -> Result<String, ScriptError> {
        Ok(self.object(object)?.id.clone())
    }

    fn distance(&self, from: ObjectHandle, to: &str) -> Result<f32, ScriptError> {
        self.host.world.distance(from, to)
    }

    fn actor_name(&self, object: ObjectHandle) -> Result<String, ScriptError> {
        Ok(self.actor(object)?.name.clone())
    }

    fn actor_race(&self, object: ObjectHandle) -> Result<String, ScriptError> {
        Ok(self.actor(object)?.race.clone())
    }

    fn actor_faction(&self, object: ObjectHandle) -> Result<Option<String>, ScriptError> {
        let faction = &self.actor(object)?.faction;
        Ok((!faction.is_empty()).then(|| faction.clone()))
    }

    fn actor_value(&self, object: ObjectHandle, name: &str) -> Result<f32, ScriptError> {
        self.actor(object)?;
        Ok(self
            .object(object)?
            .stats
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or(0.0))
    }

    fn set_actor_value(&mut self, object: ObjectHandle, name: &str, value: f32) -> Result<(), ScriptError> {
        self.actor(object)?;
        self.host
            .world
            .object_mut(object)?
            .stats
            .insert(name.to_ascii_lowercase(), value);
        Ok(())
    }

    fn is_disabled(&self, object: ObjectHandle) -> Result<bool, ScriptError> {
        Ok(self.object(object)?.disabled)
    }

    fn set_disabled(&mut self, object: ObjectHandle, disabled: bool) -> Result<(), ScriptError> {
        self.host.world.object_mut(object)?.disabled = disabled;
        Ok(())
    }

    fn position(&self, object: ObjectHandle) -> Result<[f32; 3], ScriptError> {
        Ok(self.object(object)?.position)
    }

    fn set_position(&mut self, object: ObjectHandle, position: [f32; 3]) -> Result<(), ScriptError> {
        self.host.world.object_mut(object)?.position = position;
        Ok(())
    }

    fn place_at(
        &mut self,
        object: ObjectHandle,
        id: &str,
        count: i32,
        distance: f32,
        direction: i32,
    ) -> Result<(), ScriptError> {
        self.host.world.place_at(object, id, count, distance, direction)?;
        Ok(())
    }

    fn seconds_passed(&self) -> Result<f32, ScriptError> {
        Ok(self.host.world.seconds_passed)
    }

    fn menu_mode(&self) -> Result<bool, ScriptError> {
        Ok(self.host.world.menu_mode)
    }

    fn journal_index(&self, quest: &str) -> Result<i32, ScriptError> {
        Ok(self.host.world.journal(quest))
    }

    fn set_journal_index(&mut self, quest: &str, index: i32) -> Result<(), ScriptError> {
        debug!(quest = %quest, index, "journal updated");
        self.host.world.set_journal(quest, index);
        Ok(())
    }

    fn is_script_running(&self, name: &str) -> Result<bool, ScriptError> {
        Ok(self.host.globals.is_running(name))
    }

    fn start_script(&mut self, name: &str, target: Option<ObjectHandle>) -> Result<(), ScriptError> {
        self.host.globals.add_script(
            name,
            ScriptTarget::Resolved(target),
            self.host.content,
            self.host.registry.extensions(),
        )
    }

    fn stop_script(&mut self, name: &str) -> Result<(), ScriptError> {
        self.host.globals.remove_script(name);
        Ok(())
    }

    fn random(&mut self, limit: i32) -> Result<i32, ScriptError> {
        Ok(self.host.world.random(limit))
    }
}

fn no_locals(owner: &str) -> ScriptError {
    ScriptError::new(
        "CONTEXT_NO_LOCALS",
        format!("`{}` has no script with local variables.", owner),
    )
}

/// Answers the compiler's questions about globals, members and references
/// from the loaded content and the current world.
pub struct CompileContext<'a> {
    pub content: &'a ContentStore,
    pub world: &'a World,
    pub extensions: &'a Extensions,
}

impl CompilerContext for CompileContext<'_> {
    fn global_type(&self, name: &str) -> Option<VarType> {
        self.world.global_type(name)
    }

    fn member_type(&self, name: &str, owner: &str) -> Option<(VarType, bool)> {
        if let Some(handle) = self.world.find(owner) {
            let object = self.world.object(handle).ok()?;
            let locals = object.locals.as_ref()?;
            return locals.declarations.get_type(name).map(|var_type| (var_type, false));
        }
        let script = self.content.script(owner)?;
        scan_locals(&script.source, self.extensions)
            .get_type(name)
            .map(|var_type| (var_type, true))
    }

    fn lookup_reference(&self, name: &str) -> Option<i32> {
        self.world.find(name).map(|handle| handle.0)
    }

    fn is_script(&self, name: &str) -> bool {
        self.content.script(name).is_some()
    }
}
