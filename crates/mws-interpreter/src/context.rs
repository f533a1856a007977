use mws_core::{ObjectHandle, ScriptError, Value, VarType};

/// Everything a running script can reach outside its own stack.
///
/// Variable access is required. The host queries default to a
/// `CONTEXT_UNSUPPORTED` error so that a context bound to something other
/// than a world object (a console line, a unit test) only implements what
/// it can answer.
pub trait Context {
    fn local(&self, var_type: VarType, index: usize) -> Result<Value, ScriptError>;

    fn set_local(&mut self, var_type: VarType, index: usize, value: Value) -> Result<(), ScriptError>;

    fn global(&self, name: &str) -> Result<Value, ScriptError>;

    fn set_global(&mut self, name: &str, value: Value) -> Result<(), ScriptError>;

    /// Variable `name` of the script attached to object `owner`, or of the
    /// global script `owner` when `global` is set.
    fn member(&mut self, owner: &str, name: &str, global: bool) -> Result<Value, ScriptError>;

    fn set_member(
        &mut self,
        owner: &str,
        name: &str,
        global: bool,
        value: Value,
    ) -> Result<(), ScriptError>;

    fn message_box(&mut self, message: &str, buttons: &[String]) -> Result<(), ScriptError>;

    fn report(&mut self, message: &str) -> Result<(), ScriptError>;

    /// The object an instruction acts on: `explicit` when the call named one,
    /// otherwise the object the script is bound to.
    fn target(&mut self, explicit: Option<ObjectHandle>) -> Result<ObjectHandle, ScriptError>;

    fn object_id(&self, _object: ObjectHandle) -> Result<String, ScriptError> {
        unsupported("object ids")
    }

    fn distance(&self, _from: ObjectHandle, _to: &str) -> Result<f32, ScriptError> {
        unsupported("distance queries")
    }

    fn actor_name(&self, _object: ObjectHandle) -> Result<String, ScriptError> {
        unsupported("actor names")
    }

    fn actor_race(&self, _object: ObjectHandle) -> Result<String, ScriptError> {
        unsupported("actor races")
    }

    fn actor_faction(&self, _object: ObjectHandle) -> Result<Option<String>, ScriptError> {
        unsupported("actor factions")
    }

    fn actor_value(&self, _object: ObjectHandle, _name: &str) -> Result<f32, ScriptError> {
        unsupported("actor values")
    }

    fn set_actor_value(
        &mut self,
        _object: ObjectHandle,
        _name: &str,
        _value: f32,
    ) -> Result<(), ScriptError> {
        unsupported("actor values")
    }

    fn is_disabled(&self, _object: ObjectHandle) -> Result<bool, ScriptError> {
        unsupported("object state")
    }

    fn set_disabled(&mut self, _object: ObjectHandle, _disabled: bool) -> Result<(), ScriptError> {
        unsupported("object state")
    }

    fn position(&self, _object: ObjectHandle) -> Result<[f32; 3], ScriptError> {
        unsupported("positions")
    }

    fn set_position(&mut self, _object: ObjectHandle, _position: [f32; 3]) -> Result<(), ScriptError> {
        unsupported("positions")
    }

    /// Places `count` new copies of object `id` `distance` units away from
    /// `object` in `direction` (0 front, 1 back, 2 left, 3 right).
    fn place_at(
        &mut self,
        _object: ObjectHandle,
        _id: &str,
        _count: i32,
        _distance: f32,
        _direction: i32,
    ) -> Result<(), ScriptError> {
        unsupported("placing objects")
    }

    fn seconds_passed(&self) -> Result<f32, ScriptError> {
        unsupported("frame time")
    }

    fn menu_mode(&self) -> Result<bool, ScriptError> {
        Ok(false)
    }

    fn journal_index(&self, _quest: &str) -> Result<i32, ScriptError> {
        unsupported("the journal")
    }

    fn set_journal_index(&mut self, _quest: &str, _index: i32) -> Result<(), ScriptError> {
        unsupported("the journal")
    }

    fn is_script_running(&self, _name: &str) -> Result<bool, ScriptError> {
        unsupported("global scripts")
    }

    fn start_script(&mut self, _name: &str, _target: Option<ObjectHandle>) -> Result<(), ScriptError> {
        unsupported("global scripts")
    }

    fn stop_script(&mut self, _name: &str) -> Result<(), ScriptError> {
        unsupported("global scripts")
    }

    /// Uniform integer in `0..limit`.
    fn random(&mut self, _limit: i32) -> Result<i32, ScriptError> {
        unsupported("random numbers")
    }
}

pub fn unsupported<T>(what: &str) -> Result<T, ScriptError> {
    Err(ScriptError::new(
        "CONTEXT_UNSUPPORTED",
        format!("This context does not provide {}.", what),
    ))
}
