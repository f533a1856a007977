use std::fs;
use std::path::Path;

use mws_core::ScriptError;

use crate::{
    map_cli_state_invalid, map_cli_state_read, map_cli_state_write, RunState, RUN_STATE_SCHEMA,
};

pub(crate) fn save_run_state(path: &Path, state: &RunState) -> Result<(), ScriptError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(map_cli_state_write)?;

    let payload = serde_json::to_string(state).map_err(map_cli_state_invalid)?;
    fs::write(path, payload).map_err(map_cli_state_write)
}

pub(crate) fn load_run_state(path: &Path) -> Result<RunState, ScriptError> {
    if !path.exists() {
        return Err(ScriptError::new(
            "CLI_STATE_NOT_FOUND",
            format!("State file does not exist: {}", path.display()),
        ));
    }

    let raw = fs::read_to_string(path).map_err(map_cli_state_read)?;
    let state: RunState = serde_json::from_str(&raw).map_err(map_cli_state_invalid)?;

    if state.schema_version != RUN_STATE_SCHEMA {
        return Err(ScriptError::new(
            "CLI_STATE_SCHEMA",
            format!("Unsupported run state schema: {}", state.schema_version),
        ));
    }

    Ok(state)
}
