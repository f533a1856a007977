use mws_core::ScriptError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> ScriptError {
    ScriptError::new(code, error.to_string())
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn emit_error(error: ScriptError, json: bool) -> i32 {
    if json {
        let document = serde_json::json!({
            "result": "error",
            "code": error.code,
            "message": error.message,
        });
        println!("{}", document);
    } else {
        println!("RESULT:ERROR");
        println!("ERROR_CODE:{}", error.code);
        println!("ERROR_MSG_JSON:{}", json_string(&error.message));
    }
    1
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> ScriptError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> ScriptError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> ScriptError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> ScriptError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> ScriptError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> ScriptError {
    map_error("CLI_STATE_INVALID", error)
}

pub(crate) fn map_cli_output(error: serde_json::Error) -> ScriptError {
    map_error("CLI_OUTPUT", error)
}
