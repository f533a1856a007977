use mws_compiler::Diagnostic;
use mws_content::InfoRecord;
use mws_core::CompiledScript;
use mws_engine::{CompileSummary, GlobalScriptsSnapshot, Output};
use serde::{Deserialize, Serialize};

pub(crate) const RUN_STATE_SCHEMA: &str = "mws-run-state.v1";

/// What `run` saves between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunState {
    pub(crate) schema_version: String,
    pub(crate) content_dir: String,
    pub(crate) snapshot: GlobalScriptsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub(crate) enum CommandReport {
    Compile {
        summary: CompileSummary,
        diagnostics: Vec<Diagnostic>,
    },
    Dump {
        script: CompiledScript,
    },
    Run {
        ticks: u32,
        output: Vec<Output>,
        running: Vec<String>,
        state_out: Option<String>,
    },
    Eval {
        output: Vec<Output>,
    },
    Dialogue {
        topic: String,
        entries: Vec<InfoRecord>,
    },
}

impl CommandReport {
    /// Exit code of a successful command: compiling fails when any script did.
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            CommandReport::Compile { summary, .. } if !summary.failed.is_empty() => 2,
            _ => 0,
        }
    }
}
