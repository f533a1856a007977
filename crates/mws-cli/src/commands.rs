use std::path::{Path, PathBuf};

use mws_core::{ObjectHandle, ScriptError};
use mws_engine::{Engine, EngineOptions};
use tracing::{info, warn};

use crate::{
    load_content_dir, load_run_state, save_run_state, CommandReport, DialogueArgs, DumpArgs,
    EvalArgs, GlobalArgs, RunArgs, RunState, RUN_STATE_SCHEMA,
};

pub(crate) struct Session {
    pub(crate) content_dir: PathBuf,
    pub(crate) engine: Engine,
}

pub(crate) fn open_session(global: &GlobalArgs, startup_scripts: bool) -> Result<Session, ScriptError> {
    let (content_dir, content) = load_content_dir(&global.content_dir)?;
    let engine = Engine::new(
        content,
        EngineOptions {
            warnings: global.warnings.into(),
            random_seed: global.seed,
            startup_scripts,
        },
    )?;
    Ok(Session {
        content_dir,
        engine,
    })
}

pub(crate) fn run_compile(global: &GlobalArgs) -> Result<CommandReport, ScriptError> {
    let mut session = open_session(global, false)?;
    let summary = session.engine.compile_all();
    let diagnostics = session.engine.manager().diagnostics().entries().to_vec();
    Ok(CommandReport::Compile {
        summary,
        diagnostics,
    })
}

pub(crate) fn run_dump(global: &GlobalArgs, args: DumpArgs) -> Result<CommandReport, ScriptError> {
    let mut session = open_session(global, false)?;
    let script = session.engine.compile(&args.script)?;
    Ok(CommandReport::Dump { script })
}

pub(crate) fn run_ticks(global: &GlobalArgs, args: RunArgs) -> Result<CommandReport, ScriptError> {
    let resumed = args
        .state_in
        .as_deref()
        .map(|path| load_run_state(Path::new(path)))
        .transpose()?;
    let mut session = open_session(global, resumed.is_none())?;

    if let Some(state) = resumed {
        let current = session.content_dir.display().to_string();
        if state.content_dir != current {
            warn!(saved = %state.content_dir, current = %current, "state was saved against another content directory");
        }
        session.engine.restore(&state.snapshot)?;
    }

    for name in &args.start {
        session.engine.start_script(name, None)?;
    }
    for _ in 0..args.ticks {
        session.engine.tick(args.frame_seconds);
    }
    info!(ticks = args.ticks, "run finished");

    if let Some(path) = args.state_out.as_deref() {
        let state = RunState {
            schema_version: RUN_STATE_SCHEMA.to_string(),
            content_dir: session.content_dir.display().to_string(),
            snapshot: session.engine.snapshot(),
        };
        save_run_state(Path::new(path), &state)?;
    }

    Ok(CommandReport::Run {
        ticks: args.ticks,
        output: session.engine.take_output(),
        running: session.engine.globals().running(),
        state_out: args.state_out,
    })
}

pub(crate) fn run_eval(global: &GlobalArgs, args: EvalArgs) -> Result<CommandReport, ScriptError> {
    let mut session = open_session(global, true)?;
    session.engine.eval(&args.source, args.target.as_deref())?;
    Ok(CommandReport::Eval {
        output: session.engine.take_output(),
    })
}

pub(crate) fn run_dialogue(
    global: &GlobalArgs,
    args: DialogueArgs,
) -> Result<CommandReport, ScriptError> {
    let mut session = open_session(global, true)?;
    let subject = find_object(&session.engine, &args.subject)?;
    let target = args
        .target
        .as_deref()
        .map(|id| find_object(&session.engine, id))
        .transpose()?;
    let entries = session.engine.filter_topic(&args.topic, subject, target)?;
    Ok(CommandReport::Dialogue {
        topic: args.topic,
        entries,
    })
}

fn find_object(engine: &Engine, id: &str) -> Result<ObjectHandle, ScriptError> {
    engine.world().find(id).ok_or_else(|| {
        ScriptError::new("CLI_UNKNOWN_OBJECT", format!("No object with id `{}`.", id))
    })
}
