use mws_core::opcodes::decode;
use mws_core::{CompiledScript, ScriptError, VarType};
use mws_engine::Output;

use crate::{map_cli_output, CommandReport};

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn emit_report(report: &CommandReport, json: bool) -> Result<(), ScriptError> {
    if json {
        let mut document = serde_json::to_value(report).map_err(map_cli_output)?;
        if let Some(object) = document.as_object_mut() {
            object.insert("result".to_string(), "ok".into());
        }
        println!("{}", document);
        return Ok(());
    }

    for line in render_lines(report) {
        println!("{}", line);
    }
    Ok(())
}

pub(crate) fn render_lines(report: &CommandReport) -> Vec<String> {
    let mut lines = vec!["RESULT:OK".to_string()];
    match report {
        CommandReport::Compile {
            summary,
            diagnostics,
        } => {
            lines.push(format!("COMPILED:{}/{}", summary.succeeded, summary.total));
            lines.extend(summary.failed.iter().map(|name| format!("FAILED:{}", name)));
            lines.extend(
                diagnostics
                    .iter()
                    .map(|diagnostic| format!("DIAGNOSTIC_JSON:{}", json_string(&diagnostic.to_string()))),
            );
        }
        CommandReport::Dump { script } => render_script(script, &mut lines),
        CommandReport::Run {
            ticks,
            output,
            running,
            state_out,
        } => {
            lines.push(format!("TICKS:{}", ticks));
            render_output(output, &mut lines);
            lines.extend(running.iter().map(|name| format!("RUNNING:{}", name)));
            lines.push(format!(
                "STATE_OUT:{}",
                state_out.as_deref().unwrap_or("NONE")
            ));
        }
        CommandReport::Eval { output } => render_output(output, &mut lines),
        CommandReport::Dialogue { topic, entries } => {
            lines.push(format!("TOPIC:{}", topic));
            lines.extend(
                entries
                    .iter()
                    .map(|entry| format!("INFO:{}|{}", entry.id, json_string(&entry.text))),
            );
        }
    }
    lines
}

fn render_output(output: &[Output], lines: &mut Vec<String>) {
    for item in output {
        match item {
            Output::Message { text, buttons } => {
                lines.push(format!("MESSAGE_JSON:{}", json_string(text)));
                lines.extend(
                    buttons
                        .iter()
                        .map(|button| format!("BUTTON_JSON:{}", json_string(button))),
                );
            }
            Output::Report { text } => lines.push(format!("REPORT_JSON:{}", json_string(text))),
        }
    }
}

fn render_script(script: &CompiledScript, lines: &mut Vec<String>) {
    lines.push(format!("SCRIPT:{}", script.name));
    for var_type in VarType::ALL {
        for (index, name) in script.locals.names(var_type).iter().enumerate() {
            lines.push(format!("LOCAL:{} {} {}", var_type.as_char(), index, name));
        }
    }
    for block in &script.blocks {
        lines.push(format!("BLOCK:{}", block.name));
        for (index, word) in block.code.iter().enumerate() {
            let decoded = match decode(*word) {
                Ok(decoded) => format!("{:?} op={:#x} arg={}", decoded.segment, decoded.opcode, decoded.arg),
                Err(_) => "invalid".to_string(),
            };
            lines.push(format!("CODE:{:04} {:#010x} {}", index, word, decoded));
        }
    }
}
