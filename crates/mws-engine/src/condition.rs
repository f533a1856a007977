//! Data-driven conditions: each record becomes a two-line script that is
//! compiled and run against the record's target, and the results are folded
//! into one verdict.

use std::sync::OnceLock;

use mws_compiler::{compile_script, CompileOptions, Diagnostics, WarningsMode};
use mws_content::{ConditionRecord, ContentStore, InfoRecord, RunOn};
use mws_core::{ObjectHandle, ScriptError};
use regex::Regex;
use tracing::{debug, warn};

use crate::context::{Binding, CompileContext, Host, ScriptContext};
use crate::globals::GlobalScripts;
use crate::registry::Registry;
use crate::world::{ScriptLocals, World};

const RETURN_VALUE: &str = "conditionreturnvalue";

/// Parameters a function can take in a condition record.
const MAX_PARAMETERS: usize = 2;

pub struct ConditionEvaluator<'a> {
    pub registry: &'a Registry,
    pub content: &'a ContentStore,
    pub world: &'a mut World,
    pub globals: &'a mut GlobalScripts,
}

impl<'a> ConditionEvaluator<'a> {
    /// Folds `conditions` starting from `false`: a record with the combine
    /// flag ORs its result in and ends the list once the verdict is true,
    /// any other record ANDs it in. A record that cannot be evaluated leaves
    /// the verdict unchanged. An unknown function index fails the whole list.
    pub fn evaluate(
        &mut self,
        conditions: &[ConditionRecord],
        subject: ObjectHandle,
        target: Option<ObjectHandle>,
    ) -> Result<bool, ScriptError> {
        let functions = conditions
            .iter()
            .map(|record| self.function_name(record.function))
            .collect::<Result<Vec<_>, _>>()?;

        let mut verdict = false;
        for (record, function) in conditions.iter().zip(functions) {
            let Some(result) = self.evaluate_one(record, function, subject, target) else {
                continue;
            };
            if record.combine_or() {
                verdict = verdict || result;
                if verdict {
                    break;
                }
            } else {
                verdict = verdict && result;
            }
        }
        Ok(verdict)
    }

    /// An entry passes when both its quest's conditions and its own pass.
    /// An empty list imposes nothing.
    pub fn evaluate_info(
        &mut self,
        info: &InfoRecord,
        subject: ObjectHandle,
        target: Option<ObjectHandle>,
    ) -> Result<bool, ScriptError> {
        let content = self.content;
        if let Some(quest) = info.quest.as_deref() {
            match content.quest(quest) {
                Some(record) if !record.conditions.is_empty() => {
                    if !self.evaluate(&record.conditions, subject, target)? {
                        return Ok(false);
                    }
                }
                Some(_) => {}
                None => warn!(info = %info.id, quest = %quest, "entry names a quest that does not exist"),
            }
        }
        if info.conditions.is_empty() {
            return Ok(true);
        }
        self.evaluate(&info.conditions, subject, target)
    }

    /// Passing entries of `topic` in content order.
    pub fn filter_topic(
        &mut self,
        topic: &str,
        subject: ObjectHandle,
        target: Option<ObjectHandle>,
    ) -> Result<Vec<&'a InfoRecord>, ScriptError> {
        let content = self.content;
        let record = content.topic(topic).ok_or_else(|| {
            ScriptError::new("CONDITION_UNKNOWN_TOPIC", format!("Topic `{}` does not exist.", topic))
        })?;
        let mut passing = Vec::new();
        for info in &record.infos {
            if self.evaluate_info(info, subject, target)? {
                passing.push(info);
            }
        }
        debug!(topic = %topic, total = record.infos.len(), passing = passing.len(), "filtered topic");
        Ok(passing)
    }

    /// Source of the script that computes `record`'s function value.
    pub fn script_source(&self, record: &ConditionRecord) -> Result<String, ScriptError> {
        let function = self.function_name(record.function)?;
        Ok(self.render(record, function))
    }

    fn function_name(&self, index: i32) -> Result<&'a str, ScriptError> {
        self.registry.function_name(index).ok_or_else(|| {
            ScriptError::new(
                "CONDITION_UNKNOWN_FUNCTION",
                format!("Condition function index {} is not registered.", index),
            )
        })
    }

    fn render(&self, record: &ConditionRecord, function: &str) -> String {
        let arity = self
            .registry
            .extensions()
            .by_name(function)
            .map_or(0, |entry| entry.max_arguments())
            .min(MAX_PARAMETERS);
        let mut call = function.to_string();
        for raw in [record.param1, record.param2].into_iter().take(arity) {
            call.push(' ');
            call.push_str(&self.render_parameter(raw));
        }
        format!("float ConditionReturnValue\nset ConditionReturnValue to {}", call)
    }

    /// Raw parameter words carry no type: a word naming a form is rendered as
    /// that form's id, anything else as the number itself.
    fn render_parameter(&self, raw: i32) -> String {
        match self.content.form_name(raw) {
            Some(name) if identifier().is_match(name) => name.to_string(),
            Some(name) => format!("\"{}\"", name),
            None => raw.to_string(),
        }
    }

    fn resolve(&self, run_on: RunOn, subject: ObjectHandle, target: Option<ObjectHandle>) -> Option<ObjectHandle> {
        match run_on {
            RunOn::Subject => Some(subject),
            RunOn::Target => target,
            RunOn::Reference(handle) => self.world.object(handle).ok().map(|object| object.handle),
        }
    }

    /// Value of one record's comparison, or `None` when it could not be
    /// computed.
    fn evaluate_one(
        &mut self,
        record: &ConditionRecord,
        function: &str,
        subject: ObjectHandle,
        target: Option<ObjectHandle>,
    ) -> Option<bool> {
        let comparison = match record.comparison() {
            Ok(comparison) => comparison,
            Err(error) => {
                warn!(function = %function, "{}", error);
                return None;
            }
        };
        let Some(object) = self.resolve(record.run_on, subject, target) else {
            warn!(function = %function, run_on = ?record.run_on, "condition has no object to run on");
            return None;
        };

        let source = self.render(record, function);
        match self.run(&source, object) {
            Ok(value) => Some(comparison.apply(value, record.value)),
            Err(error) => {
                warn!(function = %function, code = %error.code, "condition could not be evaluated: {}", error.message);
                None
            }
        }
    }

    fn run(&mut self, source: &str, object: ObjectHandle) -> Result<f32, ScriptError> {
        let extensions = self.registry.extensions();
        let mut diagnostics = Diagnostics::new(WarningsMode::Ignore);
        let script = {
            let context = CompileContext {
                content: self.content,
                world: &*self.world,
                extensions,
            };
            let options = CompileOptions {
                warnings: WarningsMode::Ignore,
                console: false,
            };
            compile_script("condition", source, extensions, &context, options, &mut diagnostics)?
        };
        let Some(block) = script.default_block() else {
            return Err(ScriptError::new("CONDITION_EMPTY_SCRIPT", "Condition script has no code."));
        };

        let mut locals = ScriptLocals::new(script.locals.clone());
        let host = Host {
            world: &mut *self.world,
            globals: &mut *self.globals,
            content: self.content,
            registry: self.registry,
        };
        let mut context = ScriptContext::new(
            host,
            Binding::Detached {
                locals: &mut locals,
                target: Some(object),
            },
        );
        self.registry
            .interpreter()
            .run(&block.code, &script.literals, &mut context)?;
        Ok(locals.get(RETURN_VALUE)?.to_f32())
    }
}

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile")
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    const CONTENT: &str = r#"<content>
  <reference handle="8" id="player"/>
  <reference handle="9" id="old man"/>
  <form id="300" name="mq01"/>
</content>"#;

    fn record(function: i32, param1: i32) -> ConditionRecord {
        ConditionRecord {
            function,
            param1,
            param2: 0,
            compare: 0,
            value: 0.0,
            run_on: RunOn::Subject,
        }
    }

    fn sources(records: &[ConditionRecord]) -> Vec<String> {
        let content = ContentStore::load_xml_map(&BTreeMap::from([(
            "forms.xml".to_string(),
            CONTENT.to_string(),
        )]))
        .expect("content");
        let registry = Registry::new().expect("registry");
        let mut world = World::from_content(&content, registry.extensions(), 0);
        let mut globals = GlobalScripts::new();
        let evaluator = ConditionEvaluator {
            registry: &registry,
            content: &content,
            world: &mut world,
            globals: &mut globals,
        };
        records
            .iter()
            .map(|record| {
                let source = evaluator.script_source(record).expect("source");
                source
                    .strip_prefix("float ConditionReturnValue\nset ConditionReturnValue to ")
                    .expect("prefix")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn parameters_render_as_forms_then_numbers() {
        assert_eq!(
            sources(&[
                record(58, 300),
                record(1, 8),
                record(1, 9),
                record(77, 5),
                record(43, 300),
            ]),
            vec![
                "getjournalindex mq01",
                "getdistance player",
                "getdistance \"old man\"",
                "random 5",
                "getsecondspassed",
            ]
        );
    }

    #[test]
    fn unknown_function_has_no_source() {
        let content = ContentStore::default();
        let registry = Registry::new().expect("registry");
        let mut world = World::from_content(&content, registry.extensions(), 0);
        let mut globals = GlobalScripts::new();
        let evaluator = ConditionEvaluator {
            registry: &registry,
            content: &content,
            world: &mut world,
            globals: &mut globals,
        };
        let error = evaluator.script_source(&record(2, 0)).expect_err("unknown");
        assert_eq!(error.code, "CONDITION_UNKNOWN_FUNCTION");
    }
}
