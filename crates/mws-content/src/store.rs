use std::collections::BTreeMap;

use mws_core::{ObjectHandle, ScriptError, VarType};
use tracing::debug;

use crate::records::{
    ActorRecord, Comparison, ConditionRecord, GlobalRecord, InfoRecord, QuestRecord,
    ReferenceRecord, RunOn, ScriptRecord, TopicRecord,
};
use crate::xml::{parse_xml_document, XmlElement};

/// Merged view of every loaded content file. Keys are lower-cased names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentStore {
    pub scripts: BTreeMap<String, ScriptRecord>,
    pub globals: BTreeMap<String, GlobalRecord>,
    pub references: BTreeMap<ObjectHandle, ReferenceRecord>,
    pub forms: BTreeMap<i32, String>,
    pub quests: BTreeMap<String, QuestRecord>,
    pub topics: BTreeMap<String, TopicRecord>,
    pub startup: Vec<String>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `files` (path -> xml text) in path order; later records replace
    /// earlier ones with the same name.
    pub fn load_xml_map(files: &BTreeMap<String, String>) -> Result<Self, ScriptError> {
        let mut store = Self::new();
        for (path, source) in files {
            store
                .load_xml(path, source)
                .map_err(|error| ScriptError {
                    message: format!("{}: {}", path, error.message),
                    ..error
                })?;
        }
        debug!(
            files = files.len(),
            scripts = store.scripts.len(),
            references = store.references.len(),
            "content loaded"
        );
        Ok(store)
    }

    pub fn load_xml(&mut self, file: &str, source: &str) -> Result<(), ScriptError> {
        let root = parse_xml_document(source)?;
        if root.name != "content" {
            return Err(ScriptError::at(
                "CONTENT_INVALID_ROOT",
                format!("Expected <content> root element, found <{}>.", root.name),
                root.location,
            ));
        }

        for element in &root.children {
            match element.name.as_str() {
                "script" => {
                    let record = parse_script(file, element)?;
                    self.scripts.insert(record.name.clone(), record);
                }
                "global" => {
                    let record = parse_global(element)?;
                    self.globals.insert(record.name.clone(), record);
                }
                "reference" => {
                    let record = parse_reference(element)?;
                    self.references.insert(record.handle, record);
                }
                "form" => {
                    let id = element.parse_attr::<i32>("id", 0)?;
                    let name = lower(element.required_attr("name")?);
                    self.forms.insert(id, name);
                }
                "quest" => {
                    let record = parse_quest(element)?;
                    self.quests.insert(record.name.clone(), record);
                }
                "topic" => {
                    let record = parse_topic(element)?;
                    self.topics.insert(record.name.clone(), record);
                }
                "startup" => {
                    let script = lower(element.required_attr("script")?);
                    if !self.startup.contains(&script) {
                        self.startup.push(script);
                    }
                }
                other => {
                    return Err(ScriptError::at(
                        "CONTENT_UNKNOWN_ELEMENT",
                        format!("Unknown content element <{}>.", other),
                        element.location,
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn script(&self, name: &str) -> Option<&ScriptRecord> {
        self.scripts.get(&lower(name))
    }

    pub fn global(&self, name: &str) -> Option<&GlobalRecord> {
        self.globals.get(&lower(name))
    }

    pub fn reference(&self, handle: ObjectHandle) -> Option<&ReferenceRecord> {
        self.references.get(&handle)
    }

    pub fn reference_by_id(&self, id: &str) -> Option<&ReferenceRecord> {
        let key = lower(id);
        self.references.values().find(|record| record.id == key)
    }

    /// Name of the record a form id designates. Reference handles count as
    /// form ids after the explicit form table.
    pub fn form_name(&self, id: i32) -> Option<&str> {
        self.forms
            .get(&id)
            .map(String::as_str)
            .or_else(|| self.reference(ObjectHandle(id)).map(|r| r.id.as_str()))
    }

    pub fn form_id(&self, name: &str) -> Option<i32> {
        let key = lower(name);
        self.forms
            .iter()
            .find(|(_, form)| **form == key)
            .map(|(id, _)| *id)
            .or_else(|| self.reference_by_id(&key).map(|r| r.handle.0))
    }

    pub fn quest(&self, name: &str) -> Option<&QuestRecord> {
        self.quests.get(&lower(name))
    }

    pub fn topic(&self, name: &str) -> Option<&TopicRecord> {
        self.topics.get(&lower(name))
    }
}

fn lower(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn parse_script(file: &str, element: &XmlElement) -> Result<ScriptRecord, ScriptError> {
    Ok(ScriptRecord {
        name: lower(element.required_attr("name")?),
        source: element.text.clone(),
        file: file.to_string(),
        location: element.location,
    })
}

fn parse_global(element: &XmlElement) -> Result<GlobalRecord, ScriptError> {
    let type_name = element.attr("type").unwrap_or("float");
    let var_type = match VarType::from_keyword(type_name) {
        Some(VarType::Ref) | None => {
            return Err(ScriptError::at(
                "CONTENT_INVALID_ATTRIBUTE",
                format!("Global type must be short, long or float, found `{}`.", type_name),
                element.location,
            ))
        }
        Some(var_type) => var_type,
    };
    Ok(GlobalRecord {
        name: lower(element.required_attr("name")?),
        var_type,
        value: element.parse_attr::<f32>("value", 0.0)?,
    })
}

fn parse_reference(element: &XmlElement) -> Result<ReferenceRecord, ScriptError> {
    let handle = ObjectHandle(element.parse_attr::<i32>("handle", 0)?);
    if handle.0 <= 0 {
        return Err(ScriptError::at(
            "CONTENT_INVALID_ATTRIBUTE",
            "Reference handle must be a positive integer.",
            element.location,
        ));
    }

    let actor = match element.elements("actor").next() {
        None => None,
        Some(actor) => Some(ActorRecord {
            name: actor.attr("name").unwrap_or_default().to_string(),
            race: lower(actor.attr("race").unwrap_or_default()),
            faction: lower(actor.attr("faction").unwrap_or_default()),
        }),
    };

    let mut stats = BTreeMap::new();
    for stat in element.elements("stat") {
        stats.insert(
            lower(stat.required_attr("name")?),
            stat.parse_attr::<f32>("value", 0.0)?,
        );
    }

    Ok(ReferenceRecord {
        handle,
        id: lower(element.required_attr("id")?),
        script: element.attr("script").map(lower).filter(|name| !name.is_empty()),
        position: [
            element.parse_attr::<f32>("x", 0.0)?,
            element.parse_attr::<f32>("y", 0.0)?,
            element.parse_attr::<f32>("z", 0.0)?,
        ],
        disabled: element.parse_attr::<bool>("disabled", false)?,
        actor,
        stats,
    })
}

fn parse_conditions(element: &XmlElement) -> Result<Vec<ConditionRecord>, ScriptError> {
    element.elements("condition").map(parse_condition).collect()
}

fn parse_condition(element: &XmlElement) -> Result<ConditionRecord, ScriptError> {
    let invalid = |message: String| {
        ScriptError::at("CONTENT_INVALID_ATTRIBUTE", message, element.location)
    };

    let raw_compare = element.attr("compare").unwrap_or("0");
    let comparison = Comparison::parse(raw_compare)
        .ok_or_else(|| invalid(format!("Unknown comparison `{}`.", raw_compare)))?;
    let combine_or = match element.attr("combine").map(lower).as_deref() {
        None | Some("and") => false,
        Some("or") => true,
        Some(other) => return Err(invalid(format!("Unknown combine flag `{}`.", other))),
    };

    let run_on = match element.attr("run-on").map(lower).as_deref() {
        None | Some("subject") => RunOn::Subject,
        Some("target") => RunOn::Target,
        Some("reference") => RunOn::Reference(ObjectHandle(
            element.required_attr("reference")?.trim().parse::<i32>().map_err(|_| {
                invalid("Condition `reference` must be an object handle.".to_string())
            })?,
        )),
        Some(other) => return Err(invalid(format!("Unknown run-on selector `{}`.", other))),
    };

    Ok(ConditionRecord {
        function: element.required_attr("function")?.trim().parse::<i32>().map_err(|_| {
            invalid("Condition `function` must be an integer index.".to_string())
        })?,
        param1: element.parse_attr::<i32>("param1", 0)?,
        param2: element.parse_attr::<i32>("param2", 0)?,
        compare: ConditionRecord::pack_compare(comparison, combine_or),
        value: element.parse_attr::<f32>("value", 0.0)?,
        run_on,
    })
}

fn parse_quest(element: &XmlElement) -> Result<QuestRecord, ScriptError> {
    let form = match element.attr("form") {
        None => None,
        Some(_) => Some(element.parse_attr::<i32>("form", 0)?),
    };
    Ok(QuestRecord {
        name: lower(element.required_attr("name")?),
        form,
        conditions: parse_conditions(element)?,
    })
}

fn parse_topic(element: &XmlElement) -> Result<TopicRecord, ScriptError> {
    let mut infos = Vec::new();
    for info in element.elements("info") {
        infos.push(InfoRecord {
            id: lower(info.required_attr("id")?),
            quest: info.attr("quest").map(lower).filter(|name| !name.is_empty()),
            text: info.attr("text").unwrap_or_default().to_string(),
            conditions: parse_conditions(info)?,
        });
    }
    Ok(TopicRecord {
        name: lower(element.required_attr("name")?),
        infos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(path, source)| (path.to_string(), source.to_string()))
            .collect()
    }

    const BASE: &str = r#"<content>
  <global name="Gold" type="long" value="10"/>
  <script name="Foo"><![CDATA[begin foo
end]]></script>
  <reference handle="7" id="Fargoth" script="FargothScript" x="1" y="2" z="3">
    <actor name="Fargoth" race="Wood Elf" faction="Hlaalu"/>
    <stat name="Health" value="50"/>
  </reference>
  <form id="300" name="MQ01"/>
  <quest name="mq01" form="300">
    <condition function="58" param1="300" compare="&gt;=" value="10"/>
  </quest>
  <topic name="Greeting">
    <info id="greet1" quest="mq01" text="Hello.">
      <condition function="72" param1="7" compare="0" value="1" combine="or" run-on="reference" reference="7"/>
    </info>
  </topic>
  <startup script="Main"/>
</content>"#;

    #[test]
    fn loads_every_record_kind_with_lowercase_names() {
        let store = ContentStore::load_xml_map(&map(&[("a.xml", BASE)])).expect("content loads");
        assert_eq!(store.global("GOLD").map(|g| (g.var_type, g.value)), Some((VarType::Long, 10.0)));
        assert_eq!(store.script("foo").map(|s| s.source.as_str()), Some("begin foo\nend"));

        let fargoth = store.reference(ObjectHandle(7)).expect("reference");
        assert_eq!(fargoth.id, "fargoth");
        assert_eq!(fargoth.script.as_deref(), Some("fargothscript"));
        assert_eq!(fargoth.position, [1.0, 2.0, 3.0]);
        assert_eq!(fargoth.actor.as_ref().map(|a| a.race.as_str()), Some("wood elf"));
        assert_eq!(fargoth.stats.get("health"), Some(&50.0));

        assert_eq!(store.startup, vec!["main".to_string()]);

        let quest = store.quest("MQ01").expect("quest");
        assert_eq!(quest.form, Some(300));
        assert_eq!(
            quest.conditions[0].comparison().expect("operator"),
            Comparison::GreaterOrEqual
        );

        let info = &store.topic("greeting").expect("topic").infos[0];
        assert!(info.conditions[0].combine_or());
        assert_eq!(info.conditions[0].run_on, RunOn::Reference(ObjectHandle(7)));
    }

    #[test]
    fn form_ids_cover_forms_and_reference_handles() {
        let store = ContentStore::load_xml_map(&map(&[("a.xml", BASE)])).expect("content loads");
        assert_eq!(store.form_name(300), Some("mq01"));
        assert_eq!(store.form_name(7), Some("fargoth"));
        assert_eq!(store.form_name(8), None);
        assert_eq!(store.form_id("Fargoth"), Some(7));
        assert_eq!(store.form_id("mq01"), Some(300));
    }

    #[test]
    fn later_files_replace_earlier_records() {
        let override_xml = r#"<content><global name="gold" type="float" value="2.5"/></content>"#;
        let store = ContentStore::load_xml_map(&map(&[("a.xml", BASE), ("b.xml", override_xml)]))
            .expect("content loads");
        assert_eq!(store.global("gold").map(|g| g.var_type), Some(VarType::Float));
    }

    #[test]
    fn errors_name_the_offending_file() {
        let error = ContentStore::load_xml_map(&map(&[("bad.xml", "<content><npc/></content>")]))
            .expect_err("unknown element");
        assert_eq!(error.code, "CONTENT_UNKNOWN_ELEMENT");
        assert!(error.message.starts_with("bad.xml: "));

        let error = ContentStore::load_xml_map(&map(&[("root.xml", "<scripts/>")]))
            .expect_err("bad root");
        assert_eq!(error.code, "CONTENT_INVALID_ROOT");
    }

    #[test]
    fn invalid_condition_attributes_are_rejected() {
        let xml = r#"<content><quest name="q"><condition function="1" run-on="nobody"/></quest></content>"#;
        let error = ContentStore::load_xml_map(&map(&[("q.xml", xml)])).expect_err("bad run-on");
        assert_eq!(error.code, "CONTENT_INVALID_ATTRIBUTE");
    }
}
