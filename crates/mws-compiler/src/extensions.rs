use std::collections::HashMap;

use mws_core::opcodes::{segment3, segment5, Segment, EXTENSION_BASE};
use mws_core::{ScriptError, ValueType};
use tracing::debug;

const SIGNATURE_CHARS: &str = "lsfScxzj/";

/// A host function or instruction callable from script source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionEntry {
    pub name: String,
    pub keyword: usize,
    /// `None` for instructions.
    pub return_type: Option<ValueType>,
    pub signature: String,
    pub code: u32,
    pub code_explicit: Option<u32>,
}

impl ExtensionEntry {
    pub fn is_function(&self) -> bool {
        self.return_type.is_some()
    }

    pub fn accepts_explicit(&self) -> bool {
        self.code_explicit.is_some()
    }

    pub fn has_optional_arguments(&self) -> bool {
        self.signature.contains('/')
    }

    /// Segment 3 carries the supplied optional count; segment 5 has no room for it.
    pub fn segment(&self) -> Segment {
        if self.has_optional_arguments() {
            Segment::Three
        } else {
            Segment::Five
        }
    }

    /// Number of arguments the call consumes when every optional one is given.
    pub fn max_arguments(&self) -> usize {
        self.signature.chars().filter(|c| *c != '/').count()
    }

    pub fn code_word(&self, explicit: bool, optional_count: u32) -> Result<u32, ScriptError> {
        let opcode = if explicit {
            self.code_explicit.ok_or_else(|| {
                ScriptError::new(
                    "EXTENSION_NO_EXPLICIT_VARIANT",
                    format!("`{}` does not accept an explicit reference.", self.name),
                )
            })?
        } else {
            self.code
        };
        Ok(match self.segment() {
            Segment::Three => segment3(opcode, optional_count),
            _ => segment5(opcode),
        })
    }
}

/// Name -> entry table filled once at startup by the host extension modules.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    entries: Vec<ExtensionEntry>,
    by_name: HashMap<String, usize>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function(
        &mut self,
        name: &str,
        return_type: ValueType,
        signature: &str,
        code: u32,
        code_explicit: Option<u32>,
    ) -> Result<usize, ScriptError> {
        self.register(name, Some(return_type), signature, code, code_explicit)
    }

    pub fn register_instruction(
        &mut self,
        name: &str,
        signature: &str,
        code: u32,
        code_explicit: Option<u32>,
    ) -> Result<usize, ScriptError> {
        self.register(name, None, signature, code, code_explicit)
    }

    fn register(
        &mut self,
        name: &str,
        return_type: Option<ValueType>,
        signature: &str,
        code: u32,
        code_explicit: Option<u32>,
    ) -> Result<usize, ScriptError> {
        let key = name.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(ScriptError::new(
                "EXTENSION_DUPLICATE",
                format!("Extension `{}` is already registered.", name),
            ));
        }
        if let Some(bad) = signature.chars().find(|c| !SIGNATURE_CHARS.contains(*c)) {
            return Err(ScriptError::new(
                "EXTENSION_INVALID_SIGNATURE",
                format!("Extension `{}` has invalid argument code `{}`.", name, bad),
            ));
        }
        if signature.matches('/').count() > 1 {
            return Err(ScriptError::new(
                "EXTENSION_INVALID_SIGNATURE",
                format!("Extension `{}` marks optional arguments twice.", name),
            ));
        }
        for opcode in std::iter::once(code).chain(code_explicit) {
            if opcode < EXTENSION_BASE {
                return Err(ScriptError::new(
                    "EXTENSION_RESERVED_OPCODE",
                    format!(
                        "Extension `{}` uses opcode {} inside the core range (< {}).",
                        name, opcode, EXTENSION_BASE
                    ),
                ));
            }
        }

        let keyword = self.entries.len();
        self.entries.push(ExtensionEntry {
            name: key.clone(),
            keyword,
            return_type,
            signature: signature.to_string(),
            code,
            code_explicit,
        });
        self.by_name.insert(key, keyword);
        debug!(extension = %name, keyword, code, "registered extension");
        Ok(keyword)
    }

    /// Keyword id of `name`, case-insensitive.
    pub fn search(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn get(&self, keyword: usize) -> Option<&ExtensionEntry> {
        self.entries.get(keyword)
    }

    pub fn by_name(&self, name: &str) -> Option<&ExtensionEntry> {
        self.search(name).and_then(|keyword| self.get(keyword))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_is_case_insensitive() {
        let mut extensions = Extensions::new();
        let id = extensions
            .register_function("GetDistance", ValueType::Float, "c", 0x100, Some(0x101))
            .expect("register");
        assert_eq!(extensions.search("getdistance"), Some(id));
        assert_eq!(extensions.search("GETDISTANCE"), Some(id));
        assert!(extensions.by_name("getDistance").expect("entry").is_function());
        assert_eq!(extensions.search("missing"), None);
    }

    #[test]
    fn registration_rejects_duplicates_bad_codes_and_core_opcodes() {
        let mut extensions = Extensions::new();
        extensions
            .register_instruction("enable", "", 0x100, None)
            .expect("register");
        let duplicate = extensions
            .register_instruction("Enable", "", 0x102, None)
            .expect_err("duplicate");
        assert_eq!(duplicate.code, "EXTENSION_DUPLICATE");

        let bad = extensions
            .register_instruction("foo", "lq", 0x103, None)
            .expect_err("bad signature");
        assert_eq!(bad.code, "EXTENSION_INVALID_SIGNATURE");

        let core = extensions
            .register_instruction("bar", "", 12, None)
            .expect_err("core opcode");
        assert_eq!(core.code, "EXTENSION_RESERVED_OPCODE");
    }

    #[test]
    fn optional_arguments_select_segment_three() {
        let mut extensions = Extensions::new();
        extensions
            .register_instruction("placeatme", "c/lfl", 0x110, Some(0x111))
            .expect("register");
        extensions
            .register_instruction("disable", "", 0x112, None)
            .expect("register");

        let place = extensions.by_name("placeatme").expect("placeatme");
        assert_eq!(place.segment(), Segment::Three);
        assert_eq!(place.max_arguments(), 4);
        assert_eq!(place.code_word(true, 2).expect("explicit"), segment3(0x111, 2));

        let disable = extensions.by_name("disable").expect("disable");
        assert_eq!(disable.code_word(false, 0).expect("implicit"), segment5(0x112));
        let error = disable.code_word(true, 0).expect_err("no explicit variant");
        assert_eq!(error.code, "EXTENSION_NO_EXPLICIT_VARIANT");
    }
}
