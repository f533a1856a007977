use super::*;
use mws_core::opcodes::{decode, seg0, seg3, seg5, segment3, segment5};
use mws_core::{ValueType, VarType};

struct TestContext;

impl CompilerContext for TestContext {
    fn global_type(&self, name: &str) -> Option<VarType> {
        match name.to_ascii_lowercase().as_str() {
            "gamehour" => Some(VarType::Float),
            "dayspassed" => Some(VarType::Long),
            _ => None,
        }
    }

    fn member_type(&self, name: &str, owner: &str) -> Option<(VarType, bool)> {
        match (owner, name) {
            ("fargoth", "gold") => Some((VarType::Long, false)),
            ("main", "counter") => Some((VarType::Short, true)),
            _ => None,
        }
    }

    fn lookup_reference(&self, name: &str) -> Option<i32> {
        name.eq_ignore_ascii_case("fargoth").then_some(7)
    }

    fn is_script(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case("main")
    }
}

fn extensions() -> Extensions {
    let mut extensions = Extensions::new();
    extensions
        .register_function("getdistance", ValueType::Float, "c", 0x100, Some(0x101))
        .expect("getdistance");
    extensions
        .register_instruction("disable", "", 0x102, Some(0x103))
        .expect("disable");
    extensions
        .register_function("getdisabled", ValueType::Integer, "", 0x104, Some(0x105))
        .expect("getdisabled");
    extensions
        .register_instruction("placeatme", "c/lfl", 0x106, Some(0x107))
        .expect("placeatme");
    extensions
        .register_function("random", ValueType::Integer, "l", 0x108, None)
        .expect("random");
    extensions
        .register_instruction("nudge", "jl", 0x10a, None)
        .expect("nudge");
    extensions
}

fn compile_with(source: &str, options: CompileOptions) -> (Result<CompiledScript, ScriptError>, Diagnostics) {
    let extensions = extensions();
    let mut diagnostics = Diagnostics::new(options.warnings);
    let result = compile_script("test", source, &extensions, &TestContext, options, &mut diagnostics);
    (result, diagnostics)
}

fn compile(source: &str) -> CompiledScript {
    let (result, diagnostics) = compile_with(source, CompileOptions::default());
    match result {
        Ok(compiled) => compiled,
        Err(error) => panic!("{} {:?}", error, diagnostics.entries()),
    }
}

fn opcodes(code: &[u32]) -> Vec<u32> {
    code.iter()
        .map(|word| decode(*word).expect("valid word").opcode)
        .collect()
}

fn code_of(compiled: &CompiledScript) -> &[u32] {
    &compiled.default_block().expect("default block").code
}

#[test]
fn declarations_get_distinct_class_indices() {
    let compiled = compile("short a\nlong b\nfloat c\nshort d\nbegin test\nset d to a\nend");
    assert_eq!(compiled.locals.lookup("a"), Some((VarType::Short, 0)));
    assert_eq!(compiled.locals.lookup("b"), Some((VarType::Long, 0)));
    assert_eq!(compiled.locals.lookup("c"), Some((VarType::Float, 0)));
    assert_eq!(compiled.locals.lookup("d"), Some((VarType::Short, 1)));
    assert_eq!(compiled.blocks.len(), 1);
    assert_eq!(compiled.blocks[0].name, "test");
}

#[test]
fn statements_without_begin_form_the_implicit_block() {
    let compiled = compile("float ConditionReturnValue\nset ConditionReturnValue to getdistance player");
    assert_eq!(compiled.blocks.len(), 1);
    assert_eq!(compiled.blocks[0].name, "");
    let code = code_of(&compiled);
    assert_eq!(code.last(), Some(&segment5(seg5::STORE_LOCAL_FLOAT)));
    assert!(code.contains(&segment5(0x100)));
    assert_eq!(compiled.literals.strings, vec!["player".to_string()]);
}

#[test]
fn multiple_named_blocks_keep_source_order() {
    let compiled = compile("begin OnActivate\nreturn\nend OnActivate\nbegin GameMode\ndisable\nend");
    let names: Vec<&str> = compiled.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["OnActivate", "GameMode"]);
    assert_eq!(compiled.blocks[0].code, vec![segment5(seg5::RETURN)]);
    assert_eq!(compiled.blocks[1].code, vec![segment5(0x102)]);
}

#[test]
fn every_error_of_a_pass_is_reported() {
    let (result, diagnostics) = compile_with(
        "begin test\nset x to 1\nset y to 2\nset z to (1 +\nend",
        CompileOptions::default(),
    );
    let error = result.expect_err("unknown variables");
    assert_eq!(error.code, "COMPILE_FAILED");
    assert_eq!(diagnostics.error_count(), 3);
    assert_eq!(
        diagnostics.errors().map(|d| d.location.line).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
}

#[test]
fn stray_endif_is_only_a_warning() {
    let (result, diagnostics) = compile_with("begin test\nendif\nend", CompileOptions::default());
    assert!(result.is_ok());
    assert_eq!(diagnostics.warning_count(), 1);

    let strict = CompileOptions {
        warnings: WarningsMode::Strict,
        ..CompileOptions::default()
    };
    let (result, _) = compile_with("begin test\nendif\nend", strict);
    assert!(result.is_err());
}

#[test]
fn if_chain_jumps_are_fully_patched() {
    let compiled = compile(
        "short x\nbegin test\nif ( x == 1 )\nset x to 2\nelseif ( x == 2 )\nset x to 3\nelse\nset x to 4\nendif\nend",
    );
    let code = code_of(&compiled);
    for (at, word) in code.iter().enumerate() {
        let decoded = decode(*word).expect("word");
        if decoded.segment == mws_core::opcodes::Segment::Zero && decoded.opcode == seg0::JUMP_FORWARD {
            assert!(decoded.arg > 0, "unpatched jump at {}", at);
            assert!(at + decoded.arg as usize <= code.len());
        }
    }
    let skips = opcodes(code)
        .into_iter()
        .filter(|op| *op == seg5::SKIP_NON_ZERO)
        .count();
    assert_eq!(skips, 2);
}

#[test]
fn while_loops_jump_back_to_the_condition() {
    let compiled = compile("short i\nbegin test\nwhile ( i < 3 )\nset i to i + 1\nendwhile\nend");
    let code = code_of(&compiled);
    let back = code
        .iter()
        .enumerate()
        .find_map(|(at, word)| {
            let decoded = decode(*word).ok()?;
            (decoded.segment == mws_core::opcodes::Segment::Zero
                && decoded.opcode == seg0::JUMP_BACKWARD)
                .then_some((at, decoded.arg))
        })
        .expect("backward jump");
    assert_eq!(back.0 - back.1 as usize, 0);
}

#[test]
fn missing_endif_is_an_error_but_the_block_still_closes() {
    let (result, diagnostics) = compile_with(
        "short x\nbegin test\nif ( x )\nset x to 1\nend\nbegin other\nreturn\nend",
        CompileOptions::default(),
    );
    assert!(result.is_err());
    assert!(diagnostics.entries()[0].message.contains("endif"));
    assert_eq!(diagnostics.error_count(), 1);
}

#[test]
fn members_globals_and_explicit_references() {
    let compiled = compile(
        "short x\nbegin test\nset fargoth.gold to 5\nset main.counter to gamehour\nfargoth->disable\nset x to fargoth.getdisabled\nset x to fargoth.gold\nend",
    );
    let code = code_of(&compiled);
    let ops = opcodes(code);
    assert!(ops.contains(&seg5::STORE_MEMBER_LONG));
    assert!(ops.contains(&seg5::STORE_MEMBER_SHORT_GLOBAL));
    assert!(ops.contains(&seg5::FETCH_GLOBAL_FLOAT));
    assert!(ops.contains(&seg5::FETCH_MEMBER_LONG));
    assert!(code.contains(&segment5(0x103)));
    assert!(code.contains(&segment5(0x105)));
    assert!(compiled.literals.integers.contains(&7));
    assert!(compiled.literals.strings.contains(&"fargoth".to_string()));
    assert!(compiled.literals.strings.contains(&"counter".to_string()));
}

#[test]
fn bare_reference_is_its_handle() {
    let compiled = compile("ref r\nbegin test\nset r to fargoth\nr->disable\nend");
    let code = code_of(&compiled);
    assert!(opcodes(code).contains(&seg5::STORE_LOCAL_REF));
    assert!(opcodes(code).contains(&seg5::FETCH_LOCAL_REF));
    assert_eq!(code.last(), Some(&segment5(0x103)));
    assert_eq!(compiled.literals.integers, vec![7]);
}

#[test]
fn optional_arguments_are_counted() {
    let compiled = compile("begin test\nplaceatme \"rat\" 2\nplaceatme rat\nplaceatme rat, 1, 2.5, 3\nend");
    let code = code_of(&compiled);
    let calls: Vec<u32> = code
        .iter()
        .copied()
        .filter(|word| decode(*word).map(|d| d.opcode == 0x106).unwrap_or(false))
        .collect();
    assert_eq!(calls, vec![segment3(0x106, 1), segment3(0x106, 0), segment3(0x106, 3)]);
}

#[test]
fn function_arguments_end_at_additive_operators() {
    let compiled = compile("short x\nbegin test\nset x to random 10 + 5\nend");
    let code = code_of(&compiled);
    let random = code.iter().position(|w| *w == segment5(0x108)).expect("random call");
    let add = code.iter().position(|w| *w == segment5(seg5::ADD_INT)).expect("add");
    assert!(random < add);
}

struct ShadowingContext;

impl CompilerContext for ShadowingContext {
    fn global_type(&self, name: &str) -> Option<VarType> {
        name.eq_ignore_ascii_case("random").then_some(VarType::Long)
    }

    fn member_type(&self, _name: &str, _owner: &str) -> Option<(VarType, bool)> {
        None
    }

    fn lookup_reference(&self, name: &str) -> Option<i32> {
        name.eq_ignore_ascii_case("getdisabled").then_some(3)
    }
}

#[test]
fn globals_and_references_shadow_extension_names() {
    let extensions = extensions();
    let mut diagnostics = Diagnostics::default();
    let compiled = compile_script(
        "test",
        "short x\nbegin test\nset x to random\nset x to getdisabled\nend",
        &extensions,
        &ShadowingContext,
        CompileOptions::default(),
        &mut diagnostics,
    )
    .expect("compiles");
    let code = code_of(&compiled);
    assert!(opcodes(code).contains(&seg5::FETCH_GLOBAL_LONG));
    assert!(!code.contains(&segment5(0x108)));
    assert!(!code.contains(&segment5(0x104)));
    assert_eq!(compiled.literals.integers, vec![3]);
    assert!(compiled.literals.strings.contains(&"random".to_string()));
}

#[test]
fn junk_slots_swallow_stray_markers() {
    let (result, diagnostics) = compile_with("begin test\nnudge -> 5\nend", CompileOptions::default());
    let compiled = result.expect("compiles");
    assert_eq!(code_of(&compiled).last(), Some(&segment5(0x10a)));
    assert_eq!(diagnostics.warning_count(), 1);
}

#[test]
fn message_box_derives_arguments_from_format() {
    let compiled = compile("begin test\nmessagebox \"Gold %d of %.1f\" 5 2 \"Ok\" \"Cancel\"\nend");
    let code = code_of(&compiled);
    assert_eq!(code.last(), Some(&segment3(seg3::MESSAGEBOX, 2)));
    assert!(opcodes(code).contains(&seg5::INT_TO_FLOAT));
    assert_eq!(
        compiled.literals.strings,
        vec!["Ok".to_string(), "Cancel".to_string(), "Gold %d of %.1f".to_string()]
    );
}

#[test]
fn console_mode_reports_bare_expressions() {
    let console = CompileOptions {
        console: true,
        ..CompileOptions::default()
    };
    let (result, _) = compile_with("1 + 2.5", console);
    let compiled = result.expect("compiles");
    let code = code_of(&compiled);
    assert_eq!(code.last(), Some(&segment3(seg3::REPORT, 1)));
    assert_eq!(compiled.literals.strings, vec!["%f".to_string()]);

    let compiled = compile("getdisabled");
    assert_eq!(code_of(&compiled).last(), Some(&segment5(seg5::POP)));
}

#[test]
fn instructions_have_no_value() {
    let (result, diagnostics) = compile_with("short x\nset x to disable", CompileOptions::default());
    assert!(result.is_err());
    assert!(diagnostics.entries()[0].message.contains("does not return a value"));
}

#[test]
fn explicit_reference_needs_an_explicit_variant() {
    let (result, diagnostics) = compile_with("short x\nset x to fargoth.random 5", CompileOptions::default());
    assert!(result.is_err());
    assert!(diagnostics.entries()[0].message.contains("explicit reference"));
}

#[test]
fn compiled_scripts_serialize_for_dumps() {
    let compiled = compile("short x\nset x to 1");
    let json = serde_json::to_value(&compiled).expect("serialize");
    assert_eq!(json["name"], "test");
    assert_eq!(json["locals"]["shorts"][0], "x");
}

#[test]
fn stopped_parse_fails_even_without_reported_errors() {
    assert!(check_outcome("test", 0, false).is_ok());
    let error = check_outcome("test", 0, true).expect_err("stopped early");
    assert_eq!(error.code, "COMPILE_FAILED");
    assert!(error.message.contains("stopped before the end"));
    let error = check_outcome("test", 2, false).expect_err("errors");
    assert!(error.message.contains("2 error(s)"));
}
