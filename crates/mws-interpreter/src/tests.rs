use std::collections::BTreeMap;

use super::*;
use mws_compiler::{compile_script, CompileOptions, Diagnostics, EmptyContext, Extensions};
use mws_core::opcodes::{seg0, seg5, segment0, segment5, Segment};
use mws_core::{CompiledScript, LocalValues, Literals, ObjectHandle, ScriptError, Value, ValueType, VarType};

#[derive(Default)]
struct TestContext {
    locals: LocalValues,
    globals: BTreeMap<String, Value>,
    reports: Vec<String>,
    messages: Vec<(String, Vec<String>)>,
}

impl Context for TestContext {
    fn local(&self, var_type: VarType, index: usize) -> Result<Value, ScriptError> {
        self.locals.get(var_type, index)
    }

    fn set_local(&mut self, var_type: VarType, index: usize, value: Value) -> Result<(), ScriptError> {
        self.locals.set(var_type, index, value)
    }

    fn global(&self, name: &str) -> Result<Value, ScriptError> {
        self.globals
            .get(name)
            .copied()
            .ok_or_else(|| ScriptError::new("CONTEXT_UNKNOWN_GLOBAL", name))
    }

    fn set_global(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        self.globals.insert(name.to_string(), value);
        Ok(())
    }

    fn member(&mut self, _owner: &str, _name: &str, _global: bool) -> Result<Value, ScriptError> {
        unsupported("members")
    }

    fn set_member(&mut self, _owner: &str, _name: &str, _global: bool, _value: Value) -> Result<(), ScriptError> {
        unsupported("members")
    }

    fn message_box(&mut self, message: &str, buttons: &[String]) -> Result<(), ScriptError> {
        self.messages.push((message.to_string(), buttons.to_vec()));
        Ok(())
    }

    fn report(&mut self, message: &str) -> Result<(), ScriptError> {
        self.reports.push(message.to_string());
        Ok(())
    }

    fn target(&mut self, explicit: Option<ObjectHandle>) -> Result<ObjectHandle, ScriptError> {
        Ok(explicit.unwrap_or(ObjectHandle(1)))
    }
}

fn compile(source: &str, extensions: &Extensions, console: bool) -> CompiledScript {
    let mut diagnostics = Diagnostics::default();
    let options = CompileOptions {
        console,
        ..CompileOptions::default()
    };
    compile_script("test", source, extensions, &EmptyContext, options, &mut diagnostics)
        .unwrap_or_else(|error| panic!("{} {:?}", error, diagnostics.entries()))
}

fn run_with(source: &str, interpreter: &Interpreter, extensions: &Extensions) -> Result<(CompiledScript, TestContext), ScriptError> {
    let compiled = compile(source, extensions, false);
    let mut context = TestContext {
        locals: LocalValues::configure(&compiled.locals),
        ..TestContext::default()
    };
    let block = compiled.default_block().expect("block");
    interpreter.run(&block.code, &compiled.literals, &mut context)?;
    Ok((compiled, context))
}

fn run(source: &str) -> Result<(CompiledScript, TestContext), ScriptError> {
    run_with(source, &Interpreter::new(), &Extensions::new())
}

fn local(source: &str, name: &str) -> Value {
    let (compiled, context) = run(source).expect("run");
    context.locals.get_named(&compiled.locals, name).expect("local")
}

#[test]
fn arithmetic_follows_precedence_and_associativity() {
    assert_eq!(local("long x\nset x to 1 + 2 * 3", "x"), Value::Integer(7));
    assert_eq!(local("long x\nset x to 2 - 3 - 1", "x"), Value::Integer(-2));
    assert_eq!(local("long x\nset x to ( 1 + 2 ) * 3", "x"), Value::Integer(9));
    assert_eq!(local("long x\nset x to 12 / 2 / 3", "x"), Value::Integer(2));
    assert_eq!(local("long x\nset x to -2 * -3", "x"), Value::Integer(6));
}

#[test]
fn mixed_arithmetic_is_float_and_stores_convert() {
    assert_eq!(local("float f\nset f to 1 + 0.5", "f"), Value::Float(1.5));
    assert_eq!(local("short s\nset s to 7 / 2", "s"), Value::Integer(3));
    assert_eq!(local("short s\nset s to 7.9", "s"), Value::Integer(7));
    assert_eq!(local("float f\nset f to 7 / 2.0", "f"), Value::Float(3.5));
}

#[test]
fn comparisons_and_logic_yield_integers() {
    assert_eq!(local("long x\nset x to ( 2.5 > 2 )", "x"), Value::Integer(1));
    assert_eq!(local("long x\nset x to 1 == 2 || 3 >= 3", "x"), Value::Integer(1));
    assert_eq!(local("long x\nset x to 1 && 0", "x"), Value::Integer(0));
    assert_eq!(local("long x\nset x to 0.5 && 2", "x"), Value::Integer(1));
}

#[test]
fn locals_start_at_zero() {
    let source = "short a\nlong b\nfloat c\nlong r\nset r to a + b + c";
    let (compiled, context) = run(source).expect("run");
    for name in ["a", "b", "c", "r"] {
        assert_eq!(context.locals.get_named(&compiled.locals, name).expect(name).to_f32(), 0.0);
    }
}

#[test]
fn if_statement_sets_local() {
    let source = "short x\nbegin\nset x to 5\nif ( x == 5 )\nset x to 10\nendif\nend";
    assert_eq!(local(source, "x"), Value::Integer(10));
}

#[test]
fn elseif_chain_takes_one_branch() {
    let source = "short x\nshort y\nset x to 2\nif ( x == 1 )\nset y to 10\nelseif ( x == 2 )\nset y to 20\nelse\nset y to 30\nendif";
    assert_eq!(local(source, "y"), Value::Integer(20));
    let source = "short x\nshort y\nif ( x )\nset y to 10\nelse\nset y to 30\nendif";
    assert_eq!(local(source, "y"), Value::Integer(30));
}

#[test]
fn float_conditions_compare_with_zero() {
    let source = "float f\nshort y\nset f to 0.25\nif ( f )\nset y to 1\nendif";
    assert_eq!(local(source, "y"), Value::Integer(1));
}

#[test]
fn while_loop_runs_until_condition_fails() {
    let source = "short i\nlong sum\nwhile ( i < 5 )\nset i to i + 1\nset sum to sum + i\nendwhile";
    assert_eq!(local(source, "sum"), Value::Integer(15));
}

#[test]
fn return_stops_execution() {
    let source = "short x\nset x to 1\nreturn\nset x to 2";
    assert_eq!(local(source, "x"), Value::Integer(1));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let error = run("long x\nset x to 1 / x").err().expect("error");
    assert_eq!(error.code, "RUNTIME_DIVISION_BY_ZERO");
    let error = run("float f\nset f to 1.0 / f").err().expect("error");
    assert_eq!(error.code, "RUNTIME_DIVISION_BY_ZERO");
}

#[test]
fn message_box_formats_and_keeps_button_order() {
    let (_, context) = run("messagebox \"Gold %d of %.1f\" 5 2 \"Ok\" \"Cancel\"").expect("run");
    assert_eq!(
        context.messages,
        vec![(
            "Gold 5 of 2.0".to_string(),
            vec!["Ok".to_string(), "Cancel".to_string()]
        )]
    );
}

#[test]
fn console_expressions_are_reported() {
    let extensions = Extensions::new();
    let compiled = compile("1 + 2.5\n7 * 6", &extensions, true);
    let mut context = TestContext::default();
    let block = compiled.default_block().expect("block");
    Interpreter::new()
        .run(&block.code, &compiled.literals, &mut context)
        .expect("run");
    assert_eq!(context.reports, vec!["3.500000".to_string(), "42".to_string()]);
}

#[test]
fn globals_go_through_the_context() {
    struct Globals;
    impl mws_compiler::CompilerContext for Globals {
        fn global_type(&self, name: &str) -> Option<VarType> {
            (name == "gold").then_some(VarType::Long)
        }
        fn member_type(&self, _: &str, _: &str) -> Option<(VarType, bool)> {
            None
        }
        fn lookup_reference(&self, _: &str) -> Option<i32> {
            None
        }
    }

    let extensions = Extensions::new();
    let mut diagnostics = Diagnostics::default();
    let compiled = compile_script(
        "test",
        "set gold to gold + 2.6",
        &extensions,
        &Globals,
        CompileOptions::default(),
        &mut diagnostics,
    )
    .expect("compile");
    let mut context = TestContext::default();
    context.globals.insert("gold".to_string(), Value::Integer(10));
    let block = compiled.default_block().expect("block");
    Interpreter::new()
        .run(&block.code, &compiled.literals, &mut context)
        .expect("run");
    assert_eq!(context.globals["gold"], Value::Integer(12));
}

fn answer(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let base = runtime.pop_integer()?;
    runtime.push_integer(base + 40);
    Ok(())
}

#[test]
fn extension_opcodes_dispatch_to_installed_handlers() {
    let mut extensions = Extensions::new();
    extensions
        .register_function("answer", ValueType::Integer, "l", 0x100, None)
        .expect("register");
    let mut interpreter = Interpreter::new();
    interpreter.install(Segment::Five, 0x100, answer).expect("install");

    let (compiled, context) = run_with("long x\nset x to answer 2", &interpreter, &extensions).expect("run");
    assert_eq!(context.locals.get_named(&compiled.locals, "x").expect("x"), Value::Integer(42));
}

#[test]
fn opcode_collisions_are_rejected() {
    let mut interpreter = Interpreter::new();
    let before = interpreter.len();
    let error = interpreter
        .install(Segment::Five, seg5::ADD_INT, answer)
        .expect_err("collision");
    assert_eq!(error.code, "INTERPRETER_OPCODE_COLLISION");
    assert_eq!(interpreter.len(), before);
    assert!(interpreter.handles(segment5(seg5::ADD_INT)));
    assert!(!interpreter.handles(segment5(0x100)));
}

#[test]
fn malformed_code_fails_fast() {
    let literals = Literals::new();
    let interpreter = Interpreter::new();
    let mut context = TestContext::default();

    let error = interpreter
        .run(&[segment5(0x999)], &literals, &mut context)
        .expect_err("unknown");
    assert_eq!(error.code, "RUNTIME_UNKNOWN_OPCODE");

    let error = interpreter
        .run(&[segment5(seg5::ADD_INT)], &literals, &mut context)
        .expect_err("underflow");
    assert_eq!(error.code, "RUNTIME_STACK_UNDERFLOW");

    let error = interpreter
        .run(&[segment0(seg0::JUMP_FORWARD, 5)], &literals, &mut context)
        .expect_err("jump");
    assert_eq!(error.code, "RUNTIME_JUMP_OUT_OF_RANGE");

    let error = interpreter
        .run(&[0x4000_0000], &literals, &mut context)
        .expect_err("segment");
    assert_eq!(error.code, "RUNTIME_INVALID_CODE_WORD");
}

#[test]
fn missing_locals_are_reported() {
    let literals = Literals::new();
    let mut context = TestContext::default();
    let code = [segment0(seg0::PUSH_INT, 3), segment5(seg5::FETCH_LOCAL_LONG)];
    let error = Interpreter::new()
        .run(&code, &literals, &mut context)
        .expect_err("out of range");
    assert_eq!(error.code, "RUNTIME_LOCAL_OUT_OF_RANGE");
}
