mod util;

use std::rc::Rc;

use amdoc::value::ValueKind;
use amdoc::{ExtractError, Severity};
use util::*;

fn returning(value: amdoc::ast::Node) -> amdoc::ast::Node {
    func(&[], vec![ret(Some(value))])
}

// ---------------------------------------------------------------------------
// definition forms
// ---------------------------------------------------------------------------

#[test]
fn a_factory_return_becomes_the_module_value() {
    let tree = program(vec![define(vec![
        array(vec![]),
        returning(object(vec![("x", num_lit(1.0))])),
    ])]);
    let interp = extract(&[("app", tree)], &["app"]);
    let exported = module_value(&interp, "app");
    assert_eq!(exported.borrow().kind, ValueKind::Object);
    assert_eq!(prop(&exported, "x").borrow().kind, ValueKind::Number);
}

#[test]
fn an_object_literal_defines_the_module_directly() {
    let tree = program(vec![define(vec![object(vec![("x", num_lit(1.0))])])]);
    let interp = extract(&[("app", tree)], &["app"]);
    let exported = module_value(&interp, "app");
    assert_eq!(exported.borrow().kind, ValueKind::Object);
    assert_eq!(prop(&exported, "x").borrow().kind, ValueKind::Number);
}

#[test]
fn an_explicit_id_overrides_the_file_id() {
    let tree = program(vec![define(vec![
        str_lit("a/b"),
        array(vec![]),
        returning(object(vec![])),
    ])]);
    let interp = extract(&[("main", tree)], &["main"]);
    assert!(interp.graph.get("a/b").is_some());
    assert!(interp.graph.get("main").is_none());
}

#[test]
fn a_lone_string_before_the_factory_is_an_id() {
    let tree = program(vec![define(vec![str_lit("named"), returning(object(vec![]))])]);
    let interp = extract(&[("main", tree)], &["main"]);
    assert!(interp.graph.get("named").is_some());
}

#[test]
fn an_exports_dependency_becomes_the_module_value() {
    let tree = program(vec![define(vec![
        array(vec![str_lit("exports")]),
        func(
            &["exports"],
            vec![expr_stmt(assign(
                member(ident("exports"), "answer"),
                num_lit(42.0),
            ))],
        ),
    ])]);
    let interp = extract(&[("app", tree)], &["app"]);
    let exported = module_value(&interp, "app");
    assert_eq!(exported.borrow().kind, ValueKind::Object);
    assert_eq!(prop(&exported, "answer").borrow().kind, ValueKind::Number);
}

// ---------------------------------------------------------------------------
// dependency wiring
// ---------------------------------------------------------------------------

#[test]
fn two_requesters_share_one_dependency_instance() {
    let dep = program(vec![define(vec![array(vec![]), returning(object(vec![]))])]);
    let requester = |_: &str| {
        program(vec![define(vec![
            array(vec![str_lit("dep")]),
            func(
                &["d"],
                vec![ret(Some(object(vec![("got", ident("d"))])))],
            ),
        ])])
    };
    let interp = extract(
        &[("dep", dep), ("a", requester("a")), ("b", requester("b"))],
        &["a", "b"],
    );
    let shared = module_value(&interp, "dep");
    let a_got = prop(&module_value(&interp, "a"), "got");
    let b_got = prop(&module_value(&interp, "b"), "got");
    assert!(Rc::ptr_eq(&a_got, &shared));
    assert!(Rc::ptr_eq(&b_got, &shared));
}

#[test]
fn an_identity_factory_exports_its_dependency() {
    let dep = program(vec![define(vec![array(vec![]), returning(object(vec![]))])]);
    let wrap = program(vec![define(vec![
        array(vec![str_lit("dep")]),
        func(&["d"], vec![ret(Some(ident("d")))]),
    ])]);
    let interp = extract(&[("dep", dep), ("wrap", wrap)], &["wrap"]);
    assert!(Rc::ptr_eq(
        &module_value(&interp, "wrap"),
        &module_value(&interp, "dep")
    ));

    let dep_module = interp.graph.get("dep").unwrap();
    assert_eq!(dep_module.borrow().reverse_dependencies, vec!["wrap"]);
    let wrap_module = interp.graph.get("wrap").unwrap();
    assert_eq!(wrap_module.borrow().dependencies, vec!["dep"]);
}

#[test]
fn relative_ids_resolve_against_the_requester() {
    let main = program(vec![define(vec![
        array(vec![str_lit("./store")]),
        func(&["store"], vec![ret(Some(ident("store")))]),
    ])]);
    let store = program(vec![define(vec![array(vec![]), returning(object(vec![]))])]);
    let interp = extract(&[("pkg/main", main), ("pkg/store", store)], &["pkg/main"]);
    let main_module = interp.graph.get("pkg/main").unwrap();
    assert_eq!(main_module.borrow().dependencies, vec!["pkg/store"]);
}

#[test]
fn plugin_dependencies_degrade_with_a_warning() {
    let tree = program(vec![define(vec![
        array(vec![str_lit("text!tmpl.html")]),
        func(&["tmpl"], vec![ret(Some(ident("tmpl")))]),
    ])]);
    let interp = extract(&[("app", tree)], &["app"]);
    assert!(interp.graph.get("app").is_some());
    assert!(interp
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("plugin")));
    assert_eq!(
        module_value(&interp, "app").borrow().kind,
        ValueKind::Undefined
    );
}

#[test]
fn a_missing_dependency_degrades_with_a_warning() {
    let tree = program(vec![define(vec![
        array(vec![str_lit("ghost")]),
        func(&["g"], vec![ret(Some(object(vec![])))]),
    ])]);
    let interp = extract(&[("app", tree)], &["app"]);
    assert!(interp.graph.get("app").is_some());
    assert!(interp
        .diagnostics
        .iter()
        .any(|d| d.message.contains("missing dependency 'ghost'")));
}

// ---------------------------------------------------------------------------
// cycles and duplicates
// ---------------------------------------------------------------------------

#[test]
fn a_dependency_cycle_completes_with_a_diagnostic() {
    let x = program(vec![define(vec![
        array(vec![str_lit("y")]),
        func(&["y"], vec![ret(Some(object(vec![])))]),
    ])]);
    let y = program(vec![define(vec![
        array(vec![str_lit("x")]),
        func(&["x"], vec![ret(Some(object(vec![])))]),
    ])]);
    let interp = extract(&[("x", x), ("y", y)], &["x"]);
    assert!(interp.graph.get("x").is_some());
    assert!(interp.graph.get("y").is_some());
    assert!(interp
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("circular")));
}

// ---------------------------------------------------------------------------
// handler extension
// ---------------------------------------------------------------------------

fn marker_action(
    interp: &mut amdoc::Interpreter,
    _site: &amdoc::handlers::CallSite,
) -> Result<Option<amdoc::value::ValueRef>, ExtractError> {
    Ok(Some(interp.fresh(ValueKind::Object)))
}

#[test]
fn a_handler_can_recognize_a_module_export() {
    use amdoc::handlers::{CallHandlers, Handler, Recognizer};
    use amdoc::{Interpreter, MemorySource};

    let hub = program(vec![define(vec![
        array(vec![]),
        returning(func(&[], vec![])),
    ])]);
    let app = program(vec![define(vec![
        array(vec![str_lit("hub")]),
        func(&["hub"], vec![ret(Some(call(ident("hub"), vec![])))]),
    ])]);

    let mut source = MemorySource::new();
    source.insert("hub", hub);
    source.insert("app", app);

    let mut interp = Interpreter::new(Box::new(source));
    let mut handlers = CallHandlers::standard(interp.well_known());
    handlers.register(Handler {
        name: "hub-call",
        recognizer: Recognizer::ModuleValue("hub".to_string()),
        action: marker_action,
    });
    interp.set_handlers(handlers);
    interp.run("app").expect("extraction failed");

    // calling the hub export now has a handler-defined meaning
    assert_eq!(
        module_value(&interp, "app").borrow().kind,
        ValueKind::Object
    );
}

#[test]
fn duplicate_module_ids_are_fatal() {
    let first = program(vec![define(vec![
        str_lit("dup"),
        array(vec![]),
        returning(object(vec![])),
    ])]);
    let second = program(vec![define(vec![
        str_lit("dup"),
        array(vec![]),
        returning(object(vec![])),
    ])]);
    let err = extract_err(&[("one", first), ("two", second)], &["one", "two"]);
    assert!(matches!(err, ExtractError::DuplicateModule(id) if id == "dup"));
}
