#![allow(dead_code)]

use amdoc::ast::{Declarator, LiteralValue, Node, Param, Property, Span};
use amdoc::value::ValueRef;
use amdoc::{ExtractError, Interpreter, MemorySource};

// ---------------------------------------------------------------------------
// tree builders
// ---------------------------------------------------------------------------

pub fn program(body: Vec<Node>) -> Node {
    Node::Program { body }
}

pub fn block(body: Vec<Node>) -> Node {
    Node::Block { body }
}

pub fn expr_stmt(expression: Node) -> Node {
    Node::Expression {
        expression: Box::new(expression),
    }
}

pub fn ident(name: &str) -> Node {
    Node::Identifier {
        name: name.to_string(),
        span: Span::default(),
    }
}

pub fn this_expr() -> Node {
    Node::This {
        span: Span::default(),
    }
}

pub fn str_lit(value: &str) -> Node {
    Node::Literal {
        value: LiteralValue::Str(value.to_string()),
        span: Span::default(),
    }
}

pub fn num_lit(value: f64) -> Node {
    Node::Literal {
        value: LiteralValue::Number(value),
        span: Span::default(),
    }
}

pub fn array(items: Vec<Node>) -> Node {
    Node::Array {
        elements: items.into_iter().map(Some).collect(),
    }
}

pub fn object(entries: Vec<(&str, Node)>) -> Node {
    Node::Object {
        properties: entries
            .into_iter()
            .map(|(key, value)| Property {
                key: key.to_string(),
                value,
                span: Span::default(),
            })
            .collect(),
        span: Span::default(),
    }
}

pub fn func(params: &[&str], body: Vec<Node>) -> Node {
    Node::FunctionExpr {
        name: None,
        params: params
            .iter()
            .map(|name| Param {
                name: name.to_string(),
                span: Span::default(),
            })
            .collect(),
        body: Box::new(block(body)),
        span: Span::default(),
    }
}

pub fn func_decl(name: &str, params: &[&str], body: Vec<Node>) -> Node {
    Node::FunctionDecl {
        name: name.to_string(),
        params: params
            .iter()
            .map(|name| Param {
                name: name.to_string(),
                span: Span::default(),
            })
            .collect(),
        body: Box::new(block(body)),
        span: Span::default(),
    }
}

pub fn call(callee: Node, arguments: Vec<Node>) -> Node {
    Node::Call {
        callee: Box::new(callee),
        arguments,
        span: Span::default(),
    }
}

pub fn member(object: Node, property: &str) -> Node {
    Node::Member {
        object: Box::new(object),
        property: Box::new(ident(property)),
        computed: false,
        span: Span::default(),
    }
}

pub fn assign(left: Node, right: Node) -> Node {
    Node::Assignment {
        operator: "=".to_string(),
        left: Box::new(left),
        right: Box::new(right),
        span: Span::default(),
    }
}

pub fn logical(operator: &str, left: Node, right: Node) -> Node {
    Node::Logical {
        operator: operator.to_string(),
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn decl(kind: amdoc::ast::BindingKind, name: &str, init: Option<Node>) -> Node {
    Node::VarDecl {
        kind,
        declarations: vec![Declarator {
            name: name.to_string(),
            init: init.map(Box::new),
            span: Span::default(),
        }],
        span: Span::default(),
    }
}

pub fn var_stmt(name: &str, init: Node) -> Node {
    decl(amdoc::ast::BindingKind::Var, name, Some(init))
}

pub fn let_stmt(name: &str, init: Node) -> Node {
    decl(amdoc::ast::BindingKind::Let, name, Some(init))
}

pub fn ret(argument: Option<Node>) -> Node {
    Node::Return {
        argument: argument.map(Box::new),
        span: Span::default(),
    }
}

/// `define(args...)` as a statement.
pub fn define(args: Vec<Node>) -> Node {
    expr_stmt(call(ident("define"), args))
}

// ---------------------------------------------------------------------------
// extraction runners
// ---------------------------------------------------------------------------

pub fn extract(modules: &[(&str, Node)], entries: &[&str]) -> Interpreter {
    let mut source = MemorySource::new();
    for (id, tree) in modules {
        source.insert(id, tree.clone());
    }
    let mut interpreter = Interpreter::new(Box::new(source));
    for entry in entries {
        interpreter
            .run(entry)
            .unwrap_or_else(|err| panic!("extraction of '{}' failed: {}", entry, err));
    }
    interpreter
}

pub fn extract_err(modules: &[(&str, Node)], entries: &[&str]) -> ExtractError {
    let mut source = MemorySource::new();
    for (id, tree) in modules {
        source.insert(id, tree.clone());
    }
    let mut interpreter = Interpreter::new(Box::new(source));
    for entry in entries {
        if let Err(err) = interpreter.run(entry) {
            return err;
        }
    }
    panic!("extraction unexpectedly succeeded");
}

pub fn module_value(interpreter: &Interpreter, id: &str) -> ValueRef {
    let module = interpreter
        .graph
        .get(id)
        .unwrap_or_else(|| panic!("module '{}' not registered", id));
    let value = module.borrow().value.clone();
    value
}

pub fn prop(value: &ValueRef, name: &str) -> ValueRef {
    amdoc::value::get_own_or_prototype_property(value, name)
        .unwrap_or_else(|| panic!("property '{}' not found", name))
}
