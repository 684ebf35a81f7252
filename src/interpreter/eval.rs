/// Expression reading.
use std::rc::Rc;

use crate::ast::{LiteralValue, Node, Param};
use crate::diagnostics::{ExtractError, Severity};
use crate::handlers::CallSite;
use crate::scope::{AssignError, Scope};
use crate::value::{self, Parameter, Scalar, ValueKind, ValueRef};

use super::Interpreter;

/// An evaluated expression: the value it stands for, plus the reference
/// path it was reached through, when there is one. Call handlers use the
/// path to recognize callees by name when identity is not enough.
pub struct Evaluated {
    pub value: ValueRef,
    pub path: Option<Vec<String>>,
}

impl Evaluated {
    fn anonymous(value: ValueRef) -> Evaluated {
        Evaluated { value, path: None }
    }
}

impl Interpreter {
    pub(crate) fn read_expr(&mut self, node: &Node) -> Result<Evaluated, ExtractError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExtractError::BudgetExceeded(self.max_depth));
        }
        let result = self.read_expr_inner(node);
        self.depth -= 1;
        result
    }

    fn read_expr_inner(&mut self, node: &Node) -> Result<Evaluated, ExtractError> {
        match node {
            Node::Identifier { name, span } => {
                let path = vec![name.clone()];
                let mut notes = Vec::new();
                let value = Scope::resolve(&self.current_scope(), &path, &mut notes);
                self.stamp(notes, *span);
                Ok(Evaluated {
                    value,
                    path: Some(path),
                })
            }

            Node::This { span } => {
                let path = vec!["this".to_string()];
                let mut notes = Vec::new();
                let value = Scope::resolve(&self.current_scope(), &path, &mut notes);
                self.stamp(notes, *span);
                Ok(Evaluated {
                    value,
                    path: Some(path),
                })
            }

            Node::Literal { value, .. } => Ok(Evaluated::anonymous(self.literal_value(value))),

            Node::Array { elements } => {
                let array = self.fresh(ValueKind::Array);
                for element in elements {
                    let value = match element {
                        Some(expr) => self.read_expr(expr)?.value,
                        // elision
                        None => self.fresh(ValueKind::Undefined),
                    };
                    array.borrow_mut().elements.push(value);
                }
                Ok(Evaluated::anonymous(array))
            }

            Node::Object { properties, .. } => {
                let object = self.fresh(ValueKind::Object);
                for property in properties {
                    let evaluated = self.read_expr(&property.value)?;
                    if let Some(docs) = &self.docs {
                        if let Some(meta) = docs.metadata_for(&property.value, Some(node)) {
                            evaluated.value.borrow_mut().metadata.merge_from(&meta);
                        }
                    }
                    let mut notes = Vec::new();
                    value::set_property(
                        &object,
                        std::slice::from_ref(&property.key),
                        evaluated.value,
                        true,
                        &mut notes,
                    );
                    self.stamp(notes, property.span);
                }
                Ok(Evaluated::anonymous(object))
            }

            Node::FunctionExpr {
                name, params, body, ..
            } => {
                let function = self.read_function(name.as_deref(), params, body)?;
                if let Some(docs) = &self.docs {
                    if let Some(meta) = docs.metadata_for(node, None) {
                        function.borrow_mut().metadata.merge_from(&meta);
                    }
                }
                Ok(Evaluated::anonymous(function))
            }

            Node::Member {
                object,
                property,
                computed,
                span,
            } => {
                if let Some(path) = self.member_path(node)? {
                    let mut notes = Vec::new();
                    let value = Scope::resolve(&self.current_scope(), &path, &mut notes);
                    self.stamp(notes, *span);
                    return Ok(Evaluated {
                        value,
                        path: Some(path),
                    });
                }
                // the base is not a plain reference: evaluate it and take a
                // single property step off the result
                let base = self.read_expr(object)?;
                let name = if *computed {
                    None
                } else {
                    static_property_name(property)
                };
                let value = name
                    .and_then(|name| value::get_own_or_prototype_property(&base.value, &name))
                    .unwrap_or_else(|| self.fresh(ValueKind::Undefined));
                Ok(Evaluated::anonymous(value))
            }

            Node::Call {
                callee,
                arguments,
                span,
            } => {
                let evaluated = self.read_expr(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.read_expr(argument)?.value);
                }
                let site = CallSite {
                    callee: evaluated.value,
                    path: evaluated.path,
                    args,
                    span: *span,
                };
                let value = self
                    .dispatch_call(&site)?
                    .unwrap_or_else(|| self.fresh(ValueKind::Undefined));
                Ok(Evaluated::anonymous(value))
            }

            Node::New {
                callee, arguments, ..
            } => {
                let target = self.read_expr(callee)?;
                for argument in arguments {
                    self.read_expr(argument)?;
                }
                // instantiation is what proves a function is a constructor
                if target.value.borrow().kind == ValueKind::Function {
                    target.value.borrow_mut().set_kind(ValueKind::Constructor);
                }
                let instance = self.fresh(ValueKind::Instance);
                instance.borrow_mut().instance_of = Some(target.value);
                Ok(Evaluated::anonymous(instance))
            }

            Node::Assignment {
                operator,
                left,
                right,
                span,
            } => self.read_assignment(operator, left, right, *span),

            Node::Logical {
                operator,
                left,
                right,
            } => {
                let lhs = self.read_expr(left)?;
                let rhs = self.read_expr(right)?;
                // `a || b` is the default-value idiom: the left side wins
                // only when it is known truthy
                let statically_truthy = lhs
                    .value
                    .borrow()
                    .scalar
                    .as_ref()
                    .map(Scalar::is_truthy)
                    .unwrap_or(false);
                if operator == "||" && statically_truthy {
                    Ok(lhs)
                } else {
                    Ok(rhs)
                }
            }

            Node::Binary { left, right, .. } => {
                self.read_expr(left)?;
                self.read_expr(right)?;
                Ok(Evaluated::anonymous(self.fresh(ValueKind::Any)))
            }

            Node::Unary { argument, .. } => {
                self.read_expr(argument)?;
                Ok(Evaluated::anonymous(self.fresh(ValueKind::Any)))
            }

            Node::Update { argument } => self.read_expr(argument),

            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.read_expr(test)?;
                self.read_expr(consequent)?;
                self.read_expr(alternate)?;
                Ok(Evaluated::anonymous(self.fresh(ValueKind::Any)))
            }

            Node::Sequence { expressions } => {
                let mut last = None;
                for expression in expressions {
                    last = Some(self.read_expr(expression)?);
                }
                Ok(last.unwrap_or_else(|| {
                    Evaluated::anonymous(self.fresh(ValueKind::Undefined))
                }))
            }

            stmt => {
                // a statement in expression position (parser quirk)
                self.read_statement(stmt)?;
                Ok(Evaluated::anonymous(self.fresh(ValueKind::Undefined)))
            }
        }
    }

    fn read_assignment(
        &mut self,
        operator: &str,
        left: &Node,
        right: &Node,
        span: crate::ast::Span,
    ) -> Result<Evaluated, ExtractError> {
        let path = self.member_path(left)?;

        if operator != "=" {
            // compound operators compute an unknowable result, so the
            // target keeps its current binding
            self.read_expr(right)?;
            let value = match &path {
                Some(path) => {
                    let mut notes = Vec::new();
                    let value = Scope::resolve(&self.current_scope(), path, &mut notes);
                    self.stamp(notes, span);
                    value
                }
                None => self.fresh(ValueKind::Any),
            };
            return Ok(Evaluated { value, path });
        }

        let evaluated = self.read_expr(right)?;
        if let Some(docs) = &self.docs {
            if let Some(meta) = docs.metadata_for(right, None) {
                evaluated.value.borrow_mut().metadata.merge_from(&meta);
            }
        }

        match path {
            Some(path) => {
                let mut notes = Vec::new();
                let global = self.global_scope();
                let scope = self.current_scope();
                let outcome = Scope::assign(
                    &scope,
                    &global,
                    &path,
                    evaluated.value.clone(),
                    false,
                    &mut notes,
                );
                self.stamp(notes, span);
                match outcome {
                    Ok(()) => Ok(Evaluated {
                        value: evaluated.value,
                        path: Some(path),
                    }),
                    Err(AssignError::This) => Err(ExtractError::AssignToThis {
                        file: self.current_file(),
                        span,
                    }),
                }
            }
            None => {
                self.diag(
                    Severity::Warning,
                    "assignment to an unresolvable target",
                    Some(span),
                );
                Ok(Evaluated::anonymous(evaluated.value))
            }
        }
    }

    /// Flatten a reference expression into a name path. Computed members
    /// must index with a statically-known string or number; anything else
    /// (and any base that is not itself a reference) yields `None`.
    fn member_path(&mut self, node: &Node) -> Result<Option<Vec<String>>, ExtractError> {
        match node {
            Node::Identifier { name, .. } => Ok(Some(vec![name.clone()])),
            Node::This { .. } => Ok(Some(vec!["this".to_string()])),
            Node::Member {
                object,
                property,
                computed,
                span,
            } => {
                let mut base = match self.member_path(object)? {
                    Some(base) => base,
                    None => return Ok(None),
                };
                let name = if *computed {
                    let index = self.read_expr(property)?;
                    let scalar = index.value.borrow().scalar.clone();
                    match scalar {
                        Some(Scalar::Str(s)) => Some(s),
                        Some(Scalar::Number(n)) => Some(format_number(n)),
                        _ => {
                            self.diag(
                                Severity::Warning,
                                "computed member index is not statically known",
                                Some(*span),
                            );
                            None
                        }
                    }
                } else {
                    static_property_name(property)
                };
                match name {
                    Some(name) => {
                        base.push(name);
                        Ok(Some(base))
                    }
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    fn literal_value(&self, literal: &LiteralValue) -> ValueRef {
        let (kind, scalar) = match literal {
            LiteralValue::Null => (ValueKind::Null, None),
            LiteralValue::Bool(b) => (ValueKind::Boolean, Some(Scalar::Bool(*b))),
            LiteralValue::Number(n) => (ValueKind::Number, Some(Scalar::Number(*n))),
            LiteralValue::Str(s) => (ValueKind::String, Some(Scalar::Str(s.clone()))),
            LiteralValue::RegExp { regexp } => {
                (ValueKind::RegExp, Some(Scalar::RegExp(regexp.clone())))
            }
        };
        let value = self.fresh(kind);
        value.borrow_mut().scalar = scalar;
        value
    }

    /// Build a function value by reading its body eagerly, with parameters
    /// standing in as placeholders. The body is retained so a call handler
    /// can replay it later with real bindings.
    pub(crate) fn read_function(
        &mut self,
        self_name: Option<&str>,
        params: &[Param],
        body: &Node,
    ) -> Result<ValueRef, ExtractError> {
        let function = self.fresh(ValueKind::Function);
        {
            let mut f = function.borrow_mut();
            f.parameters = params.iter().map(|p| Parameter::named(&p.name)).collect();
            f.body = Some(Rc::new(body.clone()));
        }

        let scope = self.push_scope(Some(function.clone()));
        for param in params {
            let placeholder = self.fresh(ValueKind::Parameter);
            Scope::declare(&scope, &param.name, Some(placeholder), &mut Vec::new());
        }
        // a parameter sharing the function's own name shadows it
        if let Some(name) = self_name {
            Scope::declare(&scope, name, Some(function.clone()), &mut Vec::new());
        }

        let result = self.read_function_body(body);
        function.borrow_mut().scope = Some(scope);
        self.pop_scope()?;
        result?;

        Ok(function)
    }

    /// Replay a function body with concrete argument bindings. Returns the
    /// return values this particular invocation produced.
    pub(crate) fn call_function(
        &mut self,
        function: &ValueRef,
        args: &[ValueRef],
    ) -> Result<Vec<ValueRef>, ExtractError> {
        let body = match function.borrow().body.clone() {
            Some(body) => body,
            None => return Ok(Vec::new()),
        };
        let parameters = function.borrow().parameters.clone();
        let returns_before = function.borrow().returns.len();

        let scope = self.push_scope(Some(function.clone()));
        for (i, parameter) in parameters.iter().enumerate() {
            let bound = args
                .get(i)
                .cloned()
                .unwrap_or_else(|| self.fresh(ValueKind::Parameter));
            Scope::declare(&scope, &parameter.name, Some(bound), &mut Vec::new());
        }

        let result = self.read_function_body(&body);
        self.pop_scope()?;
        result?;

        let returns = function.borrow().returns[returns_before..].to_vec();
        Ok(returns)
    }

    fn read_function_body(&mut self, body: &Node) -> Result<(), ExtractError> {
        let statements: &[Node] = match body {
            Node::Block { body } => body,
            other => std::slice::from_ref(other),
        };
        self.hoist_var(statements)?;
        self.hoist_let(statements);
        for statement in statements {
            self.read_statement(statement)?;
        }
        Ok(())
    }
}

fn static_property_name(property: &Node) -> Option<String> {
    match property {
        Node::Identifier { name, .. } => Some(name.clone()),
        Node::Literal {
            value: LiteralValue::Str(s),
            ..
        } => Some(s.clone()),
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
