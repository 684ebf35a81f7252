/// Statement reading: hoisting passes and the statement walk.
///
/// Every branch is visited unconditionally; conditions and loop bounds are
/// read for their side effects but never decide anything.
use crate::ast::Node;
use crate::diagnostics::ExtractError;
use crate::scope::Scope;
use crate::value::{Value, ValueKind};

use super::Interpreter;

impl Interpreter {
    pub(crate) fn read_statement(&mut self, node: &Node) -> Result<(), ExtractError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExtractError::BudgetExceeded(self.max_depth));
        }
        let result = self.read_statement_inner(node);
        self.depth -= 1;
        result
    }

    fn read_statement_inner(&mut self, node: &Node) -> Result<(), ExtractError> {
        match node {
            Node::Program { body } => {
                self.hoist_var(body)?;
                self.hoist_let(body);
                for stmt in body {
                    self.read_statement(stmt)?;
                }
            }

            Node::Block { body } => {
                self.push_scope(None);
                self.hoist_let(body);
                let result = self.read_block_body(body);
                self.pop_scope()?;
                result?;
            }

            Node::Expression { expression } => {
                self.read_expr(expression)?;
            }

            Node::VarDecl { declarations, .. } => {
                for decl in declarations {
                    let init = match &decl.init {
                        Some(init) => init,
                        None => continue,
                    };
                    let evaluated = self.read_expr(init)?;
                    if let Some(docs) = &self.docs {
                        if let Some(meta) = docs.metadata_for(init, Some(node)) {
                            evaluated.value.borrow_mut().metadata.merge_from(&meta);
                        }
                    }
                    let mut notes = Vec::new();
                    let path = vec![decl.name.clone()];
                    let global = self.global_scope();
                    let scope = self.current_scope();
                    // the name was declared by a hoisting pass, so this
                    // cannot fail on `this`
                    let _ = Scope::assign(&scope, &global, &path, evaluated.value, true, &mut notes);
                    self.stamp(notes, decl.span);
                }
            }

            // bound during var hoisting
            Node::FunctionDecl { .. } => {}

            Node::Return { argument, span } => {
                let value = match argument {
                    Some(arg) => self.read_expr(arg)?.value,
                    None => self.fresh(ValueKind::Undefined),
                };
                match self.enclosing_function() {
                    Some(function) => function.borrow_mut().returns.push(value),
                    None => {
                        return Err(ExtractError::ReturnOutsideFunction {
                            file: self.current_file(),
                            span: *span,
                        })
                    }
                }
            }

            Node::Throw { argument, .. } => {
                let value = self.read_expr(argument)?.value;
                if let Some(function) = self.enclosing_function() {
                    function.borrow_mut().throws.push(value);
                }
            }

            Node::If {
                test,
                consequent,
                alternate,
            } => {
                self.read_expr(test)?;
                self.read_statement(consequent)?;
                if let Some(alternate) = alternate {
                    self.read_statement(alternate)?;
                }
            }

            Node::While { test, body } | Node::DoWhile { body, test } => {
                self.read_expr(test)?;
                self.read_statement(body)?;
            }

            Node::For {
                init,
                test,
                update,
                body,
            } => {
                if let Some(init) = init {
                    match init.as_ref() {
                        decl @ Node::VarDecl { .. } => self.read_statement(decl)?,
                        expr => {
                            self.read_expr(expr)?;
                        }
                    }
                }
                if let Some(test) = test {
                    self.read_expr(test)?;
                }
                if let Some(update) = update {
                    self.read_expr(update)?;
                }
                self.read_statement(body)?;
            }

            Node::ForIn { left, right, body } => {
                self.read_expr(right)?;
                match left.as_ref() {
                    Node::VarDecl { .. } => {} // names declared by hoisting
                    expr => {
                        self.read_expr(expr)?;
                    }
                }
                self.read_statement(body)?;
            }

            Node::Switch {
                discriminant,
                cases,
            } => {
                self.read_expr(discriminant)?;
                // the switch body is a single block scope shared by all arms
                self.push_scope(None);
                for case in cases {
                    self.hoist_let(&case.consequent);
                }
                let mut result = Ok(());
                'cases: for case in cases {
                    if let Some(test) = &case.test {
                        if let Err(err) = self.read_expr(test) {
                            result = Err(err);
                            break 'cases;
                        }
                    }
                    for stmt in &case.consequent {
                        if let Err(err) = self.read_statement(stmt) {
                            result = Err(err);
                            break 'cases;
                        }
                    }
                }
                self.pop_scope()?;
                result?;
            }

            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                self.read_statement(block)?;
                if let Some(handler) = handler {
                    self.push_scope(None);
                    let scope = self.current_scope();
                    Scope::declare(&scope, &handler.param, Some(Value::undefined_ref()), &mut Vec::new());
                    let result = self.read_statement(&handler.body);
                    self.pop_scope()?;
                    result?;
                }
                if let Some(finalizer) = finalizer {
                    self.read_statement(finalizer)?;
                }
            }

            Node::Labeled { body, .. } => {
                self.read_statement(body)?;
            }

            Node::Break | Node::Continue | Node::Empty | Node::Debugger => {}

            expr => {
                self.read_expr(expr)?;
            }
        }
        Ok(())
    }

    fn read_block_body(&mut self, body: &[Node]) -> Result<(), ExtractError> {
        for stmt in body {
            self.read_statement(stmt)?;
        }
        Ok(())
    }

    /// Declare block-scoped (`let`/`const`) names in the current scope.
    /// Does not descend: nested blocks hoist their own.
    pub(super) fn hoist_let(&mut self, body: &[Node]) {
        for stmt in body {
            match stmt {
                Node::VarDecl {
                    kind, declarations, ..
                } if !kind.is_function_scoped() => {
                    let scope = self.current_scope();
                    for decl in declarations {
                        Scope::declare(&scope, &decl.name, None, &mut Vec::new());
                    }
                }
                Node::Labeled { body, .. } => self.hoist_let(std::slice::from_ref(body)),
                _ => {}
            }
        }
    }

    /// Hoist function-scoped declarations into the current (function)
    /// scope, in two sub-passes: first every `var` and function name
    /// becomes a placeholder, then the function values themselves are
    /// built and bound. The split means mutually-referencing functions
    /// see each other's names while their bodies are read.
    pub(super) fn hoist_var(&mut self, body: &[Node]) -> Result<(), ExtractError> {
        self.hoist_var_names(body);
        self.hoist_var_functions(body)
    }

    fn hoist_var_names(&mut self, body: &[Node]) {
        for stmt in body {
            self.hoist_names_in(stmt);
        }
    }

    fn hoist_names_in(&mut self, stmt: &Node) {
        match stmt {
            Node::VarDecl {
                kind, declarations, ..
            } if kind.is_function_scoped() => {
                let scope = self.current_scope();
                for decl in declarations {
                    Scope::declare(&scope, &decl.name, None, &mut Vec::new());
                }
            }
            Node::FunctionDecl { name, .. } => {
                let scope = self.current_scope();
                Scope::declare(&scope, name, None, &mut Vec::new());
            }
            Node::Block { body } => self.hoist_var_names(body),
            Node::If {
                consequent,
                alternate,
                ..
            } => {
                self.hoist_names_in(consequent);
                if let Some(alternate) = alternate {
                    self.hoist_names_in(alternate);
                }
            }
            Node::While { body, .. }
            | Node::DoWhile { body, .. }
            | Node::Labeled { body, .. } => self.hoist_names_in(body),
            Node::For { init, body, .. } => {
                if let Some(init) = init {
                    self.hoist_names_in(init);
                }
                self.hoist_names_in(body);
            }
            Node::ForIn { left, body, .. } => {
                self.hoist_names_in(left);
                self.hoist_names_in(body);
            }
            Node::Switch { cases, .. } => {
                for case in cases {
                    self.hoist_var_names(&case.consequent);
                }
            }
            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                self.hoist_names_in(block);
                if let Some(handler) = handler {
                    self.hoist_names_in(&handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.hoist_names_in(finalizer);
                }
            }
            _ => {}
        }
    }

    fn hoist_var_functions(&mut self, body: &[Node]) -> Result<(), ExtractError> {
        for stmt in body {
            self.hoist_functions_in(stmt)?;
        }
        Ok(())
    }

    fn hoist_functions_in(&mut self, stmt: &Node) -> Result<(), ExtractError> {
        match stmt {
            Node::FunctionDecl {
                name,
                params,
                body,
                span,
            } => {
                let function = self.read_function(Some(name.as_str()), params, body)?;
                if let Some(docs) = &self.docs {
                    if let Some(meta) = docs.metadata_for(stmt, None) {
                        function.borrow_mut().metadata.merge_from(&meta);
                    }
                }
                let scope = self.current_scope();
                let mut notes = Vec::new();
                Scope::declare(&scope, name, Some(function), &mut notes);
                self.stamp(notes, *span);
            }
            Node::Block { body } => self.hoist_var_functions(body)?,
            Node::If {
                consequent,
                alternate,
                ..
            } => {
                self.hoist_functions_in(consequent)?;
                if let Some(alternate) = alternate {
                    self.hoist_functions_in(alternate)?;
                }
            }
            Node::While { body, .. }
            | Node::DoWhile { body, .. }
            | Node::Labeled { body, .. } => self.hoist_functions_in(body)?,
            Node::For { init, body, .. } => {
                if let Some(init) = init {
                    self.hoist_functions_in(init)?;
                }
                self.hoist_functions_in(body)?;
            }
            Node::ForIn { body, .. } => self.hoist_functions_in(body)?,
            Node::Switch { cases, .. } => {
                for case in cases {
                    self.hoist_var_functions(&case.consequent)?;
                }
            }
            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                self.hoist_functions_in(block)?;
                if let Some(handler) = handler {
                    self.hoist_functions_in(&handler.body)?;
                }
                if let Some(finalizer) = finalizer {
                    self.hoist_functions_in(finalizer)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
