/// Syntax-tree input surface.
///
/// Trees arrive pre-parsed (the lexer/parser is an external collaborator);
/// the node set mirrors the SpiderMonkey/esprima statement and expression
/// grammar that AMD-style sources are parsed into. Nodes deserialize from
/// the parser's JSON output via the `type` tag.
use serde::{Deserialize, Serialize};

/// Source position of a node, for diagnostics and comment correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Var,
    Let,
    Const,
}

impl BindingKind {
    /// Whether declarations of this kind hoist to the enclosing function
    /// scope (as opposed to the enclosing block).
    pub fn is_function_scoped(&self) -> bool {
        matches!(self, BindingKind::Var)
    }
}

/// A single `name = init` inside a variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarator {
    pub name: String,
    #[serde(default)]
    pub init: Option<Box<Node>>,
    #[serde(default)]
    pub span: Span,
}

/// A declared function parameter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

/// An `{ key: value }` member of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Node,
    #[serde(default)]
    pub span: Span,
}

/// One `case expr:` (or `default:`) arm of a switch statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    #[serde(default)]
    pub test: Option<Box<Node>>,
    #[serde(default)]
    pub consequent: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: String,
    pub body: Box<Node>,
}

/// Literal payloads. Untagged so `1`, `"x"`, `true` and `null` deserialize
/// directly; regular expressions arrive as `{ "regexp": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    RegExp { regexp: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------
    Program {
        body: Vec<Node>,
    },
    Block {
        body: Vec<Node>,
    },
    Expression {
        expression: Box<Node>,
    },
    VarDecl {
        kind: BindingKind,
        declarations: Vec<Declarator>,
        #[serde(default)]
        span: Span,
    },
    FunctionDecl {
        name: String,
        params: Vec<Param>,
        body: Box<Node>,
        #[serde(default)]
        span: Span,
    },
    Return {
        #[serde(default)]
        argument: Option<Box<Node>>,
        #[serde(default)]
        span: Span,
    },
    If {
        test: Box<Node>,
        consequent: Box<Node>,
        #[serde(default)]
        alternate: Option<Box<Node>>,
    },
    While {
        test: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        test: Box<Node>,
    },
    For {
        #[serde(default)]
        init: Option<Box<Node>>,
        #[serde(default)]
        test: Option<Box<Node>>,
        #[serde(default)]
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForIn {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
    },
    Switch {
        discriminant: Box<Node>,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: Box<Node>,
        #[serde(default)]
        handler: Option<CatchClause>,
        #[serde(default)]
        finalizer: Option<Box<Node>>,
    },
    Throw {
        argument: Box<Node>,
        #[serde(default)]
        span: Span,
    },
    Labeled {
        label: String,
        body: Box<Node>,
    },
    Break,
    Continue,
    Empty,
    Debugger,

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------
    Identifier {
        name: String,
        #[serde(default)]
        span: Span,
    },
    This {
        #[serde(default)]
        span: Span,
    },
    Literal {
        value: LiteralValue,
        #[serde(default)]
        span: Span,
    },
    Array {
        /// `None` elements are elisions (`[1, , 3]`).
        elements: Vec<Option<Node>>,
    },
    Object {
        properties: Vec<Property>,
        #[serde(default)]
        span: Span,
    },
    FunctionExpr {
        #[serde(default)]
        name: Option<String>,
        params: Vec<Param>,
        body: Box<Node>,
        #[serde(default)]
        span: Span,
    },
    Member {
        object: Box<Node>,
        property: Box<Node>,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        span: Span,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
        #[serde(default)]
        span: Span,
    },
    New {
        callee: Box<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
        #[serde(default)]
        span: Span,
    },
    Assignment {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
        #[serde(default)]
        span: Span,
    },
    Logical {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    Binary {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        operator: String,
        argument: Box<Node>,
    },
    Update {
        argument: Box<Node>,
    },
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    Sequence {
        expressions: Vec<Node>,
    },
}

impl Node {
    /// Best-effort source position, for diagnostics.
    pub fn span(&self) -> Span {
        match self {
            Node::VarDecl { span, .. }
            | Node::FunctionDecl { span, .. }
            | Node::Return { span, .. }
            | Node::Throw { span, .. }
            | Node::Identifier { span, .. }
            | Node::This { span, .. }
            | Node::Literal { span, .. }
            | Node::Object { span, .. }
            | Node::FunctionExpr { span, .. }
            | Node::Member { span, .. }
            | Node::Call { span, .. }
            | Node::New { span, .. }
            | Node::Assignment { span, .. } => *span,
            Node::Expression { expression } => expression.span(),
            _ => Span::default(),
        }
    }
}
