//! Tree node types.
//!
//! One variant per source construct. The grammar is flat: binary operators
//! take exactly two operands (no chaining without parentheses), `if` always
//! carries an `else` arm, and method bodies are declarations, statements,
//! then a single trailing return expression.

/// A whole compilation unit: the entry class followed by the ordinary
/// classes in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub main: MainClass,
    pub classes: Vec<ClassDecl>,
}

/// The entry class. Its single static method is the process entry point;
/// it has locals and statements but no fields, no return value and no
/// callable methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainClass {
    pub name: String,
    /// Name of the `String[]` parameter of the entry method. Carried for
    /// completeness; nothing in the language can read it.
    pub arg_name: String,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Statement>,
}

/// An ordinary class declaration, optionally extending a parent declared
/// earlier in the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
}

/// A field, local or parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub ty: TypeTag,
    pub name: String,
}

/// A method declaration. The body is locals, then statements, then the
/// return expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub return_ty: TypeTag,
    pub name: String,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Statement>,
    pub ret: Expr,
}

/// Source types. Class types are carried by name; resolution against the
/// class table happens in the layout pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    Boolean,
    IntArray,
    Class(String),
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `{ ... }`
    Block(Vec<Statement>),

    /// `name = value;` — the target is a bare identifier, resolved to a
    /// local, parameter or field at emission time.
    Assign { target: String, value: Expr },

    /// `name[index] = value;`
    ArrayAssign {
        target: String,
        index: Expr,
        value: Expr,
    },

    /// `if (cond) then_arm else else_arm` — the else arm is mandatory.
    If {
        cond: Expr,
        then_arm: Box<Statement>,
        else_arm: Box<Statement>,
    },

    /// `while (cond) body`
    While { cond: Expr, body: Box<Statement> },

    /// `System.out.println(value);`
    Print(Expr),
}

/// Two-operand operators below `&&` in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Less,
    Add,
    Sub,
    Mul,
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `lhs && rhs`, short-circuit.
    And { lhs: Box<Expr>, rhs: Box<Expr> },

    /// `lhs < rhs`, `lhs + rhs`, `lhs - rhs`, `lhs * rhs`.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// `array[index]`
    ArrayLookup { array: Box<Expr>, index: Box<Expr> },

    /// `array.length`
    ArrayLength(Box<Expr>),

    /// `receiver.method(args)`
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },

    /// Decimal integer literal.
    Int(i32),

    True,

    False,

    /// Variable, parameter or field read.
    Ident(String),

    This,

    /// `new int[size]`
    NewArray(Box<Expr>),

    /// `new Class()`
    NewObject(String),

    /// `!value`
    Not(Box<Expr>),

    /// `(inner)` — kept as a node so both passes traverse the same shape.
    Paren(Box<Expr>),
}
