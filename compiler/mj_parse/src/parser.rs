//! Recursive-descent parser.
//!
//! One method per grammar production, driven by a flat token cursor. The
//! grammar has no precedence climbing: a binary operator joins exactly two
//! primaries, `&&` joins exactly two clauses, and anything deeper needs
//! parentheses.

use mj_ir::{
    BinaryOp, ClassDecl, Expr, MainClass, MethodDecl, Program, Statement, TypeTag, VarDecl,
};

use crate::error::ParseError;
use crate::lexer::{self, Token, TokenKind};

/// Parse a whole unit.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = lexer::lex(source)?;
    Parser::new(tokens).program()
}

/// Parser state: the token list and a cursor into it.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    // ===== Token access =====

    fn current(&self) -> &Token {
        // The lexer guarantees a trailing Eof token.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> &TokenKind {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.kind()) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) {
        if !matches!(self.kind(), TokenKind::Eof) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ParseError> {
        if self.at(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self.kind().to_string(),
            line: self.current().line,
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = self.kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    // ===== Declarations =====

    fn program(mut self) -> Result<Program, ParseError> {
        let main = self.main_class()?;
        let mut classes = Vec::new();
        while self.at(&TokenKind::Class) {
            classes.push(self.class_decl()?);
        }
        self.expect(&TokenKind::Eof, "`class` or end of input")?;
        Ok(Program { main, classes })
    }

    fn main_class(&mut self) -> Result<MainClass, ParseError> {
        self.expect(&TokenKind::Class, "`class`")?;
        let name = self.ident()?;
        self.expect(&TokenKind::LBrace, "`{`")?;
        self.expect(&TokenKind::Public, "`public`")?;
        self.expect(&TokenKind::Static, "`static`")?;
        self.expect(&TokenKind::Void, "`void`")?;
        self.expect(&TokenKind::Main, "`main`")?;
        self.expect(&TokenKind::LParen, "`(`")?;
        self.expect(&TokenKind::StringKw, "`String`")?;
        self.expect(&TokenKind::LBracket, "`[`")?;
        self.expect(&TokenKind::RBracket, "`]`")?;
        let arg_name = self.ident()?;
        self.expect(&TokenKind::RParen, "`)`")?;
        self.expect(&TokenKind::LBrace, "`{`")?;
        let locals = self.var_decls()?;
        let mut body = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            body.push(self.statement()?);
        }
        self.expect(&TokenKind::RBrace, "`}`")?;
        self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(MainClass {
            name,
            arg_name,
            locals,
            body,
        })
    }

    fn class_decl(&mut self) -> Result<ClassDecl, ParseError> {
        self.expect(&TokenKind::Class, "`class`")?;
        let name = self.ident()?;
        let parent = if self.eat(&TokenKind::Extends) {
            Some(self.ident()?)
        } else {
            None
        };
        self.expect(&TokenKind::LBrace, "`{`")?;
        let fields = self.var_decls()?;
        let mut methods = Vec::new();
        while self.at(&TokenKind::Public) {
            methods.push(self.method_decl()?);
        }
        self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(ClassDecl {
            name,
            parent,
            fields,
            methods,
        })
    }

    fn method_decl(&mut self) -> Result<MethodDecl, ParseError> {
        self.expect(&TokenKind::Public, "`public`")?;
        let return_ty = self.type_tag()?;
        let name = self.ident()?;
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let ty = self.type_tag()?;
                let param = self.ident()?;
                params.push(VarDecl { ty, name: param });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        self.expect(&TokenKind::LBrace, "`{`")?;
        let locals = self.var_decls()?;
        let mut body = Vec::new();
        while !self.at(&TokenKind::Return) {
            body.push(self.statement()?);
        }
        self.expect(&TokenKind::Return, "`return`")?;
        let ret = self.expression()?;
        self.expect(&TokenKind::Semi, "`;`")?;
        self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(MethodDecl {
            return_ty,
            name,
            params,
            locals,
            body,
            ret,
        })
    }

    /// Zero or more `Type name;` declarations. A body switches from
    /// declarations to statements at the first token run that cannot start
    /// a declaration; `name name` needs one token of lookahead to tell a
    /// class-typed declaration from an assignment.
    fn var_decls(&mut self) -> Result<Vec<VarDecl>, ParseError> {
        let mut decls = Vec::new();
        while self.starts_var_decl() {
            let ty = self.type_tag()?;
            let name = self.ident()?;
            self.expect(&TokenKind::Semi, "`;`")?;
            decls.push(VarDecl { ty, name });
        }
        Ok(decls)
    }

    fn starts_var_decl(&self) -> bool {
        match self.kind() {
            TokenKind::Int | TokenKind::Boolean => true,
            TokenKind::Ident(_) => matches!(self.peek_kind(), TokenKind::Ident(_)),
            _ => false,
        }
    }

    fn type_tag(&mut self) -> Result<TypeTag, ParseError> {
        match self.kind() {
            TokenKind::Int => {
                self.advance();
                if self.eat(&TokenKind::LBracket) {
                    self.expect(&TokenKind::RBracket, "`]`")?;
                    Ok(TypeTag::IntArray)
                } else {
                    Ok(TypeTag::Int)
                }
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(TypeTag::Boolean)
            }
            TokenKind::Ident(_) => Ok(TypeTag::Class(self.ident()?)),
            _ => Err(self.unexpected("a type")),
        }
    }

    // ===== Statements =====

    fn statement(&mut self) -> Result<Statement, ParseError> {
        match self.kind() {
            TokenKind::LBrace => {
                self.advance();
                let mut stmts = Vec::new();
                while !self.at(&TokenKind::RBrace) {
                    stmts.push(self.statement()?);
                }
                self.expect(&TokenKind::RBrace, "`}`")?;
                Ok(Statement::Block(stmts))
            }
            TokenKind::If => {
                self.advance();
                self.expect(&TokenKind::LParen, "`(`")?;
                let cond = self.expression()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                let then_arm = Box::new(self.statement()?);
                self.expect(&TokenKind::Else, "`else`")?;
                let else_arm = Box::new(self.statement()?);
                Ok(Statement::If {
                    cond,
                    then_arm,
                    else_arm,
                })
            }
            TokenKind::While => {
                self.advance();
                self.expect(&TokenKind::LParen, "`(`")?;
                let cond = self.expression()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                let body = Box::new(self.statement()?);
                Ok(Statement::While { cond, body })
            }
            TokenKind::Println => {
                self.advance();
                self.expect(&TokenKind::LParen, "`(`")?;
                let value = self.expression()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                self.expect(&TokenKind::Semi, "`;`")?;
                Ok(Statement::Print(value))
            }
            TokenKind::Ident(_) => {
                let target = self.ident()?;
                if self.eat(&TokenKind::LBracket) {
                    let index = self.expression()?;
                    self.expect(&TokenKind::RBracket, "`]`")?;
                    self.expect(&TokenKind::Assign, "`=`")?;
                    let value = self.expression()?;
                    self.expect(&TokenKind::Semi, "`;`")?;
                    Ok(Statement::ArrayAssign {
                        target,
                        index,
                        value,
                    })
                } else {
                    self.expect(&TokenKind::Assign, "`=`")?;
                    let value = self.expression()?;
                    self.expect(&TokenKind::Semi, "`;`")?;
                    Ok(Statement::Assign { target, value })
                }
            }
            _ => Err(self.unexpected("a statement")),
        }
    }

    // ===== Expressions =====

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.clause()?;
        if self.eat(&TokenKind::AndAnd) {
            let rhs = self.clause()?;
            Ok(Expr::And {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
        } else {
            Ok(lhs)
        }
    }

    fn clause(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Bang) {
            // `!` binds to another `!` or a single primary, never a binary.
            let inner = if self.at(&TokenKind::Bang) {
                self.clause()?
            } else {
                self.primary()?
            };
            return Ok(Expr::Not(Box::new(inner)));
        }
        let lhs = self.primary()?;
        let op = match self.kind() {
            TokenKind::Less => Some(BinaryOp::Less),
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let rhs = self.primary()?;
                Ok(Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            None => Ok(lhs),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = match self.kind() {
            TokenKind::IntLit(n) => {
                let n = *n;
                self.advance();
                Expr::Int(n)
            }
            TokenKind::True => {
                self.advance();
                Expr::True
            }
            TokenKind::False => {
                self.advance();
                Expr::False
            }
            TokenKind::This => {
                self.advance();
                Expr::This
            }
            TokenKind::Ident(_) => Expr::Ident(self.ident()?),
            TokenKind::New => {
                self.advance();
                if self.eat(&TokenKind::Int) {
                    self.expect(&TokenKind::LBracket, "`[`")?;
                    let size = self.expression()?;
                    self.expect(&TokenKind::RBracket, "`]`")?;
                    Expr::NewArray(Box::new(size))
                } else {
                    let class = self.ident()?;
                    self.expect(&TokenKind::LParen, "`(`")?;
                    self.expect(&TokenKind::RParen, "`)`")?;
                    Expr::NewObject(class)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Expr::Paren(Box::new(inner))
            }
            _ => return Err(self.unexpected("an expression")),
        };

        // Postfix: indexing, `.length`, method calls. These chain, so the
        // receiver of a call can itself be a call.
        loop {
            if self.eat(&TokenKind::LBracket) {
                let index = self.primary()?;
                self.expect(&TokenKind::RBracket, "`]`")?;
                expr = Expr::ArrayLookup {
                    array: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&TokenKind::Dot) {
                if self.eat(&TokenKind::Length) {
                    expr = Expr::ArrayLength(Box::new(expr));
                } else {
                    let method = self.ident()?;
                    self.expect(&TokenKind::LParen, "`(`")?;
                    let mut args = Vec::new();
                    if !self.at(&TokenKind::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "`)`")?;
                    expr = Expr::Call {
                        receiver: Box::new(expr),
                        method,
                        args,
                    };
                }
            } else {
                break;
            }
        }
        Ok(expr)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn expr_of(text: &str) -> Expr {
        let src = format!("class M {{ public static void main(String[] a) {{ x = {text}; }} }}");
        let program = parse(&src).unwrap();
        match program.main.body.into_iter().next() {
            Some(Statement::Assign { value, .. }) => value,
            other => panic!("expected an assignment, got {other:?}"),
        }
    }

    #[test]
    fn whole_program() {
        let src = "
            class Main {
                public static void main(String[] args) {
                    int x;
                    x = 2 + 3;
                    System.out.println(x);
                }
            }
            class Point {
                int x;
                public int getX() {
                    return x;
                }
            }
            class Point3 extends Point {
                public int getX() {
                    return 0 - x;
                }
            }
        ";
        let program = parse(src).unwrap();
        assert_eq!(program.main.name, "Main");
        assert_eq!(program.main.arg_name, "args");
        assert_eq!(
            program.main.locals,
            vec![VarDecl {
                ty: TypeTag::Int,
                name: "x".to_owned(),
            }]
        );
        assert_eq!(program.main.body.len(), 2);
        assert_eq!(program.classes.len(), 2);
        assert_eq!(program.classes[0].name, "Point");
        assert_eq!(program.classes[0].parent, None);
        assert_eq!(program.classes[1].parent, Some("Point".to_owned()));
        assert_eq!(program.classes[1].methods[0].name, "getX");
    }

    #[test]
    fn binary_takes_two_primaries() {
        assert_eq!(
            expr_of("1 + 2"),
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::Int(1)),
                rhs: Box::new(Expr::Int(2)),
            }
        );
    }

    #[test]
    fn and_not_and_parens() {
        assert_eq!(
            expr_of("a && !(1 < 2)"),
            Expr::And {
                lhs: Box::new(Expr::Ident("a".to_owned())),
                rhs: Box::new(Expr::Not(Box::new(Expr::Paren(Box::new(Expr::Binary {
                    op: BinaryOp::Less,
                    lhs: Box::new(Expr::Int(1)),
                    rhs: Box::new(Expr::Int(2)),
                }))))),
            }
        );
    }

    #[test]
    fn postfix_chains() {
        assert_eq!(
            expr_of("p.next().dist(q.norm(), nums[i])"),
            Expr::Call {
                receiver: Box::new(Expr::Call {
                    receiver: Box::new(Expr::Ident("p".to_owned())),
                    method: "next".to_owned(),
                    args: vec![],
                }),
                method: "dist".to_owned(),
                args: vec![
                    Expr::Call {
                        receiver: Box::new(Expr::Ident("q".to_owned())),
                        method: "norm".to_owned(),
                        args: vec![],
                    },
                    Expr::ArrayLookup {
                        array: Box::new(Expr::Ident("nums".to_owned())),
                        index: Box::new(Expr::Ident("i".to_owned())),
                    },
                ],
            }
        );
    }

    #[test]
    fn allocation_and_length() {
        assert_eq!(
            expr_of("new int[n].length"),
            Expr::ArrayLength(Box::new(Expr::NewArray(Box::new(Expr::Ident(
                "n".to_owned()
            )))))
        );
        assert_eq!(expr_of("new Point()"), Expr::NewObject("Point".to_owned()));
    }

    #[test]
    fn array_assignment_statement() {
        let src = "class M { public static void main(String[] a) { nums[i + 1] = 7; } }";
        let program = parse(src).unwrap();
        assert_eq!(
            program.main.body[0],
            Statement::ArrayAssign {
                target: "nums".to_owned(),
                index: Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expr::Ident("i".to_owned())),
                    rhs: Box::new(Expr::Int(1)),
                },
                value: Expr::Int(7),
            }
        );
    }

    #[test]
    fn operators_do_not_chain() {
        let src = "class M { public static void main(String[] a) { x = 1 + 2 + 3; } }";
        let err = parse(src).unwrap_err();
        assert_eq!(
            err,
            ParseError::Unexpected {
                expected: "`;`",
                found: "`+`".to_owned(),
                line: 1,
            }
        );
    }

    #[test]
    fn if_requires_else() {
        let src = "
            class M {
                public static void main(String[] a) {
                    if (true) x = 1;
                }
            }
        ";
        let err = parse(src).unwrap_err();
        assert_eq!(
            err,
            ParseError::Unexpected {
                expected: "`else`",
                found: "`}`".to_owned(),
                line: 5,
            }
        );
    }

    #[test]
    fn declarations_end_at_first_statement() {
        let src = "
            class M {
                public static void main(String[] a) {
                    Point p;
                    int x;
                    p = new Point();
                    x = 1;
                }
            }
            class Point { }
        ";
        let program = parse(src).unwrap();
        assert_eq!(program.main.locals.len(), 2);
        assert_eq!(program.main.locals[0].ty, TypeTag::Class("Point".to_owned()));
        assert_eq!(program.main.body.len(), 2);
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let src = "class M { public static void main(String[] a) { } } int";
        let err = parse(src).unwrap_err();
        assert_eq!(
            err,
            ParseError::Unexpected {
                expected: "`class` or end of input",
                found: "`int`".to_owned(),
                line: 1,
            }
        );
    }
}
