//! The symbol-table pass.
//!
//! One depth-first walk over the unit. Class declarations produce layouts;
//! expression traversal resolves invocation receivers and records their
//! classes in the call-site queue, in the exact order the code generator
//! will meet the same invocations again.

use std::collections::VecDeque;

use mj_ir::{ClassDecl, Expr, MainClass, MethodDecl, Program, Statement, TypeTag};
use rustc_hash::FxHashMap;

use crate::error::SymbolError;
use crate::layout::{byte_size, ClassLayout, ClassTable, Field, MethodSignature, POINTER_SIZE};

/// Receiver classes of every invocation, in traversal order. The code
/// generator pops exactly one entry per invocation it emits.
#[derive(Debug, Default)]
pub struct CallSiteQueue {
    sites: VecDeque<String>,
}

impl CallSiteQueue {
    fn push(&mut self, class: String) {
        self.sites.push_back(class);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.sites.pop_front()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Everything the first pass produces.
#[derive(Debug)]
pub struct SymbolTable {
    pub classes: ClassTable,
    pub call_sites: CallSiteQueue,
}

/// Build the symbol table for a unit.
pub fn build(program: &Program) -> Result<SymbolTable, SymbolError> {
    let mut builder = SymbolTableBuilder::default();
    builder.visit_main(&program.main)?;
    for class in &program.classes {
        builder.visit_class(class)?;
    }
    tracing::debug!(
        classes = builder.classes.len(),
        call_sites = builder.call_sites.len(),
        "symbol table complete"
    );
    Ok(SymbolTable {
        classes: builder.classes,
        call_sites: builder.call_sites,
    })
}

#[derive(Default)]
struct SymbolTableBuilder {
    classes: ClassTable,
    call_sites: CallSiteQueue,
    /// Identifier types for receiver resolution. One flat map for the whole
    /// unit, written at declaration, parameter and assignment sites and
    /// never cleared: a name's recorded type is its most recent write.
    vars: FxHashMap<String, TypeTag>,
    /// Class whose body is being traversed; what `this` resolves to.
    current_class: String,
}

impl SymbolTableBuilder {
    fn visit_main(&mut self, main: &MainClass) -> Result<(), SymbolError> {
        self.current_class = main.name.clone();
        self.classes.insert(ClassLayout::new(main.name.clone()));
        for local in &main.locals {
            self.vars.insert(local.name.clone(), local.ty.clone());
        }
        for stmt in &main.body {
            self.visit_statement(stmt)?;
        }
        Ok(())
    }

    fn visit_class(&mut self, class: &ClassDecl) -> Result<(), SymbolError> {
        self.current_class = class.name.clone();
        let mut layout = ClassLayout::new(class.name.clone());

        let (mut next_offset, mut next_slot) = match &class.parent {
            Some(parent_name) => {
                let parent = self.classes.get(parent_name).ok_or_else(|| {
                    SymbolError::UndeclaredParent {
                        class: class.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?;
                layout.inherit(parent);
                // Fields continue after the parent's last; new methods
                // continue after the parent's last slot.
                (parent.size(), u32::try_from(parent.methods().len()).unwrap_or(u32::MAX))
            }
            None => (POINTER_SIZE, 0),
        };

        for field in &class.fields {
            self.vars.insert(field.name.clone(), field.ty.clone());
            layout.push_field(Field {
                name: field.name.clone(),
                ty: field.ty.clone(),
                offset: next_offset,
            });
            next_offset += byte_size(&field.ty);
        }
        layout.set_size(next_offset);

        for method in &class.methods {
            self.visit_method(method, &mut layout, &mut next_slot)?;
        }

        self.classes.insert(layout);
        Ok(())
    }

    fn visit_method(
        &mut self,
        method: &MethodDecl,
        layout: &mut ClassLayout,
        next_slot: &mut u32,
    ) -> Result<(), SymbolError> {
        for param in &method.params {
            self.vars.insert(param.name.clone(), param.ty.clone());
        }
        for local in &method.locals {
            self.vars.insert(local.name.clone(), local.ty.clone());
        }
        for stmt in &method.body {
            self.visit_statement(stmt)?;
        }
        self.resolve(&method.ret)?;

        let slot = match layout.method(&method.name) {
            // Override (or redeclaration): the slot is inherited.
            Some(existing) => existing.slot,
            None => {
                let slot = *next_slot;
                *next_slot += 1;
                slot
            }
        };
        layout.define_method(MethodSignature {
            name: method.name.clone(),
            declaring_class: self.current_class.clone(),
            return_ty: method.return_ty.clone(),
            slot,
            params: method
                .params
                .iter()
                .map(|p| (p.ty.clone(), p.name.clone()))
                .collect(),
        });
        Ok(())
    }

    fn visit_statement(&mut self, stmt: &Statement) -> Result<(), SymbolError> {
        match stmt {
            Statement::Block(stmts) => {
                for stmt in stmts {
                    self.visit_statement(stmt)?;
                }
            }
            Statement::Assign { target, value } => {
                // An assignment re-types its target when the right side
                // resolves to a class, so receiver resolution tracks the
                // last assigned object type.
                if let Some(class) = self.resolve(value)? {
                    self.vars.insert(target.clone(), TypeTag::Class(class));
                }
            }
            Statement::ArrayAssign { index, value, .. } => {
                self.resolve(index)?;
                self.resolve(value)?;
            }
            Statement::If {
                cond,
                then_arm,
                else_arm,
            } => {
                self.resolve(cond)?;
                self.visit_statement(then_arm)?;
                self.visit_statement(else_arm)?;
            }
            Statement::While { cond, body } => {
                self.resolve(cond)?;
                self.visit_statement(body)?;
            }
            Statement::Print(value) => {
                self.resolve(value)?;
            }
        }
        Ok(())
    }

    /// Traverse an expression, queueing every invocation's receiver class.
    /// Returns the class an enclosing invocation would dispatch on, when
    /// the expression has one.
    fn resolve(&mut self, expr: &Expr) -> Result<Option<String>, SymbolError> {
        match expr {
            Expr::And { lhs, rhs } => {
                self.resolve(lhs)?;
                self.resolve(rhs)?;
                Ok(None)
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.resolve(lhs)?;
                self.resolve(rhs)?;
                Ok(None)
            }
            Expr::ArrayLookup { array, index } => {
                self.resolve(array)?;
                self.resolve(index)?;
                Ok(None)
            }
            Expr::ArrayLength(array) => {
                self.resolve(array)?;
                Ok(None)
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => {
                let class = self.resolve(receiver)?.ok_or_else(|| {
                    SymbolError::UnresolvedReceiver {
                        method: method.clone(),
                    }
                })?;
                self.call_sites.push(class.clone());
                for arg in args {
                    self.resolve(arg)?;
                }
                // A call propagates its receiver's class, so a chained
                // call dispatches on the same class as its prefix.
                Ok(Some(class))
            }
            Expr::Int(_) | Expr::True | Expr::False => Ok(None),
            Expr::Ident(name) => match self.vars.get(name) {
                Some(TypeTag::Class(class)) => Ok(Some(class.clone())),
                _ => Ok(None),
            },
            Expr::This => Ok(Some(self.current_class.clone())),
            Expr::NewArray(size) => {
                self.resolve(size)?;
                Ok(None)
            }
            Expr::NewObject(class) => Ok(Some(class.clone())),
            Expr::Not(inner) => {
                self.resolve(inner)?;
                Ok(None)
            }
            Expr::Paren(inner) => self.resolve(inner),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn build_source(src: &str) -> SymbolTable {
        build(&mj_parse::parse(src).unwrap()).unwrap()
    }

    #[test]
    fn offsets_continue_across_inheritance() {
        let table = build_source(
            "
            class Main { public static void main(String[] a) { } }
            class A { int x; }
            class B extends A { boolean y; int[] zs; }
            ",
        );
        let a = table.classes.get("A").unwrap();
        let b = table.classes.get("B").unwrap();

        assert_eq!(a.field("x").unwrap().offset, 8);
        assert_eq!(a.size(), 12);

        // Inherited field keeps its offset; own fields append after it.
        assert_eq!(b.field("x").unwrap().offset, 8);
        assert_eq!(b.field("y").unwrap().offset, 12);
        assert_eq!(b.field("zs").unwrap().offset, 13);
        assert_eq!(b.size(), 21);

        let offsets: Vec<u32> = b.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![8, 12, 13]);
    }

    #[test]
    fn override_reuses_slot_and_new_methods_append() {
        let table = build_source(
            "
            class Main { public static void main(String[] a) { } }
            class A {
                public int f() { return 1; }
            }
            class B extends A {
                public int f() { return 2; }
                public int g() { return 3; }
            }
            ",
        );
        let a = table.classes.get("A").unwrap();
        let b = table.classes.get("B").unwrap();

        assert_eq!(a.method("f").unwrap().slot, 0);
        assert_eq!(b.method("f").unwrap().slot, 0);
        assert_eq!(b.method("f").unwrap().declaring_class, "B");
        assert_eq!(b.method("g").unwrap().slot, 1);
        assert_eq!(b.methods().len(), 2);
    }

    #[test]
    fn queue_records_receivers_in_traversal_order() {
        let mut table = build_source(
            "
            class Main {
                public static void main(String[] a) {
                    A p;
                    B q;
                    p = new A();
                    q = new B();
                    System.out.println(p.f(q.g(), this.stop()));
                }
            }
            class A { public int f(int m, int n) { return m; } }
            class B { public int g() { return 0; } }
            ",
        );
        // Receiver first, then argument invocations left to right.
        assert_eq!(table.call_sites.len(), 3);
        assert_eq!(table.call_sites.pop().as_deref(), Some("A"));
        assert_eq!(table.call_sites.pop().as_deref(), Some("B"));
        assert_eq!(table.call_sites.pop().as_deref(), Some("Main"));
        assert_eq!(table.call_sites.pop(), None);
    }

    #[test]
    fn chained_call_dispatches_on_the_receiver_class() {
        let mut table = build_source(
            "
            class Main {
                public static void main(String[] a) {
                    A p;
                    p = new A();
                    System.out.println(p.f().f());
                }
            }
            class A { public int f() { return 0; } }
            ",
        );
        assert_eq!(table.call_sites.pop().as_deref(), Some("A"));
        assert_eq!(table.call_sites.pop().as_deref(), Some("A"));
        assert_eq!(table.call_sites.pop(), None);
    }

    #[test]
    fn assignment_retypes_the_target() {
        let mut table = build_source(
            "
            class Main {
                public static void main(String[] a) {
                    A p;
                    p = new B();
                    System.out.println(p.f());
                }
            }
            class A { public int f() { return 1; } }
            class B { public int f() { return 2; } }
            ",
        );
        // The queue follows the last assignment, not the declared type.
        assert_eq!(table.call_sites.pop().as_deref(), Some("B"));
    }

    #[test]
    fn undeclared_parent_is_fatal() {
        let program = mj_parse::parse(
            "
            class Main { public static void main(String[] a) { } }
            class B extends A { }
            class A { }
            ",
        )
        .unwrap();
        assert_eq!(
            build(&program).unwrap_err(),
            SymbolError::UndeclaredParent {
                class: "B".to_owned(),
                parent: "A".to_owned(),
            }
        );
    }

    #[test]
    fn unresolved_receiver_is_fatal() {
        let program = mj_parse::parse(
            "
            class Main {
                public static void main(String[] a) {
                    int x;
                    x = 1;
                    System.out.println(x.f());
                }
            }
            ",
        )
        .unwrap();
        assert_eq!(
            build(&program).unwrap_err(),
            SymbolError::UnresolvedReceiver {
                method: "f".to_owned(),
            }
        );
    }
}
