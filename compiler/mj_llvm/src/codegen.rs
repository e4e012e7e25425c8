//! The emission pass.
//!
//! Walks the unit in the same order the symbol-table pass did and
//! streams IR text to the output writer. Expression emission returns a
//! typed [`Value`]; instructions are rendered from those values, so a
//! representation cast only ever appears where two types genuinely
//! differ.

use std::io::Write;

use mj_ir::{BinaryOp, ClassDecl, Expr, MainClass, MethodDecl, Program, Statement, VarDecl};
use mj_types::{CallSiteQueue, ClassLayout, ClassTable, SymbolTable};

use crate::error::CodegenError;
use crate::runtime::{function_type, write_dispatch_tables, write_prelude};
use crate::state::EmitState;
use crate::ty::{LlvmTy, Operand, Value};

/// Lower a whole unit to IR text on `out`.
///
/// Consumes the symbol table: one call-site entry is popped per method
/// invocation, and entries left over at the end are reported as an
/// internal-consistency error. Output order is dispatch tables, runtime
/// prelude, the entry function, then every method of every class in
/// declaration order.
pub fn generate<W: Write>(
    program: &Program,
    symbols: SymbolTable,
    out: &mut W,
) -> Result<(), CodegenError> {
    let SymbolTable {
        classes,
        call_sites,
    } = symbols;

    let mut emitter = CodeGen {
        classes,
        call_sites,
        out,
        state: EmitState::default(),
        current_class: String::new(),
    };
    emitter.unit(program)
}

struct CodeGen<'w, W> {
    classes: ClassTable,
    call_sites: CallSiteQueue,
    out: &'w mut W,
    state: EmitState,
    /// Class whose methods are being emitted; unqualified identifiers
    /// that miss the local scope resolve against its fields.
    current_class: String,
}

impl<W: Write> CodeGen<'_, W> {
    fn unit(&mut self, program: &Program) -> Result<(), CodegenError> {
        write_dispatch_tables(self.out, &self.classes)?;
        write_prelude(self.out)?;

        self.entry_function(&program.main)?;
        for class in &program.classes {
            self.class_decl(class)?;
        }

        if !self.call_sites.is_empty() {
            return Err(CodegenError::CallSitesLeftOver {
                remaining: self.call_sites.len(),
            });
        }
        tracing::debug!(classes = self.classes.len(), "unit emitted");
        Ok(())
    }

    /// `@main`: locals, statements, then a fixed diagnostic print and a
    /// zero return. The entry method has no return expression of its
    /// own.
    fn entry_function(&mut self, main: &MainClass) -> Result<(), CodegenError> {
        main.name.clone_into(&mut self.current_class);
        self.state.begin_function();
        writeln!(self.out, "define i32 @main() {{")?;

        for local in &main.locals {
            self.local_decl(local)?;
        }
        for stmt in &main.body {
            self.statement(stmt)?;
        }

        writeln!(self.out, "\tcall void (i32) @print_int(i32 23)")?;
        writeln!(self.out, "\tret i32 0\n}}\n")?;
        Ok(())
    }

    fn class_decl(&mut self, class: &ClassDecl) -> Result<(), CodegenError> {
        class.name.clone_into(&mut self.current_class);
        for method in &class.methods {
            self.method_decl(method)?;
        }
        Ok(())
    }

    fn method_decl(&mut self, method: &MethodDecl) -> Result<(), CodegenError> {
        tracing::trace!(class = %self.current_class, method = %method.name, "emit method");
        self.state.begin_function();

        let ret_ty = LlvmTy::of(&method.return_ty);
        let params: Vec<String> = method
            .params
            .iter()
            .map(|param| format!(", {} %.{}", LlvmTy::of(&param.ty), param.name))
            .collect();
        writeln!(
            self.out,
            ";{class}.{name}\ndefine {ret_ty} @{class}.{name}(i8* %this{params}) {{",
            class = self.current_class,
            name = method.name,
            params = params.concat(),
        )?;

        if !method.params.is_empty() {
            writeln!(
                self.out,
                "\t;allocate space and store each parameter of the method"
            )?;
            for param in &method.params {
                let ty = LlvmTy::of(&param.ty);
                writeln!(
                    self.out,
                    "\t%{id} = alloca {ty}\n\tstore {ty} %.{id}, {ty}* %{id}",
                    id = param.name,
                )?;
                self.state
                    .bind(&param.name, Operand::Name(param.name.clone()), ty);
            }
        }

        for local in &method.locals {
            self.local_decl(local)?;
        }
        for stmt in &method.body {
            self.statement(stmt)?;
        }

        let ret = self.expression(&method.ret)?;
        writeln!(self.out, "\tret {ret}\n}}\n")?;
        Ok(())
    }

    fn local_decl(&mut self, decl: &VarDecl) -> Result<(), CodegenError> {
        let ty = LlvmTy::of(&decl.ty);
        writeln!(
            self.out,
            "\n\t;allocate space for local variable %{id}\n\t%{id} = alloca {ty}",
            id = decl.name,
        )?;
        self.state
            .bind(&decl.name, Operand::Name(decl.name.clone()), ty);
        Ok(())
    }

    fn statement(&mut self, stmt: &Statement) -> Result<(), CodegenError> {
        match stmt {
            Statement::Block(stmts) => {
                for stmt in stmts {
                    self.statement(stmt)?;
                }
                Ok(())
            }
            Statement::Assign { target, value } => self.assign(target, value),
            Statement::ArrayAssign {
                target,
                index,
                value,
            } => self.array_assign(target, index, value),
            Statement::If {
                cond,
                then_arm,
                else_arm,
            } => self.if_statement(cond, then_arm, else_arm),
            Statement::While { cond, body } => self.while_statement(cond, body),
            Statement::Print(value) => self.print_statement(value),
        }
    }

    fn assign(&mut self, target: &str, value: &Expr) -> Result<(), CodegenError> {
        let value = self.expression(value)?;
        let (mut addr, slot_ty) = self.ident_address(target)?;

        // Storing a derived-class reference through a slot declared with
        // another representation needs the slot pointer reinterpreted.
        if slot_ty != value.ty {
            let cast = self.state.fresh_reg();
            writeln!(
                self.out,
                "\n\t;adjust pointer type of left operand\n\t{cast} = bitcast {slot_ty}* {addr} to {ty}*",
                ty = value.ty,
            )?;
            addr = cast;
        }

        writeln!(
            self.out,
            "\n\t;store result\n\tstore {value}, {ty}* {addr}",
            ty = value.ty,
        )?;
        Ok(())
    }

    fn array_assign(
        &mut self,
        target: &str,
        index: &Expr,
        value: &Expr,
    ) -> Result<(), CodegenError> {
        let (addr, ty) = self.ident_address(target)?;
        let index = self.expression(index)?;
        let value = self.expression(value)?;

        let arr = self.state.fresh_reg();
        writeln!(self.out, "\n\t;load array\n\t{arr} = load {ty}, {ty}* {addr}")?;
        let array = Value::new(ty, arr);

        self.bounds_check(&array, &index)?;
        let word = self.physical_index(&index)?;

        let slot = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;assign a value to the array element\n\t{slot} = getelementptr i32, i32* {arr}, i32 {word}",
            arr = array.op,
        )?;
        writeln!(self.out, "\tstore {value}, i32* {slot}")?;
        Ok(())
    }

    fn if_statement(
        &mut self,
        cond: &Expr,
        then_arm: &Statement,
        else_arm: &Statement,
    ) -> Result<(), CodegenError> {
        let labels = self.state.if_labels();
        let cond = self.expression(cond)?;

        writeln!(
            self.out,
            "\n\t;if statement\n\tbr {cond}, label %{then}, label %{els}\n\n{then}:",
            then = labels.then,
            els = labels.els,
        )?;
        self.state.set_block(&labels.then);
        self.statement(then_arm)?;

        writeln!(
            self.out,
            "\tbr label %{end}\n\n{els}:",
            end = labels.end,
            els = labels.els,
        )?;
        self.state.set_block(&labels.els);
        self.statement(else_arm)?;

        writeln!(self.out, "\tbr label %{end}\n\n{end}:", end = labels.end)?;
        self.state.set_block(&labels.end);
        Ok(())
    }

    fn while_statement(&mut self, cond: &Expr, body: &Statement) -> Result<(), CodegenError> {
        let labels = self.state.loop_labels();

        writeln!(
            self.out,
            "\n\t;while statement\n\tbr label %{head}\n\n{head}:",
            head = labels.head,
        )?;
        self.state.set_block(&labels.head);
        let cond = self.expression(cond)?;

        writeln!(
            self.out,
            "\tbr {cond}, label %{body}, label %{exit}\n\n{body}:",
            body = labels.body,
            exit = labels.exit,
        )?;
        self.state.set_block(&labels.body);
        self.statement(body)?;

        writeln!(
            self.out,
            "\n\tbr label %{head}\n{exit}:\n",
            head = labels.head,
            exit = labels.exit,
        )?;
        self.state.set_block(&labels.exit);
        Ok(())
    }

    fn print_statement(&mut self, value: &Expr) -> Result<(), CodegenError> {
        let value = self.expression(value)?;
        let helper = if value.ty == LlvmTy::I1 {
            "print_bool"
        } else {
            "print_int"
        };
        writeln!(
            self.out,
            "\n\t;display an {ty}\n\tcall void ({ty}) @{helper}({value})",
            ty = value.ty,
        )?;
        Ok(())
    }

    fn expression(&mut self, expr: &Expr) -> Result<Value, CodegenError> {
        match expr {
            Expr::Int(n) => Ok(Value::new(LlvmTy::I32, Operand::Const(*n))),
            Expr::True => Ok(Value::new(LlvmTy::I1, Operand::Bool(true))),
            Expr::False => Ok(Value::new(LlvmTy::I1, Operand::Bool(false))),
            Expr::This => Ok(Value::new(LlvmTy::I8Ptr, Operand::Name("this".into()))),
            Expr::Ident(name) => self.ident_read(name),
            Expr::Paren(inner) => self.expression(inner),
            Expr::Not(clause) => {
                let clause = self.expression(clause)?;
                let reg = self.state.fresh_reg();
                writeln!(
                    self.out,
                    "\n\t;apply logical not, using xor\n\t{reg} = xor {clause}, 1"
                )?;
                Ok(Value::new(LlvmTy::I1, reg))
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::And { lhs, rhs } => self.short_circuit_and(lhs, rhs),
            Expr::ArrayLookup { array, index } => self.array_lookup(array, index),
            Expr::ArrayLength(array) => {
                let array = self.expression(array)?;
                self.length_read(&array)
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => self.method_call(receiver, method, args),
            Expr::NewArray(size) => self.array_alloc(size),
            Expr::NewObject(class) => self.object_alloc(class),
        }
    }

    fn ident_read(&mut self, name: &str) -> Result<Value, CodegenError> {
        let local = self.state.lookup(name).map(|b| (b.ptr.clone(), b.ty));

        if let Some((ptr, ty)) = local {
            let reg = self.state.fresh_reg();
            writeln!(
                self.out,
                "\n\t;loading local variable '{name}' from stack\n\t{reg} = load {ty}, {ty}* {ptr}"
            )?;
            return Ok(Value::new(ty, reg));
        }

        let (addr, ty) = self.field_address(name, true)?;
        let reg = self.state.fresh_reg();
        writeln!(self.out, "\t{reg} = load {ty}, {ty}* {addr}")?;
        Ok(Value::new(ty, reg))
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value, CodegenError> {
        let left = self.expression(lhs)?;
        let right = self.expression(rhs)?;

        let (instr, ty) = match op {
            BinaryOp::Less => ("icmp slt", LlvmTy::I1),
            BinaryOp::Add => ("add", LlvmTy::I32),
            BinaryOp::Sub => ("sub", LlvmTy::I32),
            BinaryOp::Mul => ("mul", LlvmTy::I32),
        };
        let reg = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;apply arithmetic expression\n\t{reg} = {instr} {left}, {right}",
            right = right.op,
        )?;
        Ok(Value::new(ty, reg))
    }

    /// The right clause only runs when the left one was true; the merge
    /// block selects the right value when control came through the
    /// right-hand block and the left value otherwise. The phi names the
    /// block the right clause actually ended in, which differs from its
    /// entry label when the clause itself branches.
    fn short_circuit_and(&mut self, lhs: &Expr, rhs: &Expr) -> Result<Value, CodegenError> {
        let left = self.expression(lhs)?;
        let labels = self.state.and_labels();

        writeln!(
            self.out,
            "\t;short-circuit and clause, right side gets evaluated if and only if left side evaluates to true\n\tbr {left}, label %{rhs}, label %{skip}\n\n{rhs}:",
            rhs = labels.rhs,
            skip = labels.skip,
        )?;
        self.state.set_block(&labels.rhs);

        let right = self.expression(rhs)?;
        let right_block = self.state.block().to_owned();

        writeln!(
            self.out,
            "\tbr label %{merge}\n\n{skip}:\n\n\tbr label %{merge}\n\n{merge}:\n",
            merge = labels.merge,
            skip = labels.skip,
        )?;
        let reg = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{reg} = phi i1 [{right}, %{right_block}], [{left}, %{skip}]",
            right = right.op,
            left = left.op,
            skip = labels.skip,
        )?;
        self.state.set_block(&labels.merge);
        Ok(Value::new(LlvmTy::I1, reg))
    }

    fn array_lookup(&mut self, array: &Expr, index: &Expr) -> Result<Value, CodegenError> {
        let array = self.expression(array)?;
        let index = self.expression(index)?;

        self.bounds_check(&array, &index)?;
        let word = self.physical_index(&index)?;

        let slot = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;lookup *({arr} + {word})\n\t{slot} = getelementptr i32, i32* {arr}, i32 {word}",
            arr = array.op,
        )?;
        let reg = self.state.fresh_reg();
        writeln!(self.out, "\t{reg} = load i32, i32* {slot}")?;
        Ok(Value::new(LlvmTy::I32, reg))
    }

    /// Load the element count from the array's first word.
    fn length_read(&mut self, array: &Value) -> Result<Value, CodegenError> {
        let slot = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;get length of array at {arr}\n\t{slot} = getelementptr i32, i32* {arr}, i32 0",
            arr = array.op,
        )?;
        let reg = self.state.fresh_reg();
        writeln!(self.out, "\t{reg} = load i32, i32* {slot}")?;
        Ok(Value::new(LlvmTy::I32, reg))
    }

    /// Validate `0 <= index < length` before an element access. Exactly
    /// one of `index < 0` and `index < length` holds for an index in
    /// range; any other combination routes through `throw_oob` before
    /// rejoining the access path.
    fn bounds_check(&mut self, array: &Value, index: &Value) -> Result<(), CodegenError> {
        let labels = self.state.bounds_labels();
        let length = self.length_read(array)?;

        let negative = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;make sure index \"{idx}\" is within bounds\n\t{negative} = icmp slt i32 {idx}, 0",
            idx = index.op,
        )?;
        let in_range = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{in_range} = icmp slt i32 {idx}, {len}",
            idx = index.op,
            len = length.op,
        )?;
        let valid = self.state.fresh_reg();
        writeln!(self.out, "\t{valid} = xor i1 {negative}, {in_range}")?;
        writeln!(
            self.out,
            "\tbr i1 {valid}, label %{ok}, label %{fail}\n\n{fail}:\n\n\tcall void @throw_oob()\n\tbr label %{ok}\n\n{ok}:",
            ok = labels.ok,
            fail = labels.fail,
        )?;
        self.state.set_block(&labels.ok);
        Ok(())
    }

    /// Physical word of a logical element index: one past it, to skip
    /// the length word. Constant indexes fold; register indexes emit an
    /// add.
    fn physical_index(&mut self, index: &Value) -> Result<Operand, CodegenError> {
        if let Operand::Const(n) = index.op {
            return Ok(Operand::Const(n.wrapping_add(1)));
        }
        let reg = self.state.fresh_reg();
        writeln!(self.out, "\n\t{reg} = add i32 {idx}, 1", idx = index.op)?;
        Ok(reg)
    }

    fn method_call(
        &mut self,
        receiver: &Expr,
        method: &str,
        args: &[Expr],
    ) -> Result<Value, CodegenError> {
        let receiver = self.expression(receiver)?;

        // The class recorded for this invocation when the symbol table
        // was built; authoritative for slot and signature lookup.
        let class_name =
            self.call_sites
                .pop()
                .ok_or_else(|| CodegenError::CallSitesExhausted {
                    method: method.to_owned(),
                })?;
        let sig = self
            .class_layout(&class_name)?
            .method(method)
            .ok_or_else(|| CodegenError::UnknownMethod {
                class: class_name.clone(),
                method: method.to_owned(),
            })?
            .clone();

        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            arguments.push(self.expression(arg)?);
        }

        let ret_ty = LlvmTy::of(&sig.return_ty);
        let table_ptr = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{table_ptr} = bitcast {receiver} to i8***\t\t\t\t;{table_ptr} points to the vTable"
        )?;
        let table = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{table} = load i8**, i8*** {table_ptr}\t\t\t\t;{table} is the vTable"
        )?;
        let entry = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{entry} = getelementptr i8*, i8** {table}, i32 {slot}\t;{entry} points to the address of {method}",
            slot = sig.slot,
        )?;
        let code = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{code} = load i8*, i8** {entry}\t\t\t\t\t;{code} points to the body of {method}"
        )?;
        let callee = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{callee} = bitcast i8* {code} to {fn_ty}*\t;cast pointer to the appropriate size",
            fn_ty = function_type(&sig),
        )?;

        let rendered: Vec<String> = arguments.iter().map(|arg| format!(", {arg}")).collect();
        let reg = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{reg} = call {ret_ty} {callee}(i8* {recv}{args})",
            recv = receiver.op,
            args = rendered.concat(),
        )?;
        Ok(Value::new(ret_ty, reg))
    }

    fn array_alloc(&mut self, size: &Expr) -> Result<Value, CodegenError> {
        let size = self.expression(size)?;

        let words = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;allocate space for new array of size {n} + 1 place to store size at\n\t{words} = add i32 {n}, 1",
            n = size.op,
        )?;
        let raw = self.state.fresh_reg();
        writeln!(self.out, "\t{raw} = call i8* @calloc(i32 4, i32 {words})")?;
        let arr = self.state.fresh_reg();
        writeln!(self.out, "\t{arr} = bitcast i8* {raw} to i32*")?;
        writeln!(
            self.out,
            "\n\t;store size at index 0\n\tstore i32 {n}, i32* {arr}",
            n = size.op,
        )?;
        Ok(Value::new(LlvmTy::I32Ptr, arr))
    }

    fn object_alloc(&mut self, class: &str) -> Result<Value, CodegenError> {
        let (size, table_len) = {
            let layout = self.class_layout(class)?;
            (layout.size(), layout.methods().len())
        };

        let obj = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;allocate space for a new \"{class}\" object\n\t{obj} = call i8* @calloc(i32 1, i32 {size})"
        )?;
        let slots = self.state.fresh_reg();
        writeln!(self.out, "\t{slots} = bitcast i8* {obj} to i8***")?;
        let table = self.state.fresh_reg();
        writeln!(
            self.out,
            "\t{table} = getelementptr [{table_len} x i8*], [{table_len} x i8*]* @.{class}_vtable, i32 0, i32 0"
        )?;
        writeln!(self.out, "\tstore i8** {table}, i8*** {slots}")?;
        Ok(Value::new(LlvmTy::I8Ptr, obj))
    }

    /// Address of an assignment target: the stack slot of a local or
    /// parameter, else the computed field address in the current class.
    fn ident_address(&mut self, name: &str) -> Result<(Operand, LlvmTy), CodegenError> {
        if let Some(binding) = self.state.lookup(name) {
            return Ok((binding.ptr.clone(), binding.ty));
        }
        self.field_address(name, false)
    }

    /// Compute a field's address from the receiver pointer: byte offset
    /// first, then a reinterpret to the field's width. Returns the typed
    /// address; `for_read` only changes the emitted comment.
    fn field_address(
        &mut self,
        name: &str,
        for_read: bool,
    ) -> Result<(Operand, LlvmTy), CodegenError> {
        let (offset, ty) = {
            let class = self.class_layout(&self.current_class)?;
            let field = class
                .field(name)
                .ok_or_else(|| CodegenError::UnknownIdentifier {
                    name: name.to_owned(),
                    class: self.current_class.clone(),
                })?;
            (field.offset, LlvmTy::of(&field.ty))
        };

        let what = if for_read { "field" } else { "address of" };
        let base = self.state.fresh_reg();
        writeln!(
            self.out,
            "\n\t;load {what} {class}.{name} from memory\n\t{base} = getelementptr i8, i8* %this, i32 {offset}",
            class = self.current_class,
        )?;
        let addr = self.state.fresh_reg();
        writeln!(self.out, "\t{addr} = bitcast i8* {base} to {ty}*")?;
        Ok((addr, ty))
    }

    fn class_layout(&self, name: &str) -> Result<&ClassLayout, CodegenError> {
        self.classes
            .get(name)
            .ok_or_else(|| CodegenError::UnknownClass(name.to_owned()))
    }
}
