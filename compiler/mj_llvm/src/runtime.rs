//! Fixed runtime support.
//!
//! The emitted module leans on three C library functions (`calloc`,
//! `printf`, `exit`) and three helpers defined here once per unit. The
//! prelude text is fixed; the dispatch tables are assembled from the
//! class table, one global per class, one `i8*` entry per method slot.

use std::io::{self, Write};

use mj_types::{ClassTable, MethodSignature};

use crate::ty::LlvmTy;

/// Helper declarations and definitions shared by every emitted unit.
/// Arrays print through `print_int`; the bounds-abort path prints a
/// fixed message and exits non-zero.
const RUNTIME_PRELUDE: &str = r#"
;declare functions to be used
declare i8* @calloc(i32, i32)
declare i32 @printf(i8*, ...)
declare void @exit(i32)

;define constants and functions to be used
@_cint = constant [4 x i8] c"%d\0a\00"
@_cOOB = constant [15 x i8] c"Out of bounds\0a\00"
define void @print_int(i32 %i) {
	%_str = bitcast [4 x i8]* @_cint to i8*
	call i32 (i8*, ...) @printf(i8* %_str, i32 %i)
	ret void
}

define void @throw_oob() {
	%_str = bitcast [15 x i8]* @_cOOB to i8*
	call i32 (i8*, ...) @printf(i8* %_str)
	call void @exit(i32 1)
	ret void
}

@_ctrue = constant [6 x i8] c"true\0a\00"
@_cfalse = constant [7 x i8] c"false\0a\00"
define void @print_bool(i1 %i){
	br i1 %i, label %is_true, label %is_false

is_true:
	%_res_true = bitcast [6 x i8]* @_ctrue to i8*
	br label %result

is_false:
	%_res_false = bitcast [7 x i8]* @_cfalse to i8*
	br label %result

result:
	%_res = phi i8* [%_res_true, %is_true], [%_res_false, %is_false]
	call i32 (i8*, ...) @printf(i8* %_res)
	ret void
}

"#;

pub(crate) fn write_prelude<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(RUNTIME_PRELUDE.as_bytes())
}

/// The function-pointer type of a method as the dispatch machinery sees
/// it: return type, then the implicit `i8*` receiver, then the declared
/// parameter types.
pub(crate) fn function_type(sig: &MethodSignature) -> String {
    let ret = LlvmTy::of(&sig.return_ty);
    let params: Vec<String> = sig
        .params
        .iter()
        .map(|(ty, _)| LlvmTy::of(ty).to_string())
        .collect();

    if params.is_empty() {
        format!("{ret} (i8*)")
    } else {
        format!("{ret} (i8*, {})", params.join(", "))
    }
}

/// One dispatch-table global per class, in declaration order. Slot `k`
/// holds the function registered as the most specific definition for
/// that slot, cast to `i8*`. The entry class gets an empty table.
pub(crate) fn write_dispatch_tables<W: Write>(
    out: &mut W,
    classes: &ClassTable,
) -> io::Result<()> {
    writeln!(
        out,
        ";for each class, declare a global vTable containing a pointer for each method"
    )?;

    for class in classes.iter() {
        let entries: Vec<String> = class
            .methods()
            .iter()
            .map(|method| {
                format!(
                    "i8* bitcast ({}* @{}.{} to i8*)",
                    function_type(method),
                    method.declaring_class,
                    method.name
                )
            })
            .collect();

        writeln!(
            out,
            "@.{}_vtable = global [{} x i8*] [{}]",
            class.name(),
            class.methods().len(),
            entries.join(", ")
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use mj_ir::TypeTag;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn function_types_carry_the_implicit_receiver() {
        let sig = MethodSignature {
            name: "run".into(),
            declaring_class: "A".into(),
            return_ty: TypeTag::Int,
            slot: 0,
            params: Vec::new(),
        };
        assert_eq!(function_type(&sig), "i32 (i8*)");
    }

    #[test]
    fn function_types_list_parameters_in_order() {
        let sig = MethodSignature {
            name: "mix".into(),
            declaring_class: "A".into(),
            return_ty: TypeTag::Class("B".into()),
            slot: 2,
            params: vec![
                (TypeTag::Int, "n".into()),
                (TypeTag::Boolean, "flag".into()),
                (TypeTag::IntArray, "xs".into()),
            ],
        };
        assert_eq!(function_type(&sig), "i8* (i8*, i32, i1, i32*)");
    }

    #[test]
    fn prelude_defines_the_three_helpers_once() {
        let mut out = Vec::new();
        write_prelude(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.matches("define void @print_int(i32 %i)").count(), 1);
        assert_eq!(text.matches("define void @print_bool(i1 %i)").count(), 1);
        assert_eq!(text.matches("define void @throw_oob()").count(), 1);
        assert!(text.contains(r#"@_cOOB = constant [15 x i8] c"Out of bounds\0a\00""#));
    }
}
