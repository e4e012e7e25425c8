//! Human-readable offsets report.
//!
//! A read-only view over the finished class table, printed by the driver
//! when `--offsets` is given. Inherited fields are listed under the class
//! being dumped; methods are listed under their declaring class, which for
//! an inherited (non-overridden) method is the ancestor that defined it.

use crate::layout::ClassTable;

pub fn offsets_report(classes: &ClassTable) -> String {
    let mut out = String::new();
    out.push_str("Offsets\n-------\n");
    for class in classes.iter() {
        out.push_str(&format!("Class: {}\n", class.name()));

        out.push_str("\n\tFields\n\t------\n\t\tthis: 0\n");
        for field in class.fields() {
            out.push_str(&format!(
                "\t\t{}.{}: {}\n",
                class.name(),
                field.name,
                field.offset
            ));
        }

        out.push_str("\n\tMethods\n\t-------\n");
        for method in class.methods() {
            out.push_str(&format!(
                "\t\t{}.{}: {}\n",
                method.declaring_class, method.name, method.slot
            ));
        }
    }
    out
}
