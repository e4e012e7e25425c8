//! Symbol-table errors.

use thiserror::Error;

/// Fatal errors from the symbol-table pass. Both abort the unit; nothing
/// is emitted for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// `class C extends P` where `P` has not been declared yet. Parents
    /// must appear before their children in the unit.
    #[error("class `{class}` extends undeclared class `{parent}`")]
    UndeclaredParent { class: String, parent: String },

    /// The receiver of a call could not be resolved to a class: it is not
    /// `this`, an allocation, another call, or a name bound to a class
    /// type.
    #[error("cannot resolve a receiver class for the call to `{method}`")]
    UnresolvedReceiver { method: String },
}
