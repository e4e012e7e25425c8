//! Emission errors.

use std::io;

use thiserror::Error;

/// Fatal errors from the emission pass. The name-lookup variants mean the
/// symbol table disagrees with the tree being emitted; the call-site
/// variants mean the two passes walked the tree in a different order.
/// Every one aborts the unit.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("unknown class `{0}`")]
    UnknownClass(String),

    /// An identifier that is neither a local, a parameter, nor a field of
    /// the class being emitted.
    #[error("`{name}` is not a variable or field in class `{class}`")]
    UnknownIdentifier { name: String, class: String },

    #[error("class `{class}` has no method `{method}`")]
    UnknownMethod { class: String, method: String },

    /// The call-site queue ran out before the last invocation was
    /// emitted.
    #[error("call-site queue exhausted at the call to `{method}`")]
    CallSitesExhausted { method: String },

    /// Entries were still queued after the whole unit was emitted.
    #[error("{remaining} call-site entries left over after emission")]
    CallSitesLeftOver { remaining: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}
