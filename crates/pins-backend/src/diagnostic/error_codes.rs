//! Error code registry
//!
//! Codes follow the CGxxxx scheme:
//! - CG0xxx: errors in the user's program detected during code generation
//! - CG9xxx: internal errors (defects in an earlier phase or in this crate)

/// Integer literal that is malformed or does not fit in 32 bits
pub const ILLEGAL_INTEGER: &str = "CG0001";
/// Call whose callee does not resolve to a function
pub const NOT_CALLABLE: &str = "CG0002";
/// `^e` where `e` is not a variable or parameter
pub const ADDRESS_OF_NON_VARIABLE: &str = "CG0003";
/// Assignment whose destination is neither a variable nor `e^`
pub const ASSIGN_TO_NON_LVALUE: &str = "CG0004";
/// No entry function to call from the program prologue
pub const MISSING_ENTRY_POINT: &str = "CG0005";
/// Repetition initializer `n * c` with `n < 0`, or too large to address
pub const ILLEGAL_REPEAT_COUNT: &str = "CG0006";

pub const INTERNAL_ERROR: &str = "CG9999";

/// Short description for an error code
pub fn describe(code: &str) -> Option<&'static str> {
    match code {
        ILLEGAL_INTEGER => Some("illegal integer value"),
        NOT_CALLABLE => Some("cannot call non-function"),
        ADDRESS_OF_NON_VARIABLE => Some("cannot take address of non-variable expression"),
        ASSIGN_TO_NON_LVALUE => Some("cannot assign to non-lvalue"),
        MISSING_ENTRY_POINT => Some("missing entry point"),
        ILLEGAL_REPEAT_COUNT => Some("illegal repetition count"),
        INTERNAL_ERROR => Some("internal compiler error"),
        _ => None,
    }
}
