/// Code generation error types
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use thiserror::Error;

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Failure of a back-end pass
///
/// `Diagnostic` and `MissingEntryPoint` are caused by the user's program.
/// `Internal` means an invariant the earlier phases promise was broken;
/// it is never a user error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    #[error("{0}")]
    Diagnostic(Diagnostic),

    #[error("missing entry point: no function `{name}` with a body")]
    MissingEntryPoint { name: String },

    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CodegenError {
    /// User-facing error at `span`
    pub fn at(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::Diagnostic(Diagnostic::error_with_code(code, message, span))
    }

    /// Compiler-internal invariant violation
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn missing_entry_point(name: impl Into<String>) -> Self {
        Self::MissingEntryPoint { name: name.into() }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Error code of this failure
    pub fn code(&self) -> &str {
        match self {
            Self::Diagnostic(diag) => &diag.code,
            Self::MissingEntryPoint { .. } => error_codes::MISSING_ENTRY_POINT,
            Self::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Render any failure as a diagnostic for reporting
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Diagnostic(diag) => diag.clone(),
            Self::MissingEntryPoint { name } => Diagnostic::error_with_code(
                error_codes::MISSING_ENTRY_POINT,
                self.to_string(),
                Span::dummy(),
            )
            .with_help(format!("define `fun {}() = ...` at the top level", name)),
            Self::Internal(_) => {
                Diagnostic::error_with_code(error_codes::INTERNAL_ERROR, self.to_string(), Span::dummy())
                    .with_note("this is a bug in the compiler, not in the program")
            }
        }
    }
}

impl From<Diagnostic> for CodegenError {
    fn from(diag: Diagnostic) -> Self {
        Self::Diagnostic(diag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let user = CodegenError::at(error_codes::NOT_CALLABLE, "cannot call non-function", Span::point(4, 2));
        assert!(!user.is_internal());
        assert_eq!(user.code(), "CG0002");
        assert_eq!(user.to_string(), "[CG0002] 4:2: cannot call non-function");

        let internal = CodegenError::internal("no frame for function #3");
        assert!(internal.is_internal());
        assert_eq!(internal.code(), "CG9999");
        assert_eq!(
            internal.to_string(),
            "internal compiler error: no frame for function #3"
        );
    }

    #[test]
    fn test_missing_entry_point_diagnostic() {
        let err = CodegenError::missing_entry_point("main");
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, "CG0005");
        assert_eq!(diag.help.as_deref(), Some("define `fun main() = ...` at the top level"));
    }
}
