//! PINS back end
//!
//! Frame layout and code generation for the PINS teaching language,
//! targeting a stack machine:
//! - Frame building: stack frames of functions, accesses of variables
//! - Constant decoding: literals and repetition initializers to words
//! - Code generation: per-node instruction fragments
//! - Segment assembly: final code and data segments
//!
//! Input is an AST already resolved by semantic analysis (see [`ast`]).
//!
//! ```
//! use pins_backend::builder::AstBuilder;
//! use pins_backend::{compile, CodegenConfig};
//!
//! let mut b = AstBuilder::new();
//! let two = b.int("2");
//! let init = b.scalar_init(two);
//! let x = b.var("x", vec![init]);
//! let use_x = b.var_ref("x", x.id);
//! let body = b.expr_stmt(use_x);
//! let main_id = b.id();
//! let main = b.fun(main_id, "main", vec![], vec![body]);
//! let program = b.program(vec![x.into(), main.into()]);
//!
//! let segments = compile(&program, &CodegenConfig::default()).unwrap();
//! assert!(segments.code_size() > 0);
//! ```

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod assemble;
pub mod ast;
pub mod builder;
pub mod codegen;
pub mod config;
pub mod decode;
pub mod diagnostic;
pub mod error;
pub mod instr;
pub mod layout;
pub mod mem;
pub mod span;

// Re-export commonly used types
pub use assemble::{assemble, Segments};
pub use ast::{NodeId, Program};
pub use codegen::{generate, CodeGenerator, Fragments};
pub use config::{CodegenConfig, ConfigError};
pub use diagnostic::{error_codes, Diagnostic, DIAG_VERSION};
pub use error::{CodegenError, CodegenResult};
pub use instr::{Code, CodeInstr, Data, DataInstr, Oper};
pub use layout::{organize, FrameBuilder, Layout};
pub use mem::{Access, Frame, Inits};
pub use span::Span;

/// Run frame building, code generation and assembly
///
/// Stops at the first error; nothing produced before it is returned.
pub fn compile(program: &Program, config: &CodegenConfig) -> CodegenResult<Segments> {
    let layout = organize(program)?;
    let fragments = generate(program, &layout)?;
    assemble(program, &layout, &fragments, config)
}
