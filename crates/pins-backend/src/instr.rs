//! Stack machine instruction set
//!
//! Two disjoint families: [`Code`] instructions for the code segment and
//! [`Data`] instructions for the data segment. Every emitted instruction
//! is wrapped with the span of the node that produced it.
//!
//! Byte sizes are what a downstream linker needs to compute addresses:
//! labels take no space, instructions with an immediate operand take 5
//! bytes, every other code instruction takes 1.

use crate::ast::BinaryOp;
use crate::mem::{Frame, WORD_SIZE};
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an opcode
pub const OPCODE_SIZE: u32 = 1;
/// Size of an opcode with a word immediate
pub const IMMEDIATE_SIZE: u32 = OPCODE_SIZE + WORD_SIZE;

/// Operator applied by [`Code::Oper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Oper {
    // ===== Arithmetic =====
    /// Pop b, pop a, push a + b
    Add,
    /// Pop b, pop a, push a - b
    Sub,
    /// Pop b, pop a, push a * b
    Mul,
    /// Pop b, pop a, push a / b
    Div,
    /// Pop b, pop a, push a % b
    Mod,
    /// Pop a, push -a
    Neg,

    // ===== Logical =====
    /// Pop a, push !a
    Not,
    /// Pop b, pop a, push a && b
    And,
    /// Pop b, pop a, push a || b
    Or,

    // ===== Relational =====
    Equ,
    Neq,
    Lth,
    Gth,
    Leq,
    Geq,
}

impl Oper {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Oper::Add => "ADD",
            Oper::Sub => "SUB",
            Oper::Mul => "MUL",
            Oper::Div => "DIV",
            Oper::Mod => "MOD",
            Oper::Neg => "NEG",
            Oper::Not => "NOT",
            Oper::And => "AND",
            Oper::Or => "OR",
            Oper::Equ => "EQU",
            Oper::Neq => "NEQ",
            Oper::Lth => "LTH",
            Oper::Gth => "GTH",
            Oper::Leq => "LEQ",
            Oper::Geq => "GEQ",
        }
    }

    /// Number of operands popped
    pub fn arity(self) -> usize {
        match self {
            Oper::Neg | Oper::Not => 1,
            _ => 2,
        }
    }
}

impl From<BinaryOp> for Oper {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Or => Oper::Or,
            BinaryOp::And => Oper::And,
            BinaryOp::Eq => Oper::Equ,
            BinaryOp::Ne => Oper::Neq,
            BinaryOp::Lt => Oper::Lth,
            BinaryOp::Gt => Oper::Gth,
            BinaryOp::Le => Oper::Leq,
            BinaryOp::Ge => Oper::Geq,
            BinaryOp::Add => Oper::Add,
            BinaryOp::Sub => Oper::Sub,
            BinaryOp::Mul => Oper::Mul,
            BinaryOp::Div => Oper::Div,
            BinaryOp::Mod => Oper::Mod,
        }
    }
}

/// Code segment instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Code {
    // ===== Labels and constants =====
    /// Define a label at the current address
    Label(String),
    /// Push the address of a label
    Name(String),
    /// Push a word
    Push(i32),

    // ===== Stack and memory =====
    /// Pop n, then pop n bytes (push them when n is negative)
    PopN,
    /// Pop an address, push the word stored there
    Load,
    /// Pop an address, pop a word, store the word there
    Save,
    /// Push the frame pointer
    RegFp,
    /// Pop an address, pop an init-blob address, copy the decoded blob
    Init,

    // ===== Operators =====
    Oper(Oper),

    // ===== Control flow =====
    /// Pop a target address, jump
    Ujmp,
    /// Pop the false target, pop the true target, pop a condition, jump
    Cjmp,
    /// Pop a code address, call it with the callee's frame; `None` for
    /// external routines
    Call(Option<Frame>),
    /// Pop the parameter-area size, return from the frame
    Retn(Frame),
}

impl Code {
    /// Attach the span of the producing node
    pub fn at(self, span: Span) -> CodeInstr {
        CodeInstr { kind: self, span }
    }

    /// Size in bytes
    pub fn size(&self) -> u32 {
        match self {
            Code::Label(_) => 0,
            Code::Name(_) | Code::Push(_) => IMMEDIATE_SIZE,
            _ => OPCODE_SIZE,
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Code::Label(_))
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Label(label) => write!(f, "LABEL {}", label),
            Code::Name(label) => write!(f, "NAME {}", label),
            Code::Push(value) => write!(f, "PUSH {}", value),
            Code::PopN => write!(f, "POPN"),
            Code::Load => write!(f, "LOAD"),
            Code::Save => write!(f, "SAVE"),
            Code::RegFp => write!(f, "REGN FP"),
            Code::Init => write!(f, "INIT"),
            Code::Oper(oper) => write!(f, "OPER {}", oper.mnemonic()),
            Code::Ujmp => write!(f, "UJMP"),
            Code::Cjmp => write!(f, "CJMP"),
            Code::Call(Some(frame)) => write!(f, "CALL {}", frame.label),
            Code::Call(None) => write!(f, "CALL"),
            Code::Retn(frame) => write!(f, "RETN {}", frame.label),
        }
    }
}

/// Data segment instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Data {
    /// Define a label at the current address
    Label(String),
    /// One initialized word
    Word(i32),
    /// Reserve `n` uninitialized bytes
    Size(u32),
}

impl Data {
    pub fn at(self, span: Span) -> DataInstr {
        DataInstr { kind: self, span }
    }

    pub fn size(&self) -> u32 {
        match self {
            Data::Label(_) => 0,
            Data::Word(_) => WORD_SIZE,
            Data::Size(bytes) => *bytes,
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Data::Label(_))
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Label(label) => write!(f, "LABEL {}", label),
            Data::Word(value) => write!(f, "DATA {}", value),
            Data::Size(bytes) => write!(f, "SIZE {}", bytes),
        }
    }
}

/// Code instruction with its source span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInstr {
    pub kind: Code,
    pub span: Span,
}

impl CodeInstr {
    pub fn size(&self) -> u32 {
        self.kind.size()
    }
}

impl fmt::Display for CodeInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

/// Data instruction with its source span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInstr {
    pub kind: Data,
    pub span: Span,
}

impl DataInstr {
    pub fn size(&self) -> u32 {
        self.kind.size()
    }
}

impl fmt::Display for DataInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}
