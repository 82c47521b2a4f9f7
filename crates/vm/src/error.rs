//! Runtime errors for the IPPcode23 VM.
//!
//! Every failing contract aborts the VM; nothing is recovered locally.
//! Each variant maps to one fixed process exit status.

use ippcode_common::{exit_code, DecodeError};
use thiserror::Error;

/// Errors that occur during program execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// `DEFVAR` on a name that already exists in the frame.
    #[error("variable '{name}' already defined")]
    Redefined { name: String },

    /// Jump or call to a label the program never declares.
    #[error("unknown label '{label}'")]
    UnknownLabel { label: String },

    /// `READ` with a type operand outside int/string/bool/nil.
    #[error("unknown type '{lexeme}' in READ")]
    UnknownReadType { lexeme: String },

    /// Operand values have the wrong dynamic type for the operation.
    #[error("wrong operand types for {opcode}")]
    OperandType { opcode: &'static str },

    /// A destination argument that is not a variable reference.
    #[error("{opcode} destination is not a variable")]
    DestinationNotVariable { opcode: &'static str },

    /// A constant operand whose lexeme does not decode.
    #[error(transparent)]
    BadConstant(#[from] DecodeError),

    /// Access to a name the referenced frame does not define.
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },

    /// A variable reference without a valid `GF@`/`LF@`/`TF@` prefix.
    #[error("malformed variable name '{name}'")]
    BadVariableName { name: String },

    /// `LF` with an empty local stack, or `TF` while no temporary frame
    /// exists.
    #[error("frame {frame} does not exist")]
    MissingFrame { frame: &'static str },

    /// Read of a variable that was defined but never assigned.
    #[error("read of uninitialized variable '{name}'")]
    UninitializedVariable { name: String },

    /// `POPS` with nothing on the data stack.
    #[error("POPS on empty data stack")]
    EmptyDataStack,

    /// `RETURN` with nothing on the call stack.
    #[error("RETURN with empty call stack")]
    EmptyCallStack,

    /// `IDIV` with a zero divisor.
    #[error("division by zero at order {at}")]
    DivisionByZero { at: i32 },

    /// `EXIT` with an integer outside 0..=49.
    #[error("EXIT status {status} out of range 0..=49")]
    ExitOutOfRange { status: i64 },

    /// String index outside the value's character range.
    #[error("index {index} out of bounds (length {length})")]
    IndexOutOfBounds { index: i64, length: usize },

    /// `INT2CHAR` of an integer that is not a Unicode scalar value.
    #[error("invalid code point {value}")]
    BadCodePoint { value: i64 },

    /// `SETCHAR` with an empty replacement string.
    #[error("SETCHAR with empty replacement string")]
    EmptyReplacement,

    /// Reading input or writing output failed at the host level.
    #[error("i/o error: {0}")]
    Io(String),
}

impl RuntimeError {
    /// The process exit status this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            RuntimeError::Redefined { .. }
            | RuntimeError::UnknownLabel { .. }
            | RuntimeError::UnknownReadType { .. } => exit_code::SEMANTIC,

            RuntimeError::OperandType { .. }
            | RuntimeError::DestinationNotVariable { .. }
            | RuntimeError::BadConstant(_) => exit_code::OPERAND_TYPE,

            RuntimeError::UndefinedVariable { .. } | RuntimeError::BadVariableName { .. } => {
                exit_code::UNDEFINED_VARIABLE
            }

            RuntimeError::MissingFrame { .. } => exit_code::MISSING_FRAME,

            RuntimeError::UninitializedVariable { .. }
            | RuntimeError::EmptyDataStack
            | RuntimeError::EmptyCallStack => exit_code::MISSING_VALUE,

            RuntimeError::DivisionByZero { .. } | RuntimeError::ExitOutOfRange { .. } => {
                exit_code::BAD_OPERAND_VALUE
            }

            RuntimeError::IndexOutOfBounds { .. }
            | RuntimeError::BadCodePoint { .. }
            | RuntimeError::EmptyReplacement => exit_code::STRING_ERROR,

            RuntimeError::Io(_) => exit_code::INTERNAL,
        }
    }
}
