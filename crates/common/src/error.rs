//! Decode errors for IPPcode23 constant operands.

use thiserror::Error;

/// Errors that occur while decoding a constant argument into a [`Value`].
///
/// Constants are decoded lazily at the point of use, so these surface as
/// operand-type errors during execution.
///
/// [`Value`]: crate::Value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// An `int` lexeme that is not a decimal integer.
    #[error("invalid int constant '{0}'")]
    InvalidInt(String),

    /// A `nil` lexeme other than the literal `nil`.
    #[error("invalid nil constant '{0}'")]
    InvalidNil(String),

    /// The argument kind has no constant value (`var`, `label`, `type`).
    #[error("argument of kind '{0}' is not a constant")]
    NotAConstant(&'static str),
}
