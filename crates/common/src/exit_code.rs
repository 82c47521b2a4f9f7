//! Process exit codes of the interpreter.
//!
//! Every diagnostic maps to one of these fixed statuses; the CLI exits
//! with the mapped code after printing a line to stderr.

/// Successful interpretation (or `EXIT 0`).
pub const OK: i32 = 0;

/// Missing or invalid command-line arguments.
pub const BAD_ARGS: i32 = 10;
/// A source or input file could not be opened.
pub const CANNOT_OPEN_INPUT: i32 = 11;
/// An output file could not be opened. The interpreter opens no output
/// files, so this status is reserved.
pub const CANNOT_OPEN_OUTPUT: i32 = 12;

/// The source is not well-formed XML.
pub const MALFORMED_XML: i32 = 31;
/// The XML is well-formed but not a valid program structure.
pub const BAD_STRUCTURE: i32 = 32;

/// Semantic error: undefined label, variable redefinition, unknown READ type.
pub const SEMANTIC: i32 = 52;
/// Operand type error.
pub const OPERAND_TYPE: i32 = 53;
/// Access to an undefined variable.
pub const UNDEFINED_VARIABLE: i32 = 54;
/// A referenced frame does not exist.
pub const MISSING_FRAME: i32 = 55;
/// Missing value: empty data/call stack or uninitialized variable read.
pub const MISSING_VALUE: i32 = 56;
/// Bad operand value: division by zero, EXIT status out of range.
pub const BAD_OPERAND_VALUE: i32 = 57;
/// Faulty string operation: bad index or bad code point.
pub const STRING_ERROR: i32 = 58;

/// Internal interpreter error.
pub const INTERNAL: i32 = 99;
