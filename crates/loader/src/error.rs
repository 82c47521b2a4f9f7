//! Error types for the IPPcode23 loader.

use ippcode_common::exit_code;
use thiserror::Error;

/// Errors produced while turning source XML into a validated program.
///
/// Returns the first error encountered. Fix one error at a time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// The root element is not `program`.
    #[error("root element '{0}', expected 'program'")]
    BadRoot(String),

    /// The root `language` attribute is missing or not `IPPcode23`.
    #[error("missing or wrong language attribute '{0}'")]
    BadLanguage(String),

    /// A child of the root that is not an `instruction` element.
    #[error("unexpected element '{0}'")]
    UnexpectedElement(String),

    /// The `order` attribute is missing, non-numeric, or not positive.
    #[error("missing or invalid order '{0}'")]
    BadOrder(String),

    /// Two instructions share an `order` value.
    #[error("duplicate order {0}")]
    DuplicateOrder(i32),

    /// The `opcode` attribute names no known instruction.
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),

    /// An instruction child that is not `arg1`/`arg2`/`arg3`.
    #[error("order {order}: bad argument element '{tag}'")]
    BadArgElement { order: i32, tag: String },

    /// The `type` attribute is missing or outside the seven kinds.
    #[error("order {order}: unknown argument type '{value}'")]
    BadArgType { order: i32, value: String },

    /// Argument suffixes do not cover 1..n (gap or duplicate).
    #[error("order {order}: argument positions are not 1..={count}")]
    BadArgPositions { order: i32, count: usize },

    /// The argument count does not match the opcode's arity.
    #[error("order {order}: {opcode} expects {expected} argument(s), found {found}")]
    BadArity {
        order: i32,
        opcode: &'static str,
        expected: usize,
        found: usize,
    },

    /// A `LABEL` whose argument is not of kind `label`.
    #[error("order {order}: LABEL argument is not of kind 'label'")]
    LabelArgKind { order: i32 },

    /// Two `LABEL` instructions declare the same name.
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),
}

impl LoadError {
    /// The process exit status this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::MalformedXml(_) => exit_code::MALFORMED_XML,
            LoadError::BadRoot(_)
            | LoadError::BadLanguage(_)
            | LoadError::UnexpectedElement(_)
            | LoadError::BadOrder(_)
            | LoadError::DuplicateOrder(_)
            | LoadError::UnknownOpcode(_)
            | LoadError::BadArgElement { .. }
            | LoadError::BadArgType { .. }
            | LoadError::BadArgPositions { .. }
            | LoadError::BadArity { .. } => exit_code::BAD_STRUCTURE,
            LoadError::LabelArgKind { .. } => exit_code::OPERAND_TYPE,
            LoadError::DuplicateLabel(_) => exit_code::SEMANTIC,
        }
    }
}
