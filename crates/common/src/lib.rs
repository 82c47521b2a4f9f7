//! Shared data model for the IPPcode23 interpreter.
//!
//! This crate provides the foundational types the loader and the VM agree
//! on:
//!
//! - [`Value`] — the tagged runtime value (`int`, `bool`, `string`, `nil`,
//!   plus the defined-but-unassigned marker)
//! - [`Opcode`] — the 35-instruction set with mnemonics and arities
//! - [`Arg`] / [`ArgKind`] — parsed operands and constant decoding
//! - [`Instruction`] — an ordered opcode with its argument list
//! - [`Program`] — the sorted instruction vector plus the label table
//! - [`DecodeError`] — constant-decoding failures
//! - [`exit_code`] — the fixed diagnostic → process status mapping
//!
//! # Dependencies
//!
//! This crate uses `thiserror` (compile-time proc-macro, zero runtime
//! cost) and has no other dependencies.

pub mod arg;
pub mod error;
pub mod exit_code;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod value;

// Re-export commonly used types at the crate root.
pub use arg::{Arg, ArgKind};
pub use error::DecodeError;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use program::Program;
pub use value::Value;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy that generates a random valid Opcode.
    fn arb_opcode() -> impl Strategy<Value = Opcode> {
        prop::sample::select(&opcode::ALL_OPCODES[..])
    }

    proptest! {
        /// Mnemonic parsing is insensitive to any mix of letter cases.
        #[test]
        fn opcode_parse_under_case_folding(op in arb_opcode(), mask in any::<u32>()) {
            let mangled: String = op
                .mnemonic()
                .chars()
                .enumerate()
                .map(|(i, c)| {
                    if mask >> (i % 32) & 1 == 1 {
                        c.to_ascii_lowercase()
                    } else {
                        c
                    }
                })
                .collect();
            prop_assert_eq!(Opcode::parse(&mangled), Some(op));
        }

        /// Escape decoding is the identity on backslash-free strings.
        #[test]
        fn string_decode_identity_without_backslash(s in "[a-zA-Z0-9 @#()]*") {
            prop_assert_eq!(arg::decode_string(&s), s);
        }

        /// Any i64 survives the write-then-decode round trip of an int
        /// constant.
        #[test]
        fn int_constant_roundtrip(n in any::<i64>()) {
            let a = Arg::new(ArgKind::Int, n.to_string());
            prop_assert_eq!(a.decode(), Ok(Value::Int(n)));
        }

        /// A decoded escape always contributes exactly one character.
        #[test]
        fn escape_decodes_to_one_char(code in 0u32..1000) {
            let lexeme = format!("\\{code:03}");
            let decoded = arg::decode_string(&lexeme);
            prop_assert_eq!(decoded.chars().count(), 1);
            prop_assert_eq!(decoded.chars().next().map(|c| c as u32), Some(code));
        }
    }
}
