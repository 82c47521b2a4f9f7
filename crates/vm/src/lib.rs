//! IPPcode23 virtual machine — executes loaded programs.
//!
//! The VM is a frame-and-stack machine with:
//! - A global frame, an optional temporary frame, and a stack of local
//!   frames addressed as `GF@x` / `TF@x` / `LF@x`
//! - A data stack for `PUSHS`/`POPS`
//! - A call stack of return addresses for `CALL`/`RETURN`
//!
//! # Usage
//!
//! ```
//! use ippcode_loader::load;
//! use ippcode_vm::run;
//!
//! let program = load(r#"
//!     <program language="IPPcode23">
//!       <instruction order="1" opcode="WRITE">
//!         <arg1 type="string">Hello\032World</arg1>
//!       </instruction>
//!     </program>
//! "#).unwrap();
//!
//! let mut output = Vec::new();
//! let status = run(&program, std::io::empty(), &mut output).unwrap();
//! assert_eq!(status, 0);
//! assert_eq!(output, b"Hello World");
//! ```

pub mod error;
pub mod execute;
pub mod machine;

pub use error::RuntimeError;
pub use machine::{Frame, Memory, Vm};

use std::io::{BufRead, Write};

use ippcode_common::Program;

/// Execute a program against an input line source and an output sink.
///
/// This is the primary entry point for the VM. The returned integer is
/// the process exit status: 0 when the program counter runs past the
/// last instruction, or the status an `EXIT` instruction requested.
///
/// # Errors
///
/// Returns [`RuntimeError`] if execution fails; [`RuntimeError::exit_code`]
/// maps the failure to its fixed diagnostic status.
pub fn run<R: BufRead, W: Write>(
    program: &Program,
    input: R,
    output: W,
) -> Result<i32, RuntimeError> {
    let mut vm = Vm::new(program, input, output);
    vm.execute()
}
