//! VM state management: frames, stacks, and operand access.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::error::RuntimeError;
use ippcode_common::{Arg, ArgKind, Instruction, Program, Value};

/// A named-variable container.
///
/// Names are stored without their frame prefix. A name appears at most
/// once; redefinition is detected here and reported by [`Memory`].
#[derive(Debug, Clone, Default)]
pub struct Frame {
    vars: HashMap<String, Value>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name` as uninitialized. Returns false if it already exists.
    pub fn define(&mut self, name: &str) -> bool {
        if self.vars.contains_key(name) {
            return false;
        }
        self.vars.insert(name.to_string(), Value::Uninit);
        true
    }

    /// Look up a variable. `None` if the name was never defined.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Assign a defined variable. Returns false if the name was never
    /// defined.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.vars.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Number of defined variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if no variables are defined.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Which frame a qualified name selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Global,
    Local,
    Temporary,
}

/// The complete mutable state of one interpretation run.
///
/// Frames are owned exclusively by their current container: the global
/// frame by the VM, the temporary frame by an optional slot, local frames
/// by the local-frame stack. `PUSHFRAME`/`POPFRAME` transfer ownership,
/// they never copy.
#[derive(Debug, Default)]
pub struct Memory {
    global: Frame,
    temporary: Option<Frame>,
    locals: Vec<Frame>,
    /// Values manipulated by `PUSHS`/`POPS`.
    pub data_stack: Vec<Value>,
    /// Return addresses pushed by `CALL`, popped by `RETURN`.
    pub call_stack: Vec<usize>,
}

impl Memory {
    /// Fresh memory: a live global frame, no temporary frame, empty stacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `GF@x` into the frame selector and the bare name.
    fn split(qualified: &str) -> Result<(FrameKind, &str), RuntimeError> {
        let (prefix, name) = qualified.split_once('@').ok_or_else(|| {
            RuntimeError::BadVariableName {
                name: qualified.to_string(),
            }
        })?;
        let kind = match prefix {
            "GF" => FrameKind::Global,
            "LF" => FrameKind::Local,
            "TF" => FrameKind::Temporary,
            _ => {
                return Err(RuntimeError::BadVariableName {
                    name: qualified.to_string(),
                })
            }
        };
        Ok((kind, name))
    }

    fn frame(&self, kind: FrameKind) -> Result<&Frame, RuntimeError> {
        match kind {
            FrameKind::Global => Ok(&self.global),
            FrameKind::Local => self
                .locals
                .last()
                .ok_or(RuntimeError::MissingFrame { frame: "LF" }),
            FrameKind::Temporary => self
                .temporary
                .as_ref()
                .ok_or(RuntimeError::MissingFrame { frame: "TF" }),
        }
    }

    fn frame_mut(&mut self, kind: FrameKind) -> Result<&mut Frame, RuntimeError> {
        match kind {
            FrameKind::Global => Ok(&mut self.global),
            FrameKind::Local => self
                .locals
                .last_mut()
                .ok_or(RuntimeError::MissingFrame { frame: "LF" }),
            FrameKind::Temporary => self
                .temporary
                .as_mut()
                .ok_or(RuntimeError::MissingFrame { frame: "TF" }),
        }
    }

    /// Define a new uninitialized variable on the referenced frame.
    pub fn define(&mut self, qualified: &str) -> Result<(), RuntimeError> {
        let (kind, name) = Self::split(qualified)?;
        if self.frame_mut(kind)?.define(name) {
            Ok(())
        } else {
            Err(RuntimeError::Redefined {
                name: qualified.to_string(),
            })
        }
    }

    /// Look up a variable, permitting `Uninit` (used only by `TYPE`).
    pub fn get_raw(&self, qualified: &str) -> Result<&Value, RuntimeError> {
        let (kind, name) = Self::split(qualified)?;
        self.frame(kind)?
            .get(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: qualified.to_string(),
            })
    }

    /// Look up a variable's value. Reading `Uninit` is an error.
    pub fn get(&self, qualified: &str) -> Result<&Value, RuntimeError> {
        let value = self.get_raw(qualified)?;
        if value.is_initialized() {
            Ok(value)
        } else {
            Err(RuntimeError::UninitializedVariable {
                name: qualified.to_string(),
            })
        }
    }

    /// Assign a defined variable.
    pub fn set(&mut self, qualified: &str, value: Value) -> Result<(), RuntimeError> {
        let (kind, name) = Self::split(qualified)?;
        if self.frame_mut(kind)?.set(name, value) {
            Ok(())
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: qualified.to_string(),
            })
        }
    }

    /// `CREATEFRAME`: replace the temporary frame, discarding any
    /// previous contents.
    pub fn create_frame(&mut self) {
        self.temporary = Some(Frame::new());
    }

    /// `PUSHFRAME`: move the temporary frame onto the local stack.
    pub fn push_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self
            .temporary
            .take()
            .ok_or(RuntimeError::MissingFrame { frame: "TF" })?;
        self.locals.push(frame);
        Ok(())
    }

    /// `POPFRAME`: move the top local frame back into the temporary slot.
    pub fn pop_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self
            .locals
            .pop()
            .ok_or(RuntimeError::MissingFrame { frame: "LF" })?;
        self.temporary = Some(frame);
        Ok(())
    }

    /// Depth of the local-frame stack.
    pub fn local_depth(&self) -> usize {
        self.locals.len()
    }

    /// Returns true if a temporary frame currently exists.
    pub fn has_temporary(&self) -> bool {
        self.temporary.is_some()
    }
}

/// The IPPcode23 virtual machine.
///
/// `R` supplies the lines `READ` consumes; `W` receives the bytes `WRITE`
/// produces.
pub struct Vm<'a, R, W> {
    /// The program being executed.
    pub(crate) program: &'a Program,
    /// Program counter: 0-based index of the next instruction.
    pub(crate) pc: usize,
    /// Frames and stacks.
    pub(crate) memory: Memory,
    pub(crate) input: R,
    pub(crate) output: W,
}

impl<'a, R: BufRead, W: Write> Vm<'a, R, W> {
    /// Create a new VM for the given program and I/O endpoints.
    pub fn new(program: &'a Program, input: R, output: W) -> Self {
        Self {
            program,
            pc: 0,
            memory: Memory::new(),
            input,
            output,
        }
    }

    /// Fetch an operand: variables from memory, constants by decoding.
    pub(crate) fn fetch(&self, arg: &Arg) -> Result<Value, RuntimeError> {
        match arg.kind {
            ArgKind::Var => self.memory.get(&arg.text).cloned(),
            _ => Ok(arg.decode()?),
        }
    }

    /// Require a destination argument to be a variable reference and
    /// return its qualified name.
    pub(crate) fn dest<'i>(
        &self,
        ins: &'i Instruction,
        index: usize,
    ) -> Result<&'i str, RuntimeError> {
        let arg = &ins.args[index];
        if arg.kind == ArgKind::Var {
            Ok(&arg.text)
        } else {
            Err(RuntimeError::DestinationNotVariable {
                opcode: ins.opcode.mnemonic(),
            })
        }
    }

    /// Fetch an operand and require an integer.
    pub(crate) fn int_operand(&self, ins: &Instruction, index: usize) -> Result<i64, RuntimeError> {
        match self.fetch(&ins.args[index])? {
            Value::Int(i) => Ok(i),
            _ => Err(RuntimeError::OperandType {
                opcode: ins.opcode.mnemonic(),
            }),
        }
    }

    /// Fetch an operand and require a boolean.
    pub(crate) fn bool_operand(
        &self,
        ins: &Instruction,
        index: usize,
    ) -> Result<bool, RuntimeError> {
        match self.fetch(&ins.args[index])? {
            Value::Bool(b) => Ok(b),
            _ => Err(RuntimeError::OperandType {
                opcode: ins.opcode.mnemonic(),
            }),
        }
    }

    /// Fetch an operand and require a string.
    pub(crate) fn str_operand(
        &self,
        ins: &Instruction,
        index: usize,
    ) -> Result<String, RuntimeError> {
        match self.fetch(&ins.args[index])? {
            Value::Str(s) => Ok(s),
            _ => Err(RuntimeError::OperandType {
                opcode: ins.opcode.mnemonic(),
            }),
        }
    }

    /// Require a label argument and resolve its jump target.
    pub(crate) fn label_target(
        &self,
        ins: &Instruction,
        index: usize,
    ) -> Result<usize, RuntimeError> {
        let arg = &ins.args[index];
        if arg.kind != ArgKind::Label {
            return Err(RuntimeError::OperandType {
                opcode: ins.opcode.mnemonic(),
            });
        }
        self.program
            .label_target(&arg.text)
            .ok_or_else(|| RuntimeError::UnknownLabel {
                label: arg.text.clone(),
            })
    }

    /// Read one input line, stripping the trailing newline. `None` at
    /// end of input.
    pub(crate) fn read_line(&mut self) -> Result<Option<String>, RuntimeError> {
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .map_err(|e| RuntimeError::Io(e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_get_set_on_global() {
        let mut memory = Memory::new();
        memory.define("GF@x").unwrap();
        assert_eq!(memory.get_raw("GF@x"), Ok(&Value::Uninit));
        memory.set("GF@x", Value::Int(1)).unwrap();
        assert_eq!(memory.get("GF@x"), Ok(&Value::Int(1)));
    }

    #[test]
    fn uninitialized_read_is_an_error() {
        let mut memory = Memory::new();
        memory.define("GF@x").unwrap();
        assert_eq!(
            memory.get("GF@x"),
            Err(RuntimeError::UninitializedVariable { name: "GF@x".into() })
        );
    }

    #[test]
    fn redefinition_is_an_error() {
        let mut memory = Memory::new();
        memory.define("GF@x").unwrap();
        assert_eq!(
            memory.define("GF@x"),
            Err(RuntimeError::Redefined { name: "GF@x".into() })
        );
    }

    #[test]
    fn undefined_access_is_an_error() {
        let memory = Memory::new();
        assert_eq!(
            memory.get("GF@missing"),
            Err(RuntimeError::UndefinedVariable {
                name: "GF@missing".into()
            })
        );
        let mut memory = Memory::new();
        assert_eq!(
            memory.set("GF@missing", Value::Nil),
            Err(RuntimeError::UndefinedVariable {
                name: "GF@missing".into()
            })
        );
    }

    #[test]
    fn malformed_names_are_rejected() {
        let memory = Memory::new();
        for name in ["x", "XF@x", "gf@x", ""] {
            assert_eq!(
                memory.get(name),
                Err(RuntimeError::BadVariableName { name: name.into() }),
                "name={name:?}"
            );
        }
    }

    #[test]
    fn name_may_contain_at_sign() {
        // Only the first '@' separates the frame prefix.
        let mut memory = Memory::new();
        memory.define("GF@a@b").unwrap();
        memory.set("GF@a@b", Value::Bool(true)).unwrap();
        assert_eq!(memory.get("GF@a@b"), Ok(&Value::Bool(true)));
    }

    #[test]
    fn temporary_frame_lifecycle() {
        let mut memory = Memory::new();
        assert_eq!(
            memory.get("TF@x"),
            Err(RuntimeError::MissingFrame { frame: "TF" })
        );

        memory.create_frame();
        memory.define("TF@x").unwrap();
        memory.set("TF@x", Value::Int(7)).unwrap();

        // CREATEFRAME discards the previous temporary frame.
        memory.create_frame();
        assert_eq!(
            memory.get("TF@x"),
            Err(RuntimeError::UndefinedVariable { name: "TF@x".into() })
        );
    }

    #[test]
    fn push_and_pop_transfer_the_frame() {
        let mut memory = Memory::new();
        assert_eq!(
            memory.push_frame(),
            Err(RuntimeError::MissingFrame { frame: "TF" })
        );
        assert_eq!(
            memory.pop_frame(),
            Err(RuntimeError::MissingFrame { frame: "LF" })
        );

        memory.create_frame();
        memory.define("TF@v").unwrap();
        memory.set("TF@v", Value::Str("kept".into())).unwrap();

        memory.push_frame().unwrap();
        assert!(!memory.has_temporary());
        assert_eq!(memory.local_depth(), 1);
        assert_eq!(memory.get("LF@v"), Ok(&Value::Str("kept".into())));

        memory.pop_frame().unwrap();
        assert!(memory.has_temporary());
        assert_eq!(memory.local_depth(), 0);
        assert_eq!(memory.get("TF@v"), Ok(&Value::Str("kept".into())));
    }

    #[test]
    fn local_frames_shadow_like_a_stack() {
        let mut memory = Memory::new();
        memory.create_frame();
        memory.define("TF@n").unwrap();
        memory.set("TF@n", Value::Int(1)).unwrap();
        memory.push_frame().unwrap();

        memory.create_frame();
        memory.define("TF@n").unwrap();
        memory.set("TF@n", Value::Int(2)).unwrap();
        memory.push_frame().unwrap();

        // LF resolves against the top frame only.
        assert_eq!(memory.get("LF@n"), Ok(&Value::Int(2)));
        memory.pop_frame().unwrap();
        assert_eq!(memory.get("LF@n"), Ok(&Value::Int(1)));
    }
}
