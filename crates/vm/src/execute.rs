//! Main execution loop and opcode dispatch for the IPPcode23 VM.

use std::cmp::Ordering;
use std::io::{BufRead, Write};

use crate::error::RuntimeError;
use crate::machine::Vm;
use ippcode_common::{ArgKind, Instruction, Opcode, Value};

/// Equality as `EQ` and the conditional jumps define it: operands of the
/// same concrete type compare by value, and nil is only ever equal to nil.
/// Any other pairing is an operand-type error.
fn equal_values(opcode: &'static str, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    match (a, b) {
        (Value::Nil, _) | (_, Value::Nil) => Ok(a == b),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        _ => Err(RuntimeError::OperandType { opcode }),
    }
}

/// Character of `s` at a character index, bounds-checked.
fn char_at(s: &str, index: i64) -> Result<char, RuntimeError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| s.chars().nth(i))
        .ok_or(RuntimeError::IndexOutOfBounds {
            index,
            length: s.chars().count(),
        })
}

impl<R: BufRead, W: Write> Vm<'_, R, W> {
    /// Execute the program until it runs past the last instruction, an
    /// `EXIT` requests a status, or an error aborts the run.
    ///
    /// The returned integer is the process exit status.
    pub fn execute(&mut self) -> Result<i32, RuntimeError> {
        let program = self.program;

        while let Some(ins) = program.instructions.get(self.pc) {
            self.pc += 1;

            match ins.opcode {
                // Frame management
                Opcode::Move => self.exec_move(ins)?,
                Opcode::CreateFrame => self.memory.create_frame(),
                Opcode::PushFrame => self.memory.push_frame()?,
                Opcode::PopFrame => self.memory.pop_frame()?,
                Opcode::DefVar => self.exec_defvar(ins)?,

                // Control flow
                Opcode::Call => self.exec_call(ins)?,
                Opcode::Return => self.exec_return()?,
                Opcode::Label => {}
                Opcode::Jump => self.pc = self.label_target(ins, 0)?,
                Opcode::JumpIfEq => self.exec_jump_if(ins, true)?,
                Opcode::JumpIfNeq => self.exec_jump_if(ins, false)?,
                Opcode::Exit => return self.exec_exit(ins),

                // Data stack
                Opcode::Pushs => self.exec_pushs(ins)?,
                Opcode::Pops => self.exec_pops(ins)?,

                // Arithmetic
                Opcode::Add => self.exec_arith(ins, i64::wrapping_add)?,
                Opcode::Sub => self.exec_arith(ins, i64::wrapping_sub)?,
                Opcode::Mul => self.exec_arith(ins, i64::wrapping_mul)?,
                Opcode::Idiv => self.exec_idiv(ins)?,

                // Relational and boolean
                Opcode::Lt => self.exec_order(ins, Ordering::is_lt)?,
                Opcode::Gt => self.exec_order(ins, Ordering::is_gt)?,
                Opcode::Eq => self.exec_eq(ins)?,
                Opcode::And => self.exec_bool(ins, |a, b| a && b)?,
                Opcode::Or => self.exec_bool(ins, |a, b| a || b)?,
                Opcode::Not => self.exec_not(ins)?,

                // Conversions
                Opcode::Int2Char => self.exec_int2char(ins)?,
                Opcode::Stri2Int => self.exec_stri2int(ins)?,

                // I/O
                Opcode::Read => self.exec_read(ins)?,
                Opcode::Write => self.exec_write(ins)?,

                // Strings
                Opcode::Concat => self.exec_concat(ins)?,
                Opcode::Strlen => self.exec_strlen(ins)?,
                Opcode::GetChar => self.exec_getchar(ins)?,
                Opcode::SetChar => self.exec_setchar(ins)?,

                // Introspection and debugging
                Opcode::Type => self.exec_type(ins)?,
                Opcode::Dprint => self.exec_dprint(ins),
                Opcode::Break => self.exec_break(ins),
            }
        }

        Ok(0)
    }

    // ---- Frame management ----

    fn exec_move(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let value = self.fetch(&ins.args[1])?;
        self.memory.set(dst, value)
    }

    fn exec_defvar(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        self.memory.define(dst)
    }

    // ---- Control flow ----

    fn exec_call(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let target = self.label_target(ins, 0)?;
        self.memory.call_stack.push(self.pc);
        self.pc = target;
        Ok(())
    }

    fn exec_return(&mut self) -> Result<(), RuntimeError> {
        self.pc = self
            .memory
            .call_stack
            .pop()
            .ok_or(RuntimeError::EmptyCallStack)?;
        Ok(())
    }

    fn exec_jump_if(&mut self, ins: &Instruction, want_equal: bool) -> Result<(), RuntimeError> {
        // Label existence is checked before operand types.
        let target = self.label_target(ins, 0)?;
        let a = self.fetch(&ins.args[1])?;
        let b = self.fetch(&ins.args[2])?;
        if equal_values(ins.opcode.mnemonic(), &a, &b)? == want_equal {
            self.pc = target;
        }
        Ok(())
    }

    fn exec_exit(&mut self, ins: &Instruction) -> Result<i32, RuntimeError> {
        let status = self.int_operand(ins, 0)?;
        if !(0..=49).contains(&status) {
            return Err(RuntimeError::ExitOutOfRange { status });
        }
        Ok(status as i32)
    }

    // ---- Data stack ----

    fn exec_pushs(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let value = self.fetch(&ins.args[0])?;
        self.memory.data_stack.push(value);
        Ok(())
    }

    fn exec_pops(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let value = self
            .memory
            .data_stack
            .pop()
            .ok_or(RuntimeError::EmptyDataStack)?;
        self.memory.set(dst, value)
    }

    // ---- Arithmetic ----

    /// Binary integer arithmetic: both operands must be `Int`.
    fn exec_arith(
        &mut self,
        ins: &Instruction,
        op: fn(i64, i64) -> i64,
    ) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let a = self.int_operand(ins, 1)?;
        let b = self.int_operand(ins, 2)?;
        self.memory.set(dst, Value::Int(op(a, b)))
    }

    fn exec_idiv(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let a = self.int_operand(ins, 1)?;
        let b = self.int_operand(ins, 2)?;
        if b == 0 {
            return Err(RuntimeError::DivisionByZero { at: ins.order });
        }
        // Truncates toward zero.
        self.memory.set(dst, Value::Int(a.wrapping_div(b)))
    }

    // ---- Relational and boolean ----

    /// `LT`/`GT`: same concrete type on both sides, nil rejected.
    /// Integers order numerically, strings by code point, booleans with
    /// false < true.
    fn exec_order(
        &mut self,
        ins: &Instruction,
        keep: fn(Ordering) -> bool,
    ) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let a = self.fetch(&ins.args[1])?;
        let b = self.fetch(&ins.args[2])?;
        let ordering = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => x.cmp(y),
            (Value::Str(x), Value::Str(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => {
                return Err(RuntimeError::OperandType {
                    opcode: ins.opcode.mnemonic(),
                })
            }
        };
        self.memory.set(dst, Value::Bool(keep(ordering)))
    }

    fn exec_eq(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let a = self.fetch(&ins.args[1])?;
        let b = self.fetch(&ins.args[2])?;
        let equal = equal_values(ins.opcode.mnemonic(), &a, &b)?;
        self.memory.set(dst, Value::Bool(equal))
    }

    fn exec_bool(
        &mut self,
        ins: &Instruction,
        op: fn(bool, bool) -> bool,
    ) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let a = self.bool_operand(ins, 1)?;
        let b = self.bool_operand(ins, 2)?;
        self.memory.set(dst, Value::Bool(op(a, b)))
    }

    fn exec_not(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let a = self.bool_operand(ins, 1)?;
        self.memory.set(dst, Value::Bool(!a))
    }

    // ---- Conversions ----

    fn exec_int2char(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let code = self.int_operand(ins, 1)?;
        let c = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or(RuntimeError::BadCodePoint { value: code })?;
        self.memory.set(dst, Value::Str(c.to_string()))
    }

    fn exec_stri2int(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let s = self.str_operand(ins, 1)?;
        let index = self.int_operand(ins, 2)?;
        let c = char_at(&s, index)?;
        self.memory.set(dst, Value::Int(c as u32 as i64))
    }

    // ---- I/O ----

    fn exec_read(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;

        let ty = &ins.args[1];
        if ty.kind != ArgKind::Type {
            return Err(RuntimeError::OperandType {
                opcode: ins.opcode.mnemonic(),
            });
        }
        if !matches!(ty.text.as_str(), "int" | "bool" | "string" | "nil") {
            return Err(RuntimeError::UnknownReadType {
                lexeme: ty.text.clone(),
            });
        }

        // End of input and blank lines both read as nil; a value that
        // fails to parse as int also falls back to nil.
        let value = match self.read_line()? {
            None => Value::Nil,
            Some(line) if line.is_empty() => Value::Nil,
            Some(line) => match ty.text.as_str() {
                "int" => line
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .unwrap_or(Value::Nil),
                "bool" => Value::Bool(line.eq_ignore_ascii_case("true")),
                "string" => Value::Str(line),
                _ => Value::Nil,
            },
        };

        self.memory.set(dst, value)
    }

    fn exec_write(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let value = self.fetch(&ins.args[0])?;
        write!(self.output, "{value}").map_err(|e| RuntimeError::Io(e.to_string()))
    }

    // ---- Strings ----

    fn exec_concat(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let mut a = self.str_operand(ins, 1)?;
        let b = self.str_operand(ins, 2)?;
        a.push_str(&b);
        self.memory.set(dst, Value::Str(a))
    }

    fn exec_strlen(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let s = self.str_operand(ins, 1)?;
        self.memory.set(dst, Value::Int(s.chars().count() as i64))
    }

    fn exec_getchar(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let s = self.str_operand(ins, 1)?;
        let index = self.int_operand(ins, 2)?;
        let c = char_at(&s, index)?;
        self.memory.set(dst, Value::Str(c.to_string()))
    }

    fn exec_setchar(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let index = self.int_operand(ins, 1)?;
        let replacement = self.str_operand(ins, 2)?;

        let current = match self.memory.get(dst)? {
            Value::Str(s) => s.clone(),
            _ => {
                return Err(RuntimeError::OperandType {
                    opcode: ins.opcode.mnemonic(),
                })
            }
        };
        let first = replacement
            .chars()
            .next()
            .ok_or(RuntimeError::EmptyReplacement)?;

        let length = current.chars().count();
        let i = usize::try_from(index)
            .ok()
            .filter(|&i| i < length)
            .ok_or(RuntimeError::IndexOutOfBounds { index, length })?;

        let updated: String = current
            .chars()
            .enumerate()
            .map(|(j, c)| if j == i { first } else { c })
            .collect();
        self.memory.set(dst, Value::Str(updated))
    }

    // ---- Introspection and debugging ----

    fn exec_type(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        let dst = self.dest(ins, 0)?;
        let sym = &ins.args[1];
        // An uninitialized variable reads as the empty type name, so the
        // fetch here must not reject Uninit.
        let name = match sym.kind {
            ArgKind::Var => self.memory.get_raw(&sym.text)?.type_name(),
            _ => sym.decode()?.type_name(),
        };
        self.memory.set(dst, Value::Str(name.to_string()))
    }

    fn exec_dprint(&self, ins: &Instruction) {
        if let Ok(value) = self.fetch(&ins.args[0]) {
            eprintln!("{value:?}");
        }
    }

    fn exec_break(&self, ins: &Instruction) {
        eprintln!(
            "break at order {}: pc={} data_stack={} call_stack={} local_frames={} temporary_frame={}",
            ins.order,
            self.pc,
            self.memory.data_stack.len(),
            self.memory.call_stack.len(),
            self.memory.local_depth(),
            if self.memory.has_temporary() { "yes" } else { "no" },
        );
    }
}
