//! Diagnostic disassembly sink.
//!
//! Purely for human-facing traces; the interpreter's correctness never
//! depends on what a `DisasmSink` does with the text it's handed.

use gpu_sim_isa::{Instruction, Opcode};

pub trait DisasmSink {
    fn emit(&mut self, text: &str);
}

/// Drops every line; the default when no diagnostic output is wanted.
#[derive(Default)]
pub struct NullSink;

impl DisasmSink for NullSink {
    fn emit(&mut self, _text: &str) {}
}

/// Renders an [`Instruction`] as `MNEMONIC dst, src0, src1` text.
pub fn disassemble(inst: &Instruction) -> String {
    let mnemonic = match &inst.opcode {
        Opcode::Mov => "mov",
        Opcode::Add => "add",
        Opcode::Mul => "mul",
        Opcode::And => "and",
        Opcode::Or => "or",
        Opcode::Xor => "xor",
        Opcode::Not => "not",
        Opcode::Shr => "shr",
        Opcode::Shl => "shl",
        Opcode::Asr => "asr",
        Opcode::Cmp(_) => "cmp",
        Opcode::Sel => "sel",
        Opcode::Mad => "mad",
        Opcode::Lrp => "lrp",
        Opcode::Line => "line",
        Opcode::Pln => "pln",
        Opcode::Math(_) => "math.rsq",
        Opcode::Send { .. } => "send",
        Opcode::If => "if",
        Opcode::Else => "else",
        Opcode::Endif => "endif",
        Opcode::Do => "do",
        Opcode::While => "while",
        Opcode::Break => "break",
        Opcode::Continue => "continue",
        Opcode::Halt => "halt",
        Opcode::Nop => "nop",
    };
    let srcs: Vec<String> = inst.src.iter().map(|s| format!("r{}", s.reg)).collect();
    format!("{mnemonic} r{}, {}", inst.dst.reg, srcs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpu_sim_isa::{Operand, RegType};

    #[test]
    fn disassembles_mov_with_one_source() {
        let inst = Instruction::new(Opcode::Mov, Operand::direct(2, RegType::F32), vec![Operand::direct(1, RegType::F32)]);
        assert_eq!(disassemble(&inst), "mov r2, r1");
    }
}
