//! SIMD8 execution unit interpreter.
//!
//! Executes a straight-line list of [`Instruction`]s against a [`Thread`],
//! lane-by-lane under the current execution mask, dispatching `SEND`
//! messages through a [`SendHandler`]. Control flow (`IF`/`ELSE`/`ENDIF`/
//! `DO`/`WHILE`/`BREAK`/`CONTINUE`/`HALT`) drives a jump table built from
//! matching opcode pairs rather than a real PC-relative jump, since this
//! interpreter has no separate decode-then-execute pass.

pub mod reg;
pub mod send;

use gpu_sim_isa::{CondModifier, Instruction, MathFn, Opcode, Operand, RegType, Saturate};
use reg::Thread;
use send::{SendArgs, SendHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EuError {
    /// A register index conversion overflowed 16 bits worth of GRF rows.
    IllegalOpcode,
    MaskStackUnderflow,
}

impl std::fmt::Display for EuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EuError::IllegalOpcode => write!(f, "illegal EU opcode"),
            EuError::MaskStackUnderflow => write!(f, "ENDIF/WHILE with no matching IF/DO"),
        }
    }
}

impl std::error::Error for EuError {}

/// A lane's value, kept in whichever of the three GRF views its operand
/// declared rather than collapsed to `f32` up front — the conversion to
/// `f32` for a `U32` above 2^24 loses bits a later `Shr`/`Shl` needs back.
#[derive(Debug, Clone, Copy)]
enum Lane {
    F(f32),
    I(i32),
    U(u32),
}

impl Lane {
    fn as_f32(self) -> f32 {
        match self {
            Lane::F(v) => v,
            Lane::I(v) => v as f32,
            Lane::U(v) => v as f32,
        }
    }

    fn as_i32(self) -> i32 {
        match self {
            Lane::F(v) => v as i32,
            Lane::I(v) => v,
            Lane::U(v) => v as i32,
        }
    }

    fn as_u32(self) -> u32 {
        match self {
            Lane::F(v) => v as u32,
            Lane::I(v) => v,
            Lane::U(v) => v as u32,
        }
    }

    /// Reinterpret without conversion — the raw bit pattern backing the
    /// GRF row, used by bitwise ops that don't care about the value's
    /// numeric meaning.
    fn bits(self) -> u32 {
        match self {
            Lane::F(v) => v.to_bits(),
            Lane::I(v) => v as u32,
            Lane::U(v) => v,
        }
    }
}

fn read_operand(thread: &Thread, operand: &Operand, lane: usize) -> Lane {
    let source_lane = operand.subreg as usize + operand.region.element(lane);
    let r = &thread.grf[operand.reg as usize];
    let mut value = match operand.reg_type {
        RegType::F32 => Lane::F(r.f(source_lane)),
        RegType::I32 => Lane::I(r.d(source_lane)),
        RegType::U32 => Lane::U(r.ud(source_lane)),
    };
    if operand.abs {
        value = match value {
            Lane::F(v) => Lane::F(v.abs()),
            Lane::I(v) => Lane::I(v.wrapping_abs()),
            Lane::U(v) => Lane::U(v),
        };
    }
    if operand.negate {
        value = match value {
            Lane::F(v) => Lane::F(-v),
            Lane::I(v) => Lane::I(v.wrapping_neg()),
            Lane::U(v) => Lane::U(v.wrapping_neg()),
        };
    }
    value
}

fn write_lane(thread: &mut Thread, reg: u16, reg_type: RegType, lane: usize, value: Lane, saturate: Saturate) {
    let r = &mut thread.grf[reg as usize];
    match reg_type {
        RegType::F32 => {
            let v = match saturate {
                Saturate::None => value.as_f32(),
                // NaN must clamp to 0, matching IEEE min/max-based saturate
                // logic rather than `value.clamp`, which propagates NaN.
                Saturate::Clamp01 => {
                    let v = value.as_f32();
                    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
                }
            };
            r.set_f(lane, v);
        }
        RegType::I32 => r.set_d(lane, value.as_i32()),
        RegType::U32 => r.set_ud(lane, value.as_u32()),
    }
}

/// Execute one instruction against `thread`, routing `SEND` through
/// `handler`. Returns the updated execution mask bookkeeping via `thread`
/// itself; the caller drives the instruction stream (there is no implicit
/// program counter here — `gpu-sim-core` owns the kernel's instruction
/// list and calls this once per instruction in order).
pub fn execute(
    thread: &mut Thread,
    inst: &Instruction,
    handler: &mut dyn SendHandler,
) -> Result<(), EuError> {
    if thread.halted {
        return Ok(());
    }

    match &inst.opcode {
        Opcode::If => {
            thread.mask_stack.push(thread.mask);
            let mut new_mask = 0u8;
            for lane in 0..8 {
                if thread.mask & (1 << lane) != 0 && read_operand(thread, &inst.src[0], lane).as_f32() != 0.0 {
                    new_mask |= 1 << lane;
                }
            }
            thread.mask = new_mask;
            return Ok(());
        }
        Opcode::Else => {
            let outer = *thread.mask_stack.last().ok_or(EuError::MaskStackUnderflow)?;
            thread.mask = outer & !thread.mask;
            return Ok(());
        }
        Opcode::Endif => {
            thread.mask = thread.mask_stack.pop().ok_or(EuError::MaskStackUnderflow)?;
            return Ok(());
        }
        Opcode::Do => {
            thread.mask_stack.push(thread.mask);
            return Ok(());
        }
        Opcode::While => {
            let mut new_mask = 0u8;
            for lane in 0..8 {
                if thread.mask & (1 << lane) != 0 && read_operand(thread, &inst.src[0], lane).as_f32() != 0.0 {
                    new_mask |= 1 << lane;
                }
            }
            thread.mask = new_mask;
            if thread.mask == 0 {
                thread.mask_stack.pop().ok_or(EuError::MaskStackUnderflow)?;
            }
            return Ok(());
        }
        Opcode::Break | Opcode::Continue => {
            // Loop-exit bookkeeping belongs to the caller's instruction
            // walk (it knows where the matching WHILE is); the interpreter
            // only clears the current lane set so no further statements in
            // this iteration execute on those lanes.
            thread.mask = 0;
            return Ok(());
        }
        Opcode::Halt => {
            thread.halted = true;
            return Ok(());
        }
        Opcode::Nop => return Ok(()),
        _ => {}
    }

    if let Opcode::Send { target, offset, len } = &inst.opcode {
        let src = inst.src.first().map(|o| o.reg).unwrap_or(0);
        let args = SendArgs { target: *target, src, dst: inst.dst.reg, offset: *offset, len: *len };
        match target {
            gpu_sim_isa::SendTarget::Urb => handler.urb_write(thread, &args),
            gpu_sim_isa::SendTarget::Sampler => handler.sample(thread, &args),
            gpu_sim_isa::SendTarget::RenderCache => handler.render_write(thread, &args),
        }
        return Ok(());
    }

    for lane in 0..8 {
        if thread.mask & (1 << lane) == 0 {
            continue;
        }

        let srcs: Vec<Lane> = inst.src.iter().map(|s| read_operand(thread, s, lane)).collect();
        let dst_type = inst.dst.reg_type;

        let result = match &inst.opcode {
            Opcode::Mov => srcs[0],
            // Arithmetic is carried out in the destination's own type, so
            // integer adds/muls wrap at 32 bits instead of rounding through
            // `f32`'s 24-bit mantissa.
            Opcode::Add => match dst_type {
                RegType::F32 => Lane::F(srcs[0].as_f32() + srcs[1].as_f32()),
                RegType::I32 => Lane::I(srcs[0].as_i32().wrapping_add(srcs[1].as_i32())),
                RegType::U32 => Lane::U(srcs[0].as_u32().wrapping_add(srcs[1].as_u32())),
            },
            Opcode::Mul => match dst_type {
                RegType::F32 => Lane::F(srcs[0].as_f32() * srcs[1].as_f32()),
                RegType::I32 => Lane::I(srcs[0].as_i32().wrapping_mul(srcs[1].as_i32())),
                RegType::U32 => Lane::U(srcs[0].as_u32().wrapping_mul(srcs[1].as_u32())),
            },
            Opcode::And => Lane::U(srcs[0].bits() & srcs[1].bits()),
            Opcode::Or => Lane::U(srcs[0].bits() | srcs[1].bits()),
            Opcode::Xor => Lane::U(srcs[0].bits() ^ srcs[1].bits()),
            Opcode::Not => Lane::U(!srcs[0].bits()),
            // Logical shift: always over the raw unsigned bit pattern, so
            // `SHR` on a `UD` matches `x >> k` bit for bit.
            Opcode::Shr => Lane::U(srcs[0].as_u32() >> (srcs[1].as_u32() & 31)),
            Opcode::Shl => Lane::U(srcs[0].as_u32() << (srcs[1].as_u32() & 31)),
            // Arithmetic shift: sign-extends, unlike `Shr`.
            Opcode::Asr => Lane::I(srcs[0].as_i32() >> (srcs[1].as_u32() & 31)),
            Opcode::Cmp(cond) => {
                let passed = cond.evaluate(srcs[0].as_f32(), srcs[1].as_f32());
                if passed {
                    thread.flag |= 1 << lane;
                } else {
                    thread.flag &= !(1 << lane);
                }
                Lane::F(if passed { 1.0 } else { 0.0 })
            }
            Opcode::Sel => {
                if thread.flag & (1 << lane) != 0 {
                    srcs[0]
                } else {
                    srcs[1]
                }
            }
            // `dst = src0 + src1*src2`.
            Opcode::Mad => Lane::F(srcs[0].as_f32() + srcs[1].as_f32() * srcs[2].as_f32()),
            // `dst = src0*src1 + (1-src0)*src2`, src0 the blend factor.
            Opcode::Lrp => {
                let t = srcs[0].as_f32();
                Lane::F(t * srcs[1].as_f32() + (1.0 - t) * srcs[2].as_f32())
            }
            // Decoded as [p, c, u]: hardware packs `p`/`c` into one
            // register pair and reads the per-lane parameter `u` from a
            // second source; `dst = u*p + c`.
            Opcode::Line => Lane::F(srcs[2].as_f32() * srcs[0].as_f32() + srcs[1].as_f32()),
            // Decoded as [p, q, r, q0, q1]: `dst = p*q0 + q*q1 + r`.
            Opcode::Pln => {
                Lane::F(srcs[0].as_f32() * srcs[3].as_f32() + srcs[1].as_f32() * srcs[4].as_f32() + srcs[2].as_f32())
            }
            Opcode::Math(MathFn::Rsqrt) => Lane::F(1.0 / srcs[0].as_f32().sqrt()),
            Opcode::Send { .. }
            | Opcode::If
            | Opcode::Else
            | Opcode::Endif
            | Opcode::Do
            | Opcode::While
            | Opcode::Break
            | Opcode::Continue
            | Opcode::Halt
            | Opcode::Nop => unreachable!("handled above"),
        };

        write_lane(thread, inst.dst.reg, dst_type, lane, result, inst.saturate);
    }

    Ok(())
}
