//! The simulator's one fatal-error taxonomy: invariant violations that
//! would otherwise be assertion failures end up here instead of a
//! `panic!`, so a caller (the CLI, or a future test harness driving many
//! scenarios) can recover and report which batch failed.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    UnknownCommandType { command_type: u32 },
    UnhandledMiOpcode { opcode: u32 },
    UrbWindowOverlap { a: (usize, usize), b: (usize, usize) },
    UrbTotalOutOfRange { total: usize },
    IaQueueOverflow,
    IllegalShaderOpcode,
    Memory(gpu_sim_hal::MemError),
    Urb(gpu_sim_urb::UrbError),
}

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalError::UnknownCommandType { command_type } => {
                write!(f, "unknown command-packet type {command_type}")
            }
            FatalError::UnhandledMiOpcode { opcode } => {
                write!(f, "unhandled MI opcode 0x{opcode:x}")
            }
            FatalError::UrbWindowOverlap { a, b } => {
                write!(f, "URB partition windows overlap: {a:?} vs {b:?}")
            }
            FatalError::UrbTotalOutOfRange { total } => {
                write!(f, "URB entry total {total} outside the 64..2560 valid range")
            }
            FatalError::IaQueueOverflow => write!(f, "IA ring queue overflow"),
            FatalError::IllegalShaderOpcode => write!(f, "illegal EU opcode"),
            FatalError::Memory(e) => write!(f, "{e}"),
            FatalError::Urb(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FatalError {}

impl From<gpu_sim_hal::MemError> for FatalError {
    fn from(e: gpu_sim_hal::MemError) -> Self {
        FatalError::Memory(e)
    }
}

impl From<gpu_sim_urb::UrbError> for FatalError {
    fn from(e: gpu_sim_urb::UrbError) -> Self {
        FatalError::Urb(e)
    }
}

impl From<gpu_sim_eu::EuError> for FatalError {
    fn from(_: gpu_sim_eu::EuError) -> Self {
        FatalError::IllegalShaderOpcode
    }
}
