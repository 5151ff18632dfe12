//! Category-filtered diagnostic tracing.
//!
//! Diagnostic lines are gated behind a global `TraceMask` of named
//! categories (`CS`, `VF`, `VS`, `PS`, `URB`, `EU`) and forwarded through
//! the `log` facade at `trace!` level, so a host binary can still route
//! them with `env_logger` or any other subscriber.

use bitflags::bitflags;

bitflags! {
    /// Which diagnostic categories are currently enabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceMask: u32 {
        const CS   = 1 << 0;
        const VF   = 1 << 1;
        const VS   = 1 << 2;
        const PS   = 1 << 3;
        const URB  = 1 << 4;
        const EU   = 1 << 5;
        const WARN = 1 << 6;
    }
}

impl Default for TraceMask {
    fn default() -> Self {
        TraceMask::WARN
    }
}

/// Emit a trace line if `category` is enabled in `mask`.
///
/// Kept as a free function (rather than a macro) so call sites read like
/// the rest of this crate's plain Rust; the `log::log!` call is still
/// lazily formatted by the facade.
pub fn emit(mask: TraceMask, category: TraceMask, args: std::fmt::Arguments<'_>) {
    if mask.contains(category) {
        log::trace!("{args}");
    }
}

#[macro_export]
macro_rules! trace {
    ($mask:expr, $category:expr, $($arg:tt)*) => {
        $crate::trace::emit($mask, $category, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask_only_carries_warnings() {
        let mask = TraceMask::default();
        assert!(mask.contains(TraceMask::WARN));
        assert!(!mask.contains(TraceMask::EU));
    }

    #[test]
    fn masks_combine_with_bitor() {
        let mask = TraceMask::VS | TraceMask::PS;
        assert!(mask.contains(TraceMask::VS));
        assert!(mask.contains(TraceMask::PS));
        assert!(!mask.contains(TraceMask::URB));
    }
}
