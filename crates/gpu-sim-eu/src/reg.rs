//! GRF register storage.
//!
//! Each GRF row holds eight lanes that are reinterpreted as `float`,
//! `i32`, or `u32` depending on the consuming instruction. `Reg` keeps one
//! `[u32; 8]` backing store and exposes the three views as reinterpreting
//! accessors, a zero-cost reinterpretation without `unsafe`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reg {
    lanes: [u32; 8],
}

impl Default for Reg {
    fn default() -> Self {
        Reg { lanes: [0; 8] }
    }
}

impl Reg {
    pub fn f(&self, lane: usize) -> f32 {
        f32::from_bits(self.lanes[lane])
    }

    pub fn set_f(&mut self, lane: usize, value: f32) {
        self.lanes[lane] = value.to_bits();
    }

    pub fn d(&self, lane: usize) -> i32 {
        self.lanes[lane] as i32
    }

    pub fn set_d(&mut self, lane: usize, value: i32) {
        self.lanes[lane] = value as u32;
    }

    pub fn ud(&self, lane: usize) -> u32 {
        self.lanes[lane]
    }

    pub fn set_ud(&mut self, lane: usize, value: u32) {
        self.lanes[lane] = value;
    }
}

/// Register file for one SIMD8 thread: 128 GRF rows of 8 lanes each,
/// matching `struct thread { struct reg grf[128]; ... }`.
#[derive(Debug, Clone)]
pub struct Thread {
    pub grf: Vec<Reg>,
    /// Current execution mask: bit `c` set means lane `c` is live.
    pub mask: u8,
    /// Stack of enclosing masks, pushed on `IF`/`DO`, popped on
    /// `ENDIF`/`WHILE`, standing in for real hardware's execution mask
    /// stack.
    pub mask_stack: Vec<u8>,
    /// Per-lane condition flags set by the last `CMP`.
    pub flag: u8,
    pub halted: bool,
}

impl Thread {
    pub fn new(grf_count: usize) -> Self {
        Thread {
            grf: vec![Reg::default(); grf_count],
            mask: 0xff,
            mask_stack: Vec::new(),
            flag: 0,
            halted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_float_and_int_views_share_storage() {
        let mut reg = Reg::default();
        reg.set_f(0, 1.0);
        assert_eq!(reg.ud(0), 0x3f800000);
    }

    #[test]
    fn fresh_thread_has_all_lanes_live() {
        let t = Thread::new(128);
        assert_eq!(t.mask, 0xff);
        assert!(t.mask_stack.is_empty());
    }
}
