//! Unified Return Buffer: a fixed-stride slab of [`Value`] rows with an
//! intrusive free list — a freed entry's first word *is* the next-free
//! link, so the free list costs no extra storage.

use log::warn;

/// One 16-byte VUE row. Four 32-bit lanes, reinterpreted as float or int
/// per the consuming stage (vertex fetch stores ints/floats, the VS/PS
/// payload reads floats).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Value {
    pub v: [i32; 4],
}

impl Value {
    pub const ZERO: Value = Value { v: [0; 4] };

    pub fn f(&self, lane: usize) -> f32 {
        f32::from_bits(self.v[lane] as u32)
    }

    pub fn set_f(&mut self, lane: usize, value: f32) {
        self.v[lane] = value.to_bits() as i32;
    }
}

/// A handle into the URB, opaque to every crate but this one apart from
/// the raw index it threads through GRF lanes as `ud[c]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UrbHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrbError {
    /// The free list ran dry: every entry in the partition is checked out.
    Exhausted,
    /// `handle` does not name a live entry (double free or stale handle).
    InvalidHandle(UrbHandle),
}

impl std::fmt::Display for UrbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrbError::Exhausted => write!(f, "URB partition exhausted"),
            UrbError::InvalidHandle(h) => write!(f, "invalid URB handle {}", h.0),
        }
    }
}

impl std::error::Error for UrbError {}

/// One client's (VS/GS/HS/DS) slice of the URB: `entry_size` rows per
/// entry, `capacity` entries, an intrusive free list threaded through the
/// first row of each free entry.
pub struct Urb {
    entry_size: usize,
    capacity: usize,
    storage: Vec<Value>,
    free_head: Option<u32>,
    live: Vec<bool>,
}

impl Urb {
    /// `entry_size` and `capacity` are in entries/rows, matching
    /// `set_urb_allocation`'s `size` (64-bit rows per entry) and `total`
    /// (entry count) fields.
    pub fn new(entry_size: usize, capacity: usize) -> Self {
        assert!(entry_size > 0, "URB entry size must be non-zero");
        let mut urb = Urb {
            entry_size,
            capacity,
            storage: vec![Value::ZERO; entry_size * capacity],
            free_head: None,
            live: vec![false; capacity],
        };
        for i in (0..capacity as u32).rev() {
            urb.push_free(i);
        }
        urb
    }

    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push_free(&mut self, index: u32) {
        let next = self.free_head.map(|h| h as i32).unwrap_or(-1);
        self.storage[index as usize * self.entry_size].v[0] = next;
        self.free_head = Some(index);
    }

    /// Check out one entry, per `alloc_urb_entry`.
    pub fn alloc(&mut self) -> Result<UrbHandle, UrbError> {
        let index = self.free_head.ok_or(UrbError::Exhausted)?;
        let linked_next = self.storage[index as usize * self.entry_size].v[0];
        self.free_head = if linked_next < 0 {
            None
        } else {
            Some(linked_next as u32)
        };
        self.live[index as usize] = true;
        self.storage[index as usize * self.entry_size] = Value::ZERO;
        Ok(UrbHandle(index))
    }

    /// Return an entry to the free list, per `free_urb_entry`.
    pub fn free(&mut self, handle: UrbHandle) -> Result<(), UrbError> {
        let index = handle.0;
        if index as usize >= self.capacity || !self.live[index as usize] {
            return Err(UrbError::InvalidHandle(handle));
        }
        self.live[index as usize] = false;
        self.push_free(index);
        Ok(())
    }

    pub fn entry(&self, handle: UrbHandle) -> &[Value] {
        debug_assert!(self.live[handle.0 as usize], "read of freed URB entry");
        let start = handle.0 as usize * self.entry_size;
        &self.storage[start..start + self.entry_size]
    }

    pub fn entry_mut(&mut self, handle: UrbHandle) -> &mut [Value] {
        debug_assert!(self.live[handle.0 as usize], "write to freed URB entry");
        let start = handle.0 as usize * self.entry_size;
        &mut self.storage[start..start + self.entry_size]
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|&&l| l).count()
    }
}

/// Decode the `URB_VS`/`URB_GS`/`URB_HS`/`URB_DS` allocation packet fields
/// into entry size and count. `dw1` is the packet's second dword.
pub fn decode_urb_allocation(dw1: u32) -> (usize, usize) {
    let size_units = ((dw1 >> 16) & 0x1ff) + 1; // 64-byte units
    let total = dw1 & 0xffff;
    let entry_size = (size_units as usize * 64) / 16; // convert to 16-byte rows
    (entry_size.max(1), total as usize)
}

pub fn warn_if_overlap(a_start: usize, a_len: usize, b_start: usize, b_len: usize) -> bool {
    let overlaps = a_start < b_start + b_len && b_start < a_start + a_len;
    if overlaps {
        warn!("URB partition window overlap: [{a_start}, {a_len}) vs [{b_start}, {b_len})");
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_free_then_realloc_reuses_slot() {
        let mut urb = Urb::new(4, 4);
        let h0 = urb.alloc().unwrap();
        urb.free(h0).unwrap();
        let h1 = urb.alloc().unwrap();
        assert_eq!(h0, h1);
    }

    #[test]
    fn exhaustion_is_a_typed_error_not_a_panic() {
        let mut urb = Urb::new(1, 2);
        urb.alloc().unwrap();
        urb.alloc().unwrap();
        assert_eq!(urb.alloc(), Err(UrbError::Exhausted));
    }

    #[test]
    fn double_free_is_rejected() {
        let mut urb = Urb::new(1, 2);
        let h = urb.alloc().unwrap();
        urb.free(h).unwrap();
        assert_eq!(urb.free(h), Err(UrbError::InvalidHandle(h)));
    }

    #[test]
    fn fresh_entry_reads_as_zero() {
        let mut urb = Urb::new(2, 2);
        let h = urb.alloc().unwrap();
        assert_eq!(urb.entry(h), &[Value::ZERO, Value::ZERO]);
    }

    #[test]
    fn decode_matches_known_packing() {
        // size field = 3 (-> 4 units of 64 bytes = 256 bytes = 16 rows), total = 32
        let dw1 = (3 << 16) | 32;
        assert_eq!(decode_urb_allocation(dw1), (16, 32));
    }
}
