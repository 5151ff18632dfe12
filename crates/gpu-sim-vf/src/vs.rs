//! Vertex shader thread dispatch: CURBE push-constant load and R0/R1
//! payload construction.

use gpu_sim_eu::reg::Thread;
use gpu_sim_urb::{UrbHandle, Value};

/// One draw's worth of per-vertex CURBE (push constant) data, already
/// resolved from `STATE_BASE_ADDRESS`-relative buffer pointers.
#[derive(Debug, Clone, Default)]
pub struct Curbe {
    pub dwords: Vec<u32>,
}

/// Build a fresh VS thread payload: CURBE in the low GRF rows, followed by
/// R1's per-lane URB write handles, followed by the fetched vertex data
/// copied in `vue_read_length * 2` row groups. `vue_rows` is one flattened
/// [`Value`] row per (lane, row-within-vertex) pair, laid out as
/// `vue_read_length*2` consecutive rows per lane.
pub fn dispatch_vs(
    grf_count: usize,
    curbe: &Curbe,
    urb_handles: [Option<UrbHandle>; 8],
    vue_rows: &[Value],
    vue_read_length: usize,
) -> Thread {
    let mut thread = Thread::new(grf_count);

    let mut row = 1usize; // R0 is reserved for the header; left zeroed here.
    for (i, dword) in curbe.dwords.iter().enumerate() {
        thread.grf[row + i / 8].set_ud(i % 8, *dword);
    }
    row += curbe.dwords.len().div_ceil(8).max(1);

    for (lane, handle) in urb_handles.iter().enumerate() {
        if let Some(h) = handle {
            thread.grf[row].set_ud(lane, h.0);
        }
    }
    row += 1;

    for group in 0..vue_read_length * 2 {
        for lane in 0..8 {
            if let Some(value) = vue_rows.get(lane * vue_read_length * 2 + group) {
                for c in 0..4 {
                    thread.grf[row + group * 4 + c].set_d(lane, value.v[c]);
                }
            }
        }
    }

    thread
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curbe_dwords_land_in_grf_starting_at_row_one() {
        let curbe = Curbe { dwords: vec![1, 2, 3] };
        let t = dispatch_vs(16, &curbe, [None; 8], &[], 0);
        assert_eq!(t.grf[1].ud(0), 1);
        assert_eq!(t.grf[1].ud(2), 3);
    }

    #[test]
    fn urb_handles_land_in_the_row_after_curbe() {
        let curbe = Curbe::default();
        let handles = [Some(UrbHandle(7)), None, None, None, None, None, None, None];
        let t = dispatch_vs(16, &curbe, handles, &[], 0);
        assert_eq!(t.grf[1].ud(0), 7);
    }
}
