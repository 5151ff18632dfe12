//! Primitive assembly: consumes VUE handles from the [`IaQueue`] and
//! emits provoking-vertex-ordered triangles, one state machine per
//! topology.

use crate::viewport::IaQueue;
use gpu_sim_urb::UrbHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriList,
    TriStrip,
    TriFan,
    Polygon,
    QuadList,
    QuadStrip,
    RectList,
}

/// Fixed provoking-vertex permutation table: for a given topology and
/// parity, this picks which of the 3 just-read vertices becomes vertex
/// 0/1/2 of the emitted triangle.
const PROVOKING_INDICES: [usize; 5] = [0, 1, 2, 0, 1];

fn provoking_order(topology: Topology, parity: bool) -> [usize; 3] {
    match topology {
        Topology::TriStrip if parity => {
            [PROVOKING_INDICES[1], PROVOKING_INDICES[0], PROVOKING_INDICES[2]]
        }
        _ => [PROVOKING_INDICES[0], PROVOKING_INDICES[1], PROVOKING_INDICES[2]],
    }
}

/// Drives one topology's consumption pattern over an [`IaQueue`], holding
/// whatever persistent state that topology needs across calls (strip
/// parity, the fan's captured first vertex).
pub struct Assembler {
    topology: Topology,
    parity: bool,
    first_vertex: Option<UrbHandle>,
    window: Vec<UrbHandle>,
}

impl Assembler {
    pub fn new(topology: Topology) -> Self {
        Assembler { topology, parity: false, first_vertex: None, window: Vec::new() }
    }

    /// Reset all persistent state. This runs once per instance inside the
    /// instancing loop, not once per draw call, so callers must invoke
    /// this at the same cadence.
    pub fn reset(&mut self, queue: &mut IaQueue, mut free: impl FnMut(UrbHandle)) {
        if let Some(h) = self.first_vertex.take() {
            free(h);
        }
        while let Some(h) = queue.pop() {
            free(h);
        }
        self.parity = false;
        self.window.clear();
    }

    /// Drain as many complete primitives as the queue currently allows,
    /// freeing any VUE handle that is fully consumed and not needed by a
    /// later primitive (e.g. the middle vertex of a TRISTRIP window).
    pub fn assemble(
        &mut self,
        queue: &mut IaQueue,
        mut free: impl FnMut(UrbHandle),
    ) -> Vec<[UrbHandle; 3]> {
        let mut out = Vec::new();
        match self.topology {
            Topology::TriList => {
                while queue.len() >= 3 {
                    let v = [queue.pop().unwrap(), queue.pop().unwrap(), queue.pop().unwrap()];
                    out.push(v);
                    for h in v {
                        free(h);
                    }
                }
            }
            Topology::TriStrip => {
                while !queue.is_empty() {
                    if let Some(h) = queue.pop() {
                        self.window.push(h);
                    }
                    if self.window.len() == 3 {
                        let order = provoking_order(Topology::TriStrip, self.parity);
                        let w = &self.window;
                        out.push([w[order[0]], w[order[1]], w[order[2]]]);
                        let dropped = self.window.remove(0);
                        free(dropped);
                        self.parity = !self.parity;
                    }
                }
            }
            Topology::TriFan | Topology::Polygon => {
                if self.first_vertex.is_none() {
                    if let Some(h) = queue.pop() {
                        self.first_vertex = Some(h);
                    }
                }
                // `window[0]` holds the previous wedge vertex between calls,
                // alongside the captured fan/polygon anchor in `first_vertex`.
                if self.window.is_empty() {
                    if let Some(h) = queue.pop() {
                        self.window.push(h);
                    }
                }
                while let (Some(&prev), Some(cur)) = (self.window.first(), queue.pop()) {
                    if let Some(first) = self.first_vertex {
                        out.push([first, prev, cur]);
                    }
                    free(prev);
                    self.window[0] = cur;
                }
            }
            Topology::QuadList => {
                while queue.len() >= 4 {
                    let a = queue.pop().unwrap();
                    let b = queue.pop().unwrap();
                    let c = queue.pop().unwrap();
                    let d = queue.pop().unwrap();
                    out.push([a, b, c]);
                    out.push([a, c, d]);
                    for h in [a, b, c, d] {
                        free(h);
                    }
                }
            }
            Topology::QuadStrip => {
                while queue.len() >= 2 {
                    self.window.push(queue.pop().unwrap());
                    self.window.push(queue.pop().unwrap());
                    if self.window.len() == 4 {
                        let [a, b, c, d] = [self.window[0], self.window[1], self.window[2], self.window[3]];
                        out.push([a, b, c]);
                        out.push([b, d, c]);
                        free(a);
                        free(b);
                        self.window = vec![c, d];
                    }
                }
            }
            Topology::RectList => {
                while queue.len() >= 3 {
                    let v = [queue.pop().unwrap(), queue.pop().unwrap(), queue.pop().unwrap()];
                    out.push(v);
                    for h in v {
                        free(h);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(n: u32) -> Vec<UrbHandle> {
        (0..n).map(UrbHandle).collect()
    }

    #[test]
    fn trilist_emits_one_triangle_per_three_vertices() {
        let mut q = IaQueue::new();
        for h in handles(6) {
            q.push(h);
        }
        let mut a = Assembler::new(Topology::TriList);
        let tris = a.assemble(&mut q, |_| {});
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0], [UrbHandle(0), UrbHandle(1), UrbHandle(2)]);
    }

    #[test]
    fn tristrip_flips_parity_every_triangle() {
        let mut q = IaQueue::new();
        for h in handles(5) {
            q.push(h);
        }
        let mut a = Assembler::new(Topology::TriStrip);
        let tris = a.assemble(&mut q, |_| {});
        assert_eq!(tris.len(), 3);
        assert_eq!(tris[0], [UrbHandle(0), UrbHandle(1), UrbHandle(2)]);
        assert_eq!(tris[1], [UrbHandle(2), UrbHandle(1), UrbHandle(3)]);
    }

    #[test]
    fn quadlist_splits_each_quad_into_two_triangles() {
        let mut q = IaQueue::new();
        for h in handles(4) {
            q.push(h);
        }
        let mut a = Assembler::new(Topology::QuadList);
        let tris = a.assemble(&mut q, |_| {});
        assert_eq!(tris, vec![
            [UrbHandle(0), UrbHandle(1), UrbHandle(2)],
            [UrbHandle(0), UrbHandle(2), UrbHandle(3)],
        ]);
    }
}
