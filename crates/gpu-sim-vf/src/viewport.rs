//! Viewport transform and the 16-entry IA (primitive assembly) ring queue.
//!
//! The 14-float `SF_CLIP_VIEWPORT` state array only ever needs six of its
//! fields here (`m00, m11, m22, m30, m31, m32`) — the affine scale/translate
//! form, not a full matrix — so this crate keeps that same narrow read.

use gpu_sim_urb::UrbHandle;

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub m00: f32,
    pub m11: f32,
    pub m22: f32,
    pub m30: f32,
    pub m31: f32,
    pub m32: f32,
}

impl Viewport {
    /// Parse the 14-float `SF_CLIP_VIEWPORT` record, keeping only the six
    /// fields this simulator's affine transform uses.
    pub fn from_floats(fields: &[f32; 14]) -> Self {
        Viewport {
            m00: fields[0],
            m11: fields[1],
            m22: fields[2],
            m30: fields[3],
            m31: fields[4],
            m32: fields[5],
        }
    }

    /// Apply perspective divide then the viewport's affine scale/offset to
    /// a clip-space position, returning screen-space `(x, y, z)`.
    pub fn transform(&self, clip: [f32; 4]) -> [f32; 3] {
        let inv_w = 1.0 / clip[3];
        let ndc = [clip[0] * inv_w, clip[1] * inv_w, clip[2] * inv_w];
        [
            ndc[0] * self.m00 + self.m30,
            ndc[1] * self.m11 + self.m31,
            ndc[2] * self.m22 + self.m32,
        ]
    }
}

/// Fixed-capacity 16-entry ring of VUE handles awaiting primitive assembly,
/// matching `gt.ia.queue[16]` with `head`/`tail` wrapped at `& 15`.
pub struct IaQueue {
    queue: [Option<UrbHandle>; 16],
    head: u8,
    tail: u8,
}

impl IaQueue {
    pub fn new() -> Self {
        IaQueue { queue: [None; 16], head: 0, tail: 0 }
    }

    pub fn len(&self) -> u8 {
        self.head.wrapping_sub(self.tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push one VUE handle. Panics (via assert) if the queue is full — a
    /// genuine driver-programming-error invariant rather than a
    /// data-dependent condition, so it stays a hard assertion.
    pub fn push(&mut self, handle: UrbHandle) {
        assert!(self.len() < 16, "IA queue overflow");
        self.queue[(self.head & 15) as usize] = Some(handle);
        self.head = self.head.wrapping_add(1);
    }

    pub fn pop(&mut self) -> Option<UrbHandle> {
        if self.is_empty() {
            return None;
        }
        let h = self.queue[(self.tail & 15) as usize].take();
        self.tail = self.tail.wrapping_add(1);
        h
    }

    /// Peek the `n`th unconsumed entry without popping it.
    pub fn peek(&self, n: u8) -> Option<UrbHandle> {
        if n >= self.len() {
            return None;
        }
        self.queue[((self.tail.wrapping_add(n)) & 15) as usize]
    }

    pub fn reset(&mut self) {
        self.queue = [None; 16];
        self.head = 0;
        self.tail = 0;
    }
}

impl Default for IaQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_applies_perspective_divide_then_affine() {
        let vp = Viewport { m00: 320.0, m11: 240.0, m22: 0.5, m30: 320.0, m31: 240.0, m32: 0.5 };
        let screen = vp.transform([0.0, 0.0, 0.0, 1.0]);
        assert_eq!(screen, [320.0, 240.0, 0.5]);
    }

    #[test]
    fn queue_wraps_at_sixteen_entries() {
        let mut q = IaQueue::new();
        for i in 0..16 {
            q.push(UrbHandle(i));
        }
        assert_eq!(q.len(), 16);
        assert_eq!(q.pop(), Some(UrbHandle(0)));
        q.push(UrbHandle(99));
        assert_eq!(q.peek(15), Some(UrbHandle(99)));
    }

    #[test]
    #[should_panic(expected = "IA queue overflow")]
    fn pushing_past_capacity_asserts() {
        let mut q = IaQueue::new();
        for i in 0..17 {
            q.push(UrbHandle(i));
        }
    }
}
