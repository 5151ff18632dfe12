//! Send-message dataport interface.
//!
//! The EU interpreter never talks to the URB, sampler, or render cache
//! directly — it hands the message off to whatever implements
//! `SendHandler`. Keeping this as a trait lets `gpu-sim-vf` and
//! `gpu-sim-raster` each own their half without `gpu-sim-eu` depending on
//! either.

use crate::reg::Thread;
use gpu_sim_isa::SendTarget;

pub struct SendArgs {
    pub target: SendTarget,
    /// Payload base register (holds the URB handle / sample coordinates
    /// in lane-indexed form).
    pub src: u16,
    /// Destination register for messages that return data (sampler reads).
    pub dst: u16,
    pub offset: u16,
    pub len: u8,
}

pub trait SendHandler {
    fn urb_write(&mut self, thread: &Thread, args: &SendArgs);
    fn sample(&mut self, thread: &mut Thread, args: &SendArgs);
    fn render_write(&mut self, thread: &Thread, args: &SendArgs);
}

/// A handler that drops every message; useful for EU unit tests that don't
/// exercise dataport traffic.
#[derive(Default)]
pub struct NullSendHandler;

impl SendHandler for NullSendHandler {
    fn urb_write(&mut self, _thread: &Thread, _args: &SendArgs) {}
    fn sample(&mut self, _thread: &mut Thread, _args: &SendArgs) {}
    fn render_write(&mut self, _thread: &Thread, _args: &SendArgs) {}
}
