//! Concrete [`SendHandler`] implementations wiring the EU's dataport
//! messages to the URB, a bound texture, and the render cache — the glue
//! `gpu-sim-eu` is deliberately kept ignorant of.

use gpu_sim_eu::reg::Thread;
use gpu_sim_eu::send::{SendArgs, SendHandler};
use gpu_sim_formats::unpack_rgba8;
use gpu_sim_raster::{DepthBuffer, DepthState, RenderTargetView};
use gpu_sim_urb::{Urb, UrbHandle};

/// VS-stage handler: the only message a vertex shader sends is a URB
/// write of its transformed output, per `sfid_urb_simd8_write`.
pub struct VsSendHandler<'a> {
    pub urb: &'a mut Urb,
}

impl SendHandler for VsSendHandler<'_> {
    fn urb_write(&mut self, thread: &Thread, args: &SendArgs) {
        for lane in 0..8 {
            if thread.mask & (1 << lane) == 0 {
                continue;
            }
            let handle = UrbHandle(thread.grf[args.src as usize].ud(lane));
            let entry = self.urb.entry_mut(handle);
            for i in 0..(args.len as usize).saturating_sub(1) {
                let row = args.offset as usize + i / 4;
                let comp = i % 4;
                if row < entry.len() {
                    entry[row].v[comp] = thread.grf[args.src as usize + 1 + i].d(lane);
                }
            }
        }
    }

    fn sample(&mut self, _thread: &mut Thread, _args: &SendArgs) {
        unreachable!("a VS thread never issues a sampler message");
    }

    fn render_write(&mut self, _thread: &Thread, _args: &SendArgs) {
        unreachable!("a VS thread never issues a render-cache message");
    }
}

pub struct BoundTexture<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub cpp: u32,
}

/// PS-stage handler: samples a bound texture and writes covered pixels to
/// the render target, gating on the depth test.
pub struct PsSendHandler<'a> {
    pub texture: Option<BoundTexture<'a>>,
    pub rt: &'a mut RenderTargetView,
    pub depth: &'a mut DepthBuffer,
    pub depth_state: DepthState,
    pub screen_x: [u32; 8],
    pub screen_y: [u32; 8],
    pub screen_z: [f32; 8],
}

impl SendHandler for PsSendHandler<'_> {
    fn urb_write(&mut self, _thread: &Thread, _args: &SendArgs) {
        unreachable!("a PS thread never issues a URB write message");
    }

    fn sample(&mut self, thread: &mut Thread, args: &SendArgs) {
        let tex = self.texture.as_ref().expect("SAMPLE with no bound texture");
        for lane in 0..8 {
            if thread.mask & (1 << lane) == 0 {
                continue;
            }
            let u = thread.grf[args.src as usize].f(lane);
            let v = thread.grf[args.src as usize + 1].f(lane);
            let wrap = |x: f32| x - x.floor();
            let uu = (wrap(u) * (tex.width.saturating_sub(1)) as f32) as u32;
            let vv = (wrap(v) * (tex.height.saturating_sub(1)) as f32) as u32;
            let offset = (vv * tex.width * tex.cpp + uu * tex.cpp) as usize;
            let Some(bytes) = tex.data.get(offset..offset + 4) else {
                continue;
            };
            let word = u32::from_le_bytes(bytes.try_into().unwrap());
            let [r, g, b, a] = unpack_rgba8(word, true);
            thread.grf[args.dst as usize].set_f(lane, r);
            thread.grf[args.dst as usize + 1].set_f(lane, g);
            thread.grf[args.dst as usize + 2].set_f(lane, b);
            thread.grf[args.dst as usize + 3].set_f(lane, a);
        }
    }

    fn render_write(&mut self, thread: &Thread, args: &SendArgs) {
        for lane in 0..8 {
            if thread.mask & (1 << lane) == 0 {
                continue;
            }
            let x = self.screen_x[lane];
            let y = self.screen_y[lane];
            let z = self.screen_z[lane];
            if !self.depth.test_and_write(&self.depth_state, x as usize, y as usize, z) {
                continue;
            }
            let r = thread.grf[args.src as usize].f(lane);
            let g = thread.grf[args.src as usize + 1].f(lane);
            let b = thread.grf[args.src as usize + 2].f(lane);
            let a = thread.grf[args.src as usize + 3].f(lane);
            self.rt.write_rgba(x, y, r, g, b, a);
        }
    }
}
