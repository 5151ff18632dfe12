//! Command-stream interpreter and top-level pipeline state (`Gt`).
//!
//! `run_batch` walks a guest batch buffer dword by dword, dispatching
//! recognized MI and Render packets, and drives the full vertex-to-pixel
//! pipeline when it hits a `3DPRIMITIVE`.

pub mod cmd;
pub mod disasm;
pub mod error;
pub mod send_handlers;

use std::collections::{BTreeMap, HashMap};

use gpu_sim_eu::reg::Thread;
use gpu_sim_formats::{SurfaceFormat, TileMode};
use gpu_sim_hal::{trace::TraceMask, GuestMemory};
use gpu_sim_isa::Instruction;
use gpu_sim_raster::{rasterize_triangle, DepthBuffer, DepthState, RenderTargetView, ScreenVertex};
use gpu_sim_urb::{UrbHandle, Value};
use gpu_sim_vf::{
    dispatch_vs, fetch::fetch_vertex, resolve_index, Assembler, Curbe, IaQueue, IndexFormat,
    Topology, VertexBuffer, VertexElement, Viewport,
};

pub use error::FatalError;

use cmd::{field, mi_register, CommandType, MiOpcode, RenderOpcode, RenderSubtype};
use send_handlers::{BoundTexture, PsSendHandler, VsSendHandler};

/// Counters a completed batch returns, used by tests and the CLI's summary
/// output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub vertices_fetched: u32,
    pub triangles_assembled: u32,
    pub pixels_shaded: u32,
}

/// Everything the interpreter needs to carry between packets: URB
/// partition, vertex pipeline fixed-function state, shader kernels, and
/// the render target being drawn to. Shaders are interpreted here, never
/// compiled to native code, so there is no JIT state to carry.
pub struct Gt {
    pub urb: gpu_sim_urb::Urb,
    pub vertex_buffers: Vec<VertexBuffer>,
    pub vertex_elements: Vec<VertexElement>,
    pub vs_kernel: Vec<Instruction>,
    pub ps_kernel: Vec<Instruction>,
    pub viewport: Viewport,
    pub topology: Topology,
    pub registers: BTreeMap<u32, u32>,
    pub render_target: RenderTargetView,
    pub depth_buffer: DepthBuffer,
    pub depth_state: DepthState,
    pub texture: Option<(Vec<u8>, u32, u32, u32)>,
    pub trace_mask: TraceMask,
    pub indexed: bool,
    pub index_buffer_addr: u64,
    pub index_format: IndexFormat,
    grf_count: usize,
    assembler: Assembler,
    ia_queue: IaQueue,
    screen_positions: HashMap<u32, ScreenVertex>,
}

impl Gt {
    pub fn new(width: u32, height: u32) -> Self {
        Gt {
            urb: gpu_sim_urb::Urb::new(4, 256),
            vertex_buffers: Vec::new(),
            vertex_elements: Vec::new(),
            vs_kernel: Vec::new(),
            ps_kernel: Vec::new(),
            viewport: Viewport::from_floats(&[1.0; 14]),
            topology: Topology::TriList,
            registers: BTreeMap::new(),
            render_target: RenderTargetView::new(
                width,
                height,
                width * 4,
                SurfaceFormat::B8G8R8A8Unorm,
                TileMode::Linear,
            ),
            depth_buffer: DepthBuffer::new(width as usize, height as usize, 1.0),
            depth_state: DepthState {
                test_enable: true,
                write_enable: true,
                compare: gpu_sim_raster::DepthCompare::Less,
            },
            texture: None,
            trace_mask: TraceMask::default(),
            indexed: false,
            index_buffer_addr: 0,
            index_format: IndexFormat::Dword,
            grf_count: 128,
            assembler: Assembler::new(Topology::TriList),
            ia_queue: IaQueue::new(),
            screen_positions: HashMap::new(),
        }
    }

    fn register(&self, addr: u32, default: u32) -> u32 {
        *self.registers.get(&addr).unwrap_or(&default)
    }

    /// Run one vertex through VS (interpreted kernel, or pass-through if
    /// none is bound) and enqueue its VUE handle for primitive assembly.
    fn emit_vertex(
        &mut self,
        mem: &GuestMemory,
        index: u32,
        instance_id: u32,
        vertex_id: u32,
    ) -> Result<(), FatalError> {
        let handle = self.urb.alloc()?;
        let mut raw = vec![Value::ZERO; self.vertex_elements.len().max(1)];
        fetch_vertex(mem, &self.vertex_buffers, &self.vertex_elements, index, instance_id, vertex_id, &mut raw);

        if self.vs_kernel.is_empty() {
            let entry = self.urb.entry_mut(handle);
            for (row, value) in raw.iter().enumerate().take(entry.len()) {
                entry[row] = *value;
            }
        } else {
            let curbe = Curbe::default();
            let mut flat = Vec::with_capacity(raw.len() * 8);
            for lane in 0..8 {
                for v in &raw {
                    flat.push(if lane == 0 { *v } else { Value::ZERO });
                }
            }
            let mut thread = dispatch_vs(self.grf_count, &curbe, [None; 8], &flat, raw.len());
            thread.grf[110].set_ud(0, handle.0);
            thread.mask = 1;
            for inst in &self.vs_kernel {
                let mut handler = VsSendHandler { urb: &mut self.urb };
                gpu_sim_eu::execute(&mut thread, inst, &mut handler)?;
            }
        }

        let position_row = self.urb.entry(handle)[0];
        let clip = [position_row.f(0), position_row.f(1), position_row.f(2), position_row.f(3).max(f32::MIN_POSITIVE).max(1e-6)];
        let screen = self.viewport.transform(if clip[3] == 0.0 { [clip[0], clip[1], clip[2], 1.0] } else { clip });
        self.screen_positions.insert(handle.0, ScreenVertex { x: screen[0], y: screen[1], z: screen[2] });
        self.ia_queue.push(handle);
        Ok(())
    }

    fn shade_and_rasterize(&mut self, stats: &mut BatchStats) {
        let Gt { assembler, ia_queue, urb, screen_positions, .. } = self;
        let triangles = assembler.assemble(ia_queue, |h| {
            let _ = urb.free(h);
            screen_positions.remove(&h.0);
        });

        for tri in triangles {
            stats.triangles_assembled += 1;
            let Some(&a) = self.screen_positions.get(&tri[0].0) else { continue };
            let Some(&b) = self.screen_positions.get(&tri[1].0) else { continue };
            let Some(&c) = self.screen_positions.get(&tri[2].0) else { continue };

            let rows_a = self.urb.entry(tri[0]).to_vec();
            let rows_b = self.urb.entry(tri[1]).to_vec();
            let rows_c = self.urb.entry(tri[2]).to_vec();
            let attr_rows = rows_a.len().min(rows_b.len()).min(rows_c.len());

            let width = self.render_target.width as i32;
            let height = self.render_target.height as i32;
            let grf_count = self.grf_count;
            let ps_kernel = self.ps_kernel.clone();
            let texture_owned = self.texture.clone();
            let depth_state = DepthState {
                test_enable: self.depth_state.test_enable,
                write_enable: self.depth_state.write_enable,
                compare: self.depth_state.compare,
            };
            let Gt { render_target, depth_buffer, .. } = self;

            let mut shaded = 0u32;
            rasterize_triangle(a, b, c, width, height, |x, y, w0, w1, w2| {
                let z = a.z * w0 + b.z * w1 + c.z * w2;
                let mut attrs = Vec::with_capacity(attr_rows.saturating_sub(1));
                for row in 1..attr_rows {
                    let mut lanes = [0f32; 4];
                    for comp in 0..4 {
                        lanes[comp] = rows_a[row].f(comp) * w0 + rows_b[row].f(comp) * w1 + rows_c[row].f(comp) * w2;
                    }
                    attrs.push(lanes);
                }
                if ps_kernel.is_empty() {
                    let color = attrs.first().copied().unwrap_or([1.0, 1.0, 1.0, 1.0]);
                    if depth_buffer.test_and_write(&depth_state, x as usize, y as usize, z) {
                        render_target.write_rgba(x as u32, y as u32, color[0], color[1], color[2], color[3]);
                        shaded += 1;
                    }
                } else {
                    let mut thread = Thread::new(grf_count);
                    thread.mask = 1;
                    for (i, lanes) in attrs.iter().enumerate() {
                        for comp in 0..4 {
                            thread.grf[2 + i * 4 + comp].set_f(0, lanes[comp]);
                        }
                    }
                    let texture = texture_owned.as_ref().map(|(data, w, h, cpp)| BoundTexture {
                        data,
                        width: *w,
                        height: *h,
                        cpp: *cpp,
                    });
                    let mut handler = PsSendHandler {
                        texture,
                        rt: render_target,
                        depth: depth_buffer,
                        depth_state: DepthState {
                            test_enable: depth_state.test_enable,
                            write_enable: depth_state.write_enable,
                            compare: depth_state.compare,
                        },
                        screen_x: [x as u32; 8],
                        screen_y: [y as u32; 8],
                        screen_z: [z; 8],
                    };
                    for inst in &ps_kernel {
                        let _ = gpu_sim_eu::execute(&mut thread, inst, &mut handler);
                    }
                    shaded += 1;
                }
            });
            stats.pixels_shaded += shaded;
        }
    }

    /// Validate the draw's register state, run every instance's vertices
    /// through VS and assembly, and reset IA state once per instance (not
    /// once per draw).
    fn dispatch_primitive(&mut self, mem: &GuestMemory, stats: &mut BatchStats) -> Result<(), FatalError> {
        let vertex_count = self.register(mi_register::VERTEX_COUNT, 0);
        let start_vertex = self.register(mi_register::START_VERTEX, 0);
        let instance_count = self.register(mi_register::INSTANCE_COUNT, 1).max(1);
        let start_instance = self.register(mi_register::START_INSTANCE, 0);
        let base_vertex = self.register(mi_register::BASE_VERTEX, 0) as i32;

        for instance in 0..instance_count {
            let instance_id = start_instance + instance;
            let mut remaining = vertex_count;
            let mut nth = 0u32;
            while remaining > 0 {
                let batch = remaining.min(8);
                for i in 0..batch {
                    let index = resolve_index(
                        mem,
                        self.indexed,
                        self.index_buffer_addr,
                        self.index_format,
                        base_vertex,
                        start_vertex,
                        nth + i,
                    )?;
                    self.emit_vertex(mem, index, instance_id, nth + i)?;
                    stats.vertices_fetched += 1;
                }
                self.shade_and_rasterize(stats);
                remaining -= batch;
                nth += batch;
            }
            let Gt { assembler, ia_queue, urb, screen_positions, .. } = self;
            assembler.reset(ia_queue, |h| {
                let _ = urb.free(h);
                screen_positions.remove(&h.0);
            });
        }
        Ok(())
    }

    fn handle_render_packet(
        &mut self,
        mem: &mut GuestMemory,
        addr: u64,
        dword: u32,
        stats: &mut BatchStats,
    ) -> Result<(), FatalError> {
        let subtype = RenderSubtype::decode(dword);
        if !matches!(subtype, RenderSubtype::Common | RenderSubtype::ThreeDState) {
            return Ok(());
        }
        match RenderOpcode::decode(dword) {
            RenderOpcode::UrbVs => {
                let dw1 = mem.read_u32(addr + 4)?;
                let (entry_size, total) = gpu_sim_urb::decode_urb_allocation(dw1);
                if !(64..=2560).contains(&total) {
                    return Err(FatalError::UrbTotalOutOfRange { total });
                }
                self.urb = gpu_sim_urb::Urb::new(entry_size, total);
            }
            RenderOpcode::Viewport => {
                let mut floats = [0f32; 14];
                for (i, f) in floats.iter_mut().enumerate() {
                    *f = mem.read_f32(addr + 4 + i as u64 * 4)?;
                }
                self.viewport = Viewport::from_floats(&floats);
            }
            RenderOpcode::Primitive => {
                self.dispatch_primitive(mem, stats)?;
            }
            _ => {
                log::warn!("unhandled 3D render opcode at 0x{addr:x}");
            }
        }
        Ok(())
    }

    /// Replace the vertex pipeline's fixed-function state directly; the
    /// CLI's scenario loader uses this instead of round-tripping through
    /// synthetic `VERTEX_BUFFERS`/`VERTEX_ELEMENTS` packets, since the
    /// binary layout of those packets is a configuration concern, not part
    /// of this simulator's pipeline semantics.
    pub fn configure_vertex_pipeline(
        &mut self,
        buffers: Vec<VertexBuffer>,
        elements: Vec<VertexElement>,
        topology: Topology,
    ) {
        self.vertex_buffers = buffers;
        self.vertex_elements = elements;
        self.topology = topology;
        self.assembler = Assembler::new(topology);
    }
}

/// Walk a batch buffer starting at `batch_addr`, dispatching MI and Render
/// packets until `MI_BATCH_BUFFER_END`, per `start_batch_buffer`.
pub fn run_batch(gt: &mut Gt, mem: &mut GuestMemory, batch_addr: u64) -> Result<BatchStats, FatalError> {
    let mut stats = BatchStats::default();
    let mut addr = batch_addr;

    loop {
        let dword = mem.read_u32(addr)?;
        match CommandType::decode(dword) {
            CommandType::Mi => {
                let opcode = MiOpcode::decode(dword);
                let raw_opcode = field(dword, 23, 28);
                let len = cmd::mi_packet_length(dword, raw_opcode);
                match opcode {
                    MiOpcode::Noop => {}
                    MiOpcode::BatchBufferEnd => break,
                    MiOpcode::LoadRegisterImm => {
                        let reg = mem.read_u32(addr + 4)?;
                        let value = mem.read_u32(addr + 8)?;
                        gt.registers.insert(reg, value);
                    }
                    MiOpcode::LoadRegisterMem => {
                        log::warn!("MI_LOAD_REGISTER_MEM is unimplemented; skipping");
                    }
                    MiOpcode::Other(op) => {
                        log::warn!("unhandled MI opcode {op} at 0x{addr:x}");
                    }
                }
                addr += len as u64 * 4;
            }
            CommandType::Render => {
                let subtype = RenderSubtype::decode(dword);
                let len = cmd::render_packet_length(dword, subtype);
                gt.handle_render_packet(mem, addr, dword, &mut stats)?;
                addr += len as u64 * 4;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpu_sim_vf::{ComponentControl, VertexFormat};

    fn write_dword(mem: &mut GuestMemory, addr: u64, value: u32) {
        mem.write(addr, &value.to_le_bytes()).unwrap();
    }

    #[test]
    fn batch_buffer_end_stops_the_walk() {
        let mut mem = GuestMemory::with_size(64);
        write_dword(&mut mem, 0, 10 << 23); // MI_BATCH_BUFFER_END
        let mut gt = Gt::new(4, 4);
        let stats = run_batch(&mut gt, &mut mem, 0).unwrap();
        assert_eq!(stats, BatchStats::default());
    }

    #[test]
    fn load_register_imm_is_recorded() {
        let mut mem = GuestMemory::with_size(64);
        write_dword(&mut mem, 0, (34u32 << 23) | 1); // MI_LOAD_REGISTER_IMM, length field 1
        write_dword(&mut mem, 4, mi_register::VERTEX_COUNT);
        write_dword(&mut mem, 8, 42);
        write_dword(&mut mem, 12, 10 << 23);
        let mut gt = Gt::new(4, 4);
        run_batch(&mut gt, &mut mem, 0).unwrap();
        assert_eq!(gt.register(mi_register::VERTEX_COUNT, 0), 42);
    }

    #[test]
    fn full_triangle_draw_shades_pixels_and_frees_urb() {
        let mut mem = GuestMemory::with_size(4096);
        // Three vertices: clip-space positions covering the 4x4 target.
        let positions: [[f32; 4]; 3] = [
            [-1.0, -1.0, 0.0, 1.0],
            [3.0, -1.0, 0.0, 1.0],
            [-1.0, 3.0, 0.0, 1.0],
        ];
        for (i, p) in positions.iter().enumerate() {
            for (c, f) in p.iter().enumerate() {
                mem.write((i * 16 + c * 4) as u64, &f.to_le_bytes()).unwrap();
            }
        }

        let mut gt = Gt::new(4, 4);
        gt.viewport = Viewport::from_floats(&[2.0, 2.0, 0.5, 2.0, 2.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        gt.configure_vertex_pipeline(
            vec![VertexBuffer { address: 0, stride: 16, instance_divisor: 0 }],
            vec![VertexElement {
                buffer_index: 0,
                format: VertexFormat::R32G32B32A32Float,
                offset: 0,
                component_control: [ComponentControl::StoreSrc; 4],
            }],
            Topology::TriList,
        );
        gt.registers.insert(mi_register::VERTEX_COUNT, 3);
        gt.registers.insert(mi_register::START_VERTEX, 0);
        gt.registers.insert(mi_register::INSTANCE_COUNT, 1);

        let mut stats = BatchStats::default();
        gt.dispatch_primitive(&mem, &mut stats).unwrap();

        assert_eq!(stats.triangles_assembled, 1);
        assert!(stats.pixels_shaded > 0);
        assert_eq!(gt.urb.live_count(), 0, "all VUEs must be freed after the draw");
    }
}
