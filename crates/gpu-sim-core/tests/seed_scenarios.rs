//! End-to-end seed scenarios driving `run_batch` over a hand-built batch
//! buffer, exercising the full command-stream walk rather than calling
//! individual pipeline stages directly.

use gpu_sim_core::{cmd::mi_register, run_batch, Gt};
use gpu_sim_hal::GuestMemory;
use gpu_sim_vf::{ComponentControl, Topology, VertexBuffer, VertexElement, VertexFormat, Viewport};

fn write_dword(mem: &mut GuestMemory, addr: u64, value: u32) {
    mem.write(addr, &value.to_le_bytes()).unwrap();
}

fn write_float(mem: &mut GuestMemory, addr: u64, value: f32) {
    mem.write(addr, &value.to_le_bytes()).unwrap();
}

/// A single oversized triangle covering the whole target, through the
/// full MI/Render packet walk (not calling `dispatch_primitive` directly).
#[test]
fn full_screen_triangle_shades_every_covered_pixel() {
    let mut mem = GuestMemory::with_size(8192);

    let vb_addr = 4096u64;
    let positions: [[f32; 4]; 3] =
        [[-1.0, -1.0, 0.0, 1.0], [3.0, -1.0, 0.0, 1.0], [-1.0, 3.0, 0.0, 1.0]];
    for (i, p) in positions.iter().enumerate() {
        for (c, f) in p.iter().enumerate() {
            write_float(&mut mem, vb_addr + (i * 16 + c * 4) as u64, *f);
        }
    }

    let mut addr = 0u64;
    // MI_LOAD_REGISTER_IMM x3: VERTEX_COUNT, START_VERTEX, INSTANCE_COUNT
    for (reg, value) in [
        (mi_register::VERTEX_COUNT, 3),
        (mi_register::START_VERTEX, 0),
        (mi_register::INSTANCE_COUNT, 1),
    ] {
        write_dword(&mut mem, addr, (34u32 << 23) | 1);
        write_dword(&mut mem, addr + 4, reg);
        write_dword(&mut mem, addr + 8, value);
        addr += 12;
    }

    // 3DSTATE_VIEWPORT: opcode field 0x10c at bits 16:26, subtype Common (0).
    // Total packet length is (length field + 2) dwords; 1 header + 14 floats
    // of payload means the length field must be 13.
    let viewport_header = (3u32 << 29) | (0x10c << 16) | 13;
    write_dword(&mut mem, addr, viewport_header);
    let viewport_floats: [f32; 14] = [2.0, 2.0, 0.5, 2.0, 2.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    for (i, f) in viewport_floats.iter().enumerate() {
        write_float(&mut mem, addr + 4 + i as u64 * 4, *f);
    }
    addr += 15 * 4;

    // 3DPRIMITIVE: length field 0 means total length 2 dwords (header plus
    // one reserved payload dword this simulator never reads, since the
    // actual draw parameters come from the MI_LOAD_REGISTER_IMM registers
    // set above, not the packet body).
    let primitive_header = (3u32 << 29) | (0x700 << 16);
    write_dword(&mut mem, addr, primitive_header);
    addr += 8;

    // MI_BATCH_BUFFER_END
    write_dword(&mut mem, addr, 10u32 << 23);

    let mut gt = Gt::new(4, 4);
    gt.configure_vertex_pipeline(
        vec![VertexBuffer { address: vb_addr, stride: 16, instance_divisor: 0 }],
        vec![VertexElement {
            buffer_index: 0,
            format: VertexFormat::R32G32B32A32Float,
            offset: 0,
            component_control: [ComponentControl::StoreSrc; 4],
        }],
        Topology::TriList,
    );

    let stats = run_batch(&mut gt, &mut mem, 0).expect("batch runs to completion");
    assert_eq!(stats.vertices_fetched, 3);
    assert_eq!(stats.triangles_assembled, 1);
    assert_eq!(stats.pixels_shaded, 16, "triangle covers the whole 4x4 target");
    assert_eq!(gt.urb.live_count(), 0);
}

#[test]
fn degenerate_triangle_shades_nothing_and_still_frees_vues() {
    let mut mem = GuestMemory::with_size(8192);
    // Three collinear points: zero area, must be culled.
    let positions: [[f32; 4]; 3] = [[0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 0.0, 1.0], [2.0, 2.0, 0.0, 1.0]];
    for (i, p) in positions.iter().enumerate() {
        for (c, f) in p.iter().enumerate() {
            write_float(&mut mem, (i * 16 + c * 4) as u64, *f);
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
    gt.registers.insert(mi_register::INSTANCE_COUNT, 1);

    let primitive_header = (3u32 << 29) | (0x700 << 16);
    write_dword(&mut mem, 4096, primitive_header);
    write_dword(&mut mem, 4104, 10u32 << 23);
    let stats = run_batch(&mut gt, &mut mem, 4096).unwrap();

    assert_eq!(stats.triangles_assembled, 1);
    assert_eq!(stats.pixels_shaded, 0);
    assert_eq!(gt.urb.live_count(), 0);
}
