//! Vertex fetch: turns an index into a set of per-element component values
//! in a URB row.

use gpu_sim_hal::{GuestMemory, MemError};
use gpu_sim_urb::Value;
use log::warn;

/// Per-element component-control selector, as decoded from
/// `VERTEX_ELEMENT_STATE`'s four `VFCOMP_*` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentControl {
    NoStore,
    StoreSrc,
    Store0,
    Store1Fp,
    Store1Int,
    StorePid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    R32G32B32A32Float,
    R32G32B32Float,
    R32G32Float,
    R32Float,
}

impl VertexFormat {
    fn component_count(self) -> usize {
        match self {
            VertexFormat::R32G32B32A32Float => 4,
            VertexFormat::R32G32B32Float => 3,
            VertexFormat::R32G32Float => 2,
            VertexFormat::R32Float => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VertexElement {
    pub buffer_index: usize,
    pub format: VertexFormat,
    pub offset: u32,
    /// `component_control[0..4]` picks where each of the four output
    /// lanes in the URB row comes from.
    pub component_control: [ComponentControl; 4],
}

#[derive(Debug, Clone, Copy)]
pub struct VertexBuffer {
    pub address: u64,
    pub stride: u32,
    pub instance_divisor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Byte,
    Word,
    Dword,
}

/// Resolve the index of the `nth` vertex in a draw, handling both the
/// `SEQUENTIAL` (no index buffer) and `RANDOM` (indexed) access patterns,
/// per `fetch_vertex`'s index resolution.
pub fn resolve_index(
    mem: &GuestMemory,
    indexed: bool,
    index_buffer_addr: u64,
    index_format: IndexFormat,
    base_vertex: i32,
    start_vertex: u32,
    nth: u32,
) -> Result<u32, MemError> {
    if !indexed {
        return Ok(start_vertex + nth);
    }
    let element_index = start_vertex + nth;
    let value = match index_format {
        IndexFormat::Byte => mem.read(index_buffer_addr + element_index as u64, 1)?[0] as u32,
        IndexFormat::Word => {
            let b = mem.read(index_buffer_addr + element_index as u64 * 2, 2)?;
            u16::from_le_bytes(b.try_into().unwrap()) as u32
        }
        IndexFormat::Dword => mem.read_u32(index_buffer_addr + element_index as u64 * 4)?,
    };
    Ok((value as i64 + base_vertex as i64) as u32)
}

/// Fetch one vertex's worth of elements into a URB row slice, one
/// [`Value`] per vertex element. Out-of-bounds element reads degrade to a
/// zeroed vector with a `WARN`-category trace line rather than a fatal
/// error.
pub fn fetch_vertex(
    mem: &GuestMemory,
    buffers: &[VertexBuffer],
    elements: &[VertexElement],
    vertex_index: u32,
    instance_id: u32,
    vertex_id: u32,
    out: &mut [Value],
) {
    debug_assert_eq!(out.len(), elements.len());
    for (slot, elem) in elements.iter().enumerate() {
        let buf = &buffers[elem.buffer_index];
        let index = if buf.instance_divisor > 0 {
            instance_id / buf.instance_divisor
        } else {
            vertex_index
        };
        let addr = buf.address + index as u64 * buf.stride as u64 + elem.offset as u64;
        let count = elem.format.component_count();
        let fetched = mem.read(addr, count * 4);

        let mut raw = [0f32; 4];
        match fetched {
            Ok(bytes) => {
                for (i, chunk) in bytes.chunks_exact(4).enumerate() {
                    raw[i] = f32::from_bits(u32::from_le_bytes(chunk.try_into().unwrap()));
                }
            }
            Err(err) => {
                warn!("vertex fetch out of bounds at 0x{addr:x}: {err}");
            }
        }

        let mut value = Value::ZERO;
        for lane in 0..4 {
            value.v[lane] = match elem.component_control[lane] {
                ComponentControl::NoStore => continue,
                ComponentControl::StoreSrc => raw[lane].to_bits() as i32,
                ComponentControl::Store0 => 0,
                ComponentControl::Store1Fp => 1.0f32.to_bits() as i32,
                ComponentControl::Store1Int => 1,
                // The generating vertex shader reads this back as the
                // System-Generated instance/vertex id, injected by the
                // caller after this function returns.
                ComponentControl::StorePid => 0,
            };
        }
        out[slot] = value;
        let _ = (instance_id, vertex_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(control: [ComponentControl; 4]) -> VertexElement {
        VertexElement {
            buffer_index: 0,
            format: VertexFormat::R32G32B32A32Float,
            offset: 0,
            component_control: control,
        }
    }

    #[test]
    fn sequential_fetch_reads_consecutive_vertices() {
        let mut mem = GuestMemory::with_size(64);
        mem.write(0, &1.0f32.to_le_bytes()).unwrap();
        mem.write(16, &2.0f32.to_le_bytes()).unwrap();
        let buffers = [VertexBuffer { address: 0, stride: 16, instance_divisor: 0 }];
        let elements = [elem([
            ComponentControl::StoreSrc,
            ComponentControl::Store0,
            ComponentControl::Store0,
            ComponentControl::Store1Fp,
        ])];
        let mut out = [Value::ZERO; 1];
        fetch_vertex(&mem, &buffers, &elements, 1, 0, 1, &mut out);
        assert_eq!(out[0].f(0), 2.0);
        assert_eq!(out[0].f(3), 1.0);
    }

    #[test]
    fn out_of_bounds_fetch_zeroes_rather_than_panics() {
        let mem = GuestMemory::with_size(4);
        let buffers = [VertexBuffer { address: 1000, stride: 16, instance_divisor: 0 }];
        let elements = [elem([ComponentControl::StoreSrc; 4])];
        let mut out = [Value::ZERO; 1];
        fetch_vertex(&mem, &buffers, &elements, 0, 0, 0, &mut out);
        assert_eq!(out[0], Value::ZERO);
    }

    #[test]
    fn indexed_access_resolves_through_index_buffer() {
        let mut mem = GuestMemory::with_size(16);
        mem.write(0, &[5u8, 3, 9, 1]).unwrap();
        let idx = resolve_index(&mem, true, 0, IndexFormat::Byte, 0, 0, 2).unwrap();
        assert_eq!(idx, 9);
    }

    #[test]
    fn sequential_access_ignores_index_buffer() {
        let mem = GuestMemory::with_size(16);
        let idx = resolve_index(&mem, false, 0, IndexFormat::Byte, 0, 10, 3).unwrap();
        assert_eq!(idx, 13);
    }
}
