//! Vertex pipeline: fetch, VS dispatch, viewport transform, IA queue, and
//! primitive assembly. Sits between the command-stream interpreter
//! (`gpu-sim-core`) and the rasterizer (`gpu-sim-raster`).

pub mod assembly;
pub mod fetch;
pub mod viewport;
pub mod vs;

pub use assembly::{Assembler, Topology};
pub use fetch::{resolve_index, ComponentControl, IndexFormat, VertexBuffer, VertexElement, VertexFormat};
pub use viewport::{IaQueue, Viewport};
pub use vs::{dispatch_vs, Curbe};
