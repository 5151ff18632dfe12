//! Command-line front end: loads a scenario file, runs its batch buffer
//! through `gpu-sim-core::run_batch`, and dumps the resulting framebuffer
//! to a PNG.

mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gpu_sim_core::{run_batch, Gt};
use gpu_sim_hal::GuestMemory;
use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(about = "Run a gpu-sim batch buffer scenario and dump the resulting framebuffer")]
struct Args {
    /// Path to a scenario TOML file.
    scenario: PathBuf,

    /// Where to write the rendered framebuffer as a PNG.
    #[arg(long, default_value = "out.png")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;

    let base_dir = args.scenario.parent().unwrap_or_else(|| std::path::Path::new("."));
    let mut mem = GuestMemory::with_size(scenario.memory_size);
    for region in &scenario.regions {
        let bytes = std::fs::read(base_dir.join(&region.file))
            .with_context(|| format!("reading region file {}", region.file))?;
        mem.load(region.address, &bytes);
    }

    let mut gt = Gt::new(scenario.width, scenario.height);
    gt.trace_mask = scenario::parse_trace_mask(&scenario.trace);

    let stats = run_batch(&mut gt, &mut mem, scenario.batch_buffer_address)
        .context("running batch buffer")?;
    log::info!(
        "batch complete: {} vertices, {} triangles, {} pixels shaded",
        stats.vertices_fetched,
        stats.triangles_assembled,
        stats.pixels_shaded
    );

    dump_png(&gt.render_target, &args.out)?;
    Ok(())
}

fn dump_png(rt: &gpu_sim_raster::RenderTargetView, path: &std::path::Path) -> anyhow::Result<()> {
    let mut buf = image::RgbaImage::new(rt.width, rt.height);
    for y in 0..rt.height {
        for x in 0..rt.width {
            let offset = rt.byte_offset(x, y);
            let cpp = rt.format.bytes_per_pixel() as usize;
            let pixel = match rt.format {
                gpu_sim_formats::SurfaceFormat::B8G8R8A8Unorm => {
                    let b = rt.pixels[offset];
                    let g = rt.pixels[offset + 1];
                    let r = rt.pixels[offset + 2];
                    let a = rt.pixels[offset + 3];
                    [r, g, b, a]
                }
                _ => {
                    let mut p = [0u8; 4];
                    let n = cpp.min(4);
                    p[..n].copy_from_slice(&rt.pixels[offset..offset + n]);
                    if cpp < 4 {
                        p[3] = 0xff;
                    }
                    p
                }
            };
            buf.put_pixel(x, y, image::Rgba(pixel));
        }
    }
    buf.save(path).with_context(|| format!("writing PNG to {}", path.display()))?;
    Ok(())
}
