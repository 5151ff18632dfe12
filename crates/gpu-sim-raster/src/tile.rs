//! 32x32 tile traversal over a triangle's screen-space bounding box, with
//! 2x2 pixel-block scanning inside each tile.

use crate::edge::{coverage, triangle_area, ScreenVertex};

pub const TILE_SIZE: i32 = 32;
pub const BLOCK_SIZE: i32 = 2;

/// Visit every covered pixel of `a, b, c` inside `[0, width) x [0, height)`,
/// calling `visit(x, y, w0, w1, w2)` for each one. Traversal walks whole
/// 32x32 tiles first, then 2x2 blocks within each tile, clipped to the
/// triangle's bounding box — this only changes the order pixels are
/// visited in, never which pixels are covered.
pub fn rasterize_triangle(
    a: ScreenVertex,
    b: ScreenVertex,
    c: ScreenVertex,
    width: i32,
    height: i32,
    mut visit: impl FnMut(i32, i32, f32, f32, f32),
) {
    let area = triangle_area(a, b, c);
    if area <= 0.0 {
        return; // back-face or degenerate: culled whenever signed area is non-positive.
    }

    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as i32;
    let max_x = a.x.max(b.x).max(c.x).ceil().min(width as f32) as i32;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as i32;
    let max_y = a.y.max(b.y).max(c.y).ceil().min(height as f32) as i32;
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let tile_min_x = min_x - min_x.rem_euclid(TILE_SIZE);
    let tile_min_y = min_y - min_y.rem_euclid(TILE_SIZE);

    let mut ty = tile_min_y;
    while ty < max_y {
        let mut tx = tile_min_x;
        while tx < max_x {
            let block_start_x = tx.max(min_x);
            let block_start_y = ty.max(min_y);
            let block_end_x = (tx + TILE_SIZE).min(max_x);
            let block_end_y = (ty + TILE_SIZE).min(max_y);

            let mut by = block_start_y;
            while by < block_end_y {
                let mut bx = block_start_x;
                while bx < block_end_x {
                    for dy in 0..BLOCK_SIZE {
                        for dx in 0..BLOCK_SIZE {
                            let px = bx + dx;
                            let py = by + dy;
                            if px >= block_end_x || py >= block_end_y {
                                continue;
                            }
                            if let Some((w0, w1, w2)) = coverage(a, b, c, area, px, py) {
                                visit(px, py, w0, w1, w2);
                            }
                        }
                    }
                    bx += BLOCK_SIZE;
                }
                by += BLOCK_SIZE;
            }
            tx += TILE_SIZE;
        }
        ty += TILE_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> ScreenVertex {
        ScreenVertex { x, y, z: 0.0 }
    }

    #[test]
    fn full_screen_triangle_covers_half_the_pixels() {
        let a = v(0.0, 0.0);
        let b = v(640.0, 0.0);
        let c = v(0.0, 480.0);
        let mut count = 0;
        rasterize_triangle(a, b, c, 640, 480, |_, _, _, _, _| count += 1);
        // Right-triangle half of a 640x480 rect, give or take edge pixels.
        assert!(count > 150_000 && count < 154_000, "count = {count}");
    }

    #[test]
    fn back_facing_triangle_is_not_rasterized() {
        let a = v(0.0, 0.0);
        let b = v(0.0, 480.0);
        let c = v(640.0, 0.0);
        let mut count = 0;
        rasterize_triangle(a, b, c, 640, 480, |_, _, _, _, _| count += 1);
        assert_eq!(count, 0);
    }
}
