/// Diagnostics: human-readable dumps of tiles and whole buffers
///
/// Kept out of the production types; everything here goes through the
/// read-only inspection accessors.
use std::fmt::Write;

use crate::buffer::TiledCoverageBuffer;
use crate::column::TILE_HEIGHT;
use crate::tile::{
    CoverageTile, LineOp, DEPTH_BLOCK_COLS, DEPTH_BLOCK_ROWS, DEPTH_BLOCK_SIZE, TILE_WIDTH,
};

/// Text dump of one tile: flags, block depths, pending operations, and an
/// ASCII coverage bitmap with a column ruler.
pub fn dump_tile(tile: &CoverageTile) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "full={} untouched={} min_depth={} max_depth={} ops={}",
        tile.is_full(),
        tile.is_untouched(),
        tile.min_depth(),
        tile.max_depth(),
        tile.pending_ops().len()
    );

    for by in 0..DEPTH_BLOCK_ROWS {
        let _ = write!(out, "depth[{}]:", by);
        for bx in 0..DEPTH_BLOCK_COLS {
            let _ = write!(out, " {:10.2}", tile.block_depth(bx, by));
        }
        out.push('\n');
    }

    for op in tile.pending_ops() {
        match *op {
            LineOp::Line { x1, y1, x2, y2, dx } => {
                let _ = writeln!(
                    out,
                    "  line {:?},{} -> {:?},{} dx={:?}",
                    x1, y1, x2, y2, dx
                );
            }
            LineOp::VLine { x, y1, y2 } => {
                let _ = writeln!(out, "  vline {:?} y={}..{}", x, y1, y2);
            }
            LineOp::FullVLine { x } => {
                let _ = writeln!(out, "  fullvline {:?}", x);
            }
        }
    }

    // Column ruler (tens, then units), then one row per scanline.
    for x in 0..TILE_WIDTH {
        out.push(char::from_digit((x / 10) as u32, 10).unwrap());
    }
    out.push('\n');
    for x in 0..TILE_WIDTH {
        out.push(char::from_digit((x % 10) as u32, 10).unwrap());
    }
    out.push('\n');
    for y in 0..TILE_HEIGHT {
        for x in 0..TILE_WIDTH {
            out.push(if tile.coverage_bit(x, y) { '#' } else { '.' });
        }
        out.push('\n');
    }

    out
}

/// Coarse ASCII dump of the whole buffer: one character per 8x8 block,
/// graded by how many of its 64 pixels are covered.
pub fn dump_buffer_ascii(buffer: &TiledCoverageBuffer) -> String {
    let mut out = String::new();
    for ty in 0..buffer.tile_rows() {
        for by in 0..DEPTH_BLOCK_ROWS {
            for tx in 0..buffer.tile_cols() {
                let tile = buffer.tile_at(tx, ty);
                for bx in 0..DEPTH_BLOCK_COLS {
                    let mut count = 0;
                    for x in bx * DEPTH_BLOCK_SIZE..(bx + 1) * DEPTH_BLOCK_SIZE {
                        for y in by * DEPTH_BLOCK_SIZE..(by + 1) * DEPTH_BLOCK_SIZE {
                            if tile.coverage_bit(x, y) {
                                count += 1;
                            }
                        }
                    }
                    out.push(match count {
                        64 => '#',
                        55..=63 => '*',
                        0 => ' ',
                        1..=9 => '.',
                        _ => 'x',
                    });
                }
            }
            out.push('\n');
        }
    }
    out
}

/// Grayscale image of the buffer, one `0xAARRGGBB` pixel per screen pixel.
/// Covered pixels are shaded by their block depth (nearer is brighter),
/// uncovered pixels are black.
pub fn dump_buffer_image(buffer: &TiledCoverageBuffer) -> Vec<u32> {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let mut image = vec![0xFF000000u32; width * height];

    for y in 0..height {
        let ty = y / TILE_HEIGHT;
        let ly = y % TILE_HEIGHT;
        for x in 0..width {
            let tx = x / TILE_WIDTH;
            let lx = x % TILE_WIDTH;
            let tile = buffer.tile_at(tx as i32, ty as i32);
            if tile.coverage_bit(lx, ly) {
                let depth = tile.block_depth(lx / DEPTH_BLOCK_SIZE, ly / DEPTH_BLOCK_SIZE);
                let c = (255.0 - depth).clamp(50.0, 255.0) as u32;
                image[y * width + x] = 0xFF000000 | (c << 16) | (c << 8) | c;
            }
        }
    }
    image
}
