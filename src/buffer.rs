/// Tiled coverage buffer: occlusion culling on a grid of coverage tiles
///
/// The buffer partitions the viewport into 32x64-pixel tiles. Shapes are
/// rasterized into per-tile deferred line operations (see `tile`), then
/// committed or tested tile by tile while an XOR fill state (`fvalue`) is
/// carried left to right along each dirty tile row.
///
/// Coordinate conventions: screen space has x growing right and y growing
/// down; a polygon edge toggles the fill at each scanline it crosses, and a
/// shape covers pixel rows `[min_y, max_y)` of its vertical extent. Edges on
/// the shape's bottom row are drawn one scanline further (`y_further = 1`) so
/// the even-odd fill closes.
use glam::{Vec2, Vec3};

use crate::column::{TileColumn, TILE_HEIGHT};
use crate::count_call;
use crate::error::{CoverageBufferError, MAX_DIMENSION};
use crate::fixed::Fixed16;
use crate::outline::{z_plane_intersect, OutlineCamera, NEAR_Z, NEAR_Z_MARGIN};
use crate::tile::{CoverageTile, FillScratch, SHIFT_TILE_COL, SHIFT_TILE_ROW, TILE_WIDTH};

const COL_MASK: i32 = TILE_WIDTH as i32 - 1;
const ROW_MASK: i32 = TILE_HEIGHT as i32 - 1;

/// Rectangle-test coordinates are clamped here before rounding, guarding
/// against extreme projected boxes.
const RECT_COORD_LIMIT: f32 = 10000.0;

/// Integer pixel bounding box of a rasterized shape. `max` values are the
/// bottom/right vertex rows, not exclusive bounds.
#[derive(Copy, Clone, Debug)]
struct PixelBBox {
    minx: i32,
    miny: i32,
    maxx: i32,
    maxy: i32,
}

/// Precomputed tile and sub-tile ranges for one rectangle test, reusable
/// across `test_rectangle` and `quick_test_rectangle` calls.
#[derive(Copy, Clone, Debug)]
pub struct TestRectData {
    miny: i32,
    maxy: i32,
    start_row: i32,
    end_row: i32,
    start_col: i32,
    end_col: i32,
    start_x: i32,
    end_x: i32,
}

/// Hierarchical software coverage buffer for occlusion culling.
pub struct TiledCoverageBuffer {
    width: i32,
    height: i32,
    num_tile_cols: i32,
    num_tile_rows: i32,
    tiles: Vec<CoverageTile>,
    /// Per tile row: leftmost/rightmost tile column touched by the shape
    /// currently being rasterized. `dirty_right` may extend one past the last
    /// real column when a right-clipped edge touched the row; flush/test
    /// clamp it back.
    dirty_left: Vec<i32>,
    dirty_right: Vec<i32>,
    scratch: FillScratch,
    // Rasterization scratch, reused across shapes.
    poly_xa: Vec<i32>,
    poly_ya: Vec<i32>,
    out_cam: Vec<Vec3>,
    out_xa: Vec<i32>,
    out_ya: Vec<i32>,
}

impl TiledCoverageBuffer {
    pub fn new(width: usize, height: usize) -> Result<Self, CoverageBufferError> {
        let mut buffer = Self {
            width: 0,
            height: 0,
            num_tile_cols: 0,
            num_tile_rows: 0,
            tiles: Vec::new(),
            dirty_left: Vec::new(),
            dirty_right: Vec::new(),
            scratch: FillScratch::new(),
            poly_xa: Vec::new(),
            poly_ya: Vec::new(),
            out_cam: Vec::new(),
            out_xa: Vec::new(),
            out_ya: Vec::new(),
        };
        buffer.setup(width, height)?;
        Ok(buffer)
    }

    /// Resize for a new viewport, reusing allocations where possible. Leaves
    /// the buffer initialized (all tiles empty).
    pub fn setup(&mut self, width: usize, height: usize) -> Result<(), CoverageBufferError> {
        if width == 0 || height == 0 {
            return Err(CoverageBufferError::ZeroDimension { width, height });
        }
        if width > MAX_DIMENSION {
            return Err(CoverageBufferError::DimensionTooLarge {
                dim: width,
                max: MAX_DIMENSION,
            });
        }
        if height > MAX_DIMENSION {
            return Err(CoverageBufferError::DimensionTooLarge {
                dim: height,
                max: MAX_DIMENSION,
            });
        }

        self.width = width as i32;
        self.height = height as i32;
        self.num_tile_cols = ((width + TILE_WIDTH - 1) / TILE_WIDTH) as i32;
        self.num_tile_rows = ((height + TILE_HEIGHT - 1) / TILE_HEIGHT) as i32;

        let num_tiles = (self.num_tile_cols * self.num_tile_rows) as usize;
        self.tiles.clear();
        self.tiles.resize_with(num_tiles, CoverageTile::new);
        self.dirty_left.clear();
        self.dirty_left.resize(self.num_tile_rows as usize, i32::MAX);
        self.dirty_right.clear();
        self.dirty_right.resize(self.num_tile_rows as usize, -1);

        self.initialize();
        Ok(())
    }

    /// Start a new frame: every tile becomes logically empty. O(tiles).
    pub fn initialize(&mut self) {
        for tile in &mut self.tiles {
            tile.mark_empty();
            tile.clear_operations();
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn tile_cols(&self) -> i32 {
        self.num_tile_cols
    }

    #[inline]
    pub fn tile_rows(&self) -> i32 {
        self.num_tile_rows
    }

    /// The tile at grid position (tx, ty).
    pub fn tile_at(&self, tx: i32, ty: i32) -> &CoverageTile {
        debug_assert!(tx >= 0 && tx < self.num_tile_cols);
        debug_assert!(ty >= 0 && ty < self.num_tile_rows);
        &self.tiles[(ty * self.num_tile_cols + tx) as usize]
    }

    /// Dirty tile-column range of a row from the most recent rasterization,
    /// or None when the row was untouched. The right bound may be one past
    /// the last real column (right-clipped edges).
    pub fn dirty_range(&self, ty: i32) -> Option<(i32, i32)> {
        let (dl, dr) = (
            self.dirty_left[ty as usize],
            self.dirty_right[ty as usize],
        );
        if dl > dr {
            None
        } else {
            Some((dl, dr))
        }
    }

    #[inline]
    fn tile_mut(&mut self, tx: i32, ty: i32) -> &mut CoverageTile {
        debug_assert!(tx >= 0 && tx < self.num_tile_cols);
        debug_assert!(ty >= 0 && ty < self.num_tile_rows);
        &mut self.tiles[(ty * self.num_tile_cols + tx) as usize]
    }

    #[inline]
    fn mark_tile_dirty(&mut self, tile_x: i32, tile_y: i32) {
        let row = tile_y as usize;
        if tile_x < self.dirty_left[row] {
            self.dirty_left[row] = tile_x;
        }
        if tile_x > self.dirty_right[row] {
            self.dirty_right[row] = tile_x;
        }
    }

    fn reset_dirty(&mut self) {
        for v in &mut self.dirty_left {
            *v = i32::MAX;
        }
        for v in &mut self.dirty_right {
            *v = -1;
        }
    }

    /// Queue a vertical fill edge at screen column `x` covering pixel rows
    /// `y1..=y2`, split across tile rows. `x` must be on screen.
    fn queue_vertical_edge(&mut self, x: i32, y1: i32, y2: i32) {
        if y2 < y1 {
            return;
        }
        let tile_x = x >> SHIFT_TILE_COL;
        let local_x = Fixed16::from_int(x & COL_MASK);
        let tile_y1 = y1 >> SHIFT_TILE_ROW;
        let tile_y2 = y2 >> SHIFT_TILE_ROW;

        if tile_y1 == tile_y2 {
            self.mark_tile_dirty(tile_x, tile_y1);
            self.tile_mut(tile_x, tile_y1)
                .push_vline(local_x, y1 & ROW_MASK, y2 & ROW_MASK);
            return;
        }
        self.mark_tile_dirty(tile_x, tile_y1);
        self.tile_mut(tile_x, tile_y1)
            .push_vline(local_x, y1 & ROW_MASK, ROW_MASK);
        for t in (tile_y1 + 1)..tile_y2 {
            self.mark_tile_dirty(tile_x, t);
            self.tile_mut(tile_x, t).push_full_vline(local_x);
        }
        self.mark_tile_dirty(tile_x, tile_y2);
        self.tile_mut(tile_x, tile_y2)
            .push_vline(local_x, 0, y2 & ROW_MASK);
    }

    /// Edges fully right of the viewport push no ops, but the fill state of
    /// the touched rows must still propagate to the screen edge: extend the
    /// dirty range one past the last real tile column.
    fn mark_right_column_dirty(&mut self, y1: i32, y2: i32) {
        if y2 < y1 {
            return;
        }
        let virtual_col = self.num_tile_cols;
        for t in (y1 >> SHIFT_TILE_ROW)..=(y2 >> SHIFT_TILE_ROW) {
            self.mark_tile_dirty(virtual_col, t);
        }
    }

    /// Queue one polygon edge into every tile it crosses. `y1 < y2` on entry;
    /// `y_further` is 1 for edges ending on the shape's bottom row.
    fn draw_line(&mut self, mut x1: i32, mut y1: i32, mut x2: i32, mut y2: i32, y_further: i32) {
        y2 += y_further;

        if y2 <= 0 || y1 >= self.height {
            return;
        }

        if x1 <= 0 && x2 <= 0 {
            // Fully left: clamp to a vertical edge at x = 0.
            let y1 = y1.max(0);
            let y2 = y2.min(self.height);
            self.queue_vertical_edge(0, y1, y2 - 1);
            return;
        }
        if x1 >= self.width && x2 >= self.width {
            // Fully right: drop, but keep the rows' fill state flowing.
            let y1 = y1.max(0);
            let y2 = y2.min(self.height);
            self.mark_right_column_dirty(y1, y2 - 1);
            return;
        }
        if x1 == x2 {
            let y1 = y1.max(0);
            let y2 = y2.min(self.height);
            self.queue_vertical_edge(x1, y1, y2 - 1);
            return;
        }

        // No trivial vertical case; clip the true edge to the viewport.
        let (old_x1, old_x2, mut old_y1, mut old_y2) = (x1, x2, y1, y2);
        y2 -= y_further;
        let inside = clip_line(
            &mut x1,
            &mut y1,
            &mut x2,
            &mut y2,
            self.width - 1,
            self.height - y_further,
        );
        if inside && y1 == y2 {
            // Clipping left a single scanline.
            return;
        }
        y2 += y_further;

        if !inside {
            // The line misses the viewport horizontally but still crosses its
            // vertical extent; decide which side it passes on.
            let right_side = if old_x1 < self.width && old_x2 < self.width {
                false
            } else if old_x1 >= 0 && old_x2 >= 0 {
                true
            } else {
                // Sample the x at the topmost on-screen scanline.
                let y = old_y1.max(0);
                let x = old_x1 as f32
                    + (y - old_y1) as f32 * (old_x2 - old_x1) as f32 / (old_y2 - old_y1) as f32;
                x > 0.0
            };
            let oy1 = old_y1.max(0);
            let oy2 = old_y2.min(self.height);
            if right_side {
                self.mark_right_column_dirty(oy1, oy2 - 1);
            } else {
                self.queue_vertical_edge(0, oy1, oy2 - 1);
            }
            return;
        }

        // Parts clipped away vertically within the screen's y extent still
        // matter: clamp to x = 0 on the left, mark dirty on the right.
        old_y1 = old_y1.max(0);
        if old_y2 > self.height {
            old_y2 = self.height;
        }
        if old_y1 < y1 {
            if x1 <= 0 {
                self.queue_vertical_edge(0, old_y1, y1 - 1);
            } else if x1 >= self.width - 1 {
                self.mark_right_column_dirty(old_y1, y1 - 1);
            }
        }
        if old_y2 > y2 {
            if x2 <= 0 {
                self.queue_vertical_edge(0, y2, old_y2 - 1);
            } else if x2 >= self.width - 1 {
                self.mark_right_column_dirty(y2, old_y2 - 1);
            }
        }

        // The remaining segment is fully on screen.
        let tile_x1 = x1 >> SHIFT_TILE_COL;
        let tile_y1 = y1 >> SHIFT_TILE_ROW;
        let tile_x2 = x2 >> SHIFT_TILE_COL;
        let tile_y2 = (y2 - 1) >> SHIFT_TILE_ROW;

        let denom = (y2 - y1) - y_further;
        let dx = if denom > 0 {
            Fixed16::slope(x2 - x1, denom)
        } else {
            Fixed16::ZERO
        };

        if tile_x1 == tile_x2 && tile_y1 == tile_y2 {
            // Whole segment inside one tile.
            let start = Fixed16::from_int(x1).tile_local();
            let end = Fixed16::from_int(x2).tile_local()
                - if y_further != 0 { Fixed16::ZERO } else { dx };
            self.mark_tile_dirty(tile_x1, tile_y1);
            self.tile_mut(tile_x1, tile_y1)
                .push_line(start, y1 & ROW_MASK, end, (y2 - 1) & ROW_MASK, dx);
            return;
        }

        if tile_x1 == tile_x2 {
            // Near-vertical: one tile column, split per tile row without
            // walking individual scanlines.
            let x1f = Fixed16::from_int(x1);
            let x2f = Fixed16::from_int(x2);
            let mut x = x1f + dx * (ROW_MASK - (y1 & ROW_MASK));
            self.mark_tile_dirty(tile_x1, tile_y1);
            self.tile_mut(tile_x1, tile_y1)
                .push_line(x1f.tile_local(), y1 & ROW_MASK, x.tile_local(), ROW_MASK, dx);
            x += dx;
            for t in (tile_y1 + 1)..tile_y2 {
                let xt = x + dx * ROW_MASK;
                self.mark_tile_dirty(tile_x1, t);
                self.tile_mut(tile_x1, t)
                    .push_line(x.tile_local(), 0, xt.tile_local(), ROW_MASK, dx);
                x = xt + dx;
            }
            self.mark_tile_dirty(tile_x1, tile_y2);
            self.tile_mut(tile_x1, tile_y2).push_line(
                x.tile_local(),
                0,
                x2f.tile_local() - dx,
                (y2 - 1) & ROW_MASK,
                dx,
            );
            return;
        }

        // General case: walk scanline by scanline, closing a segment at
        // every tile boundary crossing.
        let mut x = Fixed16::from_int(x1);
        let mut y = y1;
        let mut dy = y2 - y1;
        let need_to_finish = dy > 0;
        let mut last_x = x;
        let mut last_y = y;
        let mut cur_tile_x = tile_x1;
        let mut cur_tile_y = tile_y1;
        while dy > 0 {
            let tx = x.tile_col();
            let ty = y >> SHIFT_TILE_ROW;
            if tx != cur_tile_x || ty != cur_tile_y {
                self.mark_tile_dirty(cur_tile_x, cur_tile_y);
                self.tile_mut(cur_tile_x, cur_tile_y).push_line(
                    last_x.tile_local(),
                    last_y & ROW_MASK,
                    (x - dx).tile_local(),
                    (y - 1) & ROW_MASK,
                    dx,
                );
                cur_tile_x = tx;
                cur_tile_y = ty;
                last_x = x;
                last_y = y;
            }
            x += dx;
            y += 1;
            dy -= 1;
        }
        if need_to_finish {
            self.mark_tile_dirty(cur_tile_x, cur_tile_y);
            self.tile_mut(cur_tile_x, cur_tile_y).push_line(
                last_x.tile_local(),
                last_y & ROW_MASK,
                (x - dx).tile_local(),
                (y - 1) & ROW_MASK,
                dx,
            );
        }
    }

    /// Rasterize a polygon into per-tile line ops and the dirty ranges.
    /// Returns None when the polygon cannot touch the viewport.
    fn draw_polygon(&mut self, verts: &[Vec2]) -> Option<PixelBBox> {
        if verts.len() < 3 {
            return None;
        }

        self.poly_xa.clear();
        self.poly_ya.clear();
        for v in verts {
            self.poly_xa.push(round_i32(v.x));
            self.poly_ya.push(round_i32(v.y));
        }

        let mut bbox = PixelBBox {
            minx: self.poly_xa[0],
            maxx: self.poly_xa[0],
            miny: self.poly_ya[0],
            maxy: self.poly_ya[0],
        };
        for i in 1..verts.len() {
            bbox.minx = bbox.minx.min(self.poly_xa[i]);
            bbox.maxx = bbox.maxx.max(self.poly_xa[i]);
            bbox.miny = bbox.miny.min(self.poly_ya[i]);
            bbox.maxy = bbox.maxy.max(self.poly_ya[i]);
        }

        if bbox.maxx <= 0 || bbox.maxy <= 0 || bbox.minx >= self.width || bbox.miny >= self.height
        {
            return None;
        }

        self.reset_dirty();

        let n = verts.len();
        let mut j = n - 1;
        for i in 0..n {
            let (yi, yj) = (self.poly_ya[i], self.poly_ya[j]);
            if yi != yj {
                let (x1, y1, x2, y2) = if yi < yj {
                    (self.poly_xa[i], yi, self.poly_xa[j], yj)
                } else {
                    (self.poly_xa[j], yj, self.poly_xa[i], yi)
                };
                let y_further = if y2 == bbox.maxy { 1 } else { 0 };
                self.draw_line(x1, y1, x2, y2, y_further);
            }
            j = i;
        }

        Some(bbox)
    }

    /// Commit the pending rasterization over the dirty ranges.
    fn flush_dirty_tiles(&mut self, bbox: &PixelBBox, max_depth: f32) -> bool {
        let start_row = (bbox.miny >> SHIFT_TILE_ROW).max(0);
        let end_row = (bbox.maxy >> SHIFT_TILE_ROW).min(self.num_tile_rows - 1);

        let mut modified = false;
        for row in start_row..=end_row {
            let mut fvalue = TileColumn::EMPTY;
            let dl = self.dirty_left[row as usize];
            let dr = self.dirty_right[row as usize].min(self.num_tile_cols - 1);
            for col in dl..=dr {
                count_call!(crate::stats::CULL_COUNTERS.tiles_flushed);
                let idx = (row * self.num_tile_cols + col) as usize;
                self.tiles[idx].flush(&mut self.scratch, &mut fvalue, max_depth, &mut modified);
            }
        }
        modified
    }

    fn clear_dirty_ops(&mut self, start_row: i32, end_row: i32) {
        for row in start_row..=end_row {
            let dl = self.dirty_left[row as usize];
            let dr = self.dirty_right[row as usize].min(self.num_tile_cols - 1);
            for col in dl..=dr {
                let idx = (row * self.num_tile_cols + col) as usize;
                self.tiles[idx].clear_operations();
            }
        }
    }

    /// Insert an occluder polygon at the given conservative depth. Returns
    /// true when the buffer changed (the occluder contributed something).
    pub fn insert_polygon(&mut self, verts: &[Vec2], max_depth: f32) -> bool {
        count_call!(crate::stats::CULL_COUNTERS.polygon_inserts);
        let bbox = match self.draw_polygon(verts) {
            Some(b) => b,
            None => return false,
        };
        self.flush_dirty_tiles(&bbox, max_depth)
    }

    /// Test whether a polygon at the given minimum depth would be visible.
    /// Leaves the buffer contents untouched.
    pub fn test_polygon(&mut self, verts: &[Vec2], min_depth: f32) -> bool {
        count_call!(crate::stats::CULL_COUNTERS.polygon_tests);
        let bbox = match self.draw_polygon(verts) {
            Some(b) => b,
            None => return false,
        };

        let start_row = (bbox.miny >> SHIFT_TILE_ROW).max(0);
        let end_row = (bbox.maxy >> SHIFT_TILE_ROW).min(self.num_tile_rows - 1);

        // Coverage pass: visible as soon as a tile has an uncovered pixel
        // under the shape. Op queues are kept for the depth pass.
        let mut visible = false;
        let mut do_depth_test = false;
        'coverage: for row in start_row..=end_row {
            let mut fvalue = TileColumn::EMPTY;
            let dl = self.dirty_left[row as usize];
            let dr = self.dirty_right[row as usize].min(self.num_tile_cols - 1);
            for col in dl..=dr {
                count_call!(crate::stats::CULL_COUNTERS.tiles_tested);
                let idx = (row * self.num_tile_cols + col) as usize;
                if self.tiles[idx].test_coverage_flush(
                    &mut self.scratch,
                    &mut fvalue,
                    min_depth,
                    &mut do_depth_test,
                ) {
                    visible = true;
                    break 'coverage;
                }
            }
        }

        if visible || !do_depth_test {
            self.clear_dirty_ops(start_row, end_row);
            return visible;
        }

        // Everything was coverage-occluded, but some blocks might still be
        // beaten on depth.
        let mut visible = false;
        for row in start_row..=end_row {
            let mut fvalue = TileColumn::EMPTY;
            let dl = self.dirty_left[row as usize];
            let dr = self.dirty_right[row as usize].min(self.num_tile_cols - 1);
            for col in dl..=dr {
                let idx = (row * self.num_tile_cols + col) as usize;
                if !visible {
                    visible =
                        self.tiles[idx].test_depth_flush(&mut self.scratch, &mut fvalue, min_depth);
                }
                self.tiles[idx].clear_operations();
            }
        }
        visible
    }

    /// Insert the silhouette of a 3D object given its outline edges. Edges
    /// may only reference vertices flagged in `used_verts`. Returns true when
    /// the buffer changed; returns false without drawing when a used vertex
    /// lies at or behind the near plane and splatting is not allowed.
    pub fn insert_outline(
        &mut self,
        camera: &OutlineCamera,
        verts: &[Vec3],
        used_verts: &[bool],
        edges: &[[usize; 2]],
        splat_outline: bool,
    ) -> bool {
        count_call!(crate::stats::CULL_COUNTERS.outline_inserts);
        let (bbox, max_depth) =
            match self.draw_outline(camera, verts, used_verts, edges, splat_outline) {
                Some(v) => v,
                None => return false,
            };
        self.flush_dirty_tiles(&bbox, max_depth)
    }

    fn draw_outline(
        &mut self,
        camera: &OutlineCamera,
        verts: &[Vec3],
        used_verts: &[bool],
        edges: &[[usize; 2]],
        splat_outline: bool,
    ) -> Option<(PixelBBox, f32)> {
        debug_assert_eq!(verts.len(), used_verts.len());
        let n = verts.len();
        self.out_cam.clear();
        self.out_cam.resize(n, Vec3::ZERO);
        self.out_xa.clear();
        self.out_xa.resize(n, 0);
        self.out_ya.clear();
        self.out_ya.resize(n, 0);

        // max_depth covers every vertex, used or not: unused verts still
        // bound the object's depth extent.
        let mut max_depth = -1.0f32;
        let mut bbox = PixelBBox {
            minx: i32::MAX,
            miny: i32::MAX,
            maxx: i32::MIN,
            maxy: i32::MIN,
        };
        let mut need_splatting = false;

        for i in 0..n {
            let cam = camera.to_camera(verts[i]);
            self.out_cam[i] = cam;
            if cam.z > max_depth {
                max_depth = cam.z;
            }
            if used_verts[i] {
                let p = if cam.z <= NEAR_Z {
                    if !splat_outline {
                        return None;
                    }
                    need_splatting = true;
                    camera.project_near(cam)
                } else {
                    camera.project(cam)
                };
                let xi = round_i32(p.x);
                let yi = round_i32(p.y);
                self.out_xa[i] = xi;
                self.out_ya[i] = yi;
                bbox.minx = bbox.minx.min(xi);
                bbox.maxx = bbox.maxx.max(xi);
                bbox.miny = bbox.miny.min(yi);
                bbox.maxy = bbox.maxy.max(yi);
            }
        }

        if bbox.maxx <= 0 || bbox.maxy <= 0 || bbox.minx >= self.width || bbox.miny >= self.height
        {
            return None;
        }

        self.reset_dirty();

        if need_splatting {
            for &[a, b] in edges {
                debug_assert!(used_verts[a] && used_verts[b]);
                let ca = self.out_cam[a];
                let cb = self.out_cam[b];
                if (ca.z <= NEAR_Z_MARGIN) != (cb.z <= NEAR_Z_MARGIN) {
                    // Split the edge where it crosses the near plane and draw
                    // both halves.
                    let isect = z_plane_intersect(ca, cb, NEAR_Z);
                    let p = camera.project_near(isect);
                    let ix = round_i32(p.x);
                    let iy = round_i32(p.y);
                    let (xa, ya) = (self.out_xa[a], self.out_ya[a]);
                    let (xb, yb) = (self.out_xa[b], self.out_ya[b]);
                    self.draw_outline_edge(xa, ya, ix, iy);
                    self.draw_outline_edge(ix, iy, xb, yb);
                } else {
                    let (xa, ya) = (self.out_xa[a], self.out_ya[a]);
                    let (xb, yb) = (self.out_xa[b], self.out_ya[b]);
                    self.draw_outline_edge(xa, ya, xb, yb);
                }
            }
        } else {
            for &[a, b] in edges {
                debug_assert!(used_verts[a] && used_verts[b]);
                let (xa, ya) = (self.out_xa[a], self.out_ya[a]);
                let (xb, yb) = (self.out_xa[b], self.out_ya[b]);
                self.draw_outline_edge(xa, ya, xb, yb);
            }
        }

        Some((bbox, max_depth))
    }

    fn draw_outline_edge(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        if y1 == y2 {
            return;
        }
        if y1 < y2 {
            self.draw_line(x1, y1, x2, y2, 0);
        } else {
            self.draw_line(x2, y2, x1, y1, 0);
        }
    }

    /// Clamp and round a rectangle to tile/sub-tile ranges for the rectangle
    /// tests. Returns None when the rectangle cannot touch the viewport.
    pub fn prepare_test_rectangle(&self, min: Vec2, max: Vec2) -> Option<TestRectData> {
        let maxx = if max.x > RECT_COORD_LIMIT {
            RECT_COORD_LIMIT as i32
        } else {
            if max.x <= 0.0 {
                return None;
            }
            round_i32(max.x)
        };
        let maxy = if max.y > RECT_COORD_LIMIT {
            RECT_COORD_LIMIT as i32
        } else {
            if max.y <= 0.0 {
                return None;
            }
            round_i32(max.y)
        };
        let minx = if min.x < -RECT_COORD_LIMIT {
            -(RECT_COORD_LIMIT as i32)
        } else {
            if min.x > RECT_COORD_LIMIT {
                return None;
            }
            let v = round_i32(min.x);
            if v >= self.width {
                return None;
            }
            v
        };
        let miny = if min.y < -RECT_COORD_LIMIT {
            -(RECT_COORD_LIMIT as i32)
        } else {
            if min.y > RECT_COORD_LIMIT {
                return None;
            }
            let v = round_i32(min.y);
            if v >= self.height {
                return None;
            }
            v
        };

        let miny = miny.max(0);
        let start_row = miny >> SHIFT_TILE_ROW;
        let maxy = maxy.min(self.height - 1);
        let end_row = maxy >> SHIFT_TILE_ROW;
        let minx = minx.max(0);
        let start_col = minx >> SHIFT_TILE_COL;
        let maxx = maxx.min(self.width - 1);
        let end_col = maxx >> SHIFT_TILE_COL;

        Some(TestRectData {
            miny,
            maxy,
            start_row,
            end_row,
            start_col,
            end_col,
            start_x: minx & COL_MASK,
            end_x: maxx & COL_MASK,
        })
    }

    /// Row mask for rectangle rows only partially inside a boundary tile row.
    fn rect_vermask(&self, data: &TestRectData, row: i32) -> Option<TileColumn> {
        let mut mask: Option<TileColumn> = None;
        if row == data.start_row && (data.miny & ROW_MASK) != 0 {
            mask = Some(TileColumn::span_to_bottom((data.miny & ROW_MASK) as usize));
        }
        if row == data.end_row && (data.maxy & ROW_MASK) != ROW_MASK {
            let m = TileColumn::span_from_top((data.maxy & ROW_MASK) as usize);
            mask = Some(match mask {
                Some(v) => v & m,
                None => m,
            });
        }
        mask
    }

    /// Test an axis-aligned rectangle at the given depth without
    /// rasterization: interior tiles get a full-tile test, boundary tiles a
    /// partial coverage test, then a depth-only pass over the borders.
    pub fn test_rectangle(&self, data: &TestRectData, min_depth: f32) -> bool {
        count_call!(crate::stats::CULL_COUNTERS.rect_tests);
        let mut do_depth_test = false;
        for row in data.start_row..=data.end_row {
            let vermask = self.rect_vermask(data, row);
            for col in data.start_col..=data.end_col {
                count_call!(crate::stats::CULL_COUNTERS.tiles_tested);
                let mut sx = 0;
                let mut ex = COL_MASK;
                let mut do_hor = false;
                if col == data.start_col && data.start_x != 0 {
                    sx = data.start_x;
                    do_hor = true;
                }
                if col == data.end_col && data.end_x != COL_MASK {
                    ex = data.end_x;
                    do_hor = true;
                }

                let tile = self.tile_at(col, row);
                let visible = if vermask.is_some() {
                    tile.test_coverage_rect(
                        vermask,
                        sx as usize,
                        ex as usize,
                        min_depth,
                        &mut do_depth_test,
                    )
                } else if do_hor {
                    tile.test_coverage_rect(
                        None,
                        sx as usize,
                        ex as usize,
                        min_depth,
                        &mut do_depth_test,
                    )
                } else {
                    tile.test_full_rect(min_depth)
                };
                if visible {
                    return true;
                }
            }
        }

        if !do_depth_test {
            return false;
        }

        // Depth pass over the rectangle borders.
        for row in data.start_row..=data.end_row {
            let vermask = self.rect_vermask(data, row);
            if vermask.is_some() {
                for col in data.start_col..=data.end_col {
                    let mut sx = 0;
                    let mut ex = COL_MASK;
                    let mut test = false;
                    if col == data.start_col && data.start_x != 0 {
                        sx = data.start_x;
                        test = true;
                    }
                    if col == data.end_col && data.end_x != COL_MASK {
                        ex = data.end_x;
                        test = true;
                    }
                    if test
                        && self.tile_at(col, row).test_depth_rect(
                            vermask,
                            sx as usize,
                            ex as usize,
                            min_depth,
                        )
                    {
                        return true;
                    }
                }
            } else if data.start_col == data.end_col {
                if data.start_x != 0
                    && data.end_x != COL_MASK
                    && self.tile_at(data.start_col, row).test_depth_rect(
                        None,
                        data.start_x as usize,
                        data.end_x as usize,
                        min_depth,
                    )
                {
                    return true;
                }
            } else {
                if data.start_x != 0
                    && self.tile_at(data.start_col, row).test_depth_rect(
                        None,
                        data.start_x as usize,
                        COL_MASK as usize,
                        min_depth,
                    )
                {
                    return true;
                }
                if data.end_x != COL_MASK
                    && self.tile_at(data.end_col, row).test_depth_rect(
                        None,
                        0,
                        data.end_x as usize,
                        min_depth,
                    )
                {
                    return true;
                }
            }
        }
        false
    }

    /// Cheapest rectangle test: only the per-tile full/max-depth shortcut,
    /// no coverage or block inspection. May report visible where
    /// `test_rectangle` would not.
    pub fn quick_test_rectangle(&self, data: &TestRectData, min_depth: f32) -> bool {
        count_call!(crate::stats::CULL_COUNTERS.quick_rect_tests);
        for row in data.start_row..=data.end_row {
            for col in data.start_col..=data.end_col {
                if self.tile_at(col, row).test_full_rect(min_depth) {
                    return true;
                }
            }
        }
        false
    }

    /// Test a single point; points outside the viewport are not visible.
    pub fn test_point(&self, point: Vec2, min_depth: f32) -> bool {
        count_call!(crate::stats::CULL_COUNTERS.point_tests);
        let x = round_i32(point.x);
        let y = round_i32(point.y);
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.tile_at(x >> SHIFT_TILE_COL, y >> SHIFT_TILE_ROW).test_point(
            (x & COL_MASK) as usize,
            (y & ROW_MASK) as usize,
            min_depth,
        )
    }
}

#[inline]
fn round_i32(v: f32) -> i32 {
    v.round() as i32
}

/// Liang-Barsky clip of the segment (x1,y1)-(x2,y2) to the inclusive
/// rectangle [0, xmax] x [0, ymax]. Endpoints are only written on success.
fn clip_line(x1: &mut i32, y1: &mut i32, x2: &mut i32, y2: &mut i32, xmax: i32, ymax: i32) -> bool {
    let fx1 = *x1 as f64;
    let fy1 = *y1 as f64;
    let dx = (*x2 - *x1) as f64;
    let dy = (*y2 - *y1) as f64;

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    let checks = [
        (-dx, fx1),
        (dx, xmax as f64 - fx1),
        (-dy, fy1),
        (dy, ymax as f64 - fy1),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return false;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }
    if t0 > t1 {
        return false;
    }

    let nx1 = (fx1 + t0 * dx).round() as i32;
    let ny1 = (fy1 + t0 * dy).round() as i32;
    let nx2 = (fx1 + t1 * dx).round() as i32;
    let ny2 = (fy1 + t1 * dy).round() as i32;
    *x1 = nx1.clamp(0, xmax);
    *y1 = ny1.clamp(0, ymax);
    *x2 = nx2.clamp(0, xmax);
    *y2 = ny2.clamp(0, ymax);
    true
}
