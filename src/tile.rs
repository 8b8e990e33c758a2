/// Coverage tile: deferred line fills, commit dispatch, and read-only tests
///
/// Key Design Principles:
/// 1. Deferred rasterization: edges are queued as `LineOp`s and only applied
///    when the tile is flushed or tested, so a shape costs one pass per tile.
/// 2. XOR scanline fill: the fill state (`fvalue`) is carried column to column
///    and tile to tile; each queued edge crossing toggles it (even-odd rule).
/// 3. State dispatch: the flush/test entry points branch on a small
///    `TileState` so the numerically dominant cases (untouched, fully
///    resolved, provably non-improving) never pay O(tile-area) work.
/// 4. Lazy frame reset: `queue_tile_empty` marks "never written this frame";
///    physical contents are only reset when a tile is first touched.
use crate::column::{TileColumn, TILE_HEIGHT};
use crate::count_call;
use crate::fixed::Fixed16;

/// Tile width in pixels (columns per tile).
pub const TILE_WIDTH: usize = 32;
/// log2 of the tile width, for screen -> tile column conversion.
pub const SHIFT_TILE_COL: usize = 5;
/// log2 of the tile height, for screen -> tile row conversion.
pub const SHIFT_TILE_ROW: usize = 6;

/// Side length of one coarse depth block in pixels.
pub const DEPTH_BLOCK_SIZE: usize = 8;
/// Depth blocks per tile horizontally.
pub const DEPTH_BLOCK_COLS: usize = TILE_WIDTH / DEPTH_BLOCK_SIZE;
/// Depth blocks per tile vertically.
pub const DEPTH_BLOCK_ROWS: usize = TILE_HEIGHT / DEPTH_BLOCK_SIZE;
/// Total depth blocks per tile, stored row-major (`by * cols + bx`).
pub const DEPTH_BLOCK_COUNT: usize = DEPTH_BLOCK_COLS * DEPTH_BLOCK_ROWS;

/// Depth value of a block never covered this frame. Finite `tile_min_depth`
/// means the scalar bound is backed by a real occluder write.
const UNWRITTEN_DEPTH: f32 = f32::INFINITY;

/// One deferred fill instruction, in tile-local coordinates.
///
/// `x` values are 16.16 fixed point; `y` values are whole rows in
/// `0..TILE_HEIGHT`. Produced by the buffer's edge walk, consumed (and
/// discarded) by the next flush or test pass.
#[derive(Copy, Clone, Debug)]
pub enum LineOp {
    /// Diagonal segment from (x1, y1) to (x2, y2), stepping `dx` per row.
    Line {
        x1: Fixed16,
        y1: i32,
        x2: Fixed16,
        y2: i32,
        dx: Fixed16,
    },
    /// Vertical segment at `x` covering rows `y1..=y2`.
    VLine { x: Fixed16, y1: i32, y2: i32 },
    /// Vertical segment at `x` covering the whole tile height.
    FullVLine { x: Fixed16 },
}

/// Reusable per-flush workspace: one XOR-accumulation column per tile column.
/// Owned by the buffer and threaded through flush/test calls so tiles share a
/// single allocation without any process-wide state.
pub struct FillScratch {
    cache: [TileColumn; TILE_WIDTH],
}

impl FillScratch {
    pub fn new() -> Self {
        Self {
            cache: [TileColumn::EMPTY; TILE_WIDTH],
        }
    }

    #[inline]
    fn clear(&mut self) {
        self.cache = [TileColumn::EMPTY; TILE_WIDTH];
    }
}

impl Default for FillScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse classification of a tile used to pick a flush/test strategy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileState {
    /// Never written this frame; contents are logically all-clear.
    Empty,
    /// Every column fully covered; only depth can still improve.
    Full,
    /// Partially covered with a trustworthy minimum depth bound.
    BoundedMinDepth,
    /// Partially covered, no useful depth shortcut.
    General,
}

/// One fixed-size screen tile of the coverage buffer.
pub struct CoverageTile {
    /// Coverage bits, one column per screen column of the tile. Stale while
    /// `queue_tile_empty` or `tile_full` is set; no reader looks at it then.
    coverage: [TileColumn; TILE_WIDTH],
    /// Conservative (maximum) occluder depth per 8x8 block, row-major.
    depth: [f32; DEPTH_BLOCK_COUNT],
    /// Lower bound over all written blocks; `UNWRITTEN_DEPTH` when none.
    tile_min_depth: f32,
    /// Upper bound over all written blocks.
    tile_max_depth: f32,
    /// Every column is full.
    tile_full: bool,
    /// Not written this frame: coverage and depth are logically unknown.
    queue_tile_empty: bool,
    /// Deferred fill instructions for the shape currently being processed.
    ops: Vec<LineOp>,
}

impl CoverageTile {
    pub fn new() -> Self {
        Self {
            coverage: [TileColumn::EMPTY; TILE_WIDTH],
            depth: [UNWRITTEN_DEPTH; DEPTH_BLOCK_COUNT],
            tile_min_depth: UNWRITTEN_DEPTH,
            tile_max_depth: 0.0,
            tile_full: false,
            queue_tile_empty: true,
            ops: Vec::new(),
        }
    }

    /// Reset for a new frame without touching the pixel arrays.
    pub fn mark_empty(&mut self) {
        self.queue_tile_empty = true;
        self.tile_full = false;
    }

    /// Discard pending operations without applying them (keeps capacity).
    #[inline]
    pub fn clear_operations(&mut self) {
        self.ops.clear();
    }

    #[inline]
    pub fn state(&self) -> TileState {
        if self.queue_tile_empty {
            TileState::Empty
        } else if self.tile_full {
            TileState::Full
        } else if self.tile_min_depth.is_finite() {
            TileState::BoundedMinDepth
        } else {
            TileState::General
        }
    }

    // ---- inspection accessors -------------------------------------------

    /// True if the pixel at tile-local (x, y) is covered.
    pub fn coverage_bit(&self, x: usize, y: usize) -> bool {
        if self.queue_tile_empty {
            false
        } else if self.tile_full {
            true
        } else {
            self.coverage[x].test_bit(y)
        }
    }

    /// Depth of the 8x8 block at block coordinates (bx, by).
    pub fn block_depth(&self, bx: usize, by: usize) -> f32 {
        if self.queue_tile_empty {
            UNWRITTEN_DEPTH
        } else {
            self.depth[by * DEPTH_BLOCK_COLS + bx]
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.tile_full
    }

    #[inline]
    pub fn is_untouched(&self) -> bool {
        self.queue_tile_empty
    }

    #[inline]
    pub fn min_depth(&self) -> f32 {
        self.tile_min_depth
    }

    #[inline]
    pub fn max_depth(&self) -> f32 {
        self.tile_max_depth
    }

    #[inline]
    pub fn pending_ops(&self) -> &[LineOp] {
        &self.ops
    }

    // ---- operation accumulation -----------------------------------------

    pub fn push_line(&mut self, x1: Fixed16, y1: i32, x2: Fixed16, y2: i32, dx: Fixed16) {
        debug_assert!((0..TILE_HEIGHT as i32).contains(&y1));
        debug_assert!((0..TILE_HEIGHT as i32).contains(&y2));
        debug_assert!(x1.raw() >= 0 && x1.raw() < (TILE_WIDTH as i32) << 16);
        self.ops.push(LineOp::Line { x1, y1, x2, y2, dx });
    }

    pub fn push_vline(&mut self, x: Fixed16, y1: i32, y2: i32) {
        debug_assert!((0..TILE_HEIGHT as i32).contains(&y1));
        debug_assert!((0..TILE_HEIGHT as i32).contains(&y2));
        debug_assert!(x.raw() >= 0 && x.raw() < (TILE_WIDTH as i32) << 16);
        self.ops.push(LineOp::VLine { x, y1, y2 });
    }

    pub fn push_full_vline(&mut self, x: Fixed16) {
        debug_assert!(x.raw() >= 0 && x.raw() < (TILE_WIDTH as i32) << 16);
        self.ops.push(LineOp::FullVLine { x });
    }

    /// Apply the pending operations into the scratch columns (queue kept).
    fn apply_ops(&self, scratch: &mut FillScratch) {
        scratch.clear();
        for op in &self.ops {
            match *op {
                LineOp::FullVLine { x } => {
                    let col = clamp_col(x.raw());
                    let c = &mut scratch.cache[col];
                    *c = !*c;
                }
                LineOp::VLine { x, y1, y2 } => {
                    let (y1, y2) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
                    let col = clamp_col(x.raw());
                    scratch.cache[col] ^= TileColumn::span(y1 as usize, y2 as usize);
                }
                LineOp::Line { x1, y1, x2, y2, dx } => {
                    let (mut x, y1, y2) = if y1 < y2 { (x1, y1, y2) } else { (x2, y2, y1) };
                    for y in y1..=y2 {
                        scratch.cache[clamp_col(x.raw())].xor_bit(y as usize);
                        x += dx;
                    }
                }
            }
        }
    }

    /// Apply only the fill-state effect of pending operations, ignoring x
    /// positions. Valid when the per-column contents cannot matter (the tile
    /// is full). Queue kept.
    fn apply_ops_fvalue_only(&self, fvalue: &mut TileColumn) {
        for op in &self.ops {
            match *op {
                LineOp::FullVLine { .. } => *fvalue = !*fvalue,
                LineOp::VLine { y1, y2, .. } | LineOp::Line { y1, y2, .. } => {
                    let (y1, y2) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
                    *fvalue ^= TileColumn::span(y1 as usize, y2 as usize);
                }
            }
        }
    }

    /// First write of the frame: make the lazy-empty state physical.
    fn first_touch(&mut self) {
        self.queue_tile_empty = false;
        self.tile_full = false;
        self.tile_min_depth = UNWRITTEN_DEPTH;
        self.tile_max_depth = 0.0;
        self.depth = [UNWRITTEN_DEPTH; DEPTH_BLOCK_COUNT];
    }

    fn recompute_depth_range(&mut self) {
        let mut min = self.depth[0];
        let mut max = self.depth[0];
        for &d in &self.depth[1..] {
            if d < min {
                min = d;
            } else if d > max {
                max = d;
            }
        }
        self.tile_min_depth = min;
        self.tile_max_depth = max;
    }

    // ---- flush (commit) dispatch ----------------------------------------

    /// Commit the pending fill into the tile. `fvalue` is the running XOR
    /// fill state carried in from the tile to the left and is advanced to the
    /// state leaving this tile. `modified` is set when coverage or depth
    /// actually changed.
    pub fn flush(
        &mut self,
        scratch: &mut FillScratch,
        fvalue: &mut TileColumn,
        max_depth: f32,
        modified: &mut bool,
    ) {
        if self.ops.is_empty() {
            if fvalue.is_full() {
                self.flush_full_fvalue(max_depth, modified);
            } else if fvalue.is_empty() {
                // Nothing crosses or covers this tile.
            } else {
                match self.state() {
                    TileState::Empty => {
                        self.flush_empty_const(*fvalue, max_depth);
                        *modified = true;
                    }
                    TileState::Full => {
                        // A constant partial fill cannot change a full tile.
                    }
                    TileState::BoundedMinDepth if max_depth <= self.tile_min_depth => {
                        self.flush_no_depth_const(*fvalue, max_depth, modified);
                    }
                    _ => self.flush_general_const(*fvalue, max_depth, modified),
                }
            }
            return;
        }

        match self.state() {
            TileState::Empty => self.flush_empty(scratch, fvalue, max_depth, modified),
            TileState::Full => self.flush_full(scratch, fvalue, max_depth, modified),
            TileState::BoundedMinDepth if max_depth <= self.tile_min_depth => {
                self.flush_no_depth(scratch, fvalue, modified);
            }
            _ => self.flush_general(scratch, fvalue, max_depth, modified),
        }
    }

    /// No pending ops and the incoming fill covers the whole tile.
    fn flush_full_fvalue(&mut self, max_depth: f32, modified: &mut bool) {
        count_call!(crate::stats::CULL_COUNTERS.flush_full_fvalue);
        if self.queue_tile_empty {
            self.queue_tile_empty = false;
            self.depth = [max_depth; DEPTH_BLOCK_COUNT];
            self.tile_min_depth = max_depth;
            self.tile_max_depth = max_depth;
            self.tile_full = true;
            *modified = true;
        } else if self.tile_full {
            if max_depth >= self.tile_max_depth {
                // Cannot improve any block.
            } else if max_depth <= self.tile_min_depth {
                self.depth = [max_depth; DEPTH_BLOCK_COUNT];
                self.tile_min_depth = max_depth;
                self.tile_max_depth = max_depth;
                *modified = true;
            } else {
                for d in &mut self.depth {
                    if max_depth < *d {
                        *d = max_depth;
                    }
                }
                self.tile_max_depth = max_depth;
                *modified = true;
            }
        } else {
            // Partially covered tile becomes full; every block ends at or
            // below max_depth.
            for d in &mut self.depth {
                if max_depth < *d {
                    *d = max_depth;
                }
            }
            if max_depth < self.tile_min_depth {
                self.tile_min_depth = max_depth;
            }
            self.tile_max_depth = max_depth;
            self.tile_full = true;
            *modified = true;
        }
    }

    /// No pending ops, constant non-trivial fill, tile untouched this frame:
    /// coverage is assigned outright and depth set where the fill lands.
    fn flush_empty_const(&mut self, fvalue: TileColumn, max_depth: f32) {
        count_call!(crate::stats::CULL_COUNTERS.flush_empty);
        self.first_touch();

        self.coverage = [fvalue; TILE_WIDTH];
        self.tile_full = fvalue.is_full();

        for by in 0..DEPTH_BLOCK_ROWS {
            if fvalue.check_byte(by) {
                for bx in 0..DEPTH_BLOCK_COLS {
                    self.depth[by * DEPTH_BLOCK_COLS + bx] = max_depth;
                }
            }
        }
        self.tile_min_depth = max_depth;
        self.tile_max_depth = max_depth;
    }

    /// No pending ops, constant fill, and `max_depth` beats the tile's whole
    /// depth range: no per-block depth raise needed, only coverage.
    fn flush_no_depth_const(&mut self, fvalue: TileColumn, max_depth: f32, modified: &mut bool) {
        count_call!(crate::stats::CULL_COUNTERS.flush_no_depth);
        let mut fulltest = TileColumn::FULL;

        if *modified {
            for col in 0..TILE_WIDTH {
                self.coverage[col] |= fvalue;
                fulltest &= self.coverage[col];
            }
        } else {
            let mut mods = TileColumn::EMPTY;
            for col in 0..TILE_WIDTH {
                mods |= fvalue.and_inverted(self.coverage[col]);
                self.coverage[col] |= fvalue;
                fulltest &= self.coverage[col];
            }
            if !mods.is_empty() {
                *modified = true;
            }
        }

        // Block rows the constant fill covers completely can have their depth
        // lowered, tightening future culling.
        let inv = !fvalue;
        let mut recheck_depth = false;
        for by in 0..DEPTH_BLOCK_ROWS {
            if !inv.check_byte(by) {
                for bx in 0..DEPTH_BLOCK_COLS {
                    let d = &mut self.depth[by * DEPTH_BLOCK_COLS + bx];
                    if max_depth < *d {
                        *d = max_depth;
                        recheck_depth = true;
                    }
                }
            }
        }
        if recheck_depth {
            *modified = true;
            self.recompute_depth_range();
        }

        self.tile_full = fulltest.is_full();
    }

    /// No pending ops, constant fill, general depth bookkeeping.
    fn flush_general_const(&mut self, fvalue: TileColumn, max_depth: f32, modified: &mut bool) {
        count_call!(crate::stats::CULL_COUNTERS.flush_general);
        let mut fulltest = TileColumn::FULL;
        // With a constant fill the "fully covers this block row" mask is just
        // the fill itself.
        let inv = !fvalue;

        for group in 0..DEPTH_BLOCK_COLS {
            let mut mods = TileColumn::EMPTY;
            for i in 0..DEPTH_BLOCK_SIZE {
                let col = group * DEPTH_BLOCK_SIZE + i;
                mods |= fvalue.and_inverted(self.coverage[col]);
                self.coverage[col] |= fvalue;
                fulltest &= self.coverage[col];
            }
            if !mods.is_empty() {
                *modified = true;
                for by in 0..DEPTH_BLOCK_ROWS {
                    let d = &mut self.depth[by * DEPTH_BLOCK_COLS + group];
                    if !inv.check_byte(by) {
                        if max_depth < *d {
                            *d = max_depth;
                        }
                    } else if mods.check_byte(by) && max_depth > *d {
                        *d = max_depth;
                    }
                }
            }
        }

        self.tile_full = fulltest.is_full();
        if max_depth < self.tile_min_depth || max_depth > self.tile_max_depth {
            self.recompute_depth_range();
        }
    }

    /// Ops pending, tile untouched this frame: coverage is assigned, not
    /// OR-ed, and depth is written wherever the sweep set bits.
    fn flush_empty(
        &mut self,
        scratch: &mut FillScratch,
        fvalue: &mut TileColumn,
        max_depth: f32,
        modified: &mut bool,
    ) {
        count_call!(crate::stats::CULL_COUNTERS.flush_empty);
        self.first_touch();
        self.apply_ops(scratch);
        self.ops.clear();

        let mut fulltest = TileColumn::FULL;
        for group in 0..DEPTH_BLOCK_COLS {
            let mut mods = TileColumn::EMPTY;
            for i in 0..DEPTH_BLOCK_SIZE {
                let col = group * DEPTH_BLOCK_SIZE + i;
                *fvalue ^= scratch.cache[col];
                self.coverage[col] = *fvalue;
                mods |= *fvalue;
                fulltest &= *fvalue;
            }
            if !mods.is_empty() {
                *modified = true;
                for by in 0..DEPTH_BLOCK_ROWS {
                    if mods.check_byte(by) {
                        self.depth[by * DEPTH_BLOCK_COLS + group] = max_depth;
                    }
                }
            }
        }

        self.tile_full = fulltest.is_full();
        self.tile_min_depth = max_depth;
        self.tile_max_depth = max_depth;
    }

    /// Ops pending, tile already full: coverage cannot change, but depth can
    /// still be lowered in blocks the new fill covers completely.
    fn flush_full(
        &mut self,
        scratch: &mut FillScratch,
        fvalue: &mut TileColumn,
        max_depth: f32,
        modified: &mut bool,
    ) {
        count_call!(crate::stats::CULL_COUNTERS.flush_full);
        if max_depth >= self.tile_max_depth {
            // No block can improve; only the fill state has to advance.
            self.apply_ops_fvalue_only(fvalue);
            self.ops.clear();
            return;
        }

        self.apply_ops(scratch);
        self.ops.clear();

        for group in 0..DEPTH_BLOCK_COLS {
            let mut fullcover = TileColumn::FULL;
            for i in 0..DEPTH_BLOCK_SIZE {
                *fvalue ^= scratch.cache[group * DEPTH_BLOCK_SIZE + i];
                fullcover &= *fvalue;
            }
            if !fullcover.is_empty() {
                let inv = !fullcover;
                for by in 0..DEPTH_BLOCK_ROWS {
                    if !inv.check_byte(by) {
                        let d = &mut self.depth[by * DEPTH_BLOCK_COLS + group];
                        if max_depth < *d {
                            *d = max_depth;
                            *modified = true;
                        }
                    }
                }
            }
        }

        if max_depth < self.tile_min_depth || max_depth > self.tile_max_depth {
            self.recompute_depth_range();
        }
    }

    /// Ops pending and `max_depth` beats the tile's minimum depth: coverage
    /// is OR-ed in, the per-block depth raise is provably unnecessary.
    fn flush_no_depth(
        &mut self,
        scratch: &mut FillScratch,
        fvalue: &mut TileColumn,
        modified: &mut bool,
    ) {
        count_call!(crate::stats::CULL_COUNTERS.flush_no_depth);
        self.apply_ops(scratch);
        self.ops.clear();

        let mut fulltest = TileColumn::FULL;
        if *modified {
            for col in 0..TILE_WIDTH {
                *fvalue ^= scratch.cache[col];
                self.coverage[col] |= *fvalue;
                fulltest &= self.coverage[col];
            }
        } else {
            let mut mods = TileColumn::EMPTY;
            for col in 0..TILE_WIDTH {
                *fvalue ^= scratch.cache[col];
                mods |= fvalue.and_inverted(self.coverage[col]);
                self.coverage[col] |= *fvalue;
                fulltest &= self.coverage[col];
            }
            if !mods.is_empty() {
                *modified = true;
            }
        }

        self.tile_full = fulltest.is_full();
    }

    /// Ops pending, general case: full per-column sweep with per-block depth
    /// raise (partial new coverage, conservative) or lower (fully new
    /// coverage, tightens future culling).
    fn flush_general(
        &mut self,
        scratch: &mut FillScratch,
        fvalue: &mut TileColumn,
        max_depth: f32,
        modified: &mut bool,
    ) {
        count_call!(crate::stats::CULL_COUNTERS.flush_general);
        self.apply_ops(scratch);
        self.ops.clear();

        let mut fulltest = TileColumn::FULL;
        for group in 0..DEPTH_BLOCK_COLS {
            let mut mods = TileColumn::EMPTY;
            let mut fullcover = TileColumn::FULL;
            for i in 0..DEPTH_BLOCK_SIZE {
                let col = group * DEPTH_BLOCK_SIZE + i;
                *fvalue ^= scratch.cache[col];
                mods |= fvalue.and_inverted(self.coverage[col]);
                fullcover &= *fvalue;
                self.coverage[col] |= *fvalue;
                fulltest &= self.coverage[col];
            }
            if !mods.is_empty() {
                *modified = true;
                let inv = !fullcover;
                for by in 0..DEPTH_BLOCK_ROWS {
                    let d = &mut self.depth[by * DEPTH_BLOCK_COLS + group];
                    if !inv.check_byte(by) {
                        if max_depth < *d {
                            *d = max_depth;
                        }
                    } else if mods.check_byte(by) && max_depth > *d {
                        *d = max_depth;
                    }
                }
            }
        }

        self.tile_full = fulltest.is_full();
        self.recompute_depth_range();
    }

    // ---- test (read-only query) dispatch --------------------------------

    /// Coverage part of a polygon visibility test. Returns true as soon as
    /// the incoming fill would set a currently-unset bit. Never writes
    /// coverage; the operation queue is kept because a later depth pass may
    /// still need it. Sets `do_depth_test` when a depth-only pass could still
    /// prove visibility.
    pub fn test_coverage_flush(
        &mut self,
        scratch: &mut FillScratch,
        fvalue: &mut TileColumn,
        min_depth: f32,
        do_depth_test: &mut bool,
    ) -> bool {
        if self.ops.is_empty() {
            if fvalue.is_empty() {
                return false;
            }
            if fvalue.is_full() {
                // Visibility depends entirely on the tile's full state, plus
                // a depth check later.
                *do_depth_test = true;
                return !self.tile_full;
            }
        }

        match self.state() {
            TileState::Empty => true,
            TileState::Full => {
                if min_depth <= self.tile_min_depth {
                    return true;
                }
                if min_depth <= self.tile_max_depth {
                    *do_depth_test = true;
                }
                self.apply_ops_fvalue_only(fvalue);
                false
            }
            _ => {
                if min_depth <= self.tile_min_depth {
                    return true;
                }
                if min_depth <= self.tile_max_depth {
                    *do_depth_test = true;
                }
                self.apply_ops(scratch);
                for col in 0..TILE_WIDTH {
                    *fvalue ^= scratch.cache[col];
                    if fvalue.test_inverted_mask(self.coverage[col]) {
                        // The fill would modify the coverage buffer here.
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Depth part of a polygon visibility test, run when the coverage pass
    /// found every touched pixel already covered. Returns true when some
    /// covered block could still be beaten by `min_depth`. Consumes the
    /// operation queue.
    pub fn test_depth_flush(
        &mut self,
        scratch: &mut FillScratch,
        fvalue: &mut TileColumn,
        min_depth: f32,
    ) -> bool {
        if self.ops.is_empty() && fvalue.is_empty() {
            return false;
        }
        if self.queue_tile_empty {
            return true;
        }

        if min_depth > self.tile_max_depth {
            self.apply_ops_fvalue_only(fvalue);
            self.ops.clear();
            return false;
        }

        self.apply_ops(scratch);
        self.ops.clear();

        for group in 0..DEPTH_BLOCK_COLS {
            let mut mods = TileColumn::EMPTY;
            for i in 0..DEPTH_BLOCK_SIZE {
                *fvalue ^= scratch.cache[group * DEPTH_BLOCK_SIZE + i];
                mods |= *fvalue;
            }
            if !mods.is_empty() {
                for by in 0..DEPTH_BLOCK_ROWS {
                    if mods.check_byte(by)
                        && min_depth <= self.depth[by * DEPTH_BLOCK_COLS + group]
                    {
                        return true;
                    }
                }
            }
        }
        false
    }

    // ---- axis-aligned fast paths ----------------------------------------

    /// Rectangle test for a tile fully interior to the rectangle.
    pub fn test_full_rect(&self, test_depth: f32) -> bool {
        if self.tile_full {
            test_depth <= self.tile_max_depth
        } else {
            // A not-full tile always leaves the rectangle potentially visible.
            true
        }
    }

    /// Coverage test over columns `start..=end`, optionally restricted to the
    /// rows of `vermask` for partial vertical overlap.
    pub fn test_coverage_rect(
        &self,
        vermask: Option<TileColumn>,
        start: usize,
        end: usize,
        test_depth: f32,
        do_depth_test: &mut bool,
    ) -> bool {
        if self.queue_tile_empty {
            return true;
        }
        if test_depth <= self.tile_min_depth {
            return true;
        }

        if !self.tile_full {
            match vermask {
                Some(mask) => {
                    for col in start..=end {
                        if mask.test_inverted_mask(self.coverage[col]) {
                            return true;
                        }
                    }
                }
                None => {
                    for col in start..=end {
                        if !self.coverage[col].is_full() {
                            return true;
                        }
                    }
                }
            }
        }

        if test_depth <= self.tile_max_depth {
            *do_depth_test = true;
        }
        false
    }

    /// Depth test over the blocks touched by columns `start..=end`, optionally
    /// restricted to the block rows of `vermask`.
    pub fn test_depth_rect(
        &self,
        vermask: Option<TileColumn>,
        start: usize,
        end: usize,
        test_depth: f32,
    ) -> bool {
        if test_depth > self.tile_max_depth {
            return false;
        }

        for group in (start / DEPTH_BLOCK_SIZE)..=(end / DEPTH_BLOCK_SIZE) {
            for by in 0..DEPTH_BLOCK_ROWS {
                let relevant = match vermask {
                    Some(mask) => mask.check_byte(by),
                    None => true,
                };
                if relevant && test_depth < self.depth[by * DEPTH_BLOCK_COLS + group] {
                    return true;
                }
            }
        }
        false
    }

    /// Single-pixel test at tile-local (x, y).
    pub fn test_point(&self, x: usize, y: usize, test_depth: f32) -> bool {
        debug_assert!(x < TILE_WIDTH);
        debug_assert!(y < TILE_HEIGHT);

        if self.queue_tile_empty {
            return true;
        }

        let bx = x / DEPTH_BLOCK_SIZE;
        let by = y / DEPTH_BLOCK_SIZE;
        if test_depth <= self.depth[by * DEPTH_BLOCK_COLS + bx] {
            // Visible regardless of coverage.
            return true;
        }

        if self.tile_full {
            return false;
        }
        !self.coverage[x].test_bit(y)
    }
}

impl Default for CoverageTile {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn clamp_col(raw_x: i32) -> usize {
    let col = raw_x >> 16;
    debug_assert!((0..TILE_WIDTH as i32).contains(&col), "column {} out of tile", col);
    col.clamp(0, TILE_WIDTH as i32 - 1) as usize
}
