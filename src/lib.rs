/// Tilecull - hierarchical software coverage buffer for occlusion culling
///
/// The viewport is partitioned into 32x64-pixel tiles, each holding one
/// coverage bit per pixel plus a conservative depth per 8x8 block. Occluder
/// polygons and object silhouettes are inserted front to back; candidate
/// polygons, rectangles, and points can then be tested for visibility without
/// touching a full-resolution depth buffer.
pub mod buffer;
pub mod column;
pub mod dump;
pub mod error;
pub mod fixed;
pub mod outline;
pub mod stats;
pub mod tile;

pub use buffer::{TestRectData, TiledCoverageBuffer};
pub use column::{TileColumn, TILE_HEIGHT};
pub use error::{CoverageBufferError, MAX_DIMENSION};
pub use fixed::Fixed16;
pub use outline::{OutlineCamera, NEAR_Z};
pub use stats::{CullCounterSnapshot, CullCounters, CULL_COUNTERS};
pub use tile::{CoverageTile, LineOp, TileState, DEPTH_BLOCK_SIZE, TILE_WIDTH};
