// tag_arena/server/src/core/constants.rs
use std::time::Duration;

pub const SERVER_TICK_RATE: u64 = 60;
pub const TICK_DURATION_MS: u64 = 1000 / SERVER_TICK_RATE;
pub const TICK_DURATION: Duration = Duration::from_millis(TICK_DURATION_MS);

// World constants
pub const WORLD_MIN_X: f64 = -1000.0;
pub const WORLD_MAX_X: f64 = 1000.0;
pub const WORLD_MIN_Y: f64 = -600.0;
pub const WORLD_MAX_Y: f64 = 600.0;
pub const BORDER_WALL_THICKNESS: f64 = 20.0;

// Fog-of-war rectangle, half extents around the viewer
pub const VISION_HALF_WIDTH: f64 = 480.0;
pub const VISION_HALF_HEIGHT: f64 = 270.0;

// Navigation
pub const WAYPOINT_MARGIN: f64 = 4.0;
pub const MAX_RADIUS_CLASS: u8 = 48;
pub const MIN_WAYPOINT_SPACING: f64 = 1.0;
pub const MAX_CORNER_MITER: f64 = 3.0; // multiples of radius + margin

// Character constants
pub const CHARACTER_RADIUS: f64 = 16.0;
pub const CHARACTER_MASS: f64 = 1.0;
pub const CHARACTER_MOVE_FORCE: f64 = 1800.0;
pub const CHARACTER_LINEAR_DAMPING: f64 = 6.0;
pub const READY_DELAY_MS: u64 = 3000;

// Props
pub const PROP_RADIUS: f64 = 14.0;
pub const PROP_MASS: f64 = 4.0;
pub const PROP_RESPAWN_MS: u64 = 10_000;

// Bot tuning
pub const BOT_STUCK_LIMIT_MS: u64 = 4000;
pub const BOT_ARRIVE_RADIUS: f64 = 12.0;
pub const BOT_TOO_CLOSE_RADIUS: f64 = 60.0;
pub const BOT_BLOCK_CHECK_DISTANCE: f64 = 40.0;
pub const BOT_FLEE_EXTRAPOLATION: f64 = 5.0;
pub const DEFAULT_BOT_COUNT: usize = 6;

// Performance
pub const SLOW_TICK_LOG_MS: u64 = 12;
