// tag_arena/server/src/server/mod.rs
pub mod game_loop;
pub mod instance;

pub use game_loop::StepReport;
pub use instance::Stage;
