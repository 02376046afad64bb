// tag_arena/server/src/systems/ai/mod.rs
pub mod bot_ai;
pub mod exploration;
pub mod path_planner;

pub use bot_ai::{BotBrain, BotContext, BotDecision, BotPathState};
