// tag_arena/server/src/entities/mod.rs
pub mod agent;

pub use agent::{Agent, AgentKind, AgentSnapshot, AgentSpec, Controller, Prop};
