// tag_arena/server/src/systems/bots.rs

use tracing::info;

use crate::core::error::SimResult;
use crate::core::types::{AgentId, Vec2};
use crate::entities::agent::AgentSpec;
use crate::server::instance::Stage;

const BOT_NAMES: [&str; 20] = [
    "Bot_Alpha", "Bot_Bravo", "Bot_Charlie", "Bot_Delta", "Bot_Echo",
    "Bot_Foxtrot", "Bot_Golf", "Bot_Hotel", "Bot_India", "Bot_Juliet",
    "Bot_Kilo", "Bot_Lima", "Bot_Mike", "Bot_Nova", "Bot_Oscar",
    "Bot_Papa", "Bot_Quebec", "Bot_Romeo", "Bot_Sierra", "Bot_Tango",
];

/// Spawns the bot roster onto a stage.
pub struct BotManager {
    max_bots: usize,
    spawned: Vec<AgentId>,
}

impl BotManager {
    pub fn new(max_bots: usize) -> Self {
        BotManager {
            max_bots,
            spawned: Vec::new(),
        }
    }

    pub fn bot_name(index: usize) -> String {
        let base = BOT_NAMES[index % BOT_NAMES.len()];
        match index / BOT_NAMES.len() {
            0 => base.to_string(),
            round => format!("{}_{}", base, round + 1),
        }
    }

    /// Fills the roster, cycling through `spawns`. The first bot starts as "it".
    pub fn initialize_bots(&mut self, stage: &mut Stage, spawns: &[Vec2]) -> SimResult<Vec<AgentId>> {
        if spawns.is_empty() {
            return Ok(Vec::new());
        }
        let radius = stage.config().rules.character_radius;
        for i in self.spawned.len()..self.max_bots {
            let position = spawns[i % spawns.len()];
            let mut spec = AgentSpec::bot(position)
                .named(Self::bot_name(i))
                .with_radius(radius);
            if i == 0 {
                spec = spec.it();
            }
            let id = stage.add_agent(spec)?;
            self.spawned.push(id);
        }
        info!("Spawned {} bots", self.spawned.len());
        Ok(self.spawned.clone())
    }

    pub fn spawned(&self) -> &[AgentId] {
        &self.spawned
    }
}
