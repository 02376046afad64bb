// tag_arena/server/src/entities/agent.rs
use serde::{Deserialize, Serialize};

use crate::core::constants::{CHARACTER_RADIUS, PROP_RADIUS};
use crate::core::types::{AgentId, BodyHandle, ControlState, PropId, RadiusClass, Role, Vec2};
use crate::systems::ai::bot_ai::BotBrain;
use crate::world::obstacle::{BodyRef, Obstacle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Player,
    Bot,
}

/// Creation parameters for [`Stage::add_agent`](crate::server::instance::Stage::add_agent).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: Option<String>,
    pub position: Vec2,
    pub radius: f64,
    pub role: Role,
    pub kind: AgentKind,
    pub protected: bool,
}

impl AgentSpec {
    pub fn bot(position: Vec2) -> Self {
        AgentSpec {
            name: None,
            position,
            radius: CHARACTER_RADIUS,
            role: Role::NotIt,
            kind: AgentKind::Bot,
            protected: false,
        }
    }

    pub fn player(position: Vec2) -> Self {
        AgentSpec {
            kind: AgentKind::Player,
            ..Self::bot(position)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn it(mut self) -> Self {
        self.role = Role::It;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }
}

/// How an agent decides where to go: network input or its own brain.
pub enum Controller {
    Player(ControlState),
    Bot(Box<BotBrain>),
}

pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub body: BodyHandle,
    pub radius: f64,
    pub radius_class: RadiusClass,
    pub role: Role,
    /// False during the ghost window after losing "it"; such agents cannot be tagged.
    pub ready: bool,
    pub protected: bool,
    pub controller: Controller,
}

impl Agent {
    pub fn kind(&self) -> AgentKind {
        match self.controller {
            Controller::Player(_) => AgentKind::Player,
            Controller::Bot(_) => AgentKind::Bot,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.controller, Controller::Bot(_))
    }

    pub fn controls(&self) -> ControlState {
        match &self.controller {
            Controller::Player(c) => *c,
            Controller::Bot(_) => ControlState::default(),
        }
    }

    pub fn brain(&self) -> Option<&BotBrain> {
        match &self.controller {
            Controller::Bot(brain) => Some(&**brain),
            Controller::Player(_) => None,
        }
    }

    pub fn brain_mut(&mut self) -> Option<&mut BotBrain> {
        match &mut self.controller {
            Controller::Bot(brain) => Some(&mut **brain),
            Controller::Player(_) => None,
        }
    }

    pub fn snapshot(&self, position: Vec2, velocity: Vec2) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            body: self.body,
            position,
            velocity,
            radius: self.radius,
            role: self.role,
            ready: self.ready,
        }
    }
}

/// Read-only view of one agent for the current tick, taken after physics has moved bodies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub body: BodyHandle,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f64,
    pub role: Role,
    pub ready: bool,
}

/// A destructible, pushable circle. `body` is `None` while waiting to respawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Prop {
    pub id: PropId,
    pub spawn: Vec2,
    pub radius: f64,
    pub body: Option<BodyHandle>,
}

impl Prop {
    pub fn new(id: PropId, spawn: Vec2) -> Self {
        Prop {
            id,
            spawn,
            radius: PROP_RADIUS,
            body: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.body.is_some()
    }

    pub fn obstacle_at(&self, position: Vec2) -> Obstacle {
        Obstacle::circle(BodyRef::Prop(self.id), position, self.radius)
    }
}
