// tag_arena/server/src/server/instance.rs
use ahash::AHashMap;
use metrics::gauge;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace};

use crate::core::config::{DebugToggles, SimConfig};
use crate::core::constants::{CHARACTER_LINEAR_DAMPING, CHARACTER_MASS, PROP_MASS};
use crate::core::error::{SimError, SimResult};
use crate::core::geometry::Aabb;
use crate::core::types::{AgentId, AgentView, BodyHandle, ControlState, Millis, PropId, RadiusClass, Vec2};
use crate::entities::agent::{Agent, AgentKind, AgentSnapshot, AgentSpec, Controller, Prop};
use crate::systems::ai::bot_ai::{BotBrain, BotPathState};
use crate::systems::debug_draw::DebugDraw;
use crate::systems::physics::collision::BodyOwner;
use crate::systems::physics::{BodyDesc, BodyKind, KinematicPhysics, PhysicsEngine};
use crate::systems::timers::{TimerEffect, TimerQueue};
use crate::systems::visibility;
use crate::world::map_generator::MapLayout;
use crate::world::obstacle::Obstacle;
use crate::world::obstacle_index::ObstacleIndex;
use crate::world::raycast::VisionRect;
use crate::world::waypoints::NavGraph;

/// The world context: owns every arena the simulation touches and is passed by reference
/// into each query. Nothing here is global.
pub struct Stage {
    pub(crate) config: SimConfig,
    pub(crate) bounds: Aabb,
    pub(crate) walls: ObstacleIndex,
    pub(crate) nav_graphs: AHashMap<RadiusClass, NavGraph>,
    /// Slots are never reused, so an `AgentId` always names the same agent.
    pub(crate) agents: Vec<Option<Agent>>,
    pub(crate) props: Vec<Prop>,
    /// Rebuilt from prop body positions every step.
    pub(crate) prop_obstacles: Vec<Obstacle>,
    pub(crate) bodies: AHashMap<BodyHandle, BodyOwner>,
    pub(crate) physics: Box<dyn PhysicsEngine>,
    pub(crate) timers: TimerQueue,
    pub(crate) debug: DebugDraw,
    pub(crate) rng: StdRng,
    pub(crate) now_ms: Millis,
    pub(crate) frame: u64,
    character_spawns: Vec<Vec2>,
}

impl Stage {
    pub fn new(config: SimConfig, layout: MapLayout) -> SimResult<Self> {
        let physics = Box::new(KinematicPhysics::new(layout.walls.clone()));
        Self::with_physics(config, layout, physics)
    }

    /// Builds the stage around a caller-supplied physics engine. Navigation graphs for the
    /// configured radius classes are built here; a broken graph aborts construction.
    pub fn with_physics(config: SimConfig, layout: MapLayout, physics: Box<dyn PhysicsEngine>) -> SimResult<Self> {
        config.validate()?;
        let MapLayout {
            bounds,
            walls,
            prop_spawns,
            character_spawns,
        } = layout;

        let mut stage = Stage {
            rng: StdRng::seed_from_u64(config.seed),
            debug: DebugDraw::new(config.debug.clone()),
            bounds,
            walls: ObstacleIndex::new(walls),
            nav_graphs: AHashMap::new(),
            agents: Vec::new(),
            props: Vec::new(),
            prop_obstacles: Vec::new(),
            bodies: AHashMap::new(),
            physics,
            timers: TimerQueue::new(),
            now_ms: 0,
            frame: 0,
            character_spawns,
            config,
        };

        let classes: Vec<RadiusClass> = stage
            .config
            .nav
            .radius_classes
            .iter()
            .map(|c| stage.config.radius_class(*c as f64))
            .collect();
        for class in classes {
            stage.ensure_nav_graph(class)?;
        }
        for spawn in prop_spawns {
            stage.spawn_prop(spawn);
        }
        stage.rebuild_prop_obstacles();

        info!(
            "Stage ready: {} walls, {} props, nav graphs {:?}",
            stage.walls.len(),
            stage.props.len(),
            stage.nav_graphs.keys().collect::<Vec<_>>()
        );
        Ok(stage)
    }

    /// Builds the graph for `class` on first use.
    pub fn ensure_nav_graph(&mut self, class: RadiusClass) -> SimResult<&NavGraph> {
        if !self.nav_graphs.contains_key(&class) {
            let graph = NavGraph::build(class, self.bounds, &self.walls, &self.config.nav, &self.config.vision)?;
            self.nav_graphs.insert(class, graph);
        }
        self.nav_graphs.get(&class).ok_or(SimError::MissingNavGraph(class))
    }

    pub fn nav_graph(&self, class: RadiusClass) -> Option<&NavGraph> {
        self.nav_graphs.get(&class)
    }

    pub fn add_agent(&mut self, spec: AgentSpec) -> SimResult<AgentId> {
        if !spec.position.is_finite() || !(spec.radius > 1.0) {
            return Err(SimError::Config(format!(
                "agent needs a finite position and a radius above 1, got {:?} / {}",
                spec.position, spec.radius
            )));
        }
        let radius_class = self.config.radius_class(spec.radius);
        self.ensure_nav_graph(radius_class)?;

        let id = AgentId(self.agents.len() as u32);
        let name = spec.name.clone().unwrap_or_else(|| format!("agent-{}", id.0));
        let body = self.physics.create_body(BodyDesc {
            kind: BodyKind::Character,
            position: spec.position,
            radius: spec.radius,
            mass: CHARACTER_MASS,
            linear_damping: CHARACTER_LINEAR_DAMPING,
        });
        self.bodies.insert(body, BodyOwner::Agent(id));

        let controller = match spec.kind {
            AgentKind::Player => Controller::Player(ControlState::default()),
            AgentKind::Bot => Controller::Bot(Box::new(BotBrain::new(name.clone(), self.now_ms))),
        };
        info!("[{}]: joined as {:?} ({:?}, {})", name, spec.kind, spec.role, radius_class);
        self.agents.push(Some(Agent {
            id,
            name,
            body,
            radius: spec.radius,
            radius_class,
            role: spec.role,
            ready: true,
            protected: spec.protected,
            controller,
        }));
        gauge!("arena_agents").set(self.agent_count() as f64);
        Ok(id)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> SimResult<()> {
        let agent = self.agent(id)?;
        if agent.protected {
            return Err(SimError::ProtectedAgent(id));
        }
        if let Some(agent) = self.agents.get_mut(id.index()).and_then(Option::take) {
            self.physics.destroy_body(agent.body);
            self.bodies.remove(&agent.body);
            self.timers.cancel_where(|e| *e == TimerEffect::BecomeReady(id));
            info!("[{}]: removed", agent.name);
        }
        gauge!("arena_agents").set(self.agent_count() as f64);
        Ok(())
    }

    pub fn agent(&self, id: AgentId) -> SimResult<&Agent> {
        self.agents
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(SimError::UnknownAgent(id))
    }

    pub(crate) fn agent_mut(&mut self, id: AgentId) -> SimResult<&mut Agent> {
        self.agents
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(SimError::UnknownAgent(id))
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().flatten()
    }

    pub fn agent_count(&self) -> usize {
        self.agents().count()
    }

    pub fn agent_position(&self, id: AgentId) -> SimResult<Vec2> {
        let agent = self.agent(id)?;
        self.physics.position(agent.body).ok_or(SimError::UnknownAgent(id))
    }

    /// Teleports an agent, dropping its velocity.
    pub fn set_agent_position(&mut self, id: AgentId, position: Vec2) -> SimResult<()> {
        let body = self.agent(id)?.body;
        self.physics.set_position(body, position);
        Ok(())
    }

    /// Writes one tick of network input. Bots ignore input.
    pub fn set_controls(&mut self, id: AgentId, controls: ControlState) -> SimResult<()> {
        let agent = self.agent_mut(id)?;
        match &mut agent.controller {
            Controller::Player(current) => *current = controls,
            Controller::Bot(_) => trace!("[{}]: input ignored for bot", agent.name),
        }
        Ok(())
    }

    /// Hands a bot a plan toward `goal`, as if it had chosen to explore there.
    pub fn set_bot_goal(&mut self, id: AgentId, goal: Vec2) -> SimResult<()> {
        if !goal.is_finite() {
            return Err(SimError::InvalidGoal(id, goal.x, goal.y));
        }
        let now = self.now_ms;
        let brain = self.agent_mut(id)?.brain_mut().ok_or(SimError::NotABot(id))?;
        brain.set_goal(goal, now);
        Ok(())
    }

    pub fn bot_state(&self, id: AgentId) -> SimResult<&BotPathState> {
        self.agent(id)?
            .brain()
            .map(BotBrain::state)
            .ok_or(SimError::NotABot(id))
    }

    pub fn spawn_prop(&mut self, at: Vec2) -> PropId {
        let id = PropId(self.props.len() as u32);
        let mut prop = Prop::new(id, at);
        let body = self.create_prop_body(&prop);
        prop.body = Some(body);
        self.props.push(prop);
        id
    }

    pub(crate) fn create_prop_body(&mut self, prop: &Prop) -> BodyHandle {
        let body = self.physics.create_body(BodyDesc {
            kind: BodyKind::Prop,
            position: prop.spawn,
            radius: prop.radius,
            mass: PROP_MASS,
            linear_damping: CHARACTER_LINEAR_DAMPING,
        });
        self.bodies.insert(body, BodyOwner::Prop(prop.id));
        debug!("Prop {} spawned at ({:.0}, {:.0})", prop.id, prop.spawn.x, prop.spawn.y);
        body
    }

    pub fn prop(&self, id: PropId) -> SimResult<&Prop> {
        self.props.get(id.index()).ok_or(SimError::UnknownProp(id))
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn prop_obstacles(&self) -> &[Obstacle] {
        &self.prop_obstacles
    }

    pub(crate) fn rebuild_prop_obstacles(&mut self) {
        let physics = &self.physics;
        self.prop_obstacles = self
            .props
            .iter()
            .filter_map(|p| {
                let body = p.body?;
                physics.position(body).map(|pos| p.obstacle_at(pos))
            })
            .collect();
    }

    pub(crate) fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents()
            .filter_map(|a| {
                let position = self.physics.position(a.body)?;
                let velocity = self.physics.velocity(a.body).unwrap_or(Vec2::ZERO);
                Some(a.snapshot(position, velocity))
            })
            .collect()
    }

    /// What `id` can see this tick, plus the debug overlay inside its fog rectangle.
    pub fn update(&self, id: AgentId) -> SimResult<AgentView> {
        let agent = self.agent(id)?;
        let position = self.physics.position(agent.body).ok_or(SimError::UnknownAgent(id))?;
        let vision = VisionRect::from(&self.config.vision);
        let snapshots = self.snapshots();

        let visible_shapes = visibility::visible_shapes(
            id,
            position,
            agent.radius,
            vision,
            &self.walls,
            &self.prop_obstacles,
            &snapshots,
        );
        let (debug_lines, debug_circles, debug_labels) = self.debug.within(vision.around(position));
        Ok(AgentView {
            visible_shapes,
            debug_lines,
            debug_circles,
            debug_labels,
            focus_body_id: Some(agent.body),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn set_debug_toggles(&mut self, toggles: DebugToggles) {
        self.config.debug = toggles.clone();
        self.debug.set_toggles(toggles);
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn walls(&self) -> &ObstacleIndex {
        &self.walls
    }

    pub fn character_spawns(&self) -> &[Vec2] {
        &self.character_spawns
    }

    pub fn now_ms(&self) -> Millis {
        self.now_ms
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}
