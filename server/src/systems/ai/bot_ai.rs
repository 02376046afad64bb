// tag_arena/server/src/systems/ai/bot_ai.rs

use ahash::{AHashMap, AHashSet};
use metrics::counter;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::VecDeque;
use tracing::{debug, trace};

use super::exploration::{choose_unblock_target, HeadingTable};
use super::path_planner::{advance_path, flee_target, is_blocked, plan_route, steering_heading};
use crate::core::config::SimConfig;
use crate::core::error::SimResult;
use crate::core::types::{Millis, PathLabel, RadiusClass, Vec2, WaypointId};
use crate::entities::agent::AgentSnapshot;
use crate::systems::debug_draw::DebugDraw;
use crate::world::obstacle_index::ObstacleSet;
use crate::world::raycast::VisionRect;
use crate::world::waypoints::NavGraph;

/// The plan a bot is currently following.
#[derive(Clone, Debug)]
pub struct BotPathState {
    pub path: VecDeque<Vec2>,
    pub label: PathLabel,
    pub started_at: Millis,
    /// Waypoints already tried during the current blockage.
    pub unblock_attempted: AHashSet<WaypointId>,
    /// Where the bot last gave up, kept for diagnostics.
    pub last_lost_at: Option<Vec2>,
}

impl BotPathState {
    fn new(now: Millis) -> Self {
        BotPathState {
            path: VecDeque::new(),
            label: PathLabel::Reset,
            started_at: now,
            unblock_attempted: AHashSet::new(),
            last_lost_at: None,
        }
    }
}

/// Everything one decision may read, borrowed from the stage for a single tick.
pub struct BotContext<'a> {
    pub me: &'a AgentSnapshot,
    pub agents: &'a [AgentSnapshot],
    pub graph: &'a NavGraph,
    pub obstacles: ObstacleSet<'a>,
    pub config: &'a SimConfig,
    pub now: Millis,
    pub debug: &'a mut DebugDraw,
    pub rng: &'a mut StdRng,
}

impl BotContext<'_> {
    fn vision(&self) -> VisionRect {
        VisionRect::from(&self.config.vision)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BotDecision {
    pub label: PathLabel,
    pub target: Option<Vec2>,
    /// Validated steering angle toward `target`.
    pub heading: Option<f64>,
}

pub struct BotBrain {
    name: String,
    state: BotPathState,
    headings: AHashMap<RadiusClass, HeadingTable>,
}

impl BotBrain {
    pub fn new(name: impl Into<String>, now: Millis) -> Self {
        BotBrain {
            name: name.into(),
            state: BotPathState::new(now),
            headings: AHashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &BotPathState {
        &self.state
    }

    pub fn label(&self) -> PathLabel {
        self.state.label
    }

    pub fn path(&self) -> &VecDeque<Vec2> {
        &self.state.path
    }

    pub fn headings(&self, class: RadiusClass) -> Option<&HeadingTable> {
        self.headings.get(&class)
    }

    /// Back to a blank plan. Heading tables survive, so visit history carries across role swaps.
    pub fn reset(&mut self, now: Millis) {
        trace!("[Bot {}]: reset", self.name);
        self.state.path.clear();
        self.state.label = PathLabel::Reset;
        self.state.started_at = now;
        self.state.unblock_attempted.clear();
    }

    /// Installs a single-point plan toward `goal`, as if exploration had chosen it.
    pub fn set_goal(&mut self, goal: Vec2, now: Millis) {
        self.set_path(PathLabel::Explore, VecDeque::from(vec![goal]), now);
    }

    /// Runs one decision tick.
    pub fn think(&mut self, ctx: &mut BotContext<'_>) -> SimResult<BotDecision> {
        let me = *ctx.me;
        let arrive = ctx.config.bots.arrive_radius;

        let table = self
            .headings
            .entry(ctx.graph.radius_class())
            .or_insert_with(|| HeadingTable::new(ctx.graph, me.position));
        table.mark_visited(ctx.graph, me.position, arrive, ctx.now);
        advance_path(&mut self.state.path, me.position, arrive);

        let enemy = self.visible_enemy(ctx);
        if let Some(enemy) = &enemy {
            ctx.debug.sightline(me.position, enemy.position);
        }

        let target = match enemy {
            Some(enemy) if me.role.is_it() => self.pursue(ctx, &enemy),
            Some(enemy) => self.evade(ctx, &enemy),
            None => self.follow_or_explore(ctx),
        };

        ctx.debug.path(me.position, self.state.path.iter().copied());

        let heading = match target {
            Some(t) => steering_heading(me.position, t)?,
            None => None,
        };
        Ok(BotDecision {
            label: self.state.label,
            target,
            heading,
        })
    }

    /// Drops the plan and records where it happened. Retried on the next tick.
    pub fn mark_lost(&mut self, position: Vec2, radius: f64, now: Millis, debug: &mut DebugDraw, reason: &str) {
        debug!("[Bot {}]: lost at ({:.0}, {:.0}): {}", self.name, position.x, position.y, reason);
        counter!("arena_bot_lost_total").increment(1);
        self.state.path.clear();
        self.state.label = PathLabel::Lost;
        self.state.started_at = now;
        self.state.unblock_attempted.clear();
        self.state.last_lost_at = Some(position);
        debug.lost(position, radius, reason);
    }

    fn lose(&mut self, ctx: &mut BotContext<'_>, reason: &str) -> Option<Vec2> {
        self.mark_lost(ctx.me.position, ctx.me.radius, ctx.now, ctx.debug, reason);
        None
    }

    /// Pursuit and flight keep their clock while they continue, so a long chase or a
    /// long flight eventually counts as stuck. Every other plan starts a fresh clock.
    fn set_path(&mut self, label: PathLabel, path: VecDeque<Vec2>, now: Millis) {
        let continuing = self.state.label == label && matches!(label, PathLabel::Pursue | PathLabel::Flee);
        if !continuing {
            self.state.started_at = now;
        }
        if self.state.label != label {
            trace!("[Bot {}]: {:?} -> {:?}", self.name, self.state.label, label);
        }
        self.state.label = label;
        self.state.path = path;
    }

    fn is_bored(&self, me: &AgentSnapshot, ctx: &BotContext<'_>) -> bool {
        let stuck = ctx.now.saturating_sub(self.state.started_at) > ctx.config.bots.stuck_limit_ms;
        let confused = self.state.path.is_empty();
        let arriving = self
            .state
            .path
            .front()
            .map_or(false, |p| p.distance(me.position) <= ctx.config.bots.arrive_radius);
        stuck || confused || arriving
    }

    /// Nearest eligible opponent that the bot can actually see.
    fn visible_enemy(&self, ctx: &BotContext<'_>) -> Option<AgentSnapshot> {
        let me = ctx.me;
        let vision = ctx.vision();
        let mut enemies: Vec<&AgentSnapshot> = ctx
            .agents
            .iter()
            .filter(|a| a.id != me.id && a.role != me.role)
            .filter(|a| !me.role.is_it() || a.ready)
            .collect();
        enemies.sort_by(|a, b| {
            a.position
                .distance_sq(me.position)
                .total_cmp(&b.position.distance_sq(me.position))
        });
        enemies
            .into_iter()
            .find(|e| {
                vision.contains(me.position, e.position)
                    && ctx.obstacles.circle_shown(me.position, me.radius, e.position, e.radius)
            })
            .copied()
    }

    fn pursue(&mut self, ctx: &mut BotContext<'_>, enemy: &AgentSnapshot) -> Option<Vec2> {
        self.state.unblock_attempted.clear();
        self.set_path(PathLabel::Pursue, VecDeque::from(vec![enemy.position]), ctx.now);
        Some(enemy.position)
    }

    fn evade(&mut self, ctx: &mut BotContext<'_>, enemy: &AgentSnapshot) -> Option<Vec2> {
        let me = *ctx.me;
        let config = ctx.config;
        let bots = &config.bots;
        let blocked = is_blocked(&ctx.obstacles, me.position, me.radius, enemy.position, bots.block_check_distance);

        if blocked && self.is_bored(&me, ctx) {
            return self.unblock(ctx, enemy);
        }
        if self.state.label != PathLabel::Unblock {
            let target = flee_target(
                me.position,
                enemy.position,
                enemy.velocity,
                config.tick_seconds(),
                bots.flee_extrapolation,
            );
            self.set_path(PathLabel::Flee, VecDeque::from(vec![target]), ctx.now);
            return Some(target);
        }
        self.follow_or_explore(ctx)
    }

    fn unblock(&mut self, ctx: &mut BotContext<'_>, enemy: &AgentSnapshot) -> Option<Vec2> {
        let picked = choose_unblock_target(
            ctx.graph,
            ctx.me,
            enemy.position,
            ctx.config.bots.too_close_radius,
            &mut self.state.unblock_attempted,
            &ctx.obstacles,
        );
        match picked {
            Some(id) => {
                let escape = ctx.graph.position(id);
                debug!("[Bot {}]: unblocking via waypoint {}", self.name, id);
                self.set_path(PathLabel::Unblock, VecDeque::from(vec![escape]), ctx.now);
                Some(escape)
            }
            None => self.lose(ctx, "no unblock candidates left"),
        }
    }

    fn follow_or_explore(&mut self, ctx: &mut BotContext<'_>) -> Option<Vec2> {
        let me = *ctx.me;
        if self.is_bored(&me, ctx) {
            return self.explore(ctx);
        }
        let head = *self.state.path.front()?;
        if ctx.obstacles.corridor_clear(me.position, head, me.radius) {
            return Some(head);
        }

        let goal = *self.state.path.back()?;
        match plan_route(ctx.graph, me.position, me.radius, goal, &ctx.obstacles) {
            Some(route) => {
                trace!("[Bot {}]: re-derived route with {} points", self.name, route.len());
                self.state.path = route;
                self.state.path.front().copied()
            }
            None => self.lose(ctx, "goal unreachable"),
        }
    }

    fn explore(&mut self, ctx: &mut BotContext<'_>) -> Option<Vec2> {
        let me = *ctx.me;
        self.state.unblock_attempted.clear();

        let vision = ctx.vision();
        let choice = self
            .headings
            .get_mut(&ctx.graph.radius_class())
            .and_then(|table| table.choose_explore_target(ctx.graph, &me, ctx.agents, &ctx.obstacles, vision));

        if let Some(choice) = choice {
            if let Some(route) = plan_route(ctx.graph, me.position, me.radius, choice.position, &ctx.obstacles) {
                ctx.debug.exploration(me.position, choice.position, choice.tight);
                self.set_path(PathLabel::Explore, route, ctx.now);
                return self.state.path.front().copied();
            }
        }

        // Nothing worth looking at nearby: wander toward a random waypoint instead.
        if !ctx.graph.is_empty() {
            let pick = ctx.rng.gen_range(0..ctx.graph.len());
            let goal = ctx.graph.position(pick);
            if let Some(route) = plan_route(ctx.graph, me.position, me.radius, goal, &ctx.obstacles) {
                trace!("[Bot {}]: wandering toward waypoint {}", self.name, pick);
                self.set_path(PathLabel::Explore, route, ctx.now);
                return self.state.path.front().copied();
            }
        }
        self.lose(ctx, "nowhere to explore")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AgentId, BodyHandle, ObstacleId, Role};
    use crate::world::obstacle::{BodyRef, Obstacle};
    use crate::world::obstacle_index::ObstacleIndex;
    use rand::SeedableRng;

    fn snapshot(id: u32, position: Vec2, role: Role) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId(id),
            body: BodyHandle(id),
            position,
            velocity: Vec2::ZERO,
            radius: 16.0,
            role,
            ready: true,
        }
    }

    struct Fixture {
        walls: ObstacleIndex,
        graph: NavGraph,
        config: SimConfig,
        debug: DebugDraw,
        rng: StdRng,
    }

    impl Fixture {
        fn new(walls: Vec<Obstacle>, waypoints: Vec<Vec2>) -> Self {
            let walls = ObstacleIndex::new(walls);
            let graph = NavGraph::from_positions(RadiusClass(16), waypoints, &walls).unwrap();
            Fixture {
                walls,
                graph,
                config: SimConfig::default(),
                debug: DebugDraw::default(),
                rng: StdRng::seed_from_u64(1),
            }
        }

        fn think(&mut self, brain: &mut BotBrain, me: &AgentSnapshot, agents: &[AgentSnapshot], now: Millis) -> BotDecision {
            let mut ctx = BotContext {
                me,
                agents,
                graph: &self.graph,
                obstacles: ObstacleSet::walls_only(&self.walls),
                config: &self.config,
                now,
                debug: &mut self.debug,
                rng: &mut self.rng,
            };
            brain.think(&mut ctx).unwrap()
        }
    }

    #[test]
    fn it_bot_pursues_visible_enemy() {
        let mut fx = Fixture::new(Vec::new(), vec![Vec2::new(0.0, 100.0)]);
        let me = snapshot(0, Vec2::ZERO, Role::It);
        let enemy = snapshot(1, Vec2::new(200.0, 0.0), Role::NotIt);
        let mut brain = BotBrain::new("hunter", 0);

        let decision = fx.think(&mut brain, &me, &[me, enemy], 16);
        assert_eq!(decision.label, PathLabel::Pursue);
        assert_eq!(brain.path().iter().copied().collect::<Vec<_>>(), vec![enemy.position]);
        assert!(decision.heading.unwrap().abs() < 1e-9);
    }

    #[test]
    fn it_bot_ignores_unready_targets() {
        let mut fx = Fixture::new(Vec::new(), vec![Vec2::new(0.0, 100.0)]);
        let me = snapshot(0, Vec2::ZERO, Role::It);
        let mut ghost = snapshot(1, Vec2::new(200.0, 0.0), Role::NotIt);
        ghost.ready = false;
        let mut brain = BotBrain::new("hunter", 0);
        let decision = fx.think(&mut brain, &me, &[me, ghost], 16);
        assert_eq!(decision.label, PathLabel::Explore);
    }

    #[test]
    fn runner_flees_away_from_predicted_enemy() {
        let mut fx = Fixture::new(Vec::new(), vec![Vec2::new(0.0, 100.0)]);
        let me = snapshot(0, Vec2::ZERO, Role::NotIt);
        let mut it = snapshot(1, Vec2::new(100.0, 0.0), Role::It);
        it.velocity = Vec2::new(-60.0, 0.0);
        let mut brain = BotBrain::new("runner", 0);

        let decision = fx.think(&mut brain, &me, &[me, it], 16);
        assert_eq!(decision.label, PathLabel::Flee);
        let target = decision.target.unwrap();
        assert!(target.x < 0.0);
        assert!(target.y.abs() < 1e-9);
    }

    #[test]
    fn cornered_runner_unblocks_once_bored() {
        let wall = Obstacle::rect(BodyRef::Wall(ObstacleId(0)), -40.0, -300.0, 10.0, 600.0);
        let mut fx = Fixture::new(vec![wall], vec![Vec2::new(0.0, 200.0), Vec2::new(0.0, -200.0), Vec2::new(150.0, 0.0)]);
        let me = snapshot(0, Vec2::ZERO, Role::NotIt);
        let it = snapshot(1, Vec2::new(250.0, 0.0), Role::It);
        let mut brain = BotBrain::new("cornered", 0);

        // Fresh brain has an empty path, so it is bored right away.
        let decision = fx.think(&mut brain, &me, &[me, it], 16);
        assert_eq!(decision.label, PathLabel::Unblock);
        assert_eq!(brain.state().unblock_attempted.len(), 1);
        let escape = decision.target.unwrap();
        assert!(escape.y.abs() > 100.0);
    }

    #[test]
    fn reset_keeps_visit_history() {
        let mut fx = Fixture::new(Vec::new(), vec![Vec2::ZERO, Vec2::new(300.0, 0.0)]);
        let me = snapshot(0, Vec2::ZERO, Role::It);
        let mut brain = BotBrain::new("memory", 0);
        fx.think(&mut brain, &me, &[me], 100);

        let class = RadiusClass(16);
        let before = brain.headings(class).map(|t| (t.explored_count(), t.get(0).map(|h| h.last_visited_time)));
        assert_eq!(before, Some((1, Some(100))));

        brain.reset(200);
        assert_eq!(brain.label(), PathLabel::Reset);
        assert!(brain.path().is_empty());
        let after = brain.headings(class).map(|t| (t.explored_count(), t.get(0).map(|h| h.last_visited_time)));
        assert_eq!(after, before);
    }

    #[test]
    fn unreachable_goal_goes_lost_without_error() {
        // Goal sealed inside a box.
        let walls = vec![
            Obstacle::rect(BodyRef::Wall(ObstacleId(0)), 280.0, -60.0, 140.0, 20.0),
            Obstacle::rect(BodyRef::Wall(ObstacleId(1)), 280.0, 40.0, 140.0, 20.0),
            Obstacle::rect(BodyRef::Wall(ObstacleId(2)), 280.0, -60.0, 20.0, 120.0),
            Obstacle::rect(BodyRef::Wall(ObstacleId(3)), 400.0, -60.0, 20.0, 120.0),
        ];
        let mut fx = Fixture::new(walls, vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 200.0)]);
        let me = snapshot(0, Vec2::new(0.0, 0.0), Role::It);
        let mut brain = BotBrain::new("lost", 0);
        brain.set_goal(Vec2::new(350.0, 0.0), 0);

        let decision = fx.think(&mut brain, &me, &[me], 16);
        assert_eq!(decision.label, PathLabel::Lost);
        assert!(decision.target.is_none());
        assert!(brain.path().is_empty());
        assert_eq!(brain.state().last_lost_at, Some(me.position));

        // Next tick re-evaluates from scratch.
        let again = fx.think(&mut brain, &me, &[me], 32);
        assert_ne!(again.label, PathLabel::Reset);
    }
}
