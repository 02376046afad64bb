// tag_arena/server/src/server/game_loop.rs
use metrics::{counter, histogram};
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::instance::Stage;
use crate::core::constants::SLOW_TICK_LOG_MS;
use crate::core::error::{SimError, SimResult};
use crate::core::types::{AgentId, PathLabel, PropId, Role, Vec2};
use crate::entities::agent::Controller;
use crate::systems::ai::bot_ai::BotContext;
use crate::systems::physics::collision::{resolve_contacts, ContactOutcome, ContactState};
use crate::systems::timers::TimerEffect;
use crate::world::obstacle_index::ObstacleSet;

/// What happened during one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    pub frame: u64,
    pub now_ms: u64,
    /// (tagger, tagged)
    pub tags: Vec<(AgentId, AgentId)>,
    pub smashed: Vec<PropId>,
    pub lost: Vec<AgentId>,
    pub decision_errors: usize,
}

impl Stage {
    /// Advances the world by `dt` seconds: physics, contact rules, timers, then one decision
    /// per agent whose force lands on the next physics step.
    pub fn step(&mut self, dt: f64) -> SimResult<StepReport> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::Config(format!("step dt must be positive, got {}", dt)));
        }
        let tick_start = Instant::now();

        self.debug.clear();
        self.frame += 1;
        self.now_ms += (dt * 1000.0).round() as u64;
        let mut report = StepReport {
            frame: self.frame,
            now_ms: self.now_ms,
            ..Default::default()
        };

        let events = self.physics.step(dt);
        let outcomes = resolve_contacts(
            &events,
            |body| self.bodies.get(&body).copied(),
            |id| {
                self.agent(id).ok().map(|a| ContactState {
                    role: a.role,
                    ready: a.ready,
                    select: a.controls().select,
                })
            },
        );
        for outcome in outcomes {
            match outcome {
                ContactOutcome::Tag { tagger, tagged } => {
                    self.apply_tag(tagger, tagged)?;
                    report.tags.push((tagger, tagged));
                }
                ContactOutcome::SmashProp { by, prop } => {
                    if self.smash_prop(prop) {
                        debug!("{} smashed {}", by, prop);
                        report.smashed.push(prop);
                    }
                }
            }
        }

        for effect in self.timers.poll(self.now_ms) {
            self.apply_timer(effect);
        }
        self.ensure_it();
        self.rebuild_prop_obstacles();
        self.act(&mut report);

        let elapsed = tick_start.elapsed();
        counter!("arena_ticks_total").increment(1);
        histogram!("arena_tick_seconds").record(elapsed.as_secs_f64());
        if elapsed > Duration::from_millis(SLOW_TICK_LOG_MS) {
            warn!("Frame {} took {:?}", self.frame, elapsed);
        }
        Ok(report)
    }

    /// Drives `step` at the configured tick rate until `max_ticks` steps have run.
    pub async fn run(&mut self, max_ticks: Option<u64>) -> SimResult<u64> {
        let tick = Duration::from_millis(self.config.tick_millis());
        let dt = self.config.tick_seconds();
        let summary_every = (self.config.tick_rate * 10).max(1);
        let mut tick_timer = interval(tick);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Game loop started. Tick rate: {}ms, Delta time: {}s", tick.as_millis(), dt);
        let mut ticks = 0;
        while max_ticks.map_or(true, |limit| ticks < limit) {
            tick_timer.tick().await;
            let report = self.step(dt)?;
            ticks += 1;
            if report.frame % summary_every == 0 {
                info!(
                    "Frame {}: {} agents, {} tags, {} lost, {} pending timers",
                    report.frame,
                    self.agent_count(),
                    report.tags.len(),
                    report.lost.len(),
                    self.pending_timers()
                );
            }
        }
        info!("Game loop stopped after {} ticks", ticks);
        Ok(ticks)
    }

    fn apply_tag(&mut self, tagger: AgentId, tagged: AgentId) -> SimResult<()> {
        let now = self.now_ms;
        let ready_at = now + self.config.rules.ready_delay_ms;

        let it = self.agent_mut(tagger)?;
        it.role = Role::NotIt;
        it.ready = false;
        if let Some(brain) = it.brain_mut() {
            brain.reset(now);
        }
        let target = self.agent_mut(tagged)?;
        target.role = Role::It;
        if let Some(brain) = target.brain_mut() {
            brain.reset(now);
        }

        self.timers.schedule(ready_at, TimerEffect::BecomeReady(tagger));
        counter!("arena_tags_total").increment(1);
        info!("{} tagged {}", tagger, tagged);
        Ok(())
    }

    fn smash_prop(&mut self, id: PropId) -> bool {
        let Some(body) = self.props.get_mut(id.index()).and_then(|p| p.body.take()) else {
            return false;
        };
        self.physics.destroy_body(body);
        self.bodies.remove(&body);
        self.timers
            .schedule(self.now_ms + self.config.rules.prop_respawn_ms, TimerEffect::RespawnProp(id));
        counter!("arena_props_smashed_total").increment(1);
        true
    }

    fn apply_timer(&mut self, effect: TimerEffect) {
        match effect {
            TimerEffect::BecomeReady(id) => {
                if let Ok(agent) = self.agent_mut(id) {
                    agent.ready = true;
                    debug!("[{}]: ready", agent.name);
                }
            }
            TimerEffect::RespawnProp(id) => {
                let Some(prop) = self.props.get(id.index()).filter(|p| !p.is_alive()).cloned() else {
                    return;
                };
                let body = self.create_prop_body(&prop);
                if let Some(slot) = self.props.get_mut(id.index()) {
                    slot.body = Some(body);
                }
            }
        }
    }

    /// A round always has an "it" while anyone is ready to take the role.
    fn ensure_it(&mut self) {
        if self.agents().any(|a| a.role.is_it()) {
            return;
        }
        let now = self.now_ms;
        if let Some(agent) = self.agents.iter_mut().flatten().find(|a| a.ready) {
            agent.role = Role::It;
            if let Some(brain) = agent.brain_mut() {
                brain.reset(now);
            }
            info!("[{}]: is now it", agent.name);
        }
    }

    fn act(&mut self, report: &mut StepReport) {
        let snapshots = self.snapshots();
        let Stage {
            agents,
            nav_graphs,
            walls,
            prop_obstacles,
            physics,
            config,
            debug,
            rng,
            now_ms,
            ..
        } = self;
        let obstacles = ObstacleSet::new(walls, prop_obstacles);
        let move_force = config.rules.move_force;

        for me in &snapshots {
            let Some(agent) = agents.get_mut(me.id.index()).and_then(Option::as_mut) else {
                continue;
            };
            let force = match &mut agent.controller {
                Controller::Player(controls) => controls.direction().normalize() * move_force,
                Controller::Bot(brain) => {
                    let Some(graph) = nav_graphs.get(&agent.radius_class) else {
                        warn!("[{}]: no nav graph for {}", agent.name, agent.radius_class);
                        continue;
                    };
                    let mut ctx = BotContext {
                        me,
                        agents: &snapshots,
                        graph,
                        obstacles,
                        config: &*config,
                        now: *now_ms,
                        debug: &mut *debug,
                        rng: &mut *rng,
                    };
                    match brain.think(&mut ctx) {
                        Ok(decision) => {
                            if decision.label == PathLabel::Lost {
                                report.lost.push(me.id);
                            }
                            decision
                                .heading
                                .map_or(Vec2::ZERO, |heading| Vec2::from_angle(heading) * move_force)
                        }
                        Err(e) => {
                            warn!("[{}]: decision failed: {}", agent.name, e);
                            counter!("arena_bot_decision_errors_total").increment(1);
                            brain.mark_lost(me.position, me.radius, *now_ms, debug, &e.to_string());
                            report.decision_errors += 1;
                            report.lost.push(me.id);
                            Vec2::ZERO
                        }
                    }
                }
            };
            if force != Vec2::ZERO {
                physics.apply_force(agent.body, force);
            }
        }
    }
}
