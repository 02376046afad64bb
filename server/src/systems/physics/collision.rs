// tag_arena/server/src/systems/physics/collision.rs
//! Game rules driven by the contact stream: tagging and prop smashing.

use tracing::debug;

use super::{CollisionEvent, ContactPhase};
use crate::core::types::{AgentId, BodyHandle, PropId, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyOwner {
    Agent(AgentId),
    Prop(PropId),
}

/// What the rules need to know about a character at contact time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactState {
    pub role: Role,
    pub ready: bool,
    pub select: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactOutcome {
    Tag { tagger: AgentId, tagged: AgentId },
    SmashProp { by: AgentId, prop: PropId },
}

/// Interprets one step's contacts. Tags fire only on contact start, between the "it"
/// character and a ready non-"it" one; props break whenever a character holding `select`
/// touches them. Each agent takes part in at most one tag per step.
pub fn resolve_contacts(
    events: &[CollisionEvent],
    owner_of: impl Fn(BodyHandle) -> Option<BodyOwner>,
    state_of: impl Fn(AgentId) -> Option<ContactState>,
) -> Vec<ContactOutcome> {
    let mut outcomes = Vec::new();
    let mut tagged_this_step: Vec<AgentId> = Vec::new();
    let mut smashed: Vec<PropId> = Vec::new();

    for event in events {
        match (owner_of(event.a), owner_of(event.b)) {
            (Some(BodyOwner::Agent(x)), Some(BodyOwner::Agent(y))) => {
                if event.phase != ContactPhase::Start {
                    continue;
                }
                if tagged_this_step.contains(&x) || tagged_this_step.contains(&y) {
                    continue;
                }
                let (Some(sx), Some(sy)) = (state_of(x), state_of(y)) else {
                    continue;
                };
                let pair = match (sx.role, sy.role) {
                    (Role::It, Role::NotIt) if sy.ready => Some((x, y)),
                    (Role::NotIt, Role::It) if sx.ready => Some((y, x)),
                    _ => None,
                };
                if let Some((tagger, tagged)) = pair {
                    debug!("Tag: {} -> {}", tagger, tagged);
                    tagged_this_step.push(tagger);
                    tagged_this_step.push(tagged);
                    outcomes.push(ContactOutcome::Tag { tagger, tagged });
                }
            }
            (Some(BodyOwner::Agent(agent)), Some(BodyOwner::Prop(prop)))
            | (Some(BodyOwner::Prop(prop)), Some(BodyOwner::Agent(agent))) => {
                if smashed.contains(&prop) {
                    continue;
                }
                if state_of(agent).map_or(false, |s| s.select) {
                    smashed.push(prop);
                    outcomes.push(ContactOutcome::SmashProp { by: agent, prop });
                }
            }
            _ => {}
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(body: BodyHandle) -> Option<BodyOwner> {
        match body.0 {
            0 => Some(BodyOwner::Agent(AgentId(0))),
            1 => Some(BodyOwner::Agent(AgentId(1))),
            2 => Some(BodyOwner::Prop(PropId(7))),
            _ => None,
        }
    }

    fn event(phase: ContactPhase, a: u32, b: u32) -> CollisionEvent {
        CollisionEvent {
            phase,
            a: BodyHandle(a),
            b: BodyHandle(b),
        }
    }

    #[test]
    fn tag_needs_contact_start_and_ready_target() {
        let ready = |id: AgentId| {
            Some(ContactState {
                role: if id.0 == 0 { Role::It } else { Role::NotIt },
                ready: true,
                select: false,
            })
        };
        assert_eq!(
            resolve_contacts(&[event(ContactPhase::Start, 1, 0)], owner, ready),
            vec![ContactOutcome::Tag { tagger: AgentId(0), tagged: AgentId(1) }]
        );
        assert!(resolve_contacts(&[event(ContactPhase::Active, 0, 1)], owner, ready).is_empty());

        let ghost = |id: AgentId| {
            Some(ContactState {
                role: if id.0 == 0 { Role::It } else { Role::NotIt },
                ready: id.0 == 0,
                select: false,
            })
        };
        assert!(resolve_contacts(&[event(ContactPhase::Start, 0, 1)], owner, ghost).is_empty());
    }

    #[test]
    fn select_smashes_touched_prop_once() {
        let selecting = |_: AgentId| {
            Some(ContactState {
                role: Role::NotIt,
                ready: true,
                select: true,
            })
        };
        let events = [event(ContactPhase::Active, 2, 1), event(ContactPhase::Start, 0, 2)];
        assert_eq!(
            resolve_contacts(&events, owner, selecting),
            vec![ContactOutcome::SmashProp { by: AgentId(1), prop: PropId(7) }]
        );
    }
}
