//! Signal commit: deliver buffered panic and alert signals.
//!
//! Runs after every agent was evaluated and moved. Targets read the
//! delivered flags on their next evaluation, so contagion advances one hop
//! per tick.

use std::collections::HashMap;

use hecs::{Entity, World};
use tracing::trace;

use stampede_core::components::{Kinematics, PanicState, Vitals};
use stampede_core::enums::SignalKind;
use stampede_core::events::Signal;
use stampede_core::types::AgentId;

/// Apply signals to their targets. Returns how many were delivered.
/// Signals to unknown or dead agents are dropped.
pub fn commit(
    world: &mut World,
    entities: &HashMap<AgentId, Entity>,
    signals: impl IntoIterator<Item = Signal>,
) -> usize {
    let mut delivered = 0;
    for signal in signals {
        let entity = match entities.get(&signal.target) {
            Some(entity) => *entity,
            None => continue,
        };
        let (panic, kinematics, vitals) =
            match world.query_one_mut::<(&mut PanicState, &mut Kinematics, &Vitals)>(entity) {
                Ok(components) => components,
                Err(_) => continue,
            };
        if vitals.health <= 0.0 {
            continue;
        }
        apply(&signal, panic, kinematics);
        delivered += 1;
        trace!(
            source = ?signal.source,
            target = ?signal.target,
            kind = ?signal.kind,
            "Signal delivered"
        );
    }
    delivered
}

/// Deliver one signal. Panic signals fill the inbox; alerts also set the
/// fleeing flag and turn the listener toward the threat.
pub fn apply(signal: &Signal, panic: &mut PanicState, kinematics: &mut Kinematics) {
    panic.signalled = true;
    if panic.signal_source.is_none() {
        panic.signal_source = signal.threat_position;
    }
    if signal.kind == SignalKind::Alert {
        panic.is_fleeing = true;
        if let Some(threat) = signal.threat_position {
            let to_threat = threat - kinematics.position;
            if to_threat.length_squared() > 0.0 {
                kinematics.facing = to_threat.normalize();
            }
        }
    }
}
