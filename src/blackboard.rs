use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use dc_motor::MotorState;

/// Latest view of the motor, shared between the bench tasks.
#[derive(Clone)]
pub struct State {
    pub motor: MotorState,
    /// Shaft angle (deg).
    pub position: f32,
    /// Estimated speed (deg/s).
    pub speed: f32,
    /// Estimated acceleration (deg/s²).
    pub acceleration: f32,
    pub last_tick_ts: Instant,
    pub faults: Vec<String>,
    pub finished: bool,
}

impl Default for State {
    fn default() -> Self {
        State {
            motor: MotorState::default(),
            position: 0.0,
            speed: 0.0,
            acceleration: 0.0,
            last_tick_ts: Instant::now(),
            faults: Vec::new(),
            finished: false,
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn is_finished(bb: &Blackboard) -> bool {
    bb.read().finished
}

pub fn finish(bb: &Blackboard) {
    bb.write().finished = true;
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults_are_deduplicated() {
        let bb = Blackboard::default();
        raise_fault(&bb, "Device failure in set_voltage");
        raise_fault(&bb, "Device failure in set_voltage");
        raise_fault(&bb, "control loop stalled");
        assert_eq!(snapshot(&bb).faults.len(), 2);
    }

    #[test]
    fn test_finish_flag() {
        let bb = Blackboard::default();
        assert!(!is_finished(&bb));
        finish(&bb);
        assert!(is_finished(&bb));
    }
}
