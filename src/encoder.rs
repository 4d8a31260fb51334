use std::{thread::JoinHandle, time::Duration};

use dc_motor::Direction;
use spin_sleep::SpinSleeper;
use tracing::info;

use crate::blackboard::{Blackboard, is_finished};
use crate::bridge::{BridgeOutput, SharedOutput};
use crate::control::SharedMotor;

/// Turns bridge output into whole encoder edges, carrying fractions over.
#[derive(Debug)]
pub struct TickAccumulator {
    ticks_per_volt_second: f32,
    pending: f32,
}

impl TickAccumulator {
    pub fn new(ticks_per_volt_second: f32) -> Self {
        TickAccumulator { ticks_per_volt_second, pending: 0.0 }
    }

    /// Edges produced by `output` over `dt` seconds.
    pub fn advance(&mut self, output: &BridgeOutput, dt: f32) -> u32 {
        if !output.powered || output.direction == Direction::Stop {
            self.pending = 0.0;
            return 0;
        }
        self.pending += self.ticks_per_volt_second * output.voltage * dt;
        let whole = self.pending.floor();
        self.pending -= whole;
        whole as u32
    }
}

/// Spawns the thread standing in for the encoder interrupt: it watches the
/// bridge and calls `update_dc_count` once per simulated edge.
pub fn spawn(
    motor: SharedMotor,
    output: SharedOutput,
    bb: Blackboard,
    ticks_per_volt_second: f32,
    period: Duration,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new().name("encoder".into()).spawn(move || {
        info!("Encoder thread started.");
        let sleeper = SpinSleeper::new(100_000);
        let dt = period.as_secs_f32();
        let mut accumulator = TickAccumulator::new(ticks_per_volt_second);
        let mut edges: u64 = 0;

        while !is_finished(&bb) {
            let snapshot = *output.read();
            let ticks = accumulator.advance(&snapshot, dt);
            if ticks > 0 {
                let mut motor = motor.lock();
                for _ in 0..ticks {
                    motor.update_dc_count();
                }
                edges += u64::from(ticks);
            }
            sleeper.sleep(period);
        }
        info!(edges, "Encoder thread stopped.");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(voltage: f32) -> BridgeOutput {
        BridgeOutput { powered: true, direction: Direction::Forward, voltage }
    }

    #[test]
    fn test_accumulator_carries_fractions() {
        let mut acc = TickAccumulator::new(2.5);
        // 2.5 edges/(V*s) * 2 V * 0.125 s = 0.625 edges per call
        let edges: Vec<u32> = (0..8).map(|_| acc.advance(&running(2.0), 0.125)).collect();
        assert_eq!(edges, vec![0, 1, 0, 1, 1, 0, 1, 1]);
    }

    #[test]
    fn test_accumulator_idle_when_stopped_or_unpowered() {
        let mut acc = TickAccumulator::new(10.0);
        let stopped = BridgeOutput { direction: Direction::Stop, ..running(12.0) };
        assert_eq!(acc.advance(&stopped, 1.0), 0);
        let unpowered = BridgeOutput { powered: false, ..running(12.0) };
        assert_eq!(acc.advance(&unpowered, 1.0), 0);
        assert_eq!(acc.advance(&running(1.0), 0.5), 5);
    }
}
