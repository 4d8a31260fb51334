use std::sync::Arc;

use dc_motor::{DeviceError, Direction, MotorDevice};
use parking_lot::RwLock;
use tracing::{info, warn};

/// What the simulated H-bridge is currently putting out.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BridgeOutput {
    pub powered: bool,
    pub direction: Direction,
    pub voltage: f32,
}

pub type SharedOutput = Arc<RwLock<BridgeOutput>>;

/// An H-bridge that records its output instead of switching transistors.
///
/// Commands are rejected while the bridge is unpowered and voltages above the
/// supply rail are refused, like a driver that latches a fault.
#[derive(Debug)]
pub struct SimulatedBridge {
    output: SharedOutput,
    supply_voltage: f32,
}

impl SimulatedBridge {
    pub fn new(supply_voltage: f32) -> Self {
        SimulatedBridge {
            output: SharedOutput::default(),
            supply_voltage,
        }
    }

    /// Handle for the encoder simulation to watch the output.
    pub fn output(&self) -> SharedOutput {
        Arc::clone(&self.output)
    }
}

impl MotorDevice for SimulatedBridge {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        let mut out = self.output.write();
        if out.powered {
            warn!("Bridge initialized twice");
        }
        *out = BridgeOutput {
            powered: true,
            ..BridgeOutput::default()
        };
        info!(supply_voltage = self.supply_voltage, "Bridge powered up");
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), DeviceError> {
        *self.output.write() = BridgeOutput::default();
        info!("Bridge powered down");
        Ok(())
    }

    fn set_voltage(&mut self, voltage: f32) -> Result<(), DeviceError> {
        let mut out = self.output.write();
        if !out.powered {
            warn!(voltage, "Voltage command on unpowered bridge");
            return Err(DeviceError::Failure);
        }
        if !(0.0..=self.supply_voltage).contains(&voltage) {
            warn!(voltage, supply_voltage = self.supply_voltage, "Voltage outside supply rail");
            return Err(DeviceError::Failure);
        }
        out.voltage = voltage;
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), DeviceError> {
        let mut out = self.output.write();
        if !out.powered {
            warn!(%direction, "Direction command on unpowered bridge");
            return Err(DeviceError::Failure);
        }
        out.direction = direction;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpowered_bridge_rejects_commands() {
        let mut bridge = SimulatedBridge::new(12.0);
        assert_eq!(bridge.set_voltage(3.0), Err(DeviceError::Failure));
        assert_eq!(bridge.set_direction(Direction::Forward), Err(DeviceError::Failure));
        assert_eq!(*bridge.output().read(), BridgeOutput::default());
    }

    #[test]
    fn test_powered_bridge_tracks_output() {
        let mut bridge = SimulatedBridge::new(12.0);
        let output = bridge.output();
        bridge.initialize().unwrap();
        bridge.set_direction(Direction::Backward).unwrap();
        bridge.set_voltage(6.5).unwrap();
        assert_eq!(
            *output.read(),
            BridgeOutput { powered: true, direction: Direction::Backward, voltage: 6.5 }
        );

        assert_eq!(bridge.set_voltage(12.5), Err(DeviceError::Failure));
        assert_eq!(output.read().voltage, 6.5);

        bridge.deinitialize().unwrap();
        assert!(!output.read().powered);
    }
}
