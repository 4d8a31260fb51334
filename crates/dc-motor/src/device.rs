//! The power-stage interface the controller drives.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Rotation direction requested from the power stage.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Positive rotation; encoder ticks count up.
    Forward,
    /// Negative rotation; encoder ticks count down.
    Backward,
    /// No actuation.
    #[default]
    Stop,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Capability interface of an H-bridge style power stage.
///
/// Every operation has a default body returning [`DeviceError::Unsupported`],
/// so an implementation only overrides what its hardware can do. The
/// controller reports a call into an unsupported operation as
/// [`MotorError::NullCapability`](crate::MotorError::NullCapability).
///
/// Calls must return promptly; the controller never retries.
pub trait MotorDevice {
    /// Bring the power stage up.
    fn initialize(&mut self) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }

    /// Shut the power stage down.
    fn deinitialize(&mut self) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }

    /// Apply a drive voltage magnitude (V). The sign of motion comes from
    /// [`set_direction`](MotorDevice::set_direction).
    fn set_voltage(&mut self, _voltage: f32) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }

    /// Apply a rotation direction.
    fn set_direction(&mut self, _direction: Direction) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }
}

impl<T: MotorDevice + ?Sized> MotorDevice for &mut T {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        (**self).initialize()
    }

    fn deinitialize(&mut self) -> Result<(), DeviceError> {
        (**self).deinitialize()
    }

    fn set_voltage(&mut self, voltage: f32) -> Result<(), DeviceError> {
        (**self).set_voltage(voltage)
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), DeviceError> {
        (**self).set_direction(direction)
    }
}
