//! Error types for the DC motor controller.
//!
//! Device implementations report failures with [`DeviceError`]; the controller
//! tags them with the [`Capability`] that produced them and surfaces them as
//! [`MotorError`].

use core::fmt;

/// One of the four operations a power-stage device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Bring the power stage up.
    Initialize,
    /// Shut the power stage down.
    Deinitialize,
    /// Apply a drive voltage.
    SetVoltage,
    /// Apply a rotation direction.
    SetDirection,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Initialize => "initialize",
            Capability::Deinitialize => "deinitialize",
            Capability::SetVoltage => "set_voltage",
            Capability::SetDirection => "set_direction",
        };
        f.write_str(name)
    }
}

/// Failure reported by a [`MotorDevice`](crate::MotorDevice) capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The device attempted the operation and failed.
    Failure,
    /// The device does not provide this operation.
    Unsupported,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Failure => f.write_str("device failure"),
            DeviceError::Unsupported => f.write_str("operation not supported by device"),
        }
    }
}

impl core::error::Error for DeviceError {}

/// Errors that can occur while driving a motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorError {
    /// A device capability reported a failure.
    /// Logical state updated before the call is not rolled back.
    DeviceFailure(Capability),
    /// The device does not provide the capability that was needed.
    NullCapability(Capability),
    /// Error for an invalid configuration.
    /// This variant is returned when a limit pair is inverted, a limit is not finite,
    /// or `dc_change` is not positive.
    InvalidConfig(&'static str),
    /// A call argument is outside the domain the operation accepts.
    InvalidArgument(&'static str),
    /// Error for an invalid time delta.
    /// This variant is returned when a `delta_time` is not a positive finite number.
    InvalidTimeDelta(&'static str),
}

impl MotorError {
    /// Tags a device-side error with the capability that produced it.
    pub fn from_device(err: DeviceError, capability: Capability) -> Self {
        match err {
            DeviceError::Failure => MotorError::DeviceFailure(capability),
            DeviceError::Unsupported => MotorError::NullCapability(capability),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::DeviceFailure(cap) => write!(f, "Device failure in {}", cap),
            MotorError::NullCapability(cap) => write!(f, "Device capability unavailable: {}", cap),
            MotorError::InvalidConfig(msg) => write!(f, "Invalid motor configuration: {}", msg),
            MotorError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            MotorError::InvalidTimeDelta(msg) => write!(f, "Invalid time delta: {}", msg),
        }
    }
}

impl core::error::Error for MotorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_is_tagged_with_capability() {
        assert_eq!(
            MotorError::from_device(DeviceError::Failure, Capability::SetVoltage),
            MotorError::DeviceFailure(Capability::SetVoltage)
        );
        assert_eq!(
            MotorError::from_device(DeviceError::Unsupported, Capability::Initialize),
            MotorError::NullCapability(Capability::Initialize)
        );
    }

    #[test]
    fn test_display_names_the_capability() {
        let err = MotorError::NullCapability(Capability::SetDirection);
        assert_eq!(err.to_string(), "Device capability unavailable: set_direction");
        let err = MotorError::InvalidTimeDelta("must be positive");
        assert_eq!(err.to_string(), "Invalid time delta: must be positive");
        let err = MotorError::InvalidArgument("start position must be finite");
        assert_eq!(err.to_string(), "Invalid argument: start position must be finite");
    }
}
