#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` command translator and state estimator for brushed DC motors."]
#![doc = ""]
#![doc = "This crate turns speed, position and acceleration commands into direction and"]
#![doc = "drive voltage requests for an H-bridge style power stage, and estimates position,"]
#![doc = "speed and acceleration from an encoder tick counter."]

pub mod config;
pub mod controller;
pub mod device;
pub mod error;

pub use config::{FULL_TURN, MotorConfig, wrap_position};
pub use controller::{DcMotor, MotorState};
pub use device::{Direction, MotorDevice};
pub use error::{Capability, DeviceError, MotorError};
