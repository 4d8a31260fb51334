//! The motor controller: command translation, change suppression and
//! estimation from the encoder tick counter.

use tracing::{debug, trace, warn};

use crate::config::MotorConfig;
use crate::device::{Direction, MotorDevice};
use crate::error::{Capability, DeviceError, MotorError};

/// Snapshot of the controller's mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorState {
    /// Last drive voltage sent to (or attempted on) the device (V).
    pub voltage: f32,
    /// Last direction sent to (or attempted on) the device.
    pub direction: Direction,
    /// Encoder tick counter. Saturates instead of wrapping.
    pub dc_count: i64,
    /// Position sample memoized by the last speed estimate (deg).
    pub prev_position: f32,
    /// Speed sample memoized by the last acceleration estimate (deg/s).
    pub prev_speed: f32,
}

/// Controller for one brushed DC motor behind a [`MotorDevice`].
///
/// The controller is a command translator, not a feedback loop: it turns speed,
/// position and acceleration commands into direction and voltage requests,
/// and forwards a request to the device only when it differs from the last
/// one. Position is derived solely from the tick counter advanced by
/// [`update_dc_count`](DcMotor::update_dc_count).
///
/// There is no internal synchronization. When ticks arrive from another
/// context (an interrupt, a sensor thread) the caller must serialize access,
/// for instance by keeping the controller behind a mutex.
///
/// State recorded before a failing device call is kept; after an error the
/// logical and physical state may differ until the next successful command
/// or [`reset`](DcMotor::reset).
#[derive(Debug)]
pub struct DcMotor<D> {
    config: MotorConfig,
    device: D,
    state: MotorState,
}

impl<D: MotorDevice> DcMotor<D> {
    /// Construct a controller with zeroed state. The device is not touched.
    ///
    /// # Arguments
    ///
    /// * `config`: Limits and scaling of the motor.
    /// * `device`: The power stage to drive.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidConfig)` if `config` fails
    /// [`MotorConfig::validate`].
    pub fn new(config: MotorConfig, device: D) -> Result<Self, MotorError> {
        config.validate()?;
        Ok(DcMotor {
            config,
            device,
            state: MotorState::default(),
        })
    }

    /// Zero the state and bring the device up.
    ///
    /// # Errors
    ///
    /// Propagates the device's `initialize` result.
    pub fn initialize(&mut self) -> Result<(), MotorError> {
        self.initialize_at(0.0)
    }

    /// Zero the state with the shaft at `start_position` and bring the device up.
    ///
    /// The start position is wrapped into `[0, 360)` and rounded to the nearest
    /// tick. The position sample is seeded with it, so the first speed
    /// estimate reads zero.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidArgument)` if `start_position` is not finite.
    /// Otherwise propagates the device's `initialize` result.
    pub fn initialize_at(&mut self, start_position: f32) -> Result<(), MotorError> {
        if !start_position.is_finite() {
            return Err(MotorError::InvalidArgument("start position must be finite"));
        }

        let dc_count = self.config.position_to_dc_count(start_position);
        self.state = MotorState {
            dc_count,
            prev_position: self.config.dc_count_to_position(dc_count),
            ..MotorState::default()
        };
        debug!(start_position, dc_count, "initializing motor device");

        let result = self.device.initialize();
        Self::check(result, Capability::Initialize)
    }

    /// Shut the device down and clear the state.
    ///
    /// The state is cleared even when the device reports a failure.
    pub fn deinitialize(&mut self) -> Result<(), MotorError> {
        let result = self.device.deinitialize();
        self.state = MotorState::default();
        debug!("motor device deinitialized");
        Self::check(result, Capability::Deinitialize)
    }

    /// Stop actuation and clear the voltage and estimator samples.
    ///
    /// The tick counter is kept, so absolute position survives the stop. Stop
    /// is always sent to the device, even if the controller already believes
    /// the motor is stopped.
    pub fn reset(&mut self) -> Result<(), MotorError> {
        self.state = MotorState {
            dc_count: self.state.dc_count,
            prev_position: self.get_position(),
            ..MotorState::default()
        };
        debug!(dc_count = self.state.dc_count, "resetting motor");

        let result = self.device.set_direction(Direction::Stop);
        Self::check(result, Capability::SetDirection)
    }

    /// Advance the tick counter by one step in the current direction.
    ///
    /// Call once per encoder edge. The counter saturates at `i64::MAX` and
    /// `i64::MIN`; a stopped motor does not count.
    pub fn update_dc_count(&mut self) {
        self.state.dc_count = match self.state.direction {
            Direction::Forward => self.state.dc_count.saturating_add(1),
            Direction::Backward => self.state.dc_count.saturating_sub(1),
            Direction::Stop => self.state.dc_count,
        };
    }

    /// Drive toward `position` so that it would be reached in `delta_time`.
    ///
    /// The target is clamped into the configured position range and turned into
    /// the speed `(target - current) / delta_time`, which is then applied with
    /// [`set_speed`](DcMotor::set_speed). This is a single open-loop step; call
    /// it again every control tick.
    ///
    /// # Arguments
    ///
    /// * `position`: Target position (deg).
    /// * `delta_time`: Time to reach the target (s).
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidTimeDelta)` if `delta_time` is not positive.
    /// Otherwise propagates the result of `set_speed`.
    pub fn set_position(&mut self, position: f32, delta_time: f32) -> Result<(), MotorError> {
        check_delta_time(delta_time)?;

        let target = self.config.clamp_position(position);
        let speed = (target - self.get_position()) / delta_time;
        trace!(position, target, speed, "position command");

        self.set_speed(speed)
    }

    /// Apply a signed speed command (deg/s).
    ///
    /// Speeds slower than `min_speed` stop the motor; only the direction is sent
    /// in that case. Otherwise the speed is clamped into
    /// `[min_speed, max_speed]` and converted to a voltage with
    /// [`MotorConfig::speed_to_voltage`]. Direction and voltage are sent only
    /// when they change.
    ///
    /// # Errors
    ///
    /// Returns the first device error. A failing direction change skips the
    /// voltage update.
    pub fn set_speed(&mut self, speed: f32) -> Result<(), MotorError> {
        let direction = self.config.speed_to_direction(speed);
        self.set_direction(direction)?;
        if direction == Direction::Stop {
            return Ok(());
        }

        let speed = self.config.clamp_speed(speed);
        let voltage = self.config.speed_to_voltage(speed);

        self.set_voltage(voltage)
    }

    /// Apply an acceleration command (deg/s²) over `delta_time`.
    ///
    /// The acceleration is clamped into `[min_acceleration, max_acceleration]`
    /// (zero passes through), averaged with the current acceleration estimate
    /// and integrated over `delta_time` with the trapezoid rule. The resulting
    /// speed change is applied with [`set_speed`](DcMotor::set_speed).
    ///
    /// Reads the acceleration estimate, so it advances the estimator samples
    /// just like [`get_acceleration`](DcMotor::get_acceleration).
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidTimeDelta)` if `delta_time` is not positive.
    /// Otherwise propagates the result of `set_speed`.
    pub fn set_acceleration(&mut self, acceleration: f32, delta_time: f32) -> Result<(), MotorError> {
        check_delta_time(delta_time)?;

        let acceleration = self.config.clamp_acceleration(acceleration);
        let current = self.get_acceleration(delta_time)?;
        let speed = (acceleration + current) * delta_time / 2.0;
        trace!(acceleration, current, speed, "acceleration command");

        self.set_speed(speed)
    }

    /// Current shaft angle in `[0, 360)` degrees, from the tick counter.
    pub fn get_position(&self) -> f32 {
        self.config.dc_count_to_position(self.state.dc_count)
    }

    /// Speed estimate (deg/s) since the previous call.
    ///
    /// Memoizes the current position for the next call, so call it exactly
    /// once per control tick.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidTimeDelta)` if `delta_time` is not positive.
    pub fn get_speed(&mut self, delta_time: f32) -> Result<f32, MotorError> {
        check_delta_time(delta_time)?;

        let position = self.get_position();
        let speed = (position - self.state.prev_position) / delta_time;
        self.state.prev_position = position;

        Ok(speed)
    }

    /// Acceleration estimate (deg/s²) since the previous call.
    ///
    /// Takes a speed estimate with [`get_speed`](DcMotor::get_speed) and
    /// memoizes it, so call it instead of `get_speed`, once per control tick.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidTimeDelta)` if `delta_time` is not positive.
    pub fn get_acceleration(&mut self, delta_time: f32) -> Result<f32, MotorError> {
        let speed = self.get_speed(delta_time)?;
        let acceleration = (speed - self.state.prev_speed) / delta_time;
        self.state.prev_speed = speed;

        Ok(acceleration)
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> MotorState {
        self.state
    }

    /// Returns the motor limits.
    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Returns the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device mutably. Commands sent this way bypass the
    /// controller's state tracking.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consumes the controller and returns the device.
    pub fn into_device(self) -> D {
        self.device
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), MotorError> {
        if direction == self.state.direction {
            trace!(%direction, "direction unchanged");
            return Ok(());
        }

        self.state.direction = direction;
        debug!(%direction, "setting direction");

        let result = self.device.set_direction(direction);
        Self::check(result, Capability::SetDirection)
    }

    fn set_voltage(&mut self, voltage: f32) -> Result<(), MotorError> {
        if voltage == self.state.voltage {
            trace!(voltage, "voltage unchanged");
            return Ok(());
        }

        self.state.voltage = voltage;
        debug!(voltage, "setting voltage");

        let result = self.device.set_voltage(voltage);
        Self::check(result, Capability::SetVoltage)
    }

    fn check(result: Result<(), DeviceError>, capability: Capability) -> Result<(), MotorError> {
        result.map_err(|err| {
            let err = MotorError::from_device(err, capability);
            warn!(%err, "motor device command failed");
            err
        })
    }
}

fn check_delta_time(delta_time: f32) -> Result<(), MotorError> {
    if delta_time > 0.0 && delta_time.is_finite() {
        Ok(())
    } else {
        Err(MotorError::InvalidTimeDelta("must be positive and finite"))
    }
}
