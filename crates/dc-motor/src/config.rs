//! Static limits of a motor and the pure conversions derived from them.

use libm::{copysignf, fabsf, fmod, roundf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::device::Direction;
use crate::error::MotorError;

/// Degrees in one shaft revolution.
pub const FULL_TURN: f32 = 360.0;

/// Limits and scaling of a single motor.
///
/// Positions are in degrees, speeds in degrees per second and accelerations in
/// degrees per second squared. Speed and acceleration limits bound magnitudes;
/// the sign of a command carries its direction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    /// Lowest position a position command may target (deg).
    pub min_position: f32,
    /// Highest position a position command may target (deg).
    pub max_position: f32,
    /// Smallest speed magnitude that moves the motor (deg/s).
    /// Anything slower is treated as a stop.
    pub min_speed: f32,
    /// Largest speed magnitude the motor may be commanded to (deg/s).
    pub max_speed: f32,
    /// Smallest non-zero acceleration magnitude (deg/s²).
    pub min_acceleration: f32,
    /// Largest acceleration magnitude (deg/s²).
    pub max_acceleration: f32,
    /// Drive voltage applied at `max_speed` (V).
    pub ref_voltage: f32,
    /// Angle covered by one encoder tick (deg).
    pub dc_change: f32,
}

impl MotorConfig {
    /// Checks the invariants the controller relies on.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidConfig)` if any limit is not finite, a
    /// `min`/`max` pair is inverted, a magnitude limit or `ref_voltage` is
    /// negative, or `dc_change` is not positive.
    pub fn validate(&self) -> Result<(), MotorError> {
        let values = [
            self.min_position,
            self.max_position,
            self.min_speed,
            self.max_speed,
            self.min_acceleration,
            self.max_acceleration,
            self.ref_voltage,
            self.dc_change,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MotorError::InvalidConfig("limits must be finite"));
        }
        if self.dc_change <= 0.0 {
            return Err(MotorError::InvalidConfig("dc_change must be positive"));
        }
        if self.max_position < self.min_position {
            return Err(MotorError::InvalidConfig("max_position must not be below min_position"));
        }
        if self.min_speed < 0.0 || self.max_speed < self.min_speed {
            return Err(MotorError::InvalidConfig(
                "speed limits must satisfy 0 <= min_speed <= max_speed",
            ));
        }
        if self.min_acceleration < 0.0 || self.max_acceleration < self.min_acceleration {
            return Err(MotorError::InvalidConfig(
                "acceleration limits must satisfy 0 <= min_acceleration <= max_acceleration",
            ));
        }
        if self.ref_voltage < 0.0 {
            return Err(MotorError::InvalidConfig("ref_voltage must not be negative"));
        }
        Ok(())
    }

    /// Constrains a target position into `[min_position, max_position]`.
    pub fn clamp_position(&self, position: f32) -> f32 {
        position.clamp(self.min_position, self.max_position)
    }

    /// Constrains a speed magnitude into `[min_speed, max_speed]`, keeping its sign.
    ///
    /// Exactly zero is returned unchanged.
    pub fn clamp_speed(&self, speed: f32) -> f32 {
        clamp_magnitude(speed, self.min_speed, self.max_speed)
    }

    /// Constrains an acceleration magnitude into `[min_acceleration, max_acceleration]`,
    /// keeping its sign.
    ///
    /// Exactly zero is returned unchanged.
    pub fn clamp_acceleration(&self, acceleration: f32) -> f32 {
        clamp_magnitude(acceleration, self.min_acceleration, self.max_acceleration)
    }

    /// Direction a speed command resolves to.
    ///
    /// Speeds slower than `min_speed` fall in the dead band and resolve to
    /// [`Direction::Stop`].
    pub fn speed_to_direction(&self, speed: f32) -> Direction {
        // `!(>=)` keeps NaN in the dead band.
        if !(fabsf(speed) >= self.min_speed) {
            return Direction::Stop;
        }
        if speed > 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    /// Drive voltage for a speed, interpolated linearly between `min_speed` (0 V)
    /// and `max_speed` (`ref_voltage`).
    ///
    /// The speed is expected to be clamped already. Speeds in the dead band map
    /// to 0 V; a zero-width speed range maps every other speed to `ref_voltage`.
    pub fn speed_to_voltage(&self, speed: f32) -> f32 {
        let magnitude = fabsf(speed);
        if magnitude < self.min_speed {
            return 0.0;
        }
        let span = self.max_speed - self.min_speed;
        if span <= 0.0 {
            return self.ref_voltage;
        }
        let voltage = (magnitude - self.min_speed) * self.ref_voltage / span;
        // Rounding must not push the top of the range past the reference.
        voltage.min(self.ref_voltage)
    }

    /// Angular position of a tick count, wrapped into `[0, 360)`.
    ///
    /// The product is formed in `f64` so large counts keep their fractional turn.
    pub fn dc_count_to_position(&self, dc_count: i64) -> f32 {
        wrap_degrees(dc_count as f64 * f64::from(self.dc_change))
    }

    /// Tick count of an angular position within one turn.
    ///
    /// The position is wrapped into `[0, 360)` first and rounded to the nearest
    /// tick. A tick that lands on a full turn is folded back to 0.
    pub fn position_to_dc_count(&self, position: f32) -> i64 {
        let count = roundf(wrap_position(position) / self.dc_change) as i64;
        if count as f64 * f64::from(self.dc_change) >= f64::from(FULL_TURN) {
            0
        } else {
            count
        }
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
///
/// Negative angles wrap upward, so `-1.0` becomes `359.0`.
pub fn wrap_position(position: f32) -> f32 {
    wrap_degrees(f64::from(position))
}

fn wrap_degrees(degrees: f64) -> f32 {
    let full_turn = f64::from(FULL_TURN);
    let mut wrapped = fmod(degrees, full_turn);
    if wrapped < 0.0 {
        wrapped += full_turn;
    }
    // Narrowing can round values just below a full turn up to 360.
    let wrapped = wrapped as f32;
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

fn clamp_magnitude(value: f32, min: f32, max: f32) -> f32 {
    if value == 0.0 {
        return value;
    }
    let magnitude = fabsf(value);
    if magnitude < min {
        copysignf(min, value)
    } else if magnitude > max {
        copysignf(max, value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f32 = 1e-4;

    fn config() -> MotorConfig {
        MotorConfig {
            min_position: 10.0,
            max_position: 350.0,
            min_speed: 1.0,
            max_speed: 10.0,
            min_acceleration: 0.5,
            max_acceleration: 5.0,
            ref_voltage: 12.0,
            dc_change: 1.0,
        }
    }

    #[test]
    fn test_validate_accepts_sane_limits() {
        assert!(config().validate().is_ok());
        let equal_speeds = MotorConfig { min_speed: 3.0, max_speed: 3.0, ..config() };
        assert!(equal_speeds.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let zero_tick = MotorConfig { dc_change: 0.0, ..config() };
        assert!(matches!(zero_tick.validate(), Err(MotorError::InvalidConfig(_))));

        let negative_tick = MotorConfig { dc_change: -0.5, ..config() };
        assert!(matches!(negative_tick.validate(), Err(MotorError::InvalidConfig(_))));

        let inverted_position = MotorConfig { min_position: 20.0, max_position: 10.0, ..config() };
        assert!(matches!(inverted_position.validate(), Err(MotorError::InvalidConfig(_))));

        let inverted_speed = MotorConfig { min_speed: 11.0, ..config() };
        assert!(matches!(inverted_speed.validate(), Err(MotorError::InvalidConfig(_))));

        let inverted_accel = MotorConfig { max_acceleration: 0.1, ..config() };
        assert!(matches!(inverted_accel.validate(), Err(MotorError::InvalidConfig(_))));

        let nan_voltage = MotorConfig { ref_voltage: f32::NAN, ..config() };
        assert!(matches!(nan_voltage.validate(), Err(MotorError::InvalidConfig(_))));
    }

    #[test]
    fn test_clamp_speed_preserves_sign() {
        let cfg = config();
        assert_eq!(cfg.clamp_speed(0.5), 1.0);
        assert_eq!(cfg.clamp_speed(-0.5), -1.0);
        assert_eq!(cfg.clamp_speed(25.0), 10.0);
        assert_eq!(cfg.clamp_speed(-25.0), -10.0);
        assert_eq!(cfg.clamp_speed(4.0), 4.0);
        assert_eq!(cfg.clamp_speed(0.0), 0.0);
    }

    #[test]
    fn test_clamp_acceleration_exempts_zero() {
        let cfg = config();
        assert_eq!(cfg.clamp_acceleration(0.0), 0.0);
        assert_eq!(cfg.clamp_acceleration(0.1), 0.5);
        assert_eq!(cfg.clamp_acceleration(-9.0), -5.0);
    }

    #[test]
    fn test_clamping_is_idempotent() {
        let cfg = config();
        for x in [-400.0, -12.0, -3.0, -0.2, 0.0, 0.7, 2.5, 9.99, 11.0, 360.0, 720.0] {
            let p = cfg.clamp_position(x);
            assert_eq!(cfg.clamp_position(p), p);
            let s = cfg.clamp_speed(x);
            assert_eq!(cfg.clamp_speed(s), s);
            let a = cfg.clamp_acceleration(x);
            assert_eq!(cfg.clamp_acceleration(a), a);
        }
    }

    #[test]
    fn test_speed_to_direction_dead_band() {
        let cfg = config();
        assert_eq!(cfg.speed_to_direction(0.0), Direction::Stop);
        assert_eq!(cfg.speed_to_direction(0.5), Direction::Stop);
        assert_eq!(cfg.speed_to_direction(-0.99), Direction::Stop);
        assert_eq!(cfg.speed_to_direction(f32::NAN), Direction::Stop);
        assert_eq!(cfg.speed_to_direction(1.0), Direction::Forward);
        assert_eq!(cfg.speed_to_direction(-1.0), Direction::Backward);
    }

    #[test]
    fn test_speed_to_voltage_linear() {
        let cfg = config();
        // (5 - 1) * 12 / (10 - 1) = 5.333...
        assert!((cfg.speed_to_voltage(5.0) - 48.0 / 9.0).abs() < EPSILON);
        assert!((cfg.speed_to_voltage(-5.0) - 48.0 / 9.0).abs() < EPSILON);
        assert!((cfg.speed_to_voltage(1.0) - 0.0).abs() < EPSILON);
        assert!((cfg.speed_to_voltage(10.0) - 12.0).abs() < EPSILON);
        assert_eq!(cfg.speed_to_voltage(0.5), 0.0);
    }

    #[test]
    fn test_speed_to_voltage_zero_span() {
        let cfg = MotorConfig { min_speed: 4.0, max_speed: 4.0, ..config() };
        assert_eq!(cfg.speed_to_voltage(4.0), 12.0);
    }

    #[test]
    fn test_wrap_position() {
        assert!((wrap_position(-1.0) - 359.0).abs() < EPSILON);
        assert!((wrap_position(360.0) - 0.0).abs() < EPSILON);
        assert!((wrap_position(725.0) - 5.0).abs() < EPSILON);
        assert!((wrap_position(-720.0) - 0.0).abs() < EPSILON);
        let tiny = wrap_position(-1e-9);
        assert!((0.0..FULL_TURN).contains(&tiny));
    }

    #[test]
    fn test_dc_count_to_position_is_in_range() {
        let cfg = MotorConfig { dc_change: 0.75, ..config() };
        for count in [i64::MIN, -1_000_001, -481, -1, 0, 1, 479, 480, 1_000_003, i64::MAX] {
            let position = cfg.dc_count_to_position(count);
            assert!((0.0..FULL_TURN).contains(&position), "count {} gave {}", count, position);
        }
    }

    #[test]
    fn test_dc_count_position_roundtrip() {
        let cfg = MotorConfig { dc_change: 0.5, ..config() };
        let ticks_per_turn = (FULL_TURN / cfg.dc_change) as i64;
        for count in [-1_000, -721, -1, 0, 1, 3, 719, 720, 12_345] {
            let position = cfg.dc_count_to_position(count);
            assert_eq!(cfg.position_to_dc_count(position), count.rem_euclid(ticks_per_turn));
        }
    }

    #[test]
    fn test_position_to_dc_count_stays_below_full_turn() {
        let cfg = MotorConfig { dc_change: 0.5, ..config() };
        assert_eq!(cfg.position_to_dc_count(359.9), 0);
        assert_eq!(cfg.position_to_dc_count(-0.1), 0);
        assert_eq!(cfg.position_to_dc_count(359.7), 719);

        // 514 ticks of 0.7 deg is still short of a full turn.
        let uneven = MotorConfig { dc_change: 0.7, ..config() };
        assert_eq!(uneven.position_to_dc_count(359.8), 514);
        assert_eq!(uneven.position_to_dc_count(359.9), 514);
    }
}
