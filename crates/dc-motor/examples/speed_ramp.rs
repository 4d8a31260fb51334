use dc_motor::*;

/// Prints every command it receives.
struct PrintingBridge;

impl MotorDevice for PrintingBridge {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        println!("  [bridge] initialize");
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), DeviceError> {
        println!("  [bridge] deinitialize");
        Ok(())
    }

    fn set_voltage(&mut self, voltage: f32) -> Result<(), DeviceError> {
        println!("  [bridge] voltage   -> {:.3} V", voltage);
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), DeviceError> {
        println!("  [bridge] direction -> {}", direction);
        Ok(())
    }
}

fn main() {
    let config = MotorConfig {
        min_position: 0.0,
        max_position: 359.0,
        min_speed: 1.0,
        max_speed: 10.0,
        min_acceleration: 0.5,
        max_acceleration: 5.0,
        ref_voltage: 12.0,
        dc_change: 1.0,
    };
    let dt = 0.5; // Control period in seconds
    let speeds = [0.5, 2.0, 5.0, 5.0, 10.0, 25.0, -5.0, 0.0];

    let mut motor = match DcMotor::new(config, PrintingBridge) {
        Ok(motor) => motor,
        Err(e) => {
            eprintln!("Failed to create motor: {}", e);
            return;
        }
    };

    println!("Initializing motor...");
    println!("  Config: {:?}", motor.config());
    if let Err(e) = motor.initialize() {
        eprintln!("Failed to initialize motor: {}", e);
        return;
    }

    println!("\nRamping...");
    for (i, &speed) in speeds.iter().enumerate() {
        println!("Step {:>2}: set_speed({})", i + 1, speed);
        if let Err(e) = motor.set_speed(speed) {
            eprintln!("Error during step {}: {}", i + 1, e);
            break;
        }

        // Pretend the encoder saw one edge per degree travelled.
        let ticks = (speed.abs().min(config.max_speed) * dt) as usize;
        for _ in 0..ticks {
            motor.update_dc_count();
        }

        match motor.get_acceleration(dt) {
            Ok(acceleration) => println!(
                "         position {:>6.1} deg, speed {:>6.1} deg/s, accel {:>6.1} deg/s^2",
                motor.get_position(),
                motor.state().prev_speed,
                acceleration
            ),
            Err(e) => eprintln!("Estimator error: {}", e),
        }
    }

    println!("\nStopping...");
    if let Err(e) = motor.reset() {
        eprintln!("Failed to reset motor: {}", e);
    }
    if let Err(e) = motor.deinitialize() {
        eprintln!("Failed to deinitialize motor: {}", e);
    }
    println!("Final state: {:?}", motor.state());
}
