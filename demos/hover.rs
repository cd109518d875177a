// demos/hover.rs

use std::convert::Infallible;

use embedded_hal::delay::DelayNs;
use quad_flight_core::flight::{FlightConfig, FlightController};
use quad_flight_core::pwm::{PulseScheduler, SchedulerConfig};
use quad_flight_core::sensor::{InertialSensor, ScaleSelection, SensorConfig};
use quad_flight_core::shared::MotorSpeeds;
use quad_flight_core::state::TargetState;

static SPEEDS: MotorSpeeds = MotorSpeeds::new(1000);

/// Toy rigid body: pitch and roll accelerate with the speed difference
/// between motor pairs.
struct ToyPlant {
    pitch: f32,
    roll: f32,
    pitch_rate: f32,
    roll_rate: f32,
}

impl ToyPlant {
    const GAIN: f32 = 0.02;
    const DAMPING: f32 = 0.98;

    fn step(&mut self, speeds: [u16; 4], dt: f32) {
        let [e1, e2, e3, e4] = speeds.map(f32::from);
        let pitch_torque = (e1 + e2) - (e3 + e4);
        let roll_torque = (e1 + e4) - (e2 + e3);
        self.pitch_rate = (self.pitch_rate + pitch_torque * Self::GAIN * dt) * Self::DAMPING;
        self.roll_rate = (self.roll_rate + roll_torque * Self::GAIN * dt) * Self::DAMPING;
        self.pitch += self.pitch_rate * dt;
        self.roll += self.roll_rate * dt;
    }
}

/// Sensor reading the toy plant.
struct SimSensor {
    plant: ToyPlant,
}

impl InertialSensor for SimSensor {
    type Error = Infallible;

    fn configure(&mut self, scales: ScaleSelection) -> Result<SensorConfig, Self::Error> {
        Ok(SensorConfig::from(scales))
    }

    fn read_acceleration(&mut self) -> Result<(f32, f32, f32), Self::Error> {
        let (pitch, roll) = (self.plant.pitch, self.plant.roll);
        Ok((pitch.sin(), -roll.sin(), pitch.cos() * roll.cos()))
    }

    fn read_angular_rate(&mut self) -> Result<(f32, f32, f32), Self::Error> {
        Ok((self.plant.pitch_rate, self.plant.roll_rate, 0.0))
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fn main() {
    let config = FlightConfig::new();
    let dt = config.dt;

    // Start nose up and rolled right.
    let sensor = SimSensor {
        plant: ToyPlant {
            pitch: 10.0_f32.to_radians(),
            roll: 5.0_f32.to_radians(),
            pitch_rate: 0.0,
            roll_rate: 0.0,
        },
    };
    let mut controller = FlightController::with_config(sensor, config);
    let mut delay = NoDelay;

    let sensor_config = controller
        .startup(&mut delay, config.clock_target_hz)
        .expect("startup");
    println!("accel full scale: {} g", sensor_config.accel_full_scale);
    controller.arm().expect("arm");

    let target = TargetState::default();
    let mut scheduler = PulseScheduler::with_config(SchedulerConfig::new());

    println!("     t,  est pitch,  est roll,     e1,     e2,     e3,     e4");
    for step in 0..=1000 {
        let speeds = controller
            .tick(&mut delay, &target, &SPEEDS)
            .expect("tick");
        controller.sensor_mut().plant.step(speeds, dt);

        if step % 100 == 0 {
            let attitude = controller.attitude();
            println!(
                "{:6.3}, {:10.3}, {:9.3}, {:6}, {:6}, {:6}, {:6}",
                step as f32 * dt,
                attitude.pitch.to_degrees(),
                attitude.roll.to_degrees(),
                speeds[0],
                speeds[1],
                speeds[2],
                speeds[3]
            );
        }
    }

    // One scheduler period against the last published speeds.
    let mut high = [0u32; 4];
    for _ in 0..scheduler.config().period {
        let levels = scheduler.tick(&SPEEDS);
        for (motor, count) in high.iter_mut().enumerate() {
            *count += u32::from(levels.is_high(motor));
        }
    }
    println!("pulse widths over one period: {:?}", high);
}
