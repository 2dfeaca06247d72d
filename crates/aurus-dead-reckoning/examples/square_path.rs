use aurus_dead_reckoning::*;
use core::f64::consts::FRAC_PI_2;

fn main() {
    let mut integrator = PoseIntegrator::new();
    let dt = 0.1; // Time between commands in seconds
    let steps_per_leg = 10;

    // Each leg: one second straight at 1 m/s, then one second turning left at PI/2 rad/s.
    let mut script = Vec::new();
    for _ in 0..4 {
        script.extend(std::iter::repeat_n(Twist::new(1.0, 0.0), steps_per_leg));
        script.extend(std::iter::repeat_n(Twist::new(0.0, FRAC_PI_2), steps_per_leg));
    }

    println!("Driving a 1 m square with {} commands at {} s spacing", script.len(), dt);
    println!("  Initial State: {:?}", integrator.state());

    // The first command only establishes the time reference.
    for (i, twist) in script.iter().enumerate() {
        let now = match Stamp::from_secs_f64(i as f64 * dt) {
            Ok(stamp) => stamp,
            Err(e) => {
                eprintln!("Bad timestamp at step {}: {}", i, e);
                return;
            }
        };
        integrator.on_velocity_command(*twist, now);
        if (i + 1) % steps_per_leg == 0 {
            let s = integrator.state();
            println!("Step {:>2}: Pose: {}  q: {}", i + 1, s.pose(), s.orientation);
        }
    }

    let end = integrator.state();
    println!("\nFinal Pose: {}", end.pose());
    println!(
        "Heading wrapped to [-PI, PI): {:.3} rad (accumulated {:.3} rad)",
        Pose::normalize_angle(end.heading),
        end.heading
    );
}
