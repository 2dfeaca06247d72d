use parking_lot::RwLock;
use std::sync::Arc;

use aurus_dead_reckoning::{PoseIntegrator, PoseState, Quaternion, Stamp, Twist};

/// The node's single pose estimate. Every handler holds the write lock for
/// exactly one update; the publisher holds the read lock only to copy a snapshot.
pub type Blackboard = Arc<RwLock<PoseIntegrator>>;

pub fn snapshot(bb: &Blackboard) -> PoseState {
    bb.read().snapshot()
}

/// Returns the interval that was integrated, in seconds.
pub fn apply_velocity(bb: &Blackboard, twist: Twist, now: Stamp) -> f64 {
    bb.write().on_velocity_command(twist, now)
}

pub fn resync(bb: &Blackboard) {
    bb.write().on_resync();
}

pub fn override_pose(bb: &Blackboard, x: f64, y: f64, orientation: Quaternion) {
    bb.write().on_pose_override(x, y, orientation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurus_dead_reckoning::IntegrationPhase;
    use std::thread;

    #[test]
    fn snapshots_are_never_torn() {
        let bb: Blackboard = Arc::default();
        let writer = {
            let bb = Arc::clone(&bb);
            thread::spawn(move || {
                for i in 0..2_000 {
                    let v = i as f64;
                    override_pose(&bb, v, v, Quaternion::from_yaw(v));
                }
            })
        };

        for _ in 0..2_000 {
            let s = snapshot(&bb);
            // Position and orientation always come from the same override.
            assert_eq!(s.x, s.y);
            assert_eq!(s.orientation, Quaternion::from_yaw(s.x));
        }
        writer.join().unwrap();
    }

    #[test]
    fn handlers_route_to_the_integrator() {
        let bb: Blackboard = Arc::default();
        let t0 = Stamp::new(1, 0).unwrap();
        let t1 = Stamp::new(3, 0).unwrap();

        assert_eq!(apply_velocity(&bb, Twist::new(1.0, 0.0), t0), 0.0);
        assert!((apply_velocity(&bb, Twist::new(1.0, 0.0), t1) - 2.0).abs() < 1e-9);
        assert!((snapshot(&bb).x - 2.0).abs() < 1e-9);

        resync(&bb);
        assert_eq!(bb.read().phase(), IntegrationPhase::AwaitingFirstSample);
    }
}
