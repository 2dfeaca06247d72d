use spin_sleep::SpinSleeper;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use aurus_dead_reckoning::Stamp;
use tracing::info;

use crate::blackboard::{Blackboard, snapshot};
use crate::bus::Topic;
use crate::messages::{Odometry, TransformStamped};

/// Republishes the blackboard pose as a transform and an odometry record.
pub struct OdomPublisher {
    bb: Blackboard,
    tf: Topic<TransformStamped>,
    odom: Topic<Odometry>,
    parent_frame: String,
    child_frame: String,
}

impl OdomPublisher {
    pub fn new(
        bb: Blackboard,
        tf: Topic<TransformStamped>,
        odom: Topic<Odometry>,
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
    ) -> Self {
        Self {
            bb,
            tf,
            odom,
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
        }
    }

    /// One publish cycle: both messages come from a single snapshot and share a stamp.
    pub fn publish_once(&self) {
        let state = snapshot(&self.bb);
        let stamp = Stamp::now();
        self.tf.publish(TransformStamped::from_state(
            &state,
            stamp,
            &self.parent_frame,
            &self.child_frame,
        ));
        self.odom.publish(Odometry::from_state(
            &state,
            stamp,
            &self.parent_frame,
            &self.child_frame,
        ));
    }

    /// Run on a dedicated thread until `running` is cleared.
    ///
    /// With `rate_hz == None` the loop only yields between cycles. The flag is
    /// checked between cycles, never between the two messages of one cycle.
    /// The handle yields the number of completed cycles. A rate that is not a
    /// positive finite number is rejected with [`io::ErrorKind::InvalidInput`].
    pub fn spawn(
        self,
        rate_hz: Option<f64>,
        running: Arc<AtomicBool>,
    ) -> io::Result<JoinHandle<u64>> {
        let period = rate_hz.map(publish_period).transpose()?;
        thread::Builder::new().name("odom-publisher".into()).spawn(move || {
            info!(?period, "Publisher thread started.");
            let sleeper = SpinSleeper::new(100_000);
            let mut cycles: u64 = 0;
            while running.load(Ordering::Acquire) {
                let started = Instant::now();
                self.publish_once();
                cycles += 1;
                match period {
                    Some(period) => {
                        if let Some(remaining) = period.checked_sub(started.elapsed()) {
                            sleeper.sleep(remaining);
                        }
                    }
                    None => thread::yield_now(),
                }
            }
            info!(cycles, "Publisher thread stopped.");
            cycles
        })
    }
}

fn publish_period(rate_hz: f64) -> io::Result<Duration> {
    Duration::try_from_secs_f64(1.0 / rate_hz)
        .ok()
        .filter(|_| rate_hz.is_finite() && rate_hz > 0.0)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("publish rate must be a positive number, got {rate_hz} Hz"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use aurus_dead_reckoning::Quaternion;

    fn publisher(bus: &Bus, bb: &Blackboard) -> OdomPublisher {
        OdomPublisher::new(
            Arc::clone(bb),
            bus.topic("/tf").unwrap(),
            bus.topic("odom").unwrap(),
            "odom",
            "base_footprint",
        )
    }

    #[test]
    fn publish_once_emits_matching_pair() {
        let bus = Bus::new(4).unwrap();
        let bb: Blackboard = Arc::default();
        let q = Quaternion::from_yaw(std::f64::consts::FRAC_PI_2);
        bb.write().on_pose_override(5.0, 5.0, q);

        let mut tf_rx = bus.topic::<TransformStamped>("/tf").unwrap().subscribe();
        let mut odom_rx = bus.topic::<Odometry>("odom").unwrap().subscribe();
        publisher(&bus, &bb).publish_once();

        let tf = tf_rx.try_recv().unwrap();
        let odom = odom_rx.try_recv().unwrap();
        assert_eq!(tf.header.stamp, odom.header.stamp);
        assert_eq!(tf.header.frame_id, "odom");
        assert_eq!(tf.child_frame_id, "base_footprint");
        assert_eq!((tf.transform.translation.x, tf.transform.translation.y), (5.0, 5.0));
        assert_eq!(tf.transform.rotation, q);
        assert_eq!((odom.pose.position.x, odom.pose.position.y), (5.0, 5.0));
        assert_eq!(odom.pose.orientation, q);
    }

    #[test]
    fn thread_stops_when_flag_clears() {
        let bus = Bus::new(1024).unwrap();
        let bb: Blackboard = Arc::default();
        let mut odom_rx = bus.topic::<Odometry>("odom").unwrap().subscribe();
        let running = Arc::new(AtomicBool::new(true));

        let handle = publisher(&bus, &bb).spawn(Some(200.0), Arc::clone(&running)).unwrap();
        thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::Release);
        let cycles = handle.join().unwrap();

        assert!(cycles >= 1);
        assert!(odom_rx.try_recv().is_ok());
    }

    #[test]
    fn invalid_rates_are_rejected_without_spawning() {
        let bus = Bus::new(4).unwrap();
        let bb: Blackboard = Arc::default();
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let running = Arc::new(AtomicBool::new(true));
            let err = publisher(&bus, &bb).spawn(Some(rate), running).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn unthrottled_loop_publishes_many_cycles() {
        let bus = Bus::new(4).unwrap();
        let bb: Blackboard = Arc::default();
        let running = Arc::new(AtomicBool::new(true));

        let handle = publisher(&bus, &bb).spawn(None, Arc::clone(&running)).unwrap();
        thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::Release);

        assert!(handle.join().unwrap() > 10);
    }
}
