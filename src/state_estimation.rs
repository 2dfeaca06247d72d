//! Input tasks feeding the dead-reckoning estimator.
//!
//! One task per inbound topic. Each task holds the blackboard write lock for a
//! single handler call and never across an `.await`.

use std::sync::Arc;

use aurus_dead_reckoning::{Quaternion, Stamp};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::blackboard::{self, Blackboard};
use crate::bus::next_message;
use crate::messages::{PoseStamped, PoseWithCovarianceStamped, Twist};

/// Overrides whose quaternion norm strays further than this from 1 get a warning.
const UNIT_NORM_TOLERANCE: f64 = 1e-3;

/// Feed every message on `rx` to `handle` until shutdown or until the topic closes.
async fn drain<T, F>(
    topic: &str,
    mut rx: broadcast::Receiver<Arc<T>>,
    mut shutdown: watch::Receiver<bool>,
    mut handle: F,
) -> anyhow::Result<()>
where
    T: Send + Sync + 'static,
    F: FnMut(&T),
{
    info!(topic, "Input task started.");
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            msg = next_message(&mut rx, topic) => match msg {
                Some(msg) => handle(msg.as_ref()),
                None => {
                    warn!(topic, "Topic closed; input task exiting.");
                    break;
                }
            }
        }
    }
    info!(topic, "Input task stopped.");
    Ok(())
}

pub async fn velocity_task(
    bb: Blackboard,
    topic: String,
    rx: broadcast::Receiver<Arc<Twist>>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    drain(&topic, rx, shutdown, |msg: &Twist| {
        let now = Stamp::now();
        let twist: aurus_dead_reckoning::Twist = msg.into();
        let dt = blackboard::apply_velocity(&bb, twist, now);
        if dt < 0.0 {
            warn!(dt, %now, "Clock went backwards; integrating negative interval as-is.");
        }
        debug!(vx = twist.vx, wz = twist.wz, dt, "Integrated velocity command");
    })
    .await
}

pub async fn resync_task(
    bb: Blackboard,
    topic: String,
    rx: broadcast::Receiver<Arc<PoseStamped>>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    drain(&topic, rx, shutdown, |goal: &PoseStamped| {
        blackboard::resync(&bb);
        info!(
            goal_frame = %goal.header.frame_id,
            goal_x = goal.pose.position.x,
            goal_y = goal.pose.position.y,
            "New goal received; next velocity command starts a fresh interval."
        );
    })
    .await
}

pub async fn override_task(
    bb: Blackboard,
    topic: String,
    rx: broadcast::Receiver<Arc<PoseWithCovarianceStamped>>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    drain(&topic, rx, shutdown, |msg: &PoseWithCovarianceStamped| {
        let pose = &msg.pose.pose;
        apply_override(&bb, pose.position.x, pose.position.y, pose.orientation);
    })
    .await
}

/// Shared by the override topic and the configured start-up pose.
pub fn apply_override(bb: &Blackboard, x: f64, y: f64, orientation: Quaternion) {
    let norm = orientation.norm();
    if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
        warn!(norm, "Override orientation is not a unit quaternion; storing it as given.");
    }
    blackboard::override_pose(bb, x, y, orientation);
    info!(x, y, yaw = orientation.yaw(), "Pose overridden.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Bus, Topic};
    use aurus_dead_reckoning::IntegrationPhase;
    use std::time::Duration;

    async fn wait_for(bb: &Blackboard, mut ready: impl FnMut(&Blackboard) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !ready(bb) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("blackboard never reached the expected state");
    }

    #[tokio::test]
    async fn override_task_snaps_pose() {
        let bus = Bus::new(8).unwrap();
        let topic: Topic<PoseWithCovarianceStamped> = bus.topic("/initialpose").unwrap();
        let bb: Blackboard = Arc::default();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(override_task(
            bb.clone(),
            "/initialpose".into(),
            topic.subscribe(),
            stop_rx,
        ));

        let q = Quaternion::from_yaw(std::f64::consts::FRAC_PI_2);
        topic.publish(PoseWithCovarianceStamped::planar("map", 5.0, 5.0, q));
        wait_for(&bb, |bb| blackboard::snapshot(bb).x == 5.0).await;

        let s = blackboard::snapshot(&bb);
        assert_eq!((s.x, s.y), (5.0, 5.0));
        assert_eq!(s.orientation, q);

        stop_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn resync_task_clears_time_reference() {
        let bus = Bus::new(8).unwrap();
        let topic: Topic<PoseStamped> = bus.topic("/goal").unwrap();
        let bb: Blackboard = Arc::default();
        blackboard::apply_velocity(&bb, aurus_dead_reckoning::Twist::new(1.0, 0.0), Stamp::now());
        assert_eq!(bb.read().phase(), IntegrationPhase::Integrating);

        let (_stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(resync_task(
            bb.clone(),
            "/goal".into(),
            topic.subscribe(),
            stop_rx,
        ));
        topic.publish(PoseStamped::default());
        wait_for(&bb, |bb| bb.read().phase() == IntegrationPhase::AwaitingFirstSample).await;

        // Dropping every publisher closes the topic and ends the task.
        drop(topic);
        drop(bus);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn velocity_task_integrates_with_wall_clock() {
        let bus = Bus::new(8).unwrap();
        let topic: Topic<Twist> = bus.topic("/cmd_vel").unwrap();
        let bb: Blackboard = Arc::default();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(velocity_task(
            bb.clone(),
            "/cmd_vel".into(),
            topic.subscribe(),
            stop_rx,
        ));

        topic.publish(Twist::planar(1.0, 0.0));
        wait_for(&bb, |bb| bb.read().phase() == IntegrationPhase::Integrating).await;
        assert_eq!(blackboard::snapshot(&bb).x, 0.0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        topic.publish(Twist::planar(1.0, 0.0));
        wait_for(&bb, |bb| blackboard::snapshot(bb).x > 0.0).await;

        let s = blackboard::snapshot(&bb);
        assert!(s.x >= 0.04, "integrated only {} m", s.x);
        assert_eq!(s.linear_speed, 1.0);

        stop_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }
}
