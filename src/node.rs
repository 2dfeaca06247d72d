//! Wires the estimator, its input tasks and the publisher onto a [`Bus`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::blackboard::Blackboard;
use crate::bus::Bus;
use crate::config::OdomConfig;
use crate::messages::{Odometry, PoseStamped, PoseWithCovarianceStamped, TransformStamped, Twist};
use crate::monitor::monitor_task;
use crate::publisher::OdomPublisher;
use crate::state_estimation::{apply_override, override_task, resync_task, velocity_task};

/// A running dead-reckoning node.
///
/// Must be spawned from inside a Tokio runtime.
pub struct OdomNode {
    bb: Blackboard,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<anyhow::Result<()>>)>,
    publisher: thread::JoinHandle<u64>,
}

impl OdomNode {
    pub fn spawn(config: &OdomConfig, bus: &Bus) -> anyhow::Result<Self> {
        let topics = &config.topics;
        let velocity = bus.topic::<Twist>(&topics.velocity)?;
        let resync = bus.topic::<PoseStamped>(&topics.resync)?;
        let initial_pose = bus.topic::<PoseWithCovarianceStamped>(&topics.initial_pose)?;
        let odom = bus.topic::<Odometry>(&topics.odom)?;
        let tf = bus.topic::<TransformStamped>(&topics.tf)?;

        let bb: Blackboard = Arc::default();
        if let Some(pose) = config.initial_pose {
            info!(%pose, "Applying configured initial pose.");
            apply_override(&bb, pose.x, pose.y, pose.orientation());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();
        // Subscribe before returning so nothing published after `spawn` is missed.
        tasks.push((
            "velocity",
            tokio::spawn(velocity_task(
                bb.clone(),
                topics.velocity.clone(),
                velocity.subscribe(),
                shutdown_rx.clone(),
            )),
        ));
        tasks.push((
            "resync",
            tokio::spawn(resync_task(
                bb.clone(),
                topics.resync.clone(),
                resync.subscribe(),
                shutdown_rx.clone(),
            )),
        ));
        tasks.push((
            "override",
            tokio::spawn(override_task(
                bb.clone(),
                topics.initial_pose.clone(),
                initial_pose.subscribe(),
                shutdown_rx.clone(),
            )),
        ));
        if config.monitor.interval_ms > 0 {
            tasks.push((
                "monitor",
                tokio::spawn(monitor_task(
                    topics.odom.clone(),
                    odom.subscribe(),
                    Duration::from_millis(config.monitor.interval_ms),
                    shutdown_rx,
                )),
            ));
        }

        let running = Arc::new(AtomicBool::new(true));
        let frames = &config.frames;
        let publisher = OdomPublisher::new(bb.clone(), tf, odom, &frames.odom, &frames.base)
            .spawn(config.publisher.rate_hz, Arc::clone(&running))
            .context("spawning publisher thread")?;

        info!(
            odom_frame = %config.frames.odom,
            base_frame = %config.frames.base,
            topics = ?bus.topic_names(),
            "Odometry node running."
        );
        Ok(Self {
            bb,
            running,
            shutdown_tx,
            tasks,
            publisher,
        })
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.bb
    }

    /// Ask every task and the publisher thread to stop after their current cycle.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        // Err only means every input task already exited.
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for everything to stop. Call [`OdomNode::shutdown`] first.
    pub async fn join(self) -> anyhow::Result<()> {
        let mut first_error = None;
        for (name, task) in self.tasks {
            let outcome = match task.await {
                Ok(result) => result,
                Err(join_err) => Err(anyhow!(join_err)),
            };
            if let Err(e) = outcome {
                error!(task = name, error = ?e, "Task failed.");
                if first_error.is_none() {
                    first_error = Some(e.context(format!("{name} task")));
                }
            }
        }

        let publisher = self.publisher;
        match tokio::task::spawn_blocking(move || publisher.join()).await? {
            Ok(cycles) => info!(cycles, "Odometry node stopped."),
            Err(_) => {
                error!("Publisher thread panicked.");
                if first_error.is_none() {
                    first_error = Some(anyhow!("publisher thread panicked"));
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::snapshot;
    use aurus_dead_reckoning::{IntegrationPhase, Pose, Quaternion};
    use std::f64::consts::FRAC_PI_2;

    fn test_config() -> OdomConfig {
        let mut config = OdomConfig::default();
        config.publisher.rate_hz = Some(500.0);
        config.bus.capacity = 64;
        config
    }

    async fn eventually(mut ready: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !ready() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn end_to_end_override_resync_and_publish() {
        let config = test_config();
        let bus = Bus::new(config.bus.capacity).unwrap();
        let node = OdomNode::spawn(&config, &bus).unwrap();
        let bb = node.blackboard().clone();

        let mut odom_rx = bus.topic::<Odometry>(&config.topics.odom).unwrap().subscribe();
        let override_topic = bus
            .topic::<PoseWithCovarianceStamped>(&config.topics.initial_pose)
            .unwrap();
        let velocity = bus.topic::<Twist>(&config.topics.velocity).unwrap();
        let goal = bus.topic::<PoseStamped>(&config.topics.resync).unwrap();

        // Snap to (5, 5) facing +y; the publisher must echo it exactly.
        let q = Quaternion::from_yaw(FRAC_PI_2);
        override_topic.publish(PoseWithCovarianceStamped::planar("odom", 5.0, 5.0, q));
        eventually(|| snapshot(&bb).x == 5.0).await;

        let published = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match odom_rx.recv().await {
                    Ok(odom) if odom.pose.position.x == 5.0 => return odom,
                    Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(e) => panic!("odometry topic closed: {e}"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(published.pose.position.y, 5.0);
        assert_eq!(published.pose.orientation, q);
        assert_eq!(published.header.frame_id, "odom");
        assert_eq!(published.child_frame_id, "base_footprint");

        // Drive forward from the overridden pose.
        velocity.publish(Twist::planar(1.0, 0.0));
        eventually(|| bb.read().phase() == IntegrationPhase::Integrating).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        velocity.publish(Twist::planar(1.0, 0.0));
        eventually(|| snapshot(&bb).y > 5.0).await;
        let s = snapshot(&bb);
        assert!((s.x - 5.0).abs() < 1e-9);

        // A new goal restarts the interval without moving the pose.
        goal.publish(PoseStamped::default());
        eventually(|| bb.read().phase() == IntegrationPhase::AwaitingFirstSample).await;
        assert_eq!(snapshot(&bb).pose(), s.pose());

        node.shutdown();
        node.join().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn configured_initial_pose_is_applied_before_start() {
        let mut config = test_config();
        config.initial_pose = Some(Pose::new(-1.0, 2.0, 0.5));
        config.monitor.interval_ms = 0;
        let bus = Bus::new(config.bus.capacity).unwrap();

        let node = OdomNode::spawn(&config, &bus).unwrap();
        let s = snapshot(node.blackboard());
        assert_eq!((s.x, s.y), (-1.0, 2.0));
        assert!((s.heading - 0.5).abs() < 1e-9);
        assert_eq!(node.blackboard().read().phase(), IntegrationPhase::AwaitingFirstSample);

        node.shutdown();
        node.join().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn topic_type_clash_fails_startup() {
        let config = test_config();
        let bus = Bus::new(config.bus.capacity).unwrap();
        bus.topic::<String>(&config.topics.odom).unwrap();

        assert!(OdomNode::spawn(&config, &bus).is_err());
    }
}
