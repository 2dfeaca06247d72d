use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::messages::Odometry;

/// Logs the published odometry at most once per `interval`.
///
/// The publisher usually outruns this subscriber, so lag is expected and only
/// logged at debug level.
pub async fn monitor_task(
    topic: String,
    mut rx: broadcast::Receiver<Arc<Odometry>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!(%topic, ?interval, "Odometry monitor started.");
    let mut last_report: Option<Instant> = None;
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            msg = rx.recv() => match msg {
                Ok(odom) => {
                    if last_report.is_some_and(|at| at.elapsed() < interval) {
                        continue;
                    }
                    last_report = Some(Instant::now());
                    let p = odom.pose.position;
                    info!(
                        frame = %odom.header.frame_id,
                        stamp = %odom.header.stamp,
                        x = p.x,
                        y = p.y,
                        yaw = odom.pose.orientation.yaw(),
                        vx = odom.twist.linear.x,
                        wz = odom.twist.angular.z,
                        "Odometry"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Odometry monitor skipped messages.");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    info!("Odometry monitor stopped.");
    Ok(())
}
