//! Forward-Euler pose integration over piecewise-constant velocity commands.
//!
//! [`PoseIntegrator`] owns the single [`PoseState`] of an odometry node and
//! mutates it through three handlers:
//!
//! * [`PoseIntegrator::on_velocity_command`] integrates the elapsed interval,
//! * [`PoseIntegrator::on_resync`] forgets the time reference,
//! * [`PoseIntegrator::on_pose_override`] snaps position and orientation.
//!
//! The velocity carried by a command is applied over the interval that ended
//! when the command arrived, and the heading is advanced before it is used to
//! project the linear displacement. Downstream consumers depend on this exact
//! ordering, phase lag included.

use libm::{cos, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Pose, Quaternion, Stamp, Twist};

/// Everything the integrator knows about the platform.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseState {
    /// Accumulated x position in the fixed frame (m).
    pub x: f64,
    /// Accumulated y position in the fixed frame (m).
    pub y: f64,
    /// Accumulated yaw (rad), never wrapped.
    pub heading: f64,
    /// Orientation published alongside the position.
    pub orientation: Quaternion,
    /// Last commanded linear velocity (m/s), held until the next command.
    pub linear_speed: f64,
    /// Last commanded angular velocity (rad/s), held until the next command.
    pub angular_speed: f64,
    /// Time of the previous integration step; `None` until the first sample
    /// and after every resync.
    pub last_update: Option<Stamp>,
}

impl PoseState {
    /// Position and heading as a [`Pose`].
    pub fn pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.heading)
    }

    /// Held velocity as a [`Twist`].
    pub fn twist(&self) -> Twist {
        Twist::new(self.linear_speed, self.angular_speed)
    }
}

impl Default for PoseState {
    fn default() -> Self {
        PoseState {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            orientation: Quaternion::IDENTITY,
            linear_speed: 0.0,
            angular_speed: 0.0,
            last_update: None,
        }
    }
}

/// Where the integrator is within the current integration cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationPhase {
    /// No time reference; the next command is integrated over a zero interval.
    AwaitingFirstSample,
    /// A previous sample exists; the next command integrates the elapsed time.
    Integrating,
}

/// Dead-reckoning integrator holding a single [`PoseState`].
#[derive(Debug, Clone, Default)]
pub struct PoseIntegrator {
    state: PoseState,
}

impl PoseIntegrator {
    /// A fresh integrator at the origin, facing +x, awaiting its first sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &PoseState {
        &self.state
    }

    /// Copy of the current state, for publishing outside the lock.
    pub fn snapshot(&self) -> PoseState {
        self.state
    }

    /// Current phase of the integration cycle.
    pub fn phase(&self) -> IntegrationPhase {
        match self.state.last_update {
            None => IntegrationPhase::AwaitingFirstSample,
            Some(_) => IntegrationPhase::Integrating,
        }
    }

    /// Integrate a velocity command that arrived at `now`.
    ///
    /// The commanded velocity is assumed to have held over the interval since
    /// the previous command. A negative interval (clock stepped backwards) is
    /// applied as-is.
    ///
    /// # Arguments
    ///
    /// * `twist`: The commanded linear and angular velocity.
    /// * `now`: Arrival time of the command.
    ///
    /// # Returns
    ///
    /// The interval `dt` in seconds that was integrated (zero for the first
    /// sample after start or resync).
    pub fn on_velocity_command(&mut self, twist: Twist, now: Stamp) -> f64 {
        let dt = match self.state.last_update {
            Some(previous) => now.seconds_since(previous),
            None => 0.0,
        };

        let s = &mut self.state;
        s.heading += twist.wz * dt;
        let distance = twist.vx * dt;
        s.x += cos(s.heading) * distance;
        s.y += sin(s.heading) * distance;
        s.orientation = Quaternion::from_yaw(s.heading);

        s.linear_speed = twist.vx;
        s.angular_speed = twist.wz;
        s.last_update = Some(now);
        dt
    }

    /// Drop the time reference so the next command starts a fresh interval.
    ///
    /// Position, heading, orientation and held speeds are untouched.
    pub fn on_resync(&mut self) {
        self.state.last_update = None;
    }

    /// Overwrite position and orientation with an externally supplied pose.
    ///
    /// The quaternion is stored verbatim and the heading is re-derived from
    /// its yaw, so later commands integrate from the new pose. Held speeds and
    /// the time reference are untouched.
    pub fn on_pose_override(&mut self, x: f64, y: f64, orientation: Quaternion) {
        self.state.x = x;
        self.state.y = y;
        self.state.orientation = orientation;
        self.state.heading = orientation.yaw();
    }
}
