#![no_std]
#![warn(missing_docs)]
#![doc = "A `no_std` dead-reckoning pose integrator for planar mobile robots."]
#![doc = ""]
#![doc = "This crate integrates piecewise-constant velocity commands into a 2D pose"]
#![doc = "(position + unbounded heading), keeps the matching yaw quaternion in sync,"]
#![doc = "and exposes the resync and pose-override hooks used by the odometry node."]

#[cfg(any(test, feature = "std"))]
extern crate std;

use core::f64::consts::PI;
use core::fmt;
use libm::{atan2, cos, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub mod integrator;
pub mod stamp;

pub use error::DeadReckoningError;
pub use integrator::{IntegrationPhase, PoseIntegrator, PoseState};
pub use stamp::Stamp;

/// A 2‑D pose `(x, y, θ)` in meters and radians (θ measured counter‑clockwise
/// from the x‑axis of the fixed frame).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Fixed‑frame x position (m).
    pub x: f64,
    /// Fixed‑frame y position (m).
    pub y: f64,
    /// Heading (rad). Not wrapped; accumulates across full turns.
    pub theta: f64,
}

impl Pose {
    /// Construct a new pose.
    ///
    /// # Arguments
    ///
    /// * `x`: Fixed-frame x position in meters.
    /// * `y`: Fixed-frame y position in meters.
    /// * `theta`: Heading in radians.
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose { x, y, theta }
    }

    /// The heading of this pose as a rotation about the vertical axis.
    pub fn orientation(&self) -> Quaternion {
        Quaternion::from_yaw(self.theta)
    }

    /// Normalize an angle to be within `[-PI, PI)`.
    ///
    /// Angles at `PI` will be normalized to `-PI`. The integrator never calls
    /// this on its own heading; it is meant for display and comparisons.
    ///
    /// # Arguments
    ///
    /// * `angle`: The angle in radians to normalize.
    ///
    /// # Returns
    ///
    /// The normalized angle in radians.
    pub fn normalize_angle(angle: f64) -> f64 {
        let a = angle % (2.0 * PI);
        if a >= PI {
            a - 2.0 * PI
        } else if a < -PI {
            a + 2.0 * PI
        } else {
            a
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}

/// A twist expressed in the robot base frame.
/// A twist represents the linear and angular velocities of the robot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    /// Linear x velocity (m/s) in the robot's base frame.
    pub vx: f64,
    /// Angular z velocity (rad/s) around the robot's base frame z-axis.
    pub wz: f64,
}

impl Twist {
    /// Construct a new twist.
    ///
    /// # Arguments
    ///
    /// * `vx`: Linear velocity along the robot's x-axis (m/s).
    /// * `wz`: Angular velocity around the robot's z-axis (rad/s).
    pub const fn new(vx: f64, wz: f64) -> Self {
        Twist { vx, wz }
    }
}

impl fmt::Display for Twist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(vx: {:.2} m/s, ωz: {:.2} rad/s)", self.vx, self.wz)
    }
}

/// An orientation quaternion `x i + y j + z k + w`.
///
/// For planar motion only `z` and `w` are non-zero. Values supplied by an
/// external pose override are stored verbatim and may carry roll/pitch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// i component.
    pub x: f64,
    /// j component.
    pub y: f64,
    /// k component.
    pub z: f64,
    /// Scalar component.
    pub w: f64,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    /// Construct a quaternion from raw components.
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    /// Rotation of `yaw` radians about the vertical axis (roll = pitch = 0).
    ///
    /// This is the only yaw-to-quaternion conversion used by the crate, so
    /// `Quaternion::from_yaw(h).yaw()` recovers `h` modulo `2π`.
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw * 0.5;
        Quaternion::new(0.0, 0.0, sin(half), cos(half))
    }

    /// Extract the yaw (rotation about z) in `(-PI, PI]`.
    ///
    /// Both terms scale with the squared norm, so a non-unit quaternion yields
    /// the yaw of the rotation it represents.
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = self.w * self.w + self.x * self.x - self.y * self.y - self.z * self.z;
        atan2(siny_cosp, cosy_cosp)
    }

    /// Euclidean norm of the four components.
    pub fn norm(&self) -> f64 {
        libm::sqrt(self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x: {:.3}, y: {:.3}, z: {:.3}, w: {:.3})",
            self.x, self.y, self.z, self.w
        )
    }
}
