//! Typed messages exchanged on the bus.
//!
//! Field layout follows the familiar `geometry_msgs` / `nav_msgs` shapes so
//! velocity producers and pose consumers can be written against it directly.

use aurus_dead_reckoning::{self as dr, PoseState, Stamp};

pub use aurus_dead_reckoning::Quaternion;

/// Timestamp and coordinate frame of a message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: String,
}

impl Header {
    pub fn new(stamp: Stamp, frame_id: impl Into<String>) -> Self {
        Header {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// A free vector; always anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A position in free space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Velocity in free space, split into linear and angular parts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    /// Planar command: forward speed and yaw rate.
    pub fn planar(linear_x: f64, angular_z: f64) -> Self {
        Twist {
            linear: Vector3 { x: linear_x, ..Default::default() },
            angular: Vector3 { z: angular_z, ..Default::default() },
        }
    }
}

impl From<&Twist> for dr::Twist {
    fn from(msg: &Twist) -> Self {
        dr::Twist::new(msg.linear.x, msg.angular.z)
    }
}

/// A pose with reference frame and timestamp. Used as the navigation goal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// A pose with its 6x6 row-major covariance (x, y, z, roll, pitch, yaw).
#[derive(Debug, Clone, PartialEq)]
pub struct PoseWithCovariance {
    pub pose: Pose,
    pub covariance: [f64; 36],
}

impl Default for PoseWithCovariance {
    fn default() -> Self {
        PoseWithCovariance {
            pose: Pose::default(),
            covariance: [0.0; 36],
        }
    }
}

/// Operator- or localizer-supplied pose estimate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseWithCovarianceStamped {
    pub header: Header,
    pub pose: PoseWithCovariance,
}

impl PoseWithCovarianceStamped {
    /// Planar pose estimate in `frame_id` with zero covariance.
    pub fn planar(frame_id: impl Into<String>, x: f64, y: f64, orientation: Quaternion) -> Self {
        PoseWithCovarianceStamped {
            header: Header::new(Stamp::default(), frame_id),
            pose: PoseWithCovariance {
                pose: Pose {
                    position: Point { x, y, z: 0.0 },
                    orientation,
                },
                ..Default::default()
            },
        }
    }
}

/// Rigid transform: translation followed by rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

/// Transform from `header.frame_id` to `child_frame_id` at `header.stamp`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: Transform,
}

impl TransformStamped {
    /// Transform of the moving frame `child` within the fixed frame `parent`.
    pub fn from_state(state: &PoseState, stamp: Stamp, parent: &str, child: &str) -> Self {
        TransformStamped {
            header: Header::new(stamp, parent),
            child_frame_id: child.to_owned(),
            transform: Transform {
                translation: Vector3 { x: state.x, y: state.y, z: 0.0 },
                rotation: state.orientation,
            },
        }
    }
}

/// Pose in `header.frame_id` plus velocity in `child_frame_id`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Odometry {
    pub header: Header,
    pub child_frame_id: String,
    pub pose: Pose,
    pub twist: Twist,
}

impl Odometry {
    pub fn from_state(state: &PoseState, stamp: Stamp, parent: &str, child: &str) -> Self {
        Odometry {
            header: Header::new(stamp, parent),
            child_frame_id: child.to_owned(),
            pose: Pose {
                position: Point { x: state.x, y: state.y, z: 0.0 },
                orientation: state.orientation,
            },
            twist: Twist::planar(state.linear_speed, state.angular_speed),
        }
    }
}
