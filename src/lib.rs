//! Dead-reckoning odometry node.
//!
//! Integrates velocity commands into a planar pose and republishes it as a
//! frame transform plus an odometry record on an in-process [`bus::Bus`].
//! External producers and consumers share the same bus; see [`node::OdomNode`].

pub mod blackboard; // shared pose estimate behind a lock
pub mod bus; // named broadcast topics
pub mod config;
pub mod messages;
pub mod monitor;
pub mod node;
pub mod publisher;
pub mod state_estimation; // inbound topic handlers

pub use node::OdomNode;
