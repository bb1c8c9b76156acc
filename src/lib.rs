//! Control-plane core of a LISP (Locator/ID Separation Protocol) mobile
//! node.
//!
//! This crate owns the dual-stack address abstraction and its wire forms,
//! the AFI translation tables, the prefix arithmetic used for EID and
//! locator matching, and the loop which receives LISP control messages and
//! routes them to per-type handlers. The handlers themselves, the mapping
//! database, authentication and interface management are collaborators
//! behind the traits in [`dispatcher`] and [`resolve`].

pub mod address;
pub mod afi;
pub mod config;
pub mod dispatcher;
pub mod message;
pub mod prefix;
pub mod resolve;
pub mod server_list;

/// The well-known UDP port of the LISP control plane.
pub const CONTROL_PORT: u16 = 4342;
