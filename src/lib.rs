//! oci-context: named OCI contexts (profile, tenancy, compartment, region).
//!
//! A YAML context store shared by the CLI, an interactive picker that drills
//! through compartments lazily, and a Unix-socket daemon that serves the same
//! store to other processes.

pub mod cli;
pub mod cloud;
pub mod daemon;
pub mod ipc;
pub mod logging;
pub mod profiles;
pub mod store;
pub mod tui;
