//! dx365: device inventory across on-premises Active Directory, Intune and
//! Windows Autopilot.

pub mod cmd;
pub mod config;
pub mod devices;
pub mod directory;
pub mod error;
pub mod graph;
pub mod report;
pub mod session;

pub use error::{Dx365Error, Result};
