//! Route handlers grouped by resource.

pub mod players;
pub mod reports;
pub mod servers;
