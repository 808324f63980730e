//! Background Tasks Module
//!
//! Contains background tasks that run periodically during daemon operation.
//!
//! # Tasks
//! - Maintenance: expiry sweep, memory rebalancing and auto-persistence

mod maintenance;

pub use maintenance::{spawn_maintenance_task, MaintenanceScheduler, SweepReport, TickReport};
