// src/lib.rs

pub mod agent;
pub mod context;
pub mod driver;
pub mod error;
pub mod memory;
pub mod model;
pub mod protocol;
pub mod report;
pub mod validation;

pub use error::{DriverError, ProbeError, Result};
