//! Physical planning

mod generator;
pub mod join;

pub use generator::PhysicalPlanGenerator;
pub use join::{JoinSide, JoinStrategy};
