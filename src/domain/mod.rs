//! Business rules as methods on the entities plus pure aggregate functions.
//! Nothing in here touches the store; callers pass the clock in.

pub mod attendance;
pub mod availability;
pub mod contracts;
pub mod evaluations;
pub mod lessons;
pub mod payments;
pub mod plans;
pub mod roster;
pub mod students;
pub mod users;

pub use roster::slots_conflict;
pub use users::Action;
