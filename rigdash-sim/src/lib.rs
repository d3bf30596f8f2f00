//! `rigdash-sim`: synthetic bus traffic without a truck.
//!
//! The simulator evolves a plausible vehicle state under a named scenario
//! (idle, highway, city, cold start, acceleration, fault injection) and
//! emits the same J1939 frames and J1708 messages a real drivetrain would,
//! at the same periods. Output goes through the [`SimSink`] callback trait;
//! the consumer timestamps frames with its own clock, exactly as it would
//! for hardware receive interrupts.
//!
//! Everything is deterministic for a given seed and sequence of
//! [`Simulator::advance`] calls, which is what makes the generator usable
//! inside tests.

pub mod encode;
pub mod scenario;
mod sim;

pub use scenario::{Scenario, VehicleState};
pub use sim::{SimSink, Simulator, TimingConfig};
