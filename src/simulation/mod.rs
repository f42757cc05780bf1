//! Simulation orchestration: return streams, seeding, and ensemble runs

pub mod historical;
pub mod orchestrator;
pub mod returns;
pub mod rng;

pub use orchestrator::{run_simulation, run_simulation_with_cancel};
pub use returns::ReturnStream;
pub use rng::SeededRng;
