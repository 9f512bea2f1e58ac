#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![allow(missing_docs)]

pub mod collector;
pub mod engine;
pub mod error;
pub mod fees;
pub mod fork_choice;
pub mod ordering;
pub mod traits;

pub use collector::VoteCollector;
pub use engine::Engine;
pub use error::EngineError;
pub use fork_choice::ForkChoice;
