#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![allow(missing_docs)]

pub mod chain;
pub mod node;
pub mod sync;

pub use node::Node;
