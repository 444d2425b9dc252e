//! # pubsim — Theory Publication Optimizer
//!
//! Simulation engine for incremental-game theory progression: each theory
//! accumulates a currency whose log10 magnitude spans hundreds of orders,
//! so all arithmetic runs in log space. A simulation steps a tick loop —
//! currency growth, milestone allocation, variable purchases — and watches
//! the tau/hour rate to find the best publication point; coasting
//! strategies fork the run at candidate stopping points and keep the best
//! outcome.
//!
//! The crate splits into the generic engine ([`engine`], [`variable`],
//! [`logspace`]) and per-theory plug-ins ([`theory`]) wired together by the
//! request drivers in [`runner`] and the strategy catalogs in [`strategy`].

pub mod currency;
pub mod engine;
pub mod format;
pub mod logspace;
pub mod progress;
pub mod result;
pub mod runner;
pub mod settings;
pub mod strategy;
pub mod theory;
pub mod variable;

pub use engine::{Sim, SimCore, TheoryData, TheoryModel};
pub use progress::{CancelFlag, Progress, RunContext};
pub use result::SimResult;
pub use settings::Settings;
pub use theory::TheoryId;
