#![doc = "popscale public API"]
mod aggregate;
mod config;
mod error;
mod hierarchy;
mod rebalance;
mod rescale;
mod splice;
mod store;

pub mod io;
pub mod records;
pub mod script;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use config::{Conventions, ScaleConfig};

#[doc(inline)]
pub use hierarchy::{Hierarchy, Node, NodeId, NodeKind, Resolution, Target};

#[doc(inline)]
pub use store::{LeafRecord, LeafStore, Renderer, SubEntry};

#[doc(inline)]
pub use aggregate::{Aggregate, ResolutionResult, aggregate};

#[doc(inline)]
pub use rescale::{RescaleOutcome, rescale};

#[doc(inline)]
pub use splice::{Splice, splice};

#[doc(inline)]
pub use rebalance::{ImportPlan, ImportSummary, Inspection, Rebalancer, RunSummary, ScalePlan, default_annotation};
