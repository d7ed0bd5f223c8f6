//! Shared domain types for the Gale ingest orchestrator.
//!
//! Everything that more than one crate needs to agree on lives here:
//! run identity ([`RunId`]), artifact identity ([`ArtifactDescriptor`],
//! [`ArtifactKind`], [`ForecastOffset`]), the path classifier
//! ([`classify`]), and the grouping/pairing keys ([`GroupKey`],
//! [`PairKey`]).

pub mod artifact;
pub mod run;

pub use artifact::{
    classify, ArtifactDescriptor, ArtifactKind, ForecastOffset, ForecastOffsetError, GroupKey,
    PairKey,
};
pub use run::{RunId, RunIdError, ELIGIBLE_HOURS};
