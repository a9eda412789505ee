//! Probabilistic model: discrete network, CPT derivation and exact inference.

pub mod builder;
pub mod cpt;
pub mod elimination;
pub mod factor;
pub mod network;

pub use builder::{build_network, ModelConfig};
pub use cpt::Cpt;
pub use elimination::{posterior, ranked_posteriors, DiseasePosterior, EliminationOrder};
pub use factor::Factor;
pub use network::{DiseaseNetwork, Evidence, State};
