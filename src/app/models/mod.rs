pub mod artifact;
pub mod seasonal;

pub use artifact::{JsonArtifactDecoder, ModelArtifact};
pub use seasonal::{ConstantPredictor, SeasonalState, SeasonalType};
