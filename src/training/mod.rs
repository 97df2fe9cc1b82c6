//! Forest training: bootstrap sampling, tree growing and orchestration.

mod grower;
pub mod logger;
mod sampling;
mod trainer;

pub use grower::TreeGrower;
pub use logger::{TrainingLogger, Verbosity};
pub use sampling::{BootstrapAssignment, BootstrapSampler};
pub use trainer::{ForestTrainer, TrainError};
