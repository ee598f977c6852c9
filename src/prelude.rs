pub use crate::common::{ReferenceWindow, Signal};
pub use crate::detect::{detect, DetectQuery, Detector};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::hmm::common::PHMMModel;
pub use crate::hmm::params::{ModelType, TransProb, TransitionMatrix};
pub use crate::kmer::PoreModel;
pub use crate::prob::{lp, p, Prob};
pub use crate::train::{train, TrainConfig, TrainedModel, Trainer};
