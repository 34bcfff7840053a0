//! Post-hoc identification of ideal-point posterior draws.
//!
//! Latent-trait posteriors are invariant to affine maps of the trait scale,
//! so raw draws have arbitrary location, spread, and polarity; chains (and
//! individual draws) can disagree about which end of the scale is which.
//! This crate pins the scale after sampling: two anchor persons are mapped
//! exactly onto target values in every draw by an exact per-draw affine
//! solve, which flips reversed draws as a side effect.
//!
//! Anchors can be given explicitly or selected automatically as the two
//! most extreme persons of an unidentified fit. The [`resolve`] driver
//! wraps the whole procedure, refitting with fresh seeds when a sampling
//! fit fails its convergence guard.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use solon_data::{read_csv, ReaderConfig};
//! use solon_engine::{EngineConfig, LaplaceEngine};
//! use solon_identify::{resolve, IdentifyConfig};
//! use solon_model::{ModelSpec, ModelType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = read_csv(Path::new("votes.csv"), &ReaderConfig::new())?;
//! let spec = ModelSpec::new(ModelType::Binary);
//! let (draws, report) = resolve(
//!     &LaplaceEngine::new(),
//!     &data,
//!     &spec,
//!     &EngineConfig::new(),
//!     &IdentifyConfig::new(),
//!     42,
//! )?;
//! println!("anchored {} and {}", report.anchors.high, report.anchors.low);
//! # let _ = draws;
//! # Ok(())
//! # }
//! ```

pub mod anchors;
pub mod config;
pub mod error;
pub mod resolve;
pub mod transform;

pub use anchors::select_anchors;
pub use config::{AnchorPair, AnchorTargets, IdentifyConfig};
pub use error::IdentifyError;
pub use resolve::{identify_draws, resolve, IdentifyReport, IdentifyState};
pub use transform::{apply_affine, apply_variance_cap, AffineSummary};
