//! sitegrade: audits a website and grades it.
//!
//! An audit crawls a bounded set of same-site pages, optionally asks external
//! providers for lab vitals and authority signals, evaluates a fixed metric
//! catalogue over the collected facts, and folds the results into category
//! scores, an overall score and a letter grade with a coverage qualifier.
//!
//! ```no_run
//! use sitegrade::{AuditConfig, Engine, EngineSettings, Target};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), sitegrade::EngineError> {
//! let engine = Engine::new(EngineSettings::default())?;
//! let target = Target::new("example.com", AuditConfig::default())?;
//! let result = engine.run_audit(&target, CancellationToken::new()).await?;
//! println!("{}", result.outcome.label());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crawl;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod metrics;
pub mod model;
pub mod providers;
pub mod scoring;

pub use config::{AuditConfig, CancelPolicy, ProviderCredentials, PsiStrategy, Target};
pub use engine::{Engine, EngineSettings};
pub use error::EngineError;
pub use metrics::{catalogue_export, CatalogueExport, CATALOGUE, CATALOGUE_VERSION};
pub use model::{AuditReport, AuditResult, Completion, StopReason};
pub use scoring::{Grade, GradeOutcome, ScoringPolicy};
