//! Domain models for test-plan extraction.
//!
//! # Core Concepts
//!
//! ## Remote Entities
//!
//! - [`Plan`]: Top-level container of test organization within a project.
//! - [`Suite`]: A node in a plan's hierarchy, linked to its parent by `parent_suite_id`.
//! - [`Case`]: A test definition inside a suite, backed by a work item that carries
//!   the step and parameter payloads.
//! - [`WorkItem`]: The raw work-item record returned by the batch endpoint.
//!
//! ## Decoded Payloads
//!
//! - [`Step`], [`Parameter`], [`ParameterValueRow`]: Structured records decoded
//!   from the markup stored in a work item's fields.
//!
//! ## Execution Data
//!
//! - [`TestConfiguration`], [`TestVariable`]: Project-level configuration definitions.
//! - [`TestPoint`], [`TestResult`]: What was scheduled per suite and how its last run went.
//!
//! ## Run Output
//!
//! - [`SuiteNode`]: A visited suite with its cases and qualifying child suites.
//! - [`ExtractionResult`]: Everything one run produced, with its status and issue lists.
//!
//! All entities are transient: assembled fresh per run, identified only by the
//! remote service's own ids.

mod case;
mod execution;
mod plan;
mod run;
mod step;
mod suite;
mod work_item;

pub use case::*;
pub use execution::*;
pub use plan::*;
pub use run::*;
pub use step::*;
pub use suite::*;
pub use work_item::*;
