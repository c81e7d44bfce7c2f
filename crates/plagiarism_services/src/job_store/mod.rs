//! Job store implementations

mod in_memory;

use std::sync::Arc;

pub use in_memory::InMemoryJobStore;
use plagiarism_domain::JobStore;

/// Job store shared between the orchestrator and its callers
pub type SharedJobStore = Arc<dyn JobStore>;
