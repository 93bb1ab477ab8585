pub mod phase;
pub mod scan;
pub mod subsystems;
pub mod uat;

use ms_core::root::{Planning, RootProvider};
use ms_core::MsError;

/// The located `.planning/` corpus, or an error for commands that need one.
pub fn require_planning(provider: &dyn RootProvider) -> anyhow::Result<Planning> {
    Planning::discover(provider).ok_or_else(|| anyhow::Error::from(MsError::PlanningNotFound))
}
