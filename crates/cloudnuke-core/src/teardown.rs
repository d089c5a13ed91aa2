//! Pre-delete teardown protocols
//!
//! A role-like resource may need `detach-policies -> delete-inline-policies ->
//! remove-from-instance-profiles` before it can be deleted; a service-like
//! resource may need `scale-to-zero -> wait-for-stable`. Steps run strictly in
//! order and the first failure stops the protocol.

use crate::error::{NukeError, Result};
use crate::resource::Scope;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// One step of a teardown protocol
#[async_trait]
pub trait TeardownStep: Send + Sync {
    /// Step name used in logs and errors (e.g., "detach-policies")
    fn name(&self) -> &str;

    async fn run(&self, scope: &Scope, identifier: &str) -> Result<()>;
}

/// Run every step in declared order
///
/// Returns [`NukeError::TeardownStep`] naming the first failing step; the
/// remaining steps are not run.
pub async fn run_teardown(
    steps: &[Arc<dyn TeardownStep>],
    scope: &Scope,
    identifier: &str,
) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        debug!(
            identifier = %identifier,
            region = %scope,
            step = %step.name(),
            position = index + 1,
            total = steps.len(),
            "Running teardown step"
        );

        if let Err(e) = step.run(scope, identifier).await {
            warn!(
                identifier = %identifier,
                region = %scope,
                step = %step.name(),
                error = %e,
                "Teardown step failed"
            );
            return Err(NukeError::TeardownStep {
                step: step.name().to_string(),
                identifier: identifier.to_string(),
                message: e.to_string(),
            });
        }
    }
    Ok(())
}
