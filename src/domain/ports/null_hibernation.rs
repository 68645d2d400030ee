//! Null hibernation manager implementation.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::hibernation::HibernationKind;
use super::hibernation_manager::{HibernationManager, HibernationObserver};

/// A hibernation manager that accepts every request and moves nothing.
#[derive(Debug, Clone, Default)]
pub struct NullHibernationManager;

impl NullHibernationManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HibernationManager for NullHibernationManager {
    async fn prepare_util(
        &self,
        _kind: HibernationKind,
        _bucket: &str,
        _region: &str,
        _rate_limit: u64,
        _dry_run: bool,
    ) -> OrchestratorResult<()> {
        Ok(())
    }

    async fn start_hibernation(
        &self,
        _dry_run: bool,
        _bucket: &str,
        _remote_path: &str,
        _kind: HibernationKind,
        _observer: Box<dyn HibernationObserver>,
    ) -> OrchestratorResult<()> {
        Ok(())
    }

    fn stop_hibernation_task(&self) {}

    fn reset_bucket_tracked(&self) {}
}
