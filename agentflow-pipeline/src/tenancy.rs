// agentflow-pipeline/src/tenancy.rs
// ============================================================================
// Module: Tenancy Context (C12)
// Description: Wraps a backend-agnostic TenancyStore with the one admission
//              check the pipeline's Preflight stage needs.
// Purpose: Keep the pipeline programmed against the trait, never a concrete
//          store, so agentflow-cli can wire in whichever TenancyStore it
//          chooses.
// Dependencies: agentflow-core
// ============================================================================

use std::sync::Arc;

use agentflow_core::QuotaDecision;
use agentflow_core::TenancyError;
use agentflow_core::TenancyStore;

/// The per-run cost, in quota units, charged at Preflight. The orchestrator
/// does not meter token usage into the tenancy quota (that is the rate
/// limiter's job); this is a flat admission cost of one run.
const RUN_ADMISSION_COST: u64 = 1;

/// Thin wrapper over a [`TenancyStore`] giving the Preflight stage one call.
pub struct TenancyContext {
    /// The backend consulted for admission.
    store: Arc<dyn TenancyStore>,
}

impl TenancyContext {
    /// Builds a tenancy context over `store`.
    #[must_use]
    pub const fn new(store: Arc<dyn TenancyStore>) -> Self {
        Self { store }
    }

    /// Admits `tenant_id` for one run, debiting [`RUN_ADMISSION_COST`].
    ///
    /// # Errors
    ///
    /// Returns [`TenancyError`] when the tenant is unknown or the backend
    /// fails to evaluate the quota.
    pub async fn admit_run(&self, tenant_id: &str) -> Result<QuotaDecision, TenancyError> {
        self.store.check_and_debit(tenant_id, RUN_ADMISSION_COST).await
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use async_trait::async_trait;

    use super::*;

    struct AlwaysAdmits;

    #[async_trait]
    impl TenancyStore for AlwaysAdmits {
        async fn check_and_debit(&self, _tenant_id: &str, cost: u64) -> Result<QuotaDecision, TenancyError> {
            Ok(QuotaDecision { admitted: true, remaining: 100 - cost })
        }
    }

    struct UnknownTenant;

    #[async_trait]
    impl TenancyStore for UnknownTenant {
        async fn check_and_debit(&self, tenant_id: &str, _cost: u64) -> Result<QuotaDecision, TenancyError> {
            Err(TenancyError::UnknownTenant(tenant_id.to_string()))
        }
    }

    #[tokio::test]
    async fn admits_a_known_tenant() {
        let ctx = TenancyContext::new(Arc::new(AlwaysAdmits));
        let decision = ctx.admit_run("tenant-a").await.unwrap();
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 99);
    }

    #[tokio::test]
    async fn surfaces_unknown_tenant_errors() {
        let ctx = TenancyContext::new(Arc::new(UnknownTenant));
        let err = ctx.admit_run("ghost").await.unwrap_err();
        assert!(matches!(err, TenancyError::UnknownTenant(ref tenant) if tenant == "ghost"));
    }
}
