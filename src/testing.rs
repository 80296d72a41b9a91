//! Test harness for driving the provider without a gRPC server.
//!
//! [`ProviderTester`] calls [`ProviderService`] methods directly and folds
//! error diagnostics into a [`TestError`], so tests read as a sequence of
//! host calls. [`ProviderTester::against`] points a fresh provider at a mock
//! Management API with millisecond polling.
//!
//! ```ignore
//! let tester = ProviderTester::against(&mock_server.uri()).await?;
//! let state = tester
//!     .apply("singlestoredb_team", None, json!({"name": "admins"}))
//!     .await?;
//! ```

use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::provider::SingleStoreProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity};
use crate::server::ProviderService;
use crate::types::PlanResult;

/// Poll interval used by [`ProviderTester::against`].
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Failure of a harness call.
#[derive(Debug, Error)]
pub enum TestError {
    /// The call returned error diagnostics.
    #[error("operation reported {} error diagnostic(s): {}", .0.len(), summarize(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The call failed outright.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl TestError {
    /// The attribute paths named by the diagnostics or the error.
    pub fn attributes(&self) -> Vec<String> {
        match self {
            Self::Diagnostics(diags) => diags.iter().filter_map(|d| d.attribute.clone()).collect(),
            Self::Provider(e) => e.attribute().map(str::to_string).into_iter().collect(),
        }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attr) => format!("{} (at {})", d.summary, attr),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Drives a [`ProviderService`] the way the host would.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<SingleStoreProvider> {
    /// A configured SingleStore provider talking to `base_url`.
    pub async fn against(base_url: &str) -> Result<Self, TestError> {
        let url = Url::parse(base_url).map_err(|e| {
            ProviderError::Configuration(format!("invalid base URL {}: {}", base_url, e))
        })?;
        let config = ProviderConfig::new("test-api-key", url)
            .with_poll_interval(TEST_POLL_INTERVAL)
            .with_wait_timeout(Duration::from_secs(5));
        let provider = SingleStoreProvider::new();
        provider.configure_with(config).await?;
        Ok(Self::new(provider))
    }
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// `Configure`; error diagnostics become [`TestError::Diagnostics`].
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// `ValidateResourceConfig`.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// `ValidateDataSourceConfig`.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_data_source_config(data_source_type, config)
                .await?,
        )
    }

    /// `Plan` for a create, update (`prior` set) or destroy (`proposed` null).
    pub async fn plan(
        &self,
        resource_type: &str,
        prior: Option<Value>,
        proposed: Value,
    ) -> Result<PlanResult, TestError> {
        let config = proposed.clone();
        Ok(self
            .provider
            .plan(resource_type, prior, proposed, config)
            .await?)
    }

    /// Validate, plan and apply `proposed`, returning the new state.
    ///
    /// Creates when `prior` is `None`; updates in place otherwise. A plan
    /// with no changes returns the prior state without calling the provider.
    pub async fn apply(
        &self,
        resource_type: &str,
        prior: Option<Value>,
        proposed: Value,
    ) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, proposed.clone())
            .await?;
        let plan = self.plan(resource_type, prior.clone(), proposed).await?;
        match prior {
            None => Ok(self
                .provider
                .create(resource_type, plan.planned_state)
                .await?),
            Some(prior) if !plan.has_changes() => Ok(prior),
            Some(prior) => Ok(self
                .provider
                .update(resource_type, prior, plan.planned_state)
                .await?),
        }
    }

    /// `Read`.
    pub async fn read(&self, resource_type: &str, state: Value) -> Result<Value, TestError> {
        Ok(self.provider.read(resource_type, state).await?)
    }

    /// `Update` with an explicit planned state, skipping validation and planning.
    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, TestError> {
        Ok(self.provider.update(resource_type, prior, planned).await?)
    }

    /// `Delete`.
    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), TestError> {
        Ok(self.provider.delete(resource_type, state).await?)
    }

    /// `ImportResourceState`, returning the single imported state.
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<Value, TestError> {
        let imported = self.provider.import_resource(resource_type, id).await?;
        imported
            .into_iter()
            .next()
            .map(|r| r.state)
            .ok_or_else(|| ProviderError::Internal("import returned nothing".to_string()).into())
    }

    /// Validate then `ReadDataSource`.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate_data_source_config(data_source_type, config.clone())
            .await?;
        Ok(self
            .provider
            .read_data_source(data_source_type, config)
            .await?)
    }
}

/// Assert that a plan replaces the resource.
///
/// # Panics
///
/// Panics if the plan updates in place or changes nothing.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "expected a replacement, got changes to {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan changes nothing.
///
/// # Panics
///
/// Panics if the plan has any change.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        !plan.has_changes(),
        "expected no changes, got {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_validation_errors_name_attributes() {
        let tester = ProviderTester::new(SingleStoreProvider::new());
        let err = tester
            .validate_resource_config(
                "singlestoredb_invitation",
                json!({"email": "alice@example.com", "team_ids": ["nope"]}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.attributes(), vec!["team_ids.0".to_string()]);
        assert!(err.to_string().contains("team_ids.0"));
    }

    #[tokio::test]
    async fn test_plan_helpers() {
        let tester = ProviderTester::new(SingleStoreProvider::new());
        let prior = json!({
            "id": "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d",
            "email": "alice@example.com",
            "team_ids": [],
            "state": "Pending",
            "created_at": "2024-01-01T00:00:00Z",
        });

        let plan = tester
            .plan(
                "singlestoredb_invitation",
                Some(prior.clone()),
                json!({"email": "alice@example.com"}),
            )
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        let plan = tester
            .plan(
                "singlestoredb_invitation",
                Some(prior),
                json!({"email": "bob@example.com"}),
            )
            .await
            .unwrap();
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_configure_without_key_fails() {
        let tester = ProviderTester::new(SingleStoreProvider::new());
        let result = tester
            .configure(json!({"api_key": "", "api_service_url": "not a url"}))
            .await;
        assert!(matches!(result, Err(TestError::Diagnostics(_))));
    }
}
