//! The SingleStore provider: schema, configuration and dispatch.
//!
//! [`SingleStoreProvider`] implements [`ProviderService`] by routing each host
//! call to the [`Resource`] or [`DataSource`] registered under the requested
//! type name. Planning is schema-driven and needs no API access; every other
//! resource operation requires `Configure` to have succeeded first.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::ManagementClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::{DataSource, Registry, Resource};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Hemmer provider for the SingleStore Management API.
pub struct SingleStoreProvider {
    registry: Registry,
    client: RwLock<Option<Arc<ManagementClient>>>,
}

impl Default for SingleStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleStoreProvider {
    /// A provider serving every SingleStore resource and data source.
    pub fn new() -> Self {
        Self::with_registry(Registry::singlestore())
    }

    /// A provider serving a custom set of resources and data sources.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            client: RwLock::new(None),
        }
    }

    /// Configure from an already-resolved [`ProviderConfig`].
    pub async fn configure_with(&self, config: ProviderConfig) -> Result<(), ProviderError> {
        let client = ManagementClient::new(&config)?;
        info!(api_service_url = %config.api_service_url, "Provider configured");
        *self.client.write().await = Some(Arc::new(client));
        Ok(())
    }

    /// Whether `Configure` has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn client(&self) -> Result<Arc<ManagementClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "provider is not configured; Configure must be called first".to_string(),
            )
        })
    }

    fn resource(&self, type_name: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.registry.resource(type_name)
    }

    fn data_source(&self, type_name: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.registry.data_source(type_name)
    }
}

/// Schema checks first; domain checks only when the shape is right.
fn validate_config(
    schema_diagnostics: Vec<Diagnostic>,
    domain: impl FnOnce() -> Vec<Diagnostic>,
) -> Vec<Diagnostic> {
    if has_errors(&schema_diagnostics) {
        schema_diagnostics
    } else {
        let mut diagnostics = schema_diagnostics;
        diagnostics.extend(domain());
        diagnostics
    }
}

#[async_trait::async_trait]
impl ProviderService for SingleStoreProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for resource in self.registry.resources() {
            schema = schema.with_resource(resource.type_name(), resource.schema());
        }
        for data_source in self.registry.data_sources() {
            schema = schema.with_data_source(data_source.type_name(), data_source.schema());
        }
        schema
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate_config(
            validate(&ProviderConfig::schema(), &config),
            || ProviderConfig::from_value(&config).err().unwrap_or_default(),
        ))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate(&ProviderConfig::schema(), &config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }
        match ProviderConfig::from_value(&config) {
            Ok(resolved) => {
                self.configure_with(resolved).await?;
                Ok(diagnostics)
            },
            Err(errors) => Ok(errors),
        }
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        debug!("Dropping Management API client");
        self.client.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(validate_config(validate(&resource.schema(), &config), || {
            resource.validate(&config)
        }))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let prior = prior_state.filter(|v| !v.is_null());
        Ok(plan_resource(&resource.schema(), prior.as_ref(), &proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.create(&*self.client().await?, &planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.read(&*self.client().await?, &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource
            .update(&*self.client().await?, &prior_state, &planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.delete(&*self.client().await?, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let state = resource.import(&*self.client().await?, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validate_config(validate(&data_source.schema(), &config), || {
            data_source.validate(&config)
        }))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let diagnostics = data_source.validate(&config);
        if let Some(first) = diagnostics.into_iter().find(Diagnostic::is_error) {
            return Err(ProviderError::invalid_attribute(
                first.attribute.unwrap_or_default(),
                first.detail.unwrap_or(first.summary),
            ));
        }
        data_source.read(&*self.client().await?, &config).await
    }
}
