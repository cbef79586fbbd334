//! Shared application state.

use relay_config::AuthSettings;
use relay_core::ModelObject;
use relay_upstream::CredentialPool;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// Request pipeline
    pub dispatcher: Arc<Dispatcher>,
    /// Model ids listed by `/v1/models`
    pub models: Arc<Vec<String>>,
    /// Inbound API keys
    pub auth: Arc<AuthSettings>,
}

impl AppState {
    /// Start building state around a dispatcher
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Credential pool behind the dispatcher
    #[must_use]
    pub fn pool(&self) -> &Arc<CredentialPool> {
        self.dispatcher.pool()
    }

    /// Model entries for `/v1/models`
    #[must_use]
    pub fn model_objects(&self) -> Vec<ModelObject> {
        self.models
            .iter()
            .map(|id| ModelObject::new(id.as_str(), "system"))
            .collect()
    }
}

/// Builder for [`AppState`]
#[derive(Debug, Default)]
pub struct AppStateBuilder {
    dispatcher: Option<Arc<Dispatcher>>,
    models: Vec<String>,
    auth: AuthSettings,
}

impl AppStateBuilder {
    /// Set the dispatcher
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Set the advertised models
    #[must_use]
    pub fn models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Set the inbound API keys
    #[must_use]
    pub fn auth(mut self, auth: AuthSettings) -> Self {
        self.auth = auth;
        self
    }

    /// Build the state
    ///
    /// # Errors
    /// Returns error if no dispatcher was set
    pub fn build(self) -> Result<AppState, relay_core::RelayError> {
        let dispatcher = self
            .dispatcher
            .ok_or_else(|| relay_core::RelayError::configuration("AppState requires a dispatcher"))?;

        Ok(AppState {
            dispatcher,
            models: Arc::new(self.models),
            auth: Arc::new(self.auth),
        })
    }
}
