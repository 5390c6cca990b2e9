//! Application state shared by every route

use crate::config::{AccessConfig, ConfigError, ServerConfig};
use dn_abilities::{AbilityError, AbilityRegistry};
use dn_core::Operations;
use dn_store::{Actor, CidEngine, InMemoryStore};
use std::sync::Arc;

/// Operation set, ability registry and session table
#[derive(Clone)]
pub struct App {
    ops: Operations,
    abilities: Arc<AbilityRegistry>,
    access: Arc<AccessConfig>,
}

impl App {
    /// Create new app over an operation set
    ///
    /// # Errors
    /// - `AbilityError` if a built-in ability fails to register
    pub fn new(ops: Operations, access: AccessConfig) -> Result<Self, AbilityError> {
        let abilities = AbilityRegistry::with_defaults(ops.clone())?;
        Ok(Self {
            ops,
            abilities: Arc::new(abilities),
            access: Arc::new(access),
        })
    }

    /// Wire store, provider, policy and cache from configuration
    ///
    /// # Errors
    /// - `Invalid` if the seed file, provider or registry cannot be set up
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let store = match &config.seed.path {
            Some(path) => InMemoryStore::load_json(path)
                .map_err(|e| ConfigError::Invalid(format!("seed: {e}")))?,
            None => InMemoryStore::new(),
        };
        let provider = crate::provider::from_config(&config.generation)?;
        let ops = Operations::new(Arc::new(store))
            .with_provider(provider)
            .with_access(Arc::new(config.access.policy()))
            .with_cid_engine(CidEngine::new(config.cache.max_capacity))
            .with_config(config.ops_config());

        tracing::info!(
            provider = %ops.provider_name(),
            sessions = config.access.sessions.len(),
            "application wired"
        );
        Self::new(ops, config.access.clone())
            .map_err(|e| ConfigError::Invalid(format!("abilities: {e}")))
    }

    /// Shared operation set
    #[inline]
    #[must_use]
    pub fn ops(&self) -> &Operations {
        &self.ops
    }

    /// Ability registry over the same operation set
    #[inline]
    #[must_use]
    pub fn abilities(&self) -> &AbilityRegistry {
        &self.abilities
    }

    /// Actor for an `Authorization` header value
    ///
    /// Anything but a known bearer token is the anonymous actor.
    #[must_use]
    pub fn authenticate(&self, authorization: Option<&str>) -> Actor {
        authorization
            .and_then(|value| {
                let (scheme, token) = value.trim().split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .and_then(|token| self.access.actor_for(token))
            .map_or_else(Actor::anonymous, Actor::new)
    }
}
