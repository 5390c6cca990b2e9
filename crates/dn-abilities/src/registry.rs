//! Ability registry
//!
//! Provides [`AbilityRegistry`] for registering abilities and invoking them by
//! name. Invocation order is fixed: schema validation, then the permission
//! predicate, then the body, whose result is checked against the output
//! schema.

use crate::error::AbilityError;
use async_trait::async_trait;
use dn_core::Operations;
use dn_store::Actor;
use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Public description of an ability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbilityDefinition {
    /// Handle, e.g. `dni/get-post-mr`
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Category, e.g. `content.read`
    pub category: &'static str,
    /// JSON schema of the input
    pub input_schema: Value,
    /// JSON schema of the output
    pub output_schema: Value,
}

/// A named, permission-gated operation
#[async_trait]
pub trait Ability: Send + Sync {
    /// Definition (name, category, schemas)
    fn definition(&self) -> AbilityDefinition;

    /// Permission predicate, evaluated on schema-valid input before `execute`
    fn permitted(&self, ops: &Operations, input: &Value, actor: &Actor) -> bool;

    /// Run the ability
    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError>;
}

struct Registered {
    definition: AbilityDefinition,
    input: JSONSchema,
    output: JSONSchema,
    ability: Arc<dyn Ability>,
}

fn compile(name: &str, schema: &Value) -> Result<JSONSchema, AbilityError> {
    JSONSchema::compile(schema).map_err(|e| AbilityError::Schema {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn violations(schema: &JSONSchema, value: &Value) -> Option<Vec<String>> {
    schema
        .validate(value)
        .err()
        .map(|errors| errors.map(|e| e.to_string()).collect())
}

/// Registry of abilities over one operation set
#[derive(Clone)]
pub struct AbilityRegistry {
    ops: Operations,
    abilities: BTreeMap<&'static str, Arc<Registered>>,
}

impl fmt::Debug for AbilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityRegistry")
            .field("abilities", &self.names())
            .finish_non_exhaustive()
    }
}

impl AbilityRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new(ops: Operations) -> Self {
        Self {
            ops,
            abilities: BTreeMap::new(),
        }
    }

    /// Create registry with the built-in `dni/*` abilities
    ///
    /// # Errors
    /// - `Schema` if a built-in input schema fails to compile
    pub fn with_defaults(ops: Operations) -> Result<Self, AbilityError> {
        let mut registry = Self::new(ops);
        for ability in crate::abilities::builtin() {
            registry.register(ability)?;
        }
        Ok(registry)
    }

    /// Register an ability
    ///
    /// # Errors
    /// - `Duplicate` if the name is taken
    /// - `Schema` if the input or output schema does not compile
    pub fn register(&mut self, ability: Arc<dyn Ability>) -> Result<(), AbilityError> {
        let definition = ability.definition();
        let name = definition.name;
        if self.abilities.contains_key(name) {
            return Err(AbilityError::Duplicate(name.to_string()));
        }
        let input = compile(name, &definition.input_schema)?;
        let output = compile(name, &definition.output_schema)?;
        tracing::debug!(ability = name, category = definition.category, "ability registered");
        self.abilities.insert(
            name,
            Arc::new(Registered {
                definition,
                input,
                output,
                ability,
            }),
        );
        Ok(())
    }

    /// Check if ability exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.abilities.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.abilities.keys().copied().collect()
    }

    /// Definition of one ability
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&AbilityDefinition> {
        self.abilities.get(name).map(|r| &r.definition)
    }

    /// All definitions, sorted by name
    pub fn definitions(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.abilities.values().map(|r| &r.definition)
    }

    /// Get number of registered abilities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// Shared operation set
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &Operations {
        &self.ops
    }

    /// Invoke an ability by name
    ///
    /// # Errors
    /// - `UnknownAbility`, `InvalidInput`, `Forbidden`
    /// - `Operation` with the shared operation's error
    /// - `InvalidOutput` if the result breaks the output schema
    pub async fn invoke(
        &self,
        name: &str,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let entry = self
            .abilities
            .get(name)
            .ok_or_else(|| AbilityError::UnknownAbility(name.to_string()))?;

        if let Some(reasons) = violations(&entry.input, &input) {
            tracing::debug!(ability = name, ?reasons, "ability input rejected");
            return Err(AbilityError::InvalidInput(reasons));
        }
        if !entry.ability.permitted(&self.ops, &input, actor) {
            tracing::debug!(ability = name, actor = actor.id(), "ability permission denied");
            return Err(AbilityError::Forbidden(name.to_string()));
        }

        let output = entry
            .ability
            .execute(&self.ops, input, actor)
            .await
            .map_err(|err| {
                tracing::debug!(ability = name, code = err.code(), "ability failed");
                err
            })?;
        if let Some(reasons) = violations(&entry.output, &output) {
            tracing::error!(ability = name, ?reasons, "ability output rejected");
            return Err(AbilityError::InvalidOutput {
                name: name.to_string(),
                reasons,
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dn_store::InMemoryStore;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Ability for Echo {
        fn definition(&self) -> AbilityDefinition {
            AbilityDefinition {
                name: "test/echo",
                description: "Echo input",
                category: "test",
                input_schema: json!({
                    "type": "object",
                    "required": ["value"],
                    "properties": { "value": { "type": "integer", "minimum": 1 } }
                }),
                output_schema: json!({ "type": "object" }),
            }
        }

        fn permitted(&self, _ops: &Operations, _input: &Value, actor: &Actor) -> bool {
            !actor.is_anonymous()
        }

        async fn execute(
            &self,
            _ops: &Operations,
            input: Value,
            _actor: &Actor,
        ) -> Result<Value, AbilityError> {
            Ok(input)
        }
    }

    fn registry() -> AbilityRegistry {
        let mut registry = AbilityRegistry::new(Operations::new(Arc::new(InMemoryStore::new())));
        registry.register(Arc::new(Echo)).unwrap();
        registry
    }

    #[test]
    fn registry_new_empty() {
        let registry = AbilityRegistry::new(Operations::new(Arc::new(InMemoryStore::new())));
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        assert_eq!(
            registry.register(Arc::new(Echo)),
            Err(AbilityError::Duplicate("test/echo".into()))
        );
    }

    #[tokio::test]
    async fn invoke_validates_then_checks_permission() {
        let registry = registry();
        let editor = Actor::new("editor");

        let out = registry
            .invoke("test/echo", json!({ "value": 3 }), &editor)
            .await
            .unwrap();
        assert_eq!(out, json!({ "value": 3 }));

        let err = registry
            .invoke("test/echo", json!({ "value": 0 }), &editor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        // schema failures win over permission failures
        let err = registry
            .invoke("test/echo", json!({}), &Actor::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = registry
            .invoke("test/echo", json!({ "value": 1 }), &Actor::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err, AbilityError::Forbidden("test/echo".into()));
    }

    struct Shapeless;

    #[async_trait]
    impl Ability for Shapeless {
        fn definition(&self) -> AbilityDefinition {
            AbilityDefinition {
                name: "test/shapeless",
                description: "Answers without the promised key",
                category: "test",
                input_schema: json!({ "type": "object" }),
                output_schema: json!({ "type": "object", "required": ["summary"] }),
            }
        }

        fn permitted(&self, _ops: &Operations, _input: &Value, _actor: &Actor) -> bool {
            true
        }

        async fn execute(
            &self,
            _ops: &Operations,
            input: Value,
            _actor: &Actor,
        ) -> Result<Value, AbilityError> {
            Ok(input)
        }
    }

    #[tokio::test]
    async fn output_is_checked_against_schema() {
        let mut registry = registry();
        registry.register(Arc::new(Shapeless)).unwrap();
        let editor = Actor::new("editor");

        let out = registry
            .invoke("test/shapeless", json!({ "summary": "S" }), &editor)
            .await
            .unwrap();
        assert_eq!(out, json!({ "summary": "S" }));

        let err = registry
            .invoke("test/shapeless", json!({ "tags": [] }), &editor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_output");
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn unknown_ability() {
        let err = registry()
            .invoke("test/nope", json!({}), &Actor::new("editor"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
