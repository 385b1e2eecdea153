//! Thread-safe registry of commands, queries, resources, and factories.
//!
//! A [`Registry`] is an ordinary value a host wires up explicitly; no
//! global singleton exists. One reader-writer lock covers the four
//! collections: readers never block readers, a writer excludes everyone.
//! Lookups hand out `Arc` clones without copying the artifact; the
//! artifacts themselves must be safe for concurrent invocation because the
//! registry does not serialize their `execute`/`get` calls.
//!
//! Dynamic URIs are resolved by [`Registry::get_resource_with_factory`]:
//! direct registration wins, then factories are tried in registration
//! order. A factory that errors is logged and skipped, never surfaced.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

use crate::errors::{codes, CoreError};
use crate::observability::messages::registry::FactoryCreateFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::{Command, Query, Resource, ResourceFactory};

/// A unit found by [`Registry::get`].
#[derive(Clone)]
pub enum RegistryEntry {
    Command(Arc<dyn Command>),
    Query(Arc<dyn Query>),
    Resource(Arc<dyn Resource>),
}

#[derive(Default)]
struct Collections {
    commands: HashMap<String, Arc<dyn Command>>,
    queries: HashMap<String, Arc<dyn Query>>,
    resources: HashMap<String, Arc<dyn Resource>>,
    factories: Vec<Arc<dyn ResourceFactory>>,
}

#[derive(Default)]
pub struct Registry {
    inner: RwLock<Collections>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Collections> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_command(&self, command: Arc<dyn Command>) -> Result<(), CoreError> {
        let name = command.name().to_string();
        if name.is_empty() {
            return Err(CoreError::new(
                codes::INVALID_INPUT,
                "command name must not be empty",
            ));
        }

        let mut inner = self.write();
        if inner.commands.contains_key(&name) {
            return Err(CoreError::new(
                codes::COMMAND_ALREADY_REGISTERED,
                format!("command '{}' is already registered", name),
            ));
        }
        inner.commands.insert(name, command);
        Ok(())
    }

    pub fn register_query(&self, query: Arc<dyn Query>) -> Result<(), CoreError> {
        let name = query.name().to_string();
        if name.is_empty() {
            return Err(CoreError::new(
                codes::INVALID_INPUT,
                "query name must not be empty",
            ));
        }

        let mut inner = self.write();
        if inner.queries.contains_key(&name) {
            return Err(CoreError::new(
                codes::QUERY_ALREADY_REGISTERED,
                format!("query '{}' is already registered", name),
            ));
        }
        inner.queries.insert(name, query);
        Ok(())
    }

    pub fn register_resource(&self, resource: Arc<dyn Resource>) -> Result<(), CoreError> {
        let uri = resource.uri().to_string();
        if uri.is_empty() {
            return Err(CoreError::new(
                codes::INVALID_INPUT,
                "resource URI must not be empty",
            ));
        }

        let mut inner = self.write();
        if inner.resources.contains_key(&uri) {
            return Err(CoreError::new(
                codes::RESOURCE_ALREADY_REGISTERED,
                format!("resource '{}' is already registered", uri),
            ));
        }
        inner.resources.insert(uri, resource);
        Ok(())
    }

    /// Appends a factory. Registration order is the order factories are
    /// tried during dynamic resolution.
    pub fn register_resource_factory(&self, factory: Arc<dyn ResourceFactory>) {
        self.write().factories.push(factory);
    }

    pub fn get_command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.read().commands.get(name).cloned()
    }

    pub fn get_query(&self, name: &str) -> Option<Arc<dyn Query>> {
        self.read().queries.get(name).cloned()
    }

    pub fn get_resource(&self, uri: &str) -> Option<Arc<dyn Resource>> {
        self.read().resources.get(uri).cloned()
    }

    /// Resolves a resource, falling back to factories in registration
    /// order. The first factory whose `can_create` accepts the URI is asked
    /// to create; `Ok(None)` and errors both mean "try the next one".
    /// Factory `create` runs outside the registry lock.
    pub fn get_resource_with_factory(&self, uri: &str) -> Option<Arc<dyn Resource>> {
        let factories = {
            let inner = self.read();
            if let Some(resource) = inner.resources.get(uri) {
                return Some(resource.clone());
            }
            inner.factories.clone()
        };

        for factory in factories {
            if !factory.can_create(uri) {
                continue;
            }
            match factory.create(uri) {
                Ok(Some(resource)) => return Some(resource),
                Ok(None) => continue,
                Err(e) => {
                    FactoryCreateFailed {
                        pattern: factory.pattern(),
                        uri,
                        error: &e,
                    }
                    .log();
                }
            }
        }
        None
    }

    /// Search order: commands, then queries, then resources.
    pub fn get(&self, name: &str) -> Option<RegistryEntry> {
        let inner = self.read();
        if let Some(command) = inner.commands.get(name) {
            return Some(RegistryEntry::Command(command.clone()));
        }
        if let Some(query) = inner.queries.get(name) {
            return Some(RegistryEntry::Query(query.clone()));
        }
        inner
            .resources
            .get(name)
            .map(|resource| RegistryEntry::Resource(resource.clone()))
    }

    /// Snapshot of registered commands. Iteration order is unspecified.
    pub fn list_commands(&self) -> Vec<Arc<dyn Command>> {
        self.read().commands.values().cloned().collect()
    }

    pub fn list_queries(&self) -> Vec<Arc<dyn Query>> {
        self.read().queries.values().cloned().collect()
    }

    pub fn list_resources(&self) -> Vec<Arc<dyn Resource>> {
        self.read().resources.values().cloned().collect()
    }

    pub fn unregister_command(&self, name: &str) -> bool {
        self.write().commands.remove(name).is_some()
    }

    pub fn unregister_query(&self, name: &str) -> bool {
        self.write().queries.remove(name).is_some()
    }

    pub fn unregister_resource(&self, uri: &str) -> bool {
        self.write().resources.remove(uri).is_some()
    }

    pub fn command_count(&self) -> usize {
        self.read().commands.len()
    }

    pub fn query_count(&self) -> usize {
        self.read().queries.len()
    }

    pub fn resource_count(&self) -> usize {
        self.read().resources.len()
    }

    pub fn factory_count(&self) -> usize {
        self.read().factories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::schema::Schema;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct EchoCommand {
        name: String,
    }

    #[async_trait]
    impl Command for EchoCommand {
        fn name(&self) -> &str {
            &self.name
        }

        fn domain(&self) -> &str {
            "test"
        }

        fn input_schema(&self) -> Schema {
            Schema::object()
        }

        fn output_schema(&self) -> Schema {
            Schema::object()
        }

        async fn execute(
            &self,
            _ctx: &RequestContext,
            input: Map<String, Value>,
        ) -> Result<Map<String, Value>, CoreError> {
            Ok(input)
        }
    }

    struct EchoQuery {
        name: String,
    }

    #[async_trait]
    impl Query for EchoQuery {
        fn name(&self) -> &str {
            &self.name
        }

        fn domain(&self) -> &str {
            "test"
        }

        fn input_schema(&self) -> Schema {
            Schema::object()
        }

        fn output_schema(&self) -> Schema {
            Schema::object()
        }

        async fn execute(
            &self,
            _ctx: &RequestContext,
            input: Map<String, Value>,
        ) -> Result<Map<String, Value>, CoreError> {
            Ok(input)
        }
    }

    struct StaticResource {
        uri: String,
    }

    #[async_trait]
    impl Resource for StaticResource {
        fn uri(&self) -> &str {
            &self.uri
        }

        fn domain(&self) -> &str {
            "test"
        }

        fn schema(&self) -> Schema {
            Schema::object()
        }

        async fn get(&self, _ctx: &RequestContext) -> Result<Value, CoreError> {
            Ok(json!({ "uri": self.uri }))
        }

        async fn watch(
            &self,
            _ctx: &RequestContext,
            _cancel: CancellationToken,
        ) -> Result<mpsc::Receiver<Value>, CoreError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }
    }

    struct PrefixFactory {
        prefix: String,
        fail: bool,
    }

    impl ResourceFactory for PrefixFactory {
        fn pattern(&self) -> &str {
            &self.prefix
        }

        fn can_create(&self, uri: &str) -> bool {
            uri.starts_with(&self.prefix)
        }

        fn create(&self, uri: &str) -> Result<Option<Arc<dyn Resource>>, CoreError> {
            if self.fail {
                return Err(CoreError::new(codes::INTERNAL, "factory exploded"));
            }
            Ok(Some(Arc::new(StaticResource {
                uri: uri.to_string(),
            })))
        }
    }

    #[test]
    fn test_register_and_get_round_trip() {
        let registry = Registry::new();
        registry
            .register_command(Arc::new(EchoCommand {
                name: "test.echo".to_string(),
            }))
            .unwrap();
        registry
            .register_query(Arc::new(EchoQuery {
                name: "test.peek".to_string(),
            }))
            .unwrap();
        registry
            .register_resource(Arc::new(StaticResource {
                uri: "asms://test/status".to_string(),
            }))
            .unwrap();

        assert!(registry.get_command("test.echo").is_some());
        assert!(registry.get_query("test.peek").is_some());
        assert!(registry.get_resource("asms://test/status").is_some());
        assert!(registry.get_command("missing").is_none());
        assert_eq!(registry.command_count(), 1);
        assert_eq!(registry.query_count(), 1);
        assert_eq!(registry.resource_count(), 1);
    }

    #[test]
    fn test_duplicate_registration_is_rejected_per_collection() {
        let registry = Registry::new();
        let command = || {
            Arc::new(EchoCommand {
                name: "test.echo".to_string(),
            })
        };
        registry.register_command(command()).unwrap();

        let err = registry.register_command(command()).unwrap_err();
        assert!(err.is_code(codes::COMMAND_ALREADY_REGISTERED));
        assert_eq!(registry.command_count(), 1);

        registry
            .register_query(Arc::new(EchoQuery {
                name: "test.peek".to_string(),
            }))
            .unwrap();
        let err = registry
            .register_query(Arc::new(EchoQuery {
                name: "test.peek".to_string(),
            }))
            .unwrap_err();
        assert!(err.is_code(codes::QUERY_ALREADY_REGISTERED));

        registry
            .register_resource(Arc::new(StaticResource {
                uri: "asms://test/status".to_string(),
            }))
            .unwrap();
        let err = registry
            .register_resource(Arc::new(StaticResource {
                uri: "asms://test/status".to_string(),
            }))
            .unwrap_err();
        assert!(err.is_code(codes::RESOURCE_ALREADY_REGISTERED));
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let registry = Registry::new();
        let err = registry
            .register_command(Arc::new(EchoCommand {
                name: String::new(),
            }))
            .unwrap_err();
        assert!(err.is_code(codes::INVALID_INPUT));
    }

    #[test]
    fn test_get_cascades_commands_queries_resources() {
        let registry = Registry::new();
        registry
            .register_query(Arc::new(EchoQuery {
                name: "shared".to_string(),
            }))
            .unwrap();
        registry
            .register_command(Arc::new(EchoCommand {
                name: "shared".to_string(),
            }))
            .unwrap();

        // Commands win over queries for the same name.
        assert!(matches!(
            registry.get("shared"),
            Some(RegistryEntry::Command(_))
        ));
        assert!(registry.get("absent").is_none());
    }

    #[test]
    fn test_unregister_returns_presence() {
        let registry = Registry::new();
        registry
            .register_command(Arc::new(EchoCommand {
                name: "test.echo".to_string(),
            }))
            .unwrap();

        assert!(registry.unregister_command("test.echo"));
        assert!(!registry.unregister_command("test.echo"));
        assert_eq!(registry.command_count(), 0);
    }

    #[test]
    fn test_factory_fallback_in_registration_order() {
        let registry = Registry::new();
        registry.register_resource_factory(Arc::new(PrefixFactory {
            prefix: "asms://pipeline/".to_string(),
            fail: true,
        }));
        registry.register_resource_factory(Arc::new(PrefixFactory {
            prefix: "asms://pipeline/".to_string(),
            fail: false,
        }));

        // The failing factory is skipped; the second one serves the URI.
        let resource = registry
            .get_resource_with_factory("asms://pipeline/p-1")
            .unwrap();
        assert_eq!(resource.uri(), "asms://pipeline/p-1");

        assert!(registry
            .get_resource_with_factory("asms://remote/status")
            .is_none());
        assert_eq!(registry.factory_count(), 2);
    }

    #[test]
    fn test_direct_registration_wins_over_factories() {
        let registry = Registry::new();
        registry
            .register_resource(Arc::new(StaticResource {
                uri: "asms://pipeline/p-1".to_string(),
            }))
            .unwrap();
        registry.register_resource_factory(Arc::new(PrefixFactory {
            prefix: "asms://pipeline/".to_string(),
            fail: true,
        }));

        assert!(registry
            .get_resource_with_factory("asms://pipeline/p-1")
            .is_some());
    }
}
