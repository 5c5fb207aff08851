/// Plugin architecture for extending daoc.
///
/// Plugins can register new result binder providers, query rewriters and
/// converter classes. This provides an extension point for return types
/// and rewrites the built-in set does not cover.
use anyhow::Result;
use tracing::debug;

use crate::model::ConverterClass;
use crate::solver::{PreparedQueryResultBinderProvider, ProviderRegistry, QueryResultBinderProvider};
use crate::sql::{QueryRewriter, RewritePipeline};

/// Trait that all daoc plugins must implement.
///
/// A plugin registers its capabilities with the `PluginRegistry` before
/// the round starts. Plugins are loaded and initialized once.
///
/// # Example
///
/// ```ignore
/// struct ImmutableListPlugin;
///
/// impl CompilerPlugin for ImmutableListPlugin {
///     fn name(&self) -> &str { "immutable-list" }
///     fn version(&self) -> &str { "0.1.0" }
///     fn register(&self, registry: &mut PluginRegistry) -> Result<()> {
///         registry.add_query_provider(Box::new(ImmutableListProvider));
///         Ok(())
///     }
/// }
/// ```
pub trait CompilerPlugin: Send + Sync {
    /// Unique plugin identifier.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Register plugin capabilities with the registry.
    fn register(&self, registry: &mut PluginRegistry) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Central registry for everything a round can be extended with.
#[derive(Default)]
pub struct PluginRegistry {
    providers: ProviderRegistry,
    rewriters: RewritePipeline,
    converters: Vec<ConverterClass>,
    loaded_plugins: Vec<PluginInfo>,
}

impl PluginRegistry {
    /// No providers or rewriters at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in providers and rewriters.
    pub fn with_defaults() -> Self {
        Self {
            providers: ProviderRegistry::with_defaults(),
            rewriters: RewritePipeline::with_defaults(),
            ..Self::default()
        }
    }

    pub fn add_query_provider(&mut self, provider: Box<dyn QueryResultBinderProvider>) {
        self.providers.register(provider);
    }

    pub fn add_prepared_provider(&mut self, provider: Box<dyn PreparedQueryResultBinderProvider>) {
        self.providers.register_prepared(provider);
    }

    pub fn add_rewriter(&mut self, rewriter: Box<dyn QueryRewriter>) {
        self.rewriters.add(rewriter);
    }

    /// Adds a converter class visible to every DAO.
    pub fn add_converter_class(&mut self, class: ConverterClass) {
        self.converters.push(class);
    }

    pub fn load_plugin(&mut self, plugin: Box<dyn CompilerPlugin>) -> Result<()> {
        let info = PluginInfo {
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
            description: plugin.description().to_string(),
        };

        plugin.register(self)?;
        debug!(plugin = %info.name, version = %info.version, "loaded plugin");
        self.loaded_plugins.push(info);
        Ok(())
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn rewriters(&self) -> &RewritePipeline {
        &self.rewriters
    }

    pub fn converters(&self) -> &[ConverterClass] {
        &self.converters
    }

    pub fn loaded_plugins(&self) -> &[PluginInfo] {
        &self.loaded_plugins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::model::{ConverterKind, ConverterMethod, TypeRef};
    use crate::solver::provider::InstantQueryResultBinderProvider;
    use crate::solver::{ProviderPriority, QueryResultBinder};
    use crate::sql::{ParsedQuery, RemoveUnusedColumnQueryRewriter};

    struct TestPlugin;

    impl CompilerPlugin for TestPlugin {
        fn name(&self) -> &str {
            "test-plugin"
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn description(&self) -> &str {
            "A test plugin"
        }

        fn register(&self, registry: &mut PluginRegistry) -> Result<()> {
            registry.add_query_provider(Box::new(ImmutableListProvider));
            registry.add_rewriter(Box::new(RemoveUnusedColumnQueryRewriter));
            registry.add_converter_class(ConverterClass {
                name: "UuidConverter".into(),
                kind: ConverterKind::Static,
                methods: vec![ConverterMethod {
                    name: "to_text".into(),
                    from: TypeRef::simple("Uuid"),
                    to: TypeRef::string(),
                }],
            });
            Ok(())
        }
    }

    struct FailingPlugin;

    impl CompilerPlugin for FailingPlugin {
        fn name(&self) -> &str {
            "failing"
        }

        fn version(&self) -> &str {
            "0.0.1"
        }

        fn register(&self, _registry: &mut PluginRegistry) -> Result<()> {
            anyhow::bail!("missing runtime support")
        }
    }

    struct ImmutableListProvider;

    impl QueryResultBinderProvider for ImmutableListProvider {
        fn name(&self) -> &str {
            "ImmutableList"
        }

        fn priority(&self) -> ProviderPriority {
            ProviderPriority::FLOW.plus(1)
        }

        fn matches(&self, ty: &TypeRef, _ctx: &mut Context<'_>) -> bool {
            ty.simple_name() == "ImmutableList"
        }

        fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
            InstantQueryResultBinderProvider.provide(ty, query, ctx)
        }
    }

    #[test]
    fn test_registry_empty() {
        let registry = PluginRegistry::new();
        assert!(registry.loaded_plugins().is_empty());
        assert!(registry.providers().query_provider_names().is_empty());
        assert!(registry.rewriters().is_empty());
    }

    #[test]
    fn test_load_plugin() {
        let mut registry = PluginRegistry::with_defaults();
        registry.load_plugin(Box::new(TestPlugin)).unwrap();
        assert_eq!(registry.loaded_plugins().len(), 1);
        assert_eq!(registry.loaded_plugins()[0].name, "test-plugin");
        assert_eq!(registry.converters()[0].name, "UuidConverter");
        assert_eq!(registry.rewriters().rewriter_names().len(), 2);

        let names = registry.providers().query_provider_names();
        let position = names.iter().position(|n| *n == "ImmutableList").unwrap();
        assert_eq!(names[position - 1], "Flow");
        assert_eq!(names[position + 1], "instant");
    }

    #[test]
    fn test_failed_plugin_not_listed() {
        let mut registry = PluginRegistry::new();
        assert!(registry.load_plugin(Box::new(FailingPlugin)).is_err());
        assert!(registry.loaded_plugins().is_empty());
    }
}
