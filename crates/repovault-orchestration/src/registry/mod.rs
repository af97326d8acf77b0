//! Entity registry: discovery, activation, validation, and planning

pub mod descriptor;
pub mod graph;

pub use descriptor::{no_strategy, Activation, EntityDescriptor, StrategyFactoryFn};
pub use graph::{topological_sort, transitive_dependents};

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::{OrchestrationError, Result};

/// A descriptor plus its runtime activation state
#[derive(Debug, Clone)]
struct RegisteredEntity {
    descriptor: EntityDescriptor,
    activation: Activation,
    explicitly_set: bool,
}

/// Holds every known entity and decides which of them run, in what
/// order.
///
/// The registry is built once from static descriptors, then mutated
/// only by [`load_activation`] and [`validate_dependencies`]; after
/// validation the activation state is treated as fixed for the run.
///
/// [`load_activation`]: EntityRegistry::load_activation
/// [`validate_dependencies`]: EntityRegistry::validate_dependencies
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<String, RegisteredEntity>,
}

impl EntityRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a list of static descriptors
    pub fn with_descriptors(
        descriptors: impl IntoIterator<Item = EntityDescriptor>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        info!(entity_count = registry.len(), "Discovered entities");
        Ok(registry)
    }

    /// Registers one entity; duplicate names are rejected
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<()> {
        let name = descriptor.name.clone();
        if self.entities.contains_key(&name) {
            return Err(OrchestrationError::configuration(format!(
                "duplicate entity `{name}`"
            )));
        }

        debug!(entity = %name, "Registered entity");
        let activation = descriptor.default_activation.clone();
        self.entities.insert(
            name,
            RegisteredEntity {
                descriptor,
                activation,
                explicitly_set: false,
            },
        );
        Ok(())
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Names of all registered entities, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entities.keys().map(String::as_str).collect()
    }

    /// Descriptor for the named entity
    pub fn descriptor(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name).map(|entry| &entry.descriptor)
    }

    /// Current activation for the named entity
    pub fn activation(&self, name: &str) -> Option<&Activation> {
        self.entities.get(name).map(|entry| &entry.activation)
    }

    /// Whether the named entity currently participates in the run
    pub fn is_enabled(&self, name: &str) -> bool {
        self.entities
            .get(name)
            .is_some_and(|entry| entry.activation.is_enabled())
    }

    /// Copy of every entity's activation, for embedding in a run context
    pub fn activation_map(&self) -> BTreeMap<String, Activation> {
        self.entities
            .iter()
            .map(|(name, entry)| (name.clone(), entry.activation.clone()))
            .collect()
    }

    /// Applies activation values from an external configuration source.
    ///
    /// Entities the source does not name keep their descriptor default.
    /// Named entities are marked as explicitly set, which changes how
    /// dependency validation treats them. Unknown names fail under
    /// `strict` and are ignored with a warning otherwise.
    pub fn load_activation(
        &mut self,
        source: &BTreeMap<String, Activation>,
        strict: bool,
    ) -> Result<()> {
        for (name, activation) in source {
            match self.entities.get_mut(name) {
                Some(entry) => {
                    debug!(entity = %name, activation = ?activation, "Activation set from configuration");
                    entry.activation = activation.clone();
                    entry.explicitly_set = true;
                }
                None if strict => {
                    return Err(OrchestrationError::configuration(format!(
                        "activation names unknown entity `{name}`"
                    )));
                }
                None => {
                    warn!(entity = %name, "Ignoring activation for unknown entity");
                }
            }
        }

        info!(
            explicit_count = source.len(),
            entity_count = self.entities.len(),
            "Loaded activation configuration"
        );
        Ok(())
    }

    /// Reconciles activation against the dependency graph.
    ///
    /// An enabled entity whose dependency is disabled is a conflict.
    /// If the entity was explicitly enabled the conflict is an error
    /// naming both sides. If it was enabled only by default it is
    /// auto-disabled with a warning, and the check repeats until no
    /// further entity needs disabling, since each disable can newly
    /// break a transitive dependent. `strict` escalates auto-disable
    /// cases to errors as well.
    ///
    /// Returns the names of auto-disabled entities in disable order.
    pub fn validate_dependencies(&mut self, strict: bool) -> Result<Vec<String>> {
        for (name, entry) in &self.entities {
            for dep in &entry.descriptor.dependencies {
                if !self.entities.contains_key(dep) {
                    return Err(OrchestrationError::configuration(format!(
                        "entity `{name}` depends on unknown entity `{dep}`"
                    )));
                }
            }
        }

        let mut auto_disabled = Vec::new();
        loop {
            let violation = self.first_dependency_violation();
            let Some((entity, dependency, explicit)) = violation else {
                break;
            };

            if explicit {
                return Err(OrchestrationError::configuration(format!(
                    "entity `{entity}` is explicitly enabled but depends on disabled entity `{dependency}`"
                )));
            }
            if strict {
                return Err(OrchestrationError::configuration(format!(
                    "entity `{entity}` depends on disabled entity `{dependency}`"
                )));
            }

            warn!(
                entity = %entity,
                dependency = %dependency,
                "Auto-disabling entity whose dependency is disabled"
            );
            if let Some(entry) = self.entities.get_mut(&entity) {
                entry.activation = Activation::Disabled;
            }
            auto_disabled.push(entity);
        }

        info!(
            auto_disabled_count = auto_disabled.len(),
            "Validated entity dependencies"
        );
        Ok(auto_disabled)
    }

    /// First enabled entity (in name order) with a disabled dependency
    fn first_dependency_violation(&self) -> Option<(String, String, bool)> {
        for (name, entry) in &self.entities {
            if !entry.activation.is_enabled() {
                continue;
            }
            for dep in &entry.descriptor.dependencies {
                let dep_enabled = self
                    .entities
                    .get(dep)
                    .is_some_and(|d| d.activation.is_enabled());
                if !dep_enabled {
                    return Some((name.clone(), dep.clone(), entry.explicitly_set));
                }
            }
        }
        None
    }

    /// The authoritative execution plan: enabled entities, dependency
    /// order, alphabetical ties
    pub fn execution_plan(&self) -> Result<Vec<String>> {
        let mut dependencies: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, entry) in &self.entities {
            if !entry.activation.is_enabled() {
                continue;
            }
            for dep in &entry.descriptor.dependencies {
                if !self.is_enabled(dep) {
                    return Err(OrchestrationError::configuration(format!(
                        "entity `{name}` depends on `{dep}`, which is not in the enabled set"
                    )));
                }
            }
            dependencies.insert(name.clone(), entry.descriptor.dependencies.clone());
        }

        topological_sort(&dependencies)
    }

    /// Descriptors of enabled entities in execution-plan order
    pub fn enabled_descriptors(&self) -> Result<Vec<&EntityDescriptor>> {
        self.execution_plan()?
            .iter()
            .map(|name| {
                self.entities
                    .get(name)
                    .map(|entry| &entry.descriptor)
                    .ok_or_else(|| {
                        OrchestrationError::internal(format!(
                            "planned entity `{name}` missing from registry"
                        ))
                    })
            })
            .collect()
    }
}
