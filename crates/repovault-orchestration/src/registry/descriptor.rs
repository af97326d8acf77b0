//! Entity descriptors and activation state

use std::collections::BTreeSet;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::context::{ServiceKind, StrategyContext};
use crate::error::Result;
use crate::strategy::{EntityStrategy, OperationKind};

/// Whether an entity takes part in a run, and for which items.
///
/// In configuration sources this is written either as a boolean or as a
/// list of item numbers, so serialization follows that convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Entity participates with all items
    Enabled,
    /// Entity does not participate
    Disabled,
    /// Entity participates with the listed item numbers only
    Selected(BTreeSet<u64>),
}

impl Activation {
    /// Converts a plain on/off flag
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    /// Whether the entity participates in the run at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Whether the given item number is in scope for this activation
    pub fn selects(&self, number: u64) -> bool {
        match self {
            Self::Enabled => true,
            Self::Disabled => false,
            Self::Selected(numbers) => numbers.contains(&number),
        }
    }
}

impl Serialize for Activation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Enabled => serializer.serialize_bool(true),
            Self::Disabled => serializer.serialize_bool(false),
            Self::Selected(numbers) => numbers.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Activation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Numbers(BTreeSet<u64>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(true) => Self::Enabled,
            Repr::Flag(false) => Self::Disabled,
            Repr::Numbers(numbers) => Self::Selected(numbers),
        })
    }
}

/// Factory signature each entity provides per operation.
///
/// `Ok(None)` means the entity deliberately has no strategy for the
/// operation; the job is reported as skipped without blocking
/// dependents.
pub type StrategyFactoryFn = fn(&StrategyContext) -> Result<Option<Box<dyn EntityStrategy>>>;

/// Factory that always opts out of the operation
pub fn no_strategy(_context: &StrategyContext) -> Result<Option<Box<dyn EntityStrategy>>> {
    Ok(None)
}

/// Static description of one entity kind: its place in the dependency
/// graph, the services it needs, and how to build its strategies.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Unique entity name, also used as the snapshot collection name
    pub name: String,
    /// Activation applied when the configuration names no value
    pub default_activation: Activation,
    /// Names of entities that must complete before this one
    pub dependencies: Vec<String>,
    /// Services the save strategy needs from the context
    pub save_requires: Vec<ServiceKind>,
    /// Services the restore strategy needs from the context
    pub restore_requires: Vec<ServiceKind>,
    /// Builds the save strategy
    pub save_factory: StrategyFactoryFn,
    /// Builds the restore strategy
    pub restore_factory: StrategyFactoryFn,
}

impl EntityDescriptor {
    /// Creates a descriptor with no dependencies, no service
    /// requirements, and default activation `Enabled`
    pub fn new(
        name: impl Into<String>,
        save_factory: StrategyFactoryFn,
        restore_factory: StrategyFactoryFn,
    ) -> Self {
        Self {
            name: name.into(),
            default_activation: Activation::Enabled,
            dependencies: Vec::new(),
            save_requires: Vec::new(),
            restore_requires: Vec::new(),
            save_factory,
            restore_factory,
        }
    }

    /// Sets the default activation
    pub fn with_default_activation(mut self, activation: Activation) -> Self {
        self.default_activation = activation;
        self
    }

    /// Sets the dependency list
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the services the save strategy requires
    pub fn with_save_requirements(mut self, services: impl IntoIterator<Item = ServiceKind>) -> Self {
        self.save_requires = services.into_iter().collect();
        self
    }

    /// Sets the services the restore strategy requires
    pub fn with_restore_requirements(
        mut self,
        services: impl IntoIterator<Item = ServiceKind>,
    ) -> Self {
        self.restore_requires = services.into_iter().collect();
        self
    }

    /// Service requirements for the given operation
    pub fn requirements_for(&self, operation: OperationKind) -> &[ServiceKind] {
        match operation {
            OperationKind::Save => &self.save_requires,
            OperationKind::Restore => &self.restore_requires,
        }
    }

    /// Strategy factory for the given operation
    pub fn factory_for(&self, operation: OperationKind) -> StrategyFactoryFn {
        match operation {
            OperationKind::Save => self.save_factory,
            OperationKind::Restore => self.restore_factory,
        }
    }
}
