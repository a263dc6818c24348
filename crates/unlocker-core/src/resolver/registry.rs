//! Resolver registry: capability name -> remote resolver.
//!
//! Design:
//! - Built during initialization (mutable).
//! - Used during runtime (immutable, shared behind `Arc`).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ports::Resolver;

/// Name of a remote unlocking capability (e.g. `timer_bypass`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    pub const FAST_PATH: &'static str = "fast_path";
    pub const TIMER_BYPASS: &'static str = "timer_bypass";
    pub const NATIVE_BYPASS: &'static str = "native_bypass";
    pub const LINK_PAGE: &'static str = "link_page";
    pub const DRIVE: &'static str = "drive";
    pub const CLOUD: &'static str = "cloud";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Resolver for capability '{0}' is already registered")]
    AlreadyRegistered(Capability),
}

#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<Capability, Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        capability: impl Into<Capability>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<(), RegistryError> {
        let capability = capability.into();
        if self.resolvers.contains_key(&capability) {
            return Err(RegistryError::AlreadyRegistered(capability));
        }
        self.resolvers.insert(capability, resolver);
        Ok(())
    }

    pub fn get(&self, capability: &Capability) -> Option<&Arc<dyn Resolver>> {
        self.resolvers.get(capability)
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.resolvers.contains_key(capability)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
