use crate::id::FluidTypeId;
use std::collections::HashMap;

/// Temperature class of a fluid. Pipes may restrict which classes they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FluidTemperature {
    Cold,
    Normal,
    Hot,
}

/// Compatibility metadata attached to a fluid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FluidTag {
    Temperature(FluidTemperature),
    /// The fluid is a gas rather than a liquid.
    Gaseous,
}

impl FluidTag {
    fn same_kind(&self, other: &FluidTag) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A fluid type definition in the registry.
#[derive(Debug, Clone)]
pub struct FluidDef {
    pub name: String,
    pub tags: Vec<FluidTag>,
}

impl FluidDef {
    pub fn temperature(&self) -> Option<FluidTemperature> {
        self.tags.iter().find_map(|tag| match tag {
            FluidTag::Temperature(t) => Some(*t),
            _ => None,
        })
    }

    pub fn has_tag(&self, tag: FluidTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Builder for constructing an immutable [`FluidRegistry`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct FluidRegistryBuilder {
    fluids: Vec<FluidDef>,
    name_to_id: HashMap<String, FluidTypeId>,
}

impl FluidRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fluid type. Returns its ID. Names must be unique.
    pub fn register_fluid(&mut self, name: &str) -> Result<FluidTypeId, RegistryError> {
        if self.name_to_id.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let id = FluidTypeId(self.fluids.len() as u32);
        self.fluids.push(FluidDef {
            name: name.to_string(),
            tags: Vec::new(),
        });
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Attach a tag to a registered fluid. A fluid carries at most one tag
    /// of each kind.
    pub fn add_tag(&mut self, name: &str, tag: FluidTag) -> Result<(), RegistryError> {
        let id = self
            .name_to_id
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let def = &mut self.fluids[id.0 as usize];
        if def.tags.iter().any(|t| t.same_kind(&tag)) {
            return Err(RegistryError::DuplicateTag {
                fluid: name.to_string(),
                tag,
            });
        }
        def.tags.push(tag);
        Ok(())
    }

    /// Lookup fluid type ID by name.
    pub fn fluid_id(&self, name: &str) -> Option<FluidTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable registry.
    pub fn build(self) -> FluidRegistry {
        FluidRegistry {
            fluids: self.fluids,
            name_to_id: self.name_to_id,
        }
    }
}

/// Immutable fluid catalog. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct FluidRegistry {
    fluids: Vec<FluidDef>,
    name_to_id: HashMap<String, FluidTypeId>,
}

impl FluidRegistry {
    pub fn get(&self, id: FluidTypeId) -> Option<&FluidDef> {
        self.fluids.get(id.0 as usize)
    }

    pub fn fluid_id(&self, name: &str) -> Option<FluidTypeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn name(&self, id: FluidTypeId) -> Option<&str> {
        self.get(id).map(|def| def.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fluids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fluids.is_empty()
    }

    /// All fluid ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = FluidTypeId> + '_ {
        (0..self.fluids.len() as u32).map(FluidTypeId)
    }

    /// Fluids whose temperature is one of `allowed`. Fluids without a
    /// temperature tag never match.
    pub fn fluids_with_temperature(&self, allowed: &[FluidTemperature]) -> Vec<FluidTypeId> {
        self.ids()
            .filter(|id| {
                self.get(*id)
                    .and_then(FluidDef::temperature)
                    .is_some_and(|t| allowed.contains(&t))
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate fluid name: {0}")]
    DuplicateName(String),
    #[error("fluid {fluid} already has a tag of the same kind as {tag:?}")]
    DuplicateTag { fluid: String, tag: FluidTag },
}
