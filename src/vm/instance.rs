//! Live instances and the lookup interface the interpreter uses to reach them.
//!
//! The interpreter never creates or destroys instances. It reaches them
//! through [`InstanceManager`], which the host implements (or uses the
//! provided [`InstanceRegistry`]).

use std::collections::BTreeMap;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use gmrun_core::{AssetId, DEFAULT_FIRST_INSTANCE_ID, InstanceId, Value};

bitflags! {
    /// Boolean built-in fields of an instance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InstanceFlags: u8 {
        const VISIBLE = 1 << 0;
        const SOLID = 1 << 1;
        const PERSISTENT = 1 << 2;
    }
}

/// One live object.
///
/// Built-in fields are plain struct fields reached only through the
/// built-in variable table; `self_variables` holds user-defined state.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub asset_id: AssetId,
    pub instance_id: InstanceId,
    pub self_variables: FxHashMap<String, Value>,

    pub x: f64,
    pub y: f64,
    pub xstart: f64,
    pub ystart: f64,
    pub xprevious: f64,
    pub yprevious: f64,
    pub depth: f64,
    pub direction: f64,
    pub speed: f64,

    pub sprite_index: i32,
    pub image_index: f64,
    pub image_speed: f64,
    pub image_xscale: f64,
    pub image_yscale: f64,
    pub image_angle: f64,
    pub image_alpha: f64,

    pub flags: InstanceFlags,
}

impl Instance {
    pub fn new(asset_id: AssetId, instance_id: InstanceId) -> Self {
        Self {
            asset_id,
            instance_id,
            self_variables: FxHashMap::default(),
            x: 0.0,
            y: 0.0,
            xstart: 0.0,
            ystart: 0.0,
            xprevious: 0.0,
            yprevious: 0.0,
            depth: 0.0,
            direction: 0.0,
            speed: 0.0,
            sprite_index: -1,
            image_index: 0.0,
            image_speed: 1.0,
            image_xscale: 1.0,
            image_yscale: 1.0,
            image_angle: 0.0,
            image_alpha: 1.0,
            flags: InstanceFlags::VISIBLE,
        }
    }

    /// Place the instance, updating start and previous positions too.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self.xstart = x;
        self.ystart = y;
        self.xprevious = x;
        self.yprevious = y;
        self
    }
}

/// Lookup of live instances by type and by identity.
pub trait InstanceManager {
    /// All live instances of an object asset.
    fn find_by_asset_id(&self, asset_id: AssetId) -> Vec<&Instance>;

    fn find_by_instance_id(&self, instance_id: InstanceId) -> Option<&Instance>;

    fn find_by_instance_id_mut(&mut self, instance_id: InstanceId) -> Option<&mut Instance>;
}

/// Host-side instance store, ordered by instance id.
#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    instances: BTreeMap<InstanceId, Instance>,
    next_id: i32,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::starting_at(DEFAULT_FIRST_INSTANCE_ID)
    }

    /// Create a registry whose first generated id is `first_id`.
    pub fn starting_at(first_id: i32) -> Self {
        Self {
            instances: BTreeMap::new(),
            next_id: first_id,
        }
    }

    /// Create an instance of `asset_id` with the next free id.
    pub fn create(&mut self, asset_id: AssetId) -> InstanceId {
        while self.instances.contains_key(&InstanceId::new(self.next_id)) {
            self.next_id += 1;
        }
        let id = InstanceId::new(self.next_id);
        self.next_id += 1;
        self.instances.insert(id, Instance::new(asset_id, id));
        id
    }

    /// Insert a prepared instance, replacing any with the same id.
    pub fn insert(&mut self, instance: Instance) -> Option<Instance> {
        self.instances.insert(instance.instance_id, instance)
    }

    pub fn destroy(&mut self, instance_id: InstanceId) -> Option<Instance> {
        self.instances.remove(&instance_id)
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<&Instance> {
        self.instances.get(&instance_id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceManager for InstanceRegistry {
    fn find_by_asset_id(&self, asset_id: AssetId) -> Vec<&Instance> {
        self.instances
            .values()
            .filter(|instance| instance.asset_id == asset_id)
            .collect()
    }

    fn find_by_instance_id(&self, instance_id: InstanceId) -> Option<&Instance> {
        self.instances.get(&instance_id)
    }

    fn find_by_instance_id_mut(&mut self, instance_id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(&instance_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_increasing_ids() {
        let mut registry = InstanceRegistry::new();
        let a = registry.create(AssetId::new(3));
        let b = registry.create(AssetId::new(3));
        assert_eq!(a, InstanceId::new(100_000));
        assert_eq!(b, InstanceId::new(100_001));
    }

    #[test]
    fn create_skips_inserted_ids() {
        let mut registry = InstanceRegistry::new();
        registry.insert(Instance::new(AssetId::new(1), InstanceId::new(100_000)));
        let id = registry.create(AssetId::new(1));
        assert_eq!(id, InstanceId::new(100_001));
    }

    #[test]
    fn find_by_asset_id_filters_type() {
        let mut registry = InstanceRegistry::new();
        registry.create(AssetId::new(1));
        registry.create(AssetId::new(2));
        registry.create(AssetId::new(1));
        assert_eq!(registry.find_by_asset_id(AssetId::new(1)).len(), 2);
        assert!(registry.find_by_asset_id(AssetId::new(9)).is_empty());
    }

    #[test]
    fn destroy_removes_instance() {
        let mut registry = InstanceRegistry::new();
        let id = registry.create(AssetId::new(1));
        assert!(registry.destroy(id).is_some());
        assert!(registry.find_by_instance_id(id).is_none());
    }

    #[test]
    fn new_instance_defaults() {
        let instance = Instance::new(AssetId::new(0), InstanceId::new(100_000)).at(4.0, 8.0);
        assert_eq!(instance.xstart, 4.0);
        assert_eq!(instance.image_xscale, 1.0);
        assert!(instance.flags.contains(InstanceFlags::VISIBLE));
        assert!(instance.self_variables.is_empty());
    }
}
