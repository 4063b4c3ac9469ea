// tests/test_harness.rs
//! Test harness for interpreter integration tests
//!
//! Loads script artifacts from `test_scripts/` into a fresh [`Vm`] and keeps
//! the instance registry the scripts run against.

use gmrun::*;
use std::fs;
use std::path::PathBuf;

/// A VM with scripts loaded from `test_scripts/` and a host-side registry.
pub struct TestHarness {
    pub vm: Vm,
    pub instances: InstanceRegistry,
    test_scripts_dir: PathBuf,
}

impl TestHarness {
    /// Create a harness with default configuration and the standard natives.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let instances = InstanceRegistry::starting_at(config.first_instance_id);
        Self {
            vm: Vm::with_default_natives(config),
            instances,
            test_scripts_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_scripts"),
        }
    }

    /// Load every script in a `test_scripts/` artifact.
    pub fn load(&mut self, filename: &str) -> &mut Self {
        let path = self.test_scripts_dir.join(filename);
        let json = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
        self.vm
            .load_json(&json)
            .unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e));
        self
    }

    /// Add an instance with a fixed id.
    pub fn spawn(&mut self, asset_id: i32, instance_id: i32) -> InstanceId {
        let id = InstanceId::new(instance_id);
        self.instances
            .insert(Instance::new(AssetId::new(asset_id), id));
        id
    }

    pub fn run(&mut self, script: &str) -> Result<Value, ExecError> {
        self.vm
            .execute(&mut self.instances, script, None, Vec::new())
    }

    pub fn run_as(&mut self, script: &str, self_id: InstanceId) -> Result<Value, ExecError> {
        self.vm
            .execute(&mut self.instances, script, Some(self_id), Vec::new())
    }

    /// Run a script that must succeed.
    pub fn run_ok(&mut self, script: &str) -> Value {
        self.run(script)
            .unwrap_or_else(|e| panic!("{script} failed: {e}"))
    }

    pub fn instance(&self, id: InstanceId) -> &Instance {
        self.instances
            .get(id)
            .unwrap_or_else(|| panic!("no instance {id}"))
    }
}
