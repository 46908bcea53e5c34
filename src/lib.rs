// src/lib.rs
// ============================================================================
// HELIOS-ADAPT - Interfaz de adapters para modelos transformer heterogéneos
// ============================================================================

pub mod interface;
pub mod module;
pub mod mapping;
pub mod plan;
pub mod safetensor;

// Re-exports principales
pub use interface::{
    AdaptedModel, AdapterInterface, AdapterMethod, ConfigError, InterfaceConfig, MethodSet,
    ResolutionError, ResolvedLayer, ResolvedModel, Role, RoleMap, RolePath,
};
pub use module::{Module, ModuleHandle, ModuleNode, ModuleRef};
pub use mapping::{create_interface, InterfacePreset};
pub use plan::{InjectionPlan, PlanOptions, Projection};
pub use safetensor::SafetensorIndex;
