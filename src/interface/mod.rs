// src/interface/mod.rs
// ============================================================================
// INTERFACE - Resolver de roles para inyección de adapters
// ============================================================================

pub mod roles;
pub mod methods;
pub mod path;
pub mod role_map;
pub mod error;
pub mod resolver;
pub mod config;

// Re-exports
pub use roles::{Role, RoleScope};
pub use methods::{AdapterMethod, MethodSet};
pub use path::{ModulePath, PathSyntaxError};
pub use role_map::{RoleMap, RoleMapBuilder, RolePath};
pub use error::{AccessError, ConfigError, PlanError, ResolutionError};
pub use resolver::{AdaptedModel, AdapterInterface, ResolvedLayer, ResolvedModel};
pub use config::InterfaceConfig;
