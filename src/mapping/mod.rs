// src/mapping/mod.rs
// ============================================================================
// MAPPING - RoleMaps predefinidos por arquitectura
// ============================================================================

pub mod traits;
pub mod factory;
pub mod llama;
pub mod gemma;
pub mod phi;
pub mod clip;

// Re-exports
pub use traits::InterfacePreset;
pub use factory::{create_interface, create_preset, detect_architecture, load_config, preset_for};
