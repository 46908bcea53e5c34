// src/mapping/traits.rs
// ============================================================================
// PRESET TRAIT - RoleMaps predefinidos por familia de arquitectura
// ============================================================================

use crate::interface::{AdapterMethod, ConfigError, MethodSet, RoleMap};

/// Trait para presets de diferentes arquitecturas.
///
/// El preset es PURO:
/// - Solo conoce la arquitectura (nombres de submódulos)
/// - NO decide qué métodos se piden (eso lo hace el CLI o el usuario)
pub trait InterfacePreset: Send + Sync {
    /// Nombre de la familia (ej: "llama", "gemma2", "phi3")
    fn name(&self) -> &str;

    /// RoleMap de la familia
    fn role_map(&self) -> Result<RoleMap, ConfigError>;

    /// Número de capas según config.json (para validar contra el modelo real)
    fn num_layers(&self) -> Option<usize>;

    /// Métodos que el RoleMap del preset puede satisfacer
    fn supported_methods(&self) -> MethodSet {
        let Ok(map) = self.role_map() else {
            return MethodSet::default();
        };
        MethodSet::new(
            AdapterMethod::ALL
                .into_iter()
                .filter(|m| map.missing_roles(&MethodSet::new([*m])).is_empty()),
        )
    }
}

/// Lee num_hidden_layers de una config (raíz o sub-config)
pub(crate) fn config_num_layers(config: &serde_json::Value) -> Option<usize> {
    config["num_hidden_layers"].as_u64().map(|n| n as usize)
}
