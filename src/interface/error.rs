// src/interface/error.rs
// ============================================================================
// ERRORES - Configuración (estáticos) vs resolución (por modelo)
// ============================================================================
//
// Ninguno se reintenta: ambos vienen de un desajuste entre lo declarado y la
// configuración o la arquitectura real.
//
// ============================================================================

use thiserror::Error;

use super::methods::AdapterMethod;
use super::roles::Role;

/// Error detectado en construct, antes de tocar ningún modelo
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing role '{role}' required by the requested adapter methods{}", absent_suffix(.declared_absent))]
    MissingRole { role: Role, declared_absent: bool },

    #[error("invalid path for role '{role}': {reason}")]
    InvalidPath { role: String, reason: String },

    #[error("unknown role key '{0}'")]
    UnknownRole(String),

    #[error("duplicate declaration for role '{0}'")]
    DuplicateRole(Role),

    #[error("no adapter methods requested")]
    EmptyMethodSet,
}

impl ConfigError {
    /// Rol que causó el error, si aplica
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::MissingRole { role, .. } | Self::DuplicateRole(role) => Some(*role),
            _ => None,
        }
    }
}

/// Error detectado en resolve, contra un modelo concreto
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("{}path '{path}' for {target} not found: no '{segment}' under '{parent}'", layer_prefix(.layer))]
    PathNotFound {
        /// Rol (o "base_model") cuya ruta falló
        target: String,
        layer: Option<usize>,
        /// Ruta declarada
        path: String,
        /// Primer segmento inexistente
        segment: String,
        /// Ruta completa del último objeto encontrado
        parent: String,
    },

    #[error("layer collection '{path}' has no layers")]
    NoLayers { path: String },
}

impl ResolutionError {
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }
}

fn absent_suffix(declared_absent: &bool) -> &'static str {
    if *declared_absent {
        " (declared absent)"
    } else {
        ""
    }
}

fn layer_prefix(layer: &Option<usize>) -> String {
    layer.map(|l| format!("layer {}: ", l)).unwrap_or_default()
}

/// Error al consultar el cache resuelto
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("layer index {index} out of range (model has {len} layers)")]
    LayerOutOfRange { index: usize, len: usize },

    #[error("role '{role}' was not resolved for layer {layer}")]
    RoleNotResolved { role: Role, layer: usize },

    #[error("role '{0}' is model-scoped; use embeddings() or layer_collection()")]
    ModelScoped(Role),
}

/// Error al construir un plan de inyección
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("method '{0}' is not part of this interface")]
    MethodNotEnabled(AdapterMethod),

    #[error("layer index {index} out of range (model has {len} layers)")]
    LayerOutOfRange { index: usize, len: usize },

    #[error("LoRA enabled but no target modules selected")]
    NoLoraTargets,

    #[error(transparent)]
    Access(#[from] AccessError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_role_message_names_role() {
        let err = ConfigError::MissingRole {
            role: Role::AttnQProj,
            declared_absent: false,
        };
        assert_eq!(
            err.to_string(),
            "missing role 'attn_q_proj' required by the requested adapter methods"
        );
        assert_eq!(err.role(), Some(Role::AttnQProj));

        let absent = ConfigError::MissingRole {
            role: Role::LayerPreFfn,
            declared_absent: true,
        };
        assert!(absent.to_string().ends_with("(declared absent)"));
    }

    #[test]
    fn test_path_not_found_message() {
        let err = ResolutionError::PathNotFound {
            target: "layer_output_proj".into(),
            layer: Some(3),
            path: "mlp.down".into(),
            segment: "down".into(),
            parent: "model.layers.3.mlp".into(),
        };
        assert_eq!(
            err.to_string(),
            "layer 3: path 'mlp.down' for layer_output_proj not found: no 'down' under 'model.layers.3.mlp'"
        );
        assert!(err.is_path_not_found());
    }
}
