// src/interface/roles.rs
// ============================================================================
// ROLES - Vocabulario canónico de posiciones estructurales
// ============================================================================
//
// El orden de ALL es el orden canónico: resolución, validación y errores
// siempre lo siguen, nunca el orden de iteración del mapa del usuario.
//
// ============================================================================

use std::fmt;
use std::str::FromStr;

/// Desde dónde se resuelve la ruta de un rol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleScope {
    /// Relativa al modelo base
    Model,
    /// Relativa a cada capa
    Layer,
    /// Relativa al bloque de atención de cada capa (proyecciones Q/K/V/O)
    Attention,
}

/// Rol canónico, independiente de la arquitectura
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    ModelEmbeddings,
    ModelLayers,
    LayerSelfAttn,
    LayerCrossAttn,
    AttnQProj,
    AttnKProj,
    AttnVProj,
    AttnOProj,
    LayerIntermediateProj,
    LayerOutputProj,
    LayerPreSelfAttn,
    LayerPreCrossAttn,
    LayerPreFfn,
    /// Norm después de la atención
    LayerLn1,
    /// Norm después del FFN
    LayerLn2,
}

impl Role {
    /// Todos los roles en orden canónico
    pub const ALL: [Role; 15] = [
        Role::ModelEmbeddings,
        Role::ModelLayers,
        Role::LayerSelfAttn,
        Role::LayerCrossAttn,
        Role::AttnQProj,
        Role::AttnKProj,
        Role::AttnVProj,
        Role::AttnOProj,
        Role::LayerIntermediateProj,
        Role::LayerOutputProj,
        Role::LayerPreSelfAttn,
        Role::LayerPreCrossAttn,
        Role::LayerPreFfn,
        Role::LayerLn1,
        Role::LayerLn2,
    ];

    /// Roles que se resuelven por capa, en orden canónico
    pub fn layer_roles() -> impl Iterator<Item = Role> {
        Self::ALL.into_iter().filter(|r| r.scope() != RoleScope::Model)
    }

    /// Las cuatro proyecciones de atención
    pub const ATTN_PROJECTIONS: [Role; 4] = [
        Role::AttnQProj,
        Role::AttnKProj,
        Role::AttnVProj,
        Role::AttnOProj,
    ];

    /// Clave en la configuración JSON
    pub fn key(&self) -> &'static str {
        match self {
            Self::ModelEmbeddings => "model_embeddings",
            Self::ModelLayers => "model_layers",
            Self::LayerSelfAttn => "layer_self_attn",
            Self::LayerCrossAttn => "layer_cross_attn",
            Self::AttnQProj => "attn_q_proj",
            Self::AttnKProj => "attn_k_proj",
            Self::AttnVProj => "attn_v_proj",
            Self::AttnOProj => "attn_o_proj",
            Self::LayerIntermediateProj => "layer_intermediate_proj",
            Self::LayerOutputProj => "layer_output_proj",
            Self::LayerPreSelfAttn => "layer_pre_self_attn",
            Self::LayerPreCrossAttn => "layer_pre_cross_attn",
            Self::LayerPreFfn => "layer_pre_ffn",
            Self::LayerLn1 => "layer_ln_1",
            Self::LayerLn2 => "layer_ln_2",
        }
    }

    pub fn from_key(key: &str) -> Option<Role> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }

    pub fn scope(&self) -> RoleScope {
        match self {
            Self::ModelEmbeddings | Self::ModelLayers => RoleScope::Model,
            Self::AttnQProj | Self::AttnKProj | Self::AttnVProj | Self::AttnOProj => {
                RoleScope::Attention
            }
            _ => RoleScope::Layer,
        }
    }

    /// Roles que pueden faltar sin importar los métodos pedidos
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Self::LayerCrossAttn | Self::LayerPreCrossAttn | Self::LayerLn1 | Self::LayerLn2
        )
    }

    /// Letra corta de la proyección ("q", "k", "v", "o")
    pub fn projection_letter(&self) -> Option<&'static str> {
        match self {
            Self::AttnQProj => Some("q"),
            Self::AttnKProj => Some("k"),
            Self::AttnVProj => Some("v"),
            Self::AttnOProj => Some("o"),
            _ => None,
        }
    }

    /// Posición en el orden canónico
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_key(s).ok_or_else(|| format!("unknown role '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_ordinal() {
        for (i, role) in Role::ALL.iter().enumerate() {
            assert_eq!(role.ordinal(), i);
        }
    }

    #[test]
    fn test_key_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::from_key(role.key()), Some(role));
        }
        assert_eq!(Role::from_key("attn_qkv_proj"), None);
    }

    #[test]
    fn test_layer_roles_exclude_model_scope() {
        let roles: Vec<Role> = Role::layer_roles().collect();
        assert_eq!(roles.len(), 13);
        assert_eq!(roles[0], Role::LayerSelfAttn);
        assert!(!roles.contains(&Role::ModelEmbeddings));
    }

    #[test]
    fn test_scopes() {
        assert_eq!(Role::ModelLayers.scope(), RoleScope::Model);
        assert_eq!(Role::AttnVProj.scope(), RoleScope::Attention);
        assert_eq!(Role::LayerOutputProj.scope(), RoleScope::Layer);
    }
}
