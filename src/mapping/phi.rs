// src/mapping/phi.rs
// ============================================================================
// PHI PRESET - Phi-2 / Phi-3 / Phi-4
// ============================================================================
//
// Phi-3/4:
// - QKV fusionado (qkv_proj): no hay q/k/v separados → Absent
// - Gate+Up fusionado (gate_up_proj) como proyección intermedia
// - Pre-norm clásico (input_layernorm / post_attention_layernorm)
//
// Phi-2:
// - q/k/v separados, salida de atención en "dense"
// - MLP fc1/fc2
// - Atención y MLP en PARALELO: un solo norm por capa, sin pre-FFN
//
// Consecuencia: Phi-3/4 no admite LoRA por proyección; Phi-2 no admite
// bottleneck. construct() lo detecta antes de tocar el modelo.
//
// ============================================================================

use crate::interface::{ConfigError, Role, RoleMap};

use super::llama::decoder_base;
use super::traits::InterfacePreset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhiVariant {
    /// Phi-1 / Phi-1.5 / Phi-2
    Parallel,
    /// Phi-3 / Phi-3.5 / Phi-4
    Fused,
}

#[derive(Debug, Clone)]
pub struct PhiPreset {
    variant: PhiVariant,
    num_hidden_layers: Option<usize>,
}

impl PhiPreset {
    pub fn new(variant: PhiVariant, num_hidden_layers: Option<usize>) -> Self {
        Self {
            variant,
            num_hidden_layers,
        }
    }
}

impl InterfacePreset for PhiPreset {
    fn name(&self) -> &str {
        match self.variant {
            PhiVariant::Parallel => "phi",
            PhiVariant::Fused => "phi3",
        }
    }

    fn role_map(&self) -> Result<RoleMap, ConfigError> {
        match self.variant {
            PhiVariant::Parallel => decoder_base()
                .role(Role::AttnQProj, "q_proj")
                .role(Role::AttnKProj, "k_proj")
                .role(Role::AttnVProj, "v_proj")
                .role(Role::AttnOProj, "dense")
                .role(Role::LayerIntermediateProj, "mlp.fc1")
                .role(Role::LayerOutputProj, "mlp.fc2")
                .absent(Role::LayerPreFfn)
                .absent(Role::LayerLn1)
                .absent(Role::LayerLn2)
                .build(),
            PhiVariant::Fused => decoder_base()
                .absent(Role::AttnQProj)
                .absent(Role::AttnKProj)
                .absent(Role::AttnVProj)
                .role(Role::AttnOProj, "o_proj")
                .role(Role::LayerIntermediateProj, "mlp.gate_up_proj")
                .role(Role::LayerOutputProj, "mlp.down_proj")
                .role(Role::LayerPreFfn, "post_attention_layernorm")
                .absent(Role::LayerLn1)
                .absent(Role::LayerLn2)
                .build(),
        }
    }

    fn num_layers(&self) -> Option<usize> {
        self.num_hidden_layers
    }
}
