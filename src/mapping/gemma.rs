// src/mapping/gemma.rs
// ============================================================================
// GEMMA PRESET - Gemma / Gemma2
// ============================================================================
//
// Gemma  = misma disposición que Llama.
// Gemma2 = "sandwich norm": cuatro norms por capa.
//
//   input_layernorm            ← pre-atención
//   post_attention_layernorm   ← post-atención (ln_1)
//   pre_feedforward_layernorm  ← pre-FFN
//   post_feedforward_layernorm ← post-FFN (ln_2)
//
// ============================================================================

use crate::interface::{ConfigError, Role, RoleMap};

use super::llama::decoder_base;
use super::traits::InterfacePreset;

#[derive(Debug, Clone)]
pub struct GemmaPreset {
    sandwich_norm: bool,
    num_hidden_layers: Option<usize>,
}

impl GemmaPreset {
    pub fn new(sandwich_norm: bool, num_hidden_layers: Option<usize>) -> Self {
        Self {
            sandwich_norm,
            num_hidden_layers,
        }
    }
}

impl InterfacePreset for GemmaPreset {
    fn name(&self) -> &str {
        if self.sandwich_norm {
            "gemma2"
        } else {
            "gemma"
        }
    }

    fn role_map(&self) -> Result<RoleMap, ConfigError> {
        let builder = decoder_base()
            .role(Role::AttnQProj, "q_proj")
            .role(Role::AttnKProj, "k_proj")
            .role(Role::AttnVProj, "v_proj")
            .role(Role::AttnOProj, "o_proj")
            .role(Role::LayerIntermediateProj, "mlp.up_proj")
            .role(Role::LayerOutputProj, "mlp.down_proj");

        let builder = if self.sandwich_norm {
            builder
                .role(Role::LayerLn1, "post_attention_layernorm")
                .role(Role::LayerPreFfn, "pre_feedforward_layernorm")
                .role(Role::LayerLn2, "post_feedforward_layernorm")
        } else {
            builder
                .role(Role::LayerPreFfn, "post_attention_layernorm")
                .absent(Role::LayerLn1)
                .absent(Role::LayerLn2)
        };

        builder.build()
    }

    fn num_layers(&self) -> Option<usize> {
        self.num_hidden_layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemma2_sandwich_norms() {
        let preset = GemmaPreset::new(true, Some(26));
        assert_eq!(preset.name(), "gemma2");
        let map = preset.role_map().unwrap();
        assert_eq!(map.path(Role::LayerLn1).unwrap().to_string(), "post_attention_layernorm");
        assert_eq!(map.path(Role::LayerPreFfn).unwrap().to_string(), "pre_feedforward_layernorm");
        assert_eq!(map.path(Role::LayerLn2).unwrap().to_string(), "post_feedforward_layernorm");
    }

    #[test]
    fn test_gemma1_like_llama() {
        let preset = GemmaPreset::new(false, None);
        let map = preset.role_map().unwrap();
        assert_eq!(map.path(Role::LayerPreFfn).unwrap().to_string(), "post_attention_layernorm");
        assert!(map.is_absent(Role::LayerLn1));
    }
}
