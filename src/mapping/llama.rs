// src/mapping/llama.rs
// ============================================================================
// LLAMA PRESET - Llama/Mistral/Qwen2/DeepSeek
// ============================================================================
//
// Todos usan la misma disposición de submódulos:
//
//   model.embed_tokens
//   model.layers.{N}.self_attn.{q,k,v,o}_proj
//   model.layers.{N}.mlp.{gate,up,down}_proj
//   model.layers.{N}.input_layernorm           ← pre-atención
//   model.layers.{N}.post_attention_layernorm  ← pre-FFN (pese al nombre)
//
// ============================================================================

use serde_json::Value;

use crate::interface::{ConfigError, Role, RoleMap, RoleMapBuilder};

use super::traits::{config_num_layers, InterfacePreset};

#[derive(Debug, Clone)]
pub struct LlamaPreset {
    family: String,
    num_hidden_layers: Option<usize>,
}

impl LlamaPreset {
    pub fn new(family: impl Into<String>, num_hidden_layers: Option<usize>) -> Self {
        Self {
            family: family.into(),
            num_hidden_layers,
        }
    }

    pub fn from_json(family: &str, config: &Value) -> Self {
        Self::new(family, config_num_layers(config))
    }
}

/// Roles compartidos por la familia decoder-only pre-norm
pub(crate) fn decoder_base() -> RoleMapBuilder {
    RoleMap::builder()
        .base_model("model")
        .role(Role::ModelEmbeddings, "embed_tokens")
        .role(Role::ModelLayers, "layers")
        .role(Role::LayerSelfAttn, "self_attn")
        .absent(Role::LayerCrossAttn)
        .absent(Role::LayerPreCrossAttn)
        .role(Role::LayerPreSelfAttn, "input_layernorm")
}

impl InterfacePreset for LlamaPreset {
    fn name(&self) -> &str {
        &self.family
    }

    fn role_map(&self) -> Result<RoleMap, ConfigError> {
        decoder_base()
            .role(Role::AttnQProj, "q_proj")
            .role(Role::AttnKProj, "k_proj")
            .role(Role::AttnVProj, "v_proj")
            .role(Role::AttnOProj, "o_proj")
            .role(Role::LayerIntermediateProj, "mlp.up_proj")
            .role(Role::LayerOutputProj, "mlp.down_proj")
            .role(Role::LayerPreFfn, "post_attention_layernorm")
            .absent(Role::LayerLn1)
            .absent(Role::LayerLn2)
            .build()
    }

    fn num_layers(&self) -> Option<usize> {
        self.num_hidden_layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::AdapterMethod;

    #[test]
    fn test_llama_supports_all_methods() {
        let preset = LlamaPreset::from_json("llama", &serde_json::json!({ "num_hidden_layers": 32 }));
        assert_eq!(preset.num_layers(), Some(32));
        let supported = preset.supported_methods();
        for m in AdapterMethod::ALL {
            assert!(supported.contains(m), "llama should support {}", m);
        }
    }

    #[test]
    fn test_llama_paths() {
        let map = LlamaPreset::new("qwen2", None).role_map().unwrap();
        assert_eq!(map.base_model().unwrap().to_string(), "model");
        assert_eq!(map.path(Role::LayerIntermediateProj).unwrap().to_string(), "mlp.up_proj");
        assert!(map.is_absent(Role::LayerCrossAttn));
        assert!(map.is_absent(Role::LayerLn2));
    }
}
