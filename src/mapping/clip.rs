// src/mapping/clip.rs
// ============================================================================
// CLIP PRESET - Torre de visión CLIP/SigLIP
// ============================================================================
//
//   vision_model.embeddings
//   vision_model.encoder.layers.{N}.self_attn.{q,k,v,out}_proj
//   vision_model.encoder.layers.{N}.mlp.fc1 / fc2
//   vision_model.encoder.layers.{N}.layer_norm1  ← pre-atención
//   vision_model.encoder.layers.{N}.layer_norm2  ← pre-FFN
//
// ============================================================================

use serde_json::Value;

use crate::interface::{ConfigError, Role, RoleMap};

use super::traits::{config_num_layers, InterfacePreset};

#[derive(Debug, Clone)]
pub struct ClipPreset {
    num_hidden_layers: Option<usize>,
}

impl ClipPreset {
    pub fn new(num_hidden_layers: Option<usize>) -> Self {
        Self { num_hidden_layers }
    }

    pub fn from_json(config: &Value) -> Self {
        // CLIP puede tener la config en "vision_config" o en la raíz
        let vision_config = config.get("vision_config").unwrap_or(config);
        Self::new(config_num_layers(vision_config))
    }
}

impl InterfacePreset for ClipPreset {
    fn name(&self) -> &str {
        "clip"
    }

    fn role_map(&self) -> Result<RoleMap, ConfigError> {
        RoleMap::builder()
            .base_model("vision_model")
            .role(Role::ModelEmbeddings, "embeddings")
            .role(Role::ModelLayers, "encoder.layers")
            .role(Role::LayerSelfAttn, "self_attn")
            .absent(Role::LayerCrossAttn)
            .role(Role::AttnQProj, "q_proj")
            .role(Role::AttnKProj, "k_proj")
            .role(Role::AttnVProj, "v_proj")
            .role(Role::AttnOProj, "out_proj")
            .role(Role::LayerIntermediateProj, "mlp.fc1")
            .role(Role::LayerOutputProj, "mlp.fc2")
            .role(Role::LayerPreSelfAttn, "layer_norm1")
            .absent(Role::LayerPreCrossAttn)
            .role(Role::LayerPreFfn, "layer_norm2")
            .absent(Role::LayerLn1)
            .absent(Role::LayerLn2)
            .build()
    }

    fn num_layers(&self) -> Option<usize> {
        self.num_hidden_layers
    }
}
