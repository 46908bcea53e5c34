// src/mapping/factory.rs
// ============================================================================
// PRESET FACTORY - Crea el preset correcto para cada arquitectura
// ============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::interface::{AdapterInterface, MethodSet};

use super::clip::ClipPreset;
use super::gemma::GemmaPreset;
use super::llama::LlamaPreset;
use super::phi::{PhiPreset, PhiVariant};
use super::traits::{config_num_layers, InterfacePreset};

/// Detecta la arquitectura de un modelo desde config.json
pub fn detect_architecture(config: &Value) -> String {
    // Por model_type
    if let Some(model_type) = config.get("model_type").and_then(|v| v.as_str()) {
        let mt = model_type.to_lowercase();

        // Vision encoders
        if mt.contains("clip") || mt.contains("siglip") {
            return "clip".to_string();
        }

        // Phi ANTES de Llama; phi3/phi4 antes que phi a secas
        if mt.starts_with("phi3") || mt.starts_with("phi4") || mt == "phimoe" {
            return "phi3".to_string();
        }
        if mt.contains("phi") {
            return "phi".to_string();
        }
        if mt.contains("gemma") {
            return if mt == "gemma" { "gemma".to_string() } else { "gemma2".to_string() };
        }
        if mt.contains("qwen") {
            return "qwen2".to_string();
        }
        if mt.contains("mistral") {
            return "mistral".to_string();
        }
        if mt.contains("llama") || mt.contains("deepseek") || mt.contains("codellama") {
            return "llama".to_string();
        }

        return mt;
    }

    // Por architectures
    if let Some(archs) = config.get("architectures").and_then(|v| v.as_array()) {
        if let Some(arch) = archs.first().and_then(|v| v.as_str()) {
            let arch_lower = arch.to_lowercase();

            if arch_lower.contains("clip") || arch_lower.contains("siglip") {
                return "clip".to_string();
            }
            if arch_lower.contains("phi3") {
                return "phi3".to_string();
            }
            if arch_lower.contains("phi") {
                return "phi".to_string();
            }
            // Gemma2ForCausalLM, Gemma3ForConditionalGeneration: sandwich norm
            if arch_lower.starts_with("gemma2") || arch_lower.starts_with("gemma3") {
                return "gemma2".to_string();
            }
            if arch_lower.contains("gemma") {
                return "gemma".to_string();
            }
            if arch_lower.contains("qwen") {
                return "qwen2".to_string();
            }
            if arch_lower.contains("llama")
                || arch_lower.contains("deepseek")
                || arch_lower.contains("mistral")
            {
                return "llama".to_string();
            }
        }
    }

    "generic".to_string()
}

/// Lee config.json de un modelo
pub fn load_config(model_path: &Path) -> Result<Value> {
    let config_path = model_path.join("config.json");

    if !config_path.exists() {
        anyhow::bail!("No config.json found in {}", model_path.display());
    }

    let data = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let config: Value =
        serde_json::from_str(&data).with_context(|| "Invalid JSON in config.json")?;

    Ok(config)
}

/// Preset para una arquitectura ya detectada
pub fn preset_for(arch: &str, config: &Value) -> Option<Box<dyn InterfacePreset>> {
    match arch {
        "llama" | "mistral" | "qwen2" | "qwen3" | "deepseek" | "codellama" => {
            Some(Box::new(LlamaPreset::from_json(arch, config)))
        }
        "gemma" | "gemma2" | "gemma3" => Some(Box::new(GemmaPreset::new(
            arch != "gemma",
            config_num_layers(config),
        ))),
        "phi" => Some(Box::new(PhiPreset::new(PhiVariant::Parallel, config_num_layers(config)))),
        "phi3" | "phi4" => Some(Box::new(PhiPreset::new(PhiVariant::Fused, config_num_layers(config)))),
        "clip" | "siglip" => Some(Box::new(ClipPreset::from_json(config))),
        _ => None,
    }
}

/// Crea el preset correcto para una config. Desconocida → llama con warning.
pub fn create_preset(config: &Value) -> Box<dyn InterfacePreset> {
    let arch = detect_architecture(config);
    log::info!("Detected architecture: {}", arch);

    preset_for(&arch, config).unwrap_or_else(|| {
        log::warn!("Unknown architecture '{}', trying llama preset", arch);
        Box::new(LlamaPreset::from_json("llama", config))
    })
}

/// Preset + interfaz validada para el modelo en `model_path`
pub fn create_interface(
    model_path: &Path,
    methods: MethodSet,
) -> Result<(Box<dyn InterfacePreset>, AdapterInterface)> {
    let config = load_config(model_path)?;
    let preset = create_preset(&config);

    let role_map = preset
        .role_map()
        .with_context(|| format!("Invalid built-in role map for '{}'", preset.name()))?;
    let interface = AdapterInterface::construct(role_map, methods).with_context(|| {
        format!(
            "Preset '{}' cannot serve the requested methods (supported: {})",
            preset.name(),
            preset.supported_methods()
        )
    })?;

    Ok((preset, interface))
}
