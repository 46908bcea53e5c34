// src/interface/config.rs
// ============================================================================
// INTERFACE CONFIG - Declaración JSON de una interfaz
// ============================================================================
//
// {
//   "adapter_methods": ["lora", "reft"],
//   "base_model": "model",
//   "model_embeddings": "embed_tokens",
//   "model_layers": "layers",
//   "layer_self_attn": "self_attn",
//   "layer_cross_attn": null,          ← null = Absent
//   "attn_q_proj": "q_proj",
//   ...
// }
//
// Una clave ausente = rol no configurado. Una clave desconocida = error.
//
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::plan::PlanOptions;

use super::error::ConfigError;
use super::methods::MethodSet;
use super::resolver::AdapterInterface;
use super::role_map::{RoleMap, RolePath};
use super::roles::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub adapter_methods: MethodSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,

    /// Opciones del plan de inyección (opcional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanOptions>,

    /// Resto de claves: roles
    #[serde(flatten)]
    pub roles: BTreeMap<String, Option<String>>,
}

impl InterfaceConfig {
    pub fn from_json_str(data: &str) -> Result<Self> {
        serde_json::from_str(data).with_context(|| "Invalid interface JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Serializa un RoleMap existente (ej: un preset) para editarlo a mano
    pub fn from_role_map(role_map: &RoleMap, methods: MethodSet) -> Self {
        let roles = role_map
            .iter()
            .map(|(role, entry)| {
                let path = match entry {
                    RolePath::Present(p) => Some(p.to_string()),
                    RolePath::Absent => None,
                };
                (role.key().to_string(), path)
            })
            .collect();

        Self {
            adapter_methods: methods,
            base_model: role_map.base_model().map(ToString::to_string),
            plan: None,
            roles,
        }
    }

    pub fn role_map(&self) -> Result<RoleMap, ConfigError> {
        let mut builder = RoleMap::builder();
        if let Some(base) = &self.base_model {
            builder = builder.base_model(base.clone());
        }

        for (key, path) in &self.roles {
            let role = Role::from_key(key).ok_or_else(|| ConfigError::UnknownRole(key.clone()))?;
            builder = builder.entry(role, path.clone());
        }

        builder.build()
    }

    pub fn build_interface(&self) -> Result<AdapterInterface, ConfigError> {
        AdapterInterface::construct(self.role_map()?, self.adapter_methods.clone())
    }
}
