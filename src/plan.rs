// src/plan.rs
// ============================================================================
// PLAN - Sitios de inyección por método, derivados del cache resuelto
// ============================================================================
//
// El plan es lo que se entrega al mecanismo de inyección externo:
//   - lora:          una entrada por proyección elegida, por capa
//   - reft:          una entrada por capa (salida de la capa)
//   - bottleneck:    dos por capa (tras attn_o_proj y tras layer_output_proj)
//   - prompt_tuning: una sobre los embeddings
//
// Todo o nada: si algo falla no hay plan.
//
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::interface::{AdapterMethod, MethodSet, PlanError, ResolvedModel, Role};
use crate::module::ModuleHandle;

/// Proyección de atención seleccionable para LoRA
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    Q,
    K,
    V,
    O,
}

impl Projection {
    pub fn role(&self) -> Role {
        match self {
            Self::Q => Role::AttnQProj,
            Self::K => Role::AttnKProj,
            Self::V => Role::AttnVProj,
            Self::O => Role::AttnOProj,
        }
    }
}

impl FromStr for Projection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "q" => Ok(Self::Q),
            "k" => Ok(Self::K),
            "v" => Ok(Self::V),
            "o" => Ok(Self::O),
            other => Err(format!("unknown attention matrix '{}' (expected q, k, v, o)", other)),
        }
    }
}

/// Opciones del plan. Defaults: LoRA sobre q y v de la self-attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    pub attn_matrices: Vec<Projection>,
    pub selfattn_lora: bool,
    pub intermediate_lora: bool,
    pub output_lora: bool,
    /// Incluir proyecciones de cross-attention si el modelo las tiene
    pub cross_attn: bool,
    /// None = todas las capas
    pub layers: Option<Vec<usize>>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            attn_matrices: vec![Projection::Q, Projection::V],
            selfattn_lora: true,
            intermediate_lora: false,
            output_lora: false,
            cross_attn: true,
            layers: None,
        }
    }
}

impl PlanOptions {
    /// Roles objetivo de LoRA en orden canónico
    fn lora_roles(&self) -> Vec<Role> {
        let mut roles = Vec::new();
        if self.selfattn_lora {
            roles.extend(self.attn_matrices.iter().map(Projection::role));
        }
        if self.intermediate_lora {
            roles.push(Role::LayerIntermediateProj);
        }
        if self.output_lora {
            roles.push(Role::LayerOutputProj);
        }
        roles.sort();
        roles.dedup();
        roles
    }
}

/// Qué hace el inyector en el sitio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    LoraTarget,
    ReftIntervention,
    BottleneckAfterAttention,
    BottleneckAfterFfn,
    PromptEmbedding,
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LoraTarget => "lora_target",
            Self::ReftIntervention => "reft_intervention",
            Self::BottleneckAfterAttention => "bottleneck_after_attention",
            Self::BottleneckAfterFfn => "bottleneck_after_ffn",
            Self::PromptEmbedding => "prompt_embedding",
        };
        f.pad(s)
    }
}

/// Un sitio concreto del plan
#[derive(Debug, Clone)]
pub struct InjectionSite {
    pub method: AdapterMethod,
    pub kind: SiteKind,
    pub layer: Option<usize>,
    /// None cuando el sitio es la capa entera o los embeddings
    pub role: Option<Role>,
    /// Proyección bajo cross-attention
    pub cross: bool,
    pub handle: ModuleHandle,
}

impl InjectionSite {
    fn to_json(&self) -> Value {
        json!({
            "method": self.method.name(),
            "kind": self.kind,
            "layer": self.layer,
            "role": self.role.map(|r| r.key()),
            "cross_attention": self.cross,
            "path": self.handle.path(),
            "type": self.handle.type_name(),
        })
    }
}

/// Plan completo
#[derive(Debug, Clone, Default)]
pub struct InjectionPlan {
    sites: Vec<InjectionSite>,
}

impl InjectionPlan {
    pub fn build(
        resolved: &ResolvedModel,
        methods: &MethodSet,
        options: &PlanOptions,
    ) -> Result<Self, PlanError> {
        if let Some(method) = methods.iter().find(|m| !resolved.methods().contains(*m)) {
            return Err(PlanError::MethodNotEnabled(method));
        }

        let layers = select_layers(resolved, options)?;
        let mut sites = Vec::new();

        for method in methods.iter() {
            match method {
                AdapterMethod::Lora => lora_sites(resolved, &layers, options, &mut sites)?,
                AdapterMethod::Reft => {
                    for &idx in &layers {
                        let layer = resolved.layer(idx)?;
                        sites.push(InjectionSite {
                            method,
                            kind: SiteKind::ReftIntervention,
                            layer: Some(idx),
                            role: None,
                            cross: false,
                            handle: layer.handle().clone(),
                        });
                    }
                }
                AdapterMethod::Bottleneck => {
                    for &idx in &layers {
                        for (role, kind) in [
                            (Role::AttnOProj, SiteKind::BottleneckAfterAttention),
                            (Role::LayerOutputProj, SiteKind::BottleneckAfterFfn),
                        ] {
                            sites.push(InjectionSite {
                                method,
                                kind,
                                layer: Some(idx),
                                role: Some(role),
                                cross: false,
                                handle: resolved.accessor(idx, role)?.clone(),
                            });
                        }
                    }
                }
                AdapterMethod::PromptTuning => sites.push(InjectionSite {
                    method,
                    kind: SiteKind::PromptEmbedding,
                    layer: None,
                    role: None,
                    cross: false,
                    handle: resolved.embeddings().clone(),
                }),
            }
        }

        log::info!("Injection plan: {} sites for {}", sites.len(), methods);
        Ok(Self { sites })
    }

    pub fn sites(&self) -> &[InjectionSite] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites_for(&self, method: AdapterMethod) -> impl Iterator<Item = &InjectionSite> {
        self.sites.iter().filter(move |s| s.method == method)
    }

    /// Rutas completas que el inyector tiene que parchear
    pub fn target_paths(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.handle.path()).collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.sites.iter().map(InjectionSite::to_json).collect())
    }
}

fn select_layers(resolved: &ResolvedModel, options: &PlanOptions) -> Result<Vec<usize>, PlanError> {
    let len = resolved.num_layers();
    match &options.layers {
        None => Ok((0..len).collect()),
        Some(indices) => {
            let mut selected = indices.clone();
            selected.sort_unstable();
            selected.dedup();
            if let Some(&index) = selected.iter().find(|&&i| i >= len) {
                return Err(PlanError::LayerOutOfRange { index, len });
            }
            Ok(selected)
        }
    }
}

fn lora_sites(
    resolved: &ResolvedModel,
    layers: &[usize],
    options: &PlanOptions,
    sites: &mut Vec<InjectionSite>,
) -> Result<(), PlanError> {
    let roles = options.lora_roles();
    if roles.is_empty() {
        return Err(PlanError::NoLoraTargets);
    }

    for &idx in layers {
        for &role in &roles {
            sites.push(InjectionSite {
                method: AdapterMethod::Lora,
                kind: SiteKind::LoraTarget,
                layer: Some(idx),
                role: Some(role),
                cross: false,
                handle: resolved.accessor(idx, role)?.clone(),
            });
        }

        if !options.cross_attn {
            continue;
        }
        let layer = resolved.layer(idx)?;
        for &role in roles.iter().filter(|r| r.projection_letter().is_some()) {
            if let Some(handle) = layer.cross_projection(role) {
                sites.push(InjectionSite {
                    method: AdapterMethod::Lora,
                    kind: SiteKind::LoraTarget,
                    layer: Some(idx),
                    role: Some(role),
                    cross: true,
                    handle: handle.clone(),
                });
            }
        }
    }

    Ok(())
}
