// src/interface/methods.rs
// ============================================================================
// METHODS - Métodos de adapter y roles que cada uno exige
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Roles que cualquier método necesita
const BASE_ROLES: &[Role] = &[Role::ModelEmbeddings, Role::ModelLayers];

const LORA_ROLES: &[Role] = &[
    Role::LayerSelfAttn,
    Role::AttnQProj,
    Role::AttnKProj,
    Role::AttnVProj,
    Role::AttnOProj,
    Role::LayerIntermediateProj,
    Role::LayerOutputProj,
];

const BOTTLENECK_ROLES: &[Role] = &[
    Role::LayerSelfAttn,
    Role::AttnOProj,
    Role::LayerOutputProj,
    Role::LayerPreSelfAttn,
    Role::LayerPreFfn,
];

/// Método de adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterMethod {
    /// Low-rank sobre proyecciones lineales
    Lora,
    /// Intervenciones sobre la representación a la salida de cada capa
    Reft,
    /// Módulos bottleneck tras atención y FFN
    Bottleneck,
    /// Prompts aprendidos sobre los embeddings
    PromptTuning,
}

impl AdapterMethod {
    pub const ALL: [AdapterMethod; 4] = [
        AdapterMethod::Lora,
        AdapterMethod::Reft,
        AdapterMethod::Bottleneck,
        AdapterMethod::PromptTuning,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lora => "lora",
            Self::Reft => "reft",
            Self::Bottleneck => "bottleneck",
            Self::PromptTuning => "prompt_tuning",
        }
    }

    /// Roles propios del método (sin los base)
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            Self::Lora => LORA_ROLES,
            Self::Bottleneck => BOTTLENECK_ROLES,
            Self::Reft | Self::PromptTuning => &[],
        }
    }
}

impl fmt::Display for AdapterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for AdapterMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lora" => Ok(Self::Lora),
            "reft" | "loreft" => Ok(Self::Reft),
            "bottleneck" | "bn" => Ok(Self::Bottleneck),
            "prompt_tuning" | "prompt-tuning" => Ok(Self::PromptTuning),
            other => Err(format!("unknown adapter method '{}'", other)),
        }
    }
}

/// Conjunto ordenado y sin duplicados de métodos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AdapterMethod>", into = "Vec<AdapterMethod>")]
pub struct MethodSet {
    methods: Vec<AdapterMethod>,
}

impl MethodSet {
    pub fn new(methods: impl IntoIterator<Item = AdapterMethod>) -> Self {
        let mut methods: Vec<AdapterMethod> = methods.into_iter().collect();
        methods.sort();
        methods.dedup();
        Self { methods }
    }

    /// Parsea "lora,reft"
    pub fn parse_list(s: &str) -> Result<Self, String> {
        let methods = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(AdapterMethod::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(methods))
    }

    pub fn contains(&self, method: AdapterMethod) -> bool {
        self.methods.contains(&method)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = AdapterMethod> + '_ {
        self.methods.iter().copied()
    }

    pub fn is_mandatory(&self, role: Role) -> bool {
        BASE_ROLES.contains(&role)
            || self.methods.iter().any(|m| m.required_roles().contains(&role))
    }

    /// Roles obligatorios en orden canónico
    pub fn mandatory_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|r| self.is_mandatory(*r))
            .collect()
    }
}

impl From<Vec<AdapterMethod>> for MethodSet {
    fn from(methods: Vec<AdapterMethod>) -> Self {
        Self::new(methods)
    }
}

impl From<MethodSet> for Vec<AdapterMethod> {
    fn from(set: MethodSet) -> Self {
        set.methods
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.methods.iter().map(|m| m.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
