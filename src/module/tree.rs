// src/module/tree.rs
// ============================================================================
// MODULE TREE - Árbol concreto construido a mano o desde nombres de tensores
// ============================================================================
//
// "model.layers.0.self_attn.q_proj.weight"
//   └─ módulos: model → layers → 0 → self_attn → q_proj
//   └─ parámetro: weight
//
// Los hijos numéricos se ordenan por valor (0, 1, 2, ..., 10), no como texto.
//
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::{Module, ModuleRef};

/// Parámetro propio de un módulo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamInfo {
    /// Nombre local (ej: "weight", "bias")
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>, dtype: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            shape,
        }
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Nodo del árbol de módulos
pub struct ModuleNode {
    type_name: String,
    children: Vec<(String, ModuleRef)>,
    params: Vec<ParamInfo>,
}

impl ModuleNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            children: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Añade un hijo (orden de inserción = orden de declaración)
    pub fn with_child(mut self, name: impl Into<String>, child: ModuleNode) -> Self {
        self.children.push((name.into(), Arc::new(child)));
        self
    }

    /// Añade un hijo que ya es un objeto compartido
    pub fn with_shared_child(mut self, name: impl Into<String>, child: ModuleRef) -> Self {
        self.children.push((name.into(), child));
        self
    }

    pub fn with_param(mut self, param: ParamInfo) -> Self {
        self.params.push(param);
        self
    }

    /// Construye el árbol desde nombres planos de parámetros.
    ///
    /// Cada item es (nombre completo, dtype, shape). Nombres con segmentos
    /// vacíos se descartan con un warning.
    pub fn from_parameters<I, S>(params: I) -> ModuleRef
    where
        I: IntoIterator<Item = (S, String, Vec<usize>)>,
        S: AsRef<str>,
    {
        let mut root = NodeBuilder::default();
        let mut count = 0usize;

        for (full_name, dtype, shape) in params {
            let full_name = full_name.as_ref();
            if full_name.is_empty() || full_name.split('.').any(str::is_empty) {
                log::warn!("Skipping malformed parameter name '{}'", full_name);
                continue;
            }

            let (module_path, param_name) = match full_name.rsplit_once('.') {
                Some((m, p)) => (Some(m), p),
                None => (None, full_name),
            };

            let mut node = &mut root;
            if let Some(module_path) = module_path {
                for segment in module_path.split('.') {
                    node = node.children.entry(SegmentKey::parse(segment)).or_default();
                }
            }
            node.params.push(ParamInfo::new(param_name, dtype, shape));
            count += 1;
        }

        log::debug!("Module tree built from {} parameters", count);
        Arc::new(root.freeze("", true))
    }
}

impl std::fmt::Debug for ModuleNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.children.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("ModuleNode")
            .field("type_name", &self.type_name)
            .field("children", &names)
            .field("params", &self.params)
            .finish()
    }
}

impl Module for ModuleNode {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn child(&self, name: &str) -> Option<ModuleRef> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| Arc::clone(m))
    }

    fn children(&self) -> Vec<(String, ModuleRef)> {
        self.children
            .iter()
            .map(|(n, m)| (n.clone(), Arc::clone(m)))
            .collect()
    }

    fn parameters(&self) -> &[ParamInfo] {
        &self.params
    }

    fn num_children(&self) -> usize {
        self.children.len()
    }
}

// ============================================================================
// BUILDER INTERNO
// ============================================================================

/// Clave de ordenación: índices primero (por valor), luego nombres
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SegmentKey {
    Index(u64, String),
    Name(String),
}

impl SegmentKey {
    fn parse(segment: &str) -> Self {
        if segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(idx) = segment.parse::<u64>() {
                return Self::Index(idx, segment.to_string());
            }
        }
        Self::Name(segment.to_string())
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Index(_, s) | Self::Name(s) => s,
        }
    }

    fn is_index(&self) -> bool {
        matches!(self, Self::Index(..))
    }
}

#[derive(Debug, Default)]
struct NodeBuilder {
    children: BTreeMap<SegmentKey, NodeBuilder>,
    params: Vec<ParamInfo>,
}

impl NodeBuilder {
    fn freeze(self, name: &str, is_root: bool) -> ModuleNode {
        let type_name = if is_root {
            "Root".to_string()
        } else {
            self.infer_type(name).to_string()
        };

        let children = self
            .children
            .into_iter()
            .map(|(key, builder)| {
                let child_name = key.as_str().to_string();
                let node = builder.freeze(&child_name, false);
                (child_name, Arc::new(node) as ModuleRef)
            })
            .collect();

        ModuleNode {
            type_name,
            children,
            params: self.params,
        }
    }

    fn infer_type(&self, name: &str) -> &'static str {
        if !self.children.is_empty() && self.children.keys().all(SegmentKey::is_index) {
            return "ModuleList";
        }
        if !self.children.is_empty() {
            return "Module";
        }

        let weight_rank = self
            .params
            .iter()
            .find(|p| p.name == "weight")
            .map(|p| p.shape.len());

        match weight_rank {
            Some(2) if name.contains("emb") => "Embedding",
            Some(2) => "Linear",
            Some(1) => "Norm",
            Some(_) => "Conv",
            None => "Module",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str, shape: &[usize]) -> (String, String, Vec<usize>) {
        (name.to_string(), "BF16".to_string(), shape.to_vec())
    }

    #[test]
    fn test_from_parameters_structure() {
        let root = ModuleNode::from_parameters(vec![
            p("model.embed_tokens.weight", &[32000, 64]),
            p("model.layers.0.self_attn.q_proj.weight", &[64, 64]),
            p("model.layers.0.input_layernorm.weight", &[64]),
            p("lm_head.weight", &[32000, 64]),
        ]);

        assert_eq!(root.type_name(), "Root");
        let model = root.child("model").unwrap();
        assert_eq!(model.child("embed_tokens").unwrap().type_name(), "Embedding");

        let layers = model.child("layers").unwrap();
        assert_eq!(layers.type_name(), "ModuleList");

        let layer0 = layers.child("0").unwrap();
        let q = layer0.child("self_attn").unwrap().child("q_proj").unwrap();
        assert_eq!(q.type_name(), "Linear");
        assert_eq!(q.parameters()[0].shape, vec![64, 64]);
        assert_eq!(layer0.child("input_layernorm").unwrap().type_name(), "Norm");
    }

    #[test]
    fn test_numeric_children_sorted_by_value() {
        let names: Vec<_> = [10, 2, 0, 1]
            .iter()
            .map(|i| p(&format!("layers.{}.mlp.weight", i), &[4, 4]))
            .collect();
        let root = ModuleNode::from_parameters(names);
        let layers = root.child("layers").unwrap();
        let order: Vec<String> = layers.children().into_iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["0", "1", "2", "10"]);
    }

    #[test]
    fn test_malformed_names_skipped() {
        let root = ModuleNode::from_parameters(vec![
            p("a..weight", &[1]),
            p("", &[1]),
            p("b.weight", &[1]),
        ]);
        assert_eq!(root.num_children(), 1);
        assert!(root.child("b").is_some());
    }

    #[test]
    fn test_shared_child_and_params() {
        let tied: ModuleRef = Arc::new(
            ModuleNode::new("Embedding").with_param(ParamInfo::new("weight", "F16", vec![100, 8])),
        );
        let root = ModuleNode::new("Root")
            .with_shared_child("wte", Arc::clone(&tied))
            .with_shared_child("lm_head", Arc::clone(&tied));

        let a = root.child("wte").unwrap();
        let b = root.child("lm_head").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.parameters()[0].numel(), 800);
    }

    #[test]
    fn test_root_level_param() {
        let root = ModuleNode::from_parameters(vec![p("scale", &[1])]);
        assert_eq!(root.parameters().len(), 1);
        assert_eq!(root.parameters()[0].name, "scale");
    }
}
