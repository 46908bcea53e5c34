// src/interface/resolver.rs
// ============================================================================
// RESOLVER - Valida el RoleMap y lo resuelve contra un modelo vivo
// ============================================================================
//
// construct(): estático, no toca ningún modelo. Falla en el primer rol
//              obligatorio que falte (orden canónico).
// resolve():   base_model → embeddings → colección de capas → por capa, por
//              rol en orden canónico. El primer error aborta la resolución: nunca se
//              devuelve un conjunto parcial de capas.
//
// ============================================================================

use std::sync::{Arc, OnceLock};

use serde_json::{json, Value};

use crate::module::{ModuleHandle, ModuleRef};

use super::error::{AccessError, ConfigError, ResolutionError};
use super::methods::MethodSet;
use super::path::ModulePath;
use super::role_map::RoleMap;
use super::roles::{Role, RoleScope};

/// Interfaz validada: RoleMap + métodos pedidos
#[derive(Debug, Clone)]
pub struct AdapterInterface {
    role_map: Arc<RoleMap>,
    methods: MethodSet,
    embeddings: ModulePath,
    layers: ModulePath,
}

impl AdapterInterface {
    /// Valida que todos los roles que exigen los métodos estén presentes.
    pub fn construct(
        role_map: impl Into<Arc<RoleMap>>,
        methods: MethodSet,
    ) -> Result<Self, ConfigError> {
        let role_map = role_map.into();

        if methods.is_empty() {
            return Err(ConfigError::EmptyMethodSet);
        }

        if let Some((role, declared_absent)) = role_map.missing_roles(&methods).into_iter().next() {
            return Err(ConfigError::MissingRole {
                role,
                declared_absent,
            });
        }

        // Garantizados por missing_roles: son obligatorios para cualquier método
        let embeddings = required_path(&role_map, Role::ModelEmbeddings)?;
        let layers = required_path(&role_map, Role::ModelLayers)?;

        log::info!(
            "Adapter interface ready: methods={} roles={} fingerprint={:016x}",
            methods,
            role_map.len(),
            role_map.fingerprint()
        );

        Ok(Self {
            role_map,
            methods,
            embeddings,
            layers,
        })
    }

    pub fn role_map(&self) -> &Arc<RoleMap> {
        &self.role_map
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// Resuelve la interfaz contra la raíz de un modelo.
    pub fn resolve(&self, root: &ModuleRef) -> Result<ResolvedModel, ResolutionError> {
        let root = ModuleHandle::root(Arc::clone(root));

        let base = match self.role_map.base_model() {
            Some(path) => path.resolve_from(&root, "base_model", None)?,
            None => root,
        };

        let embeddings = self
            .embeddings
            .resolve_from(&base, Role::ModelEmbeddings.key(), None)?;
        let collection = self
            .layers
            .resolve_from(&base, Role::ModelLayers.key(), None)?;

        let layer_handles = collection.children();
        if layer_handles.is_empty() {
            return Err(ResolutionError::NoLayers {
                path: collection.path().to_string(),
            });
        }

        let mut layers = Vec::with_capacity(layer_handles.len());
        for (index, handle) in layer_handles.into_iter().enumerate() {
            layers.push(self.resolve_layer(index, handle)?);
        }

        log::info!(
            "Resolved {} layers under '{}' ({} roles per layer)",
            layers.len(),
            collection.path(),
            layers.first().map_or(0, |l| l.roles.len())
        );

        Ok(ResolvedModel {
            fingerprint: self.role_map.fingerprint(),
            methods: self.methods.clone(),
            base,
            embeddings,
            collection,
            layers,
        })
    }

    fn resolve_layer(&self, index: usize, layer: ModuleHandle) -> Result<ResolvedLayer, ResolutionError> {
        let mut roles: Vec<(Role, ModuleHandle)> = Vec::new();
        let mut self_attn: Option<ModuleHandle> = None;
        let mut cross_attn: Option<ModuleHandle> = None;

        for role in Role::layer_roles() {
            let Some(path) = self.role_map.path(role) else {
                continue;
            };

            // Sin bloque de atención declarado, las proyecciones cuelgan de la capa
            let scope = match (role.scope(), &self_attn) {
                (RoleScope::Attention, Some(attn)) => attn,
                _ => &layer,
            };

            let handle = path.resolve_from(scope, role.key(), Some(index))?;
            log::debug!("layer {} {} -> {}", index, role, handle.path());

            match role {
                Role::LayerSelfAttn => self_attn = Some(handle.clone()),
                Role::LayerCrossAttn => cross_attn = Some(handle.clone()),
                _ => {}
            }
            roles.push((role, handle));
        }

        // Cross-attention reutiliza los nombres de las proyecciones
        let mut cross_projections = Vec::new();
        if let Some(cross) = &cross_attn {
            for role in Role::ATTN_PROJECTIONS {
                if let Some(path) = self.role_map.path(role) {
                    let target = format!("{} (cross-attention)", role.key());
                    let handle = path.resolve_from(cross, &target, Some(index))?;
                    cross_projections.push((role, handle));
                }
            }
        }

        Ok(ResolvedLayer {
            index,
            handle: layer,
            roles,
            cross_projections,
        })
    }
}

fn required_path(role_map: &RoleMap, role: Role) -> Result<ModulePath, ConfigError> {
    role_map
        .path(role)
        .cloned()
        .ok_or(ConfigError::MissingRole {
            role,
            declared_absent: role_map.is_absent(role),
        })
}

/// Handles resueltos de una capa
#[derive(Debug, Clone)]
pub struct ResolvedLayer {
    index: usize,
    handle: ModuleHandle,
    roles: Vec<(Role, ModuleHandle)>,
    cross_projections: Vec<(Role, ModuleHandle)>,
}

impl ResolvedLayer {
    pub fn index(&self) -> usize {
        self.index
    }

    /// El objeto capa en sí
    pub fn handle(&self) -> &ModuleHandle {
        &self.handle
    }

    pub fn get(&self, role: Role) -> Option<&ModuleHandle> {
        self.roles.iter().find(|(r, _)| *r == role).map(|(_, h)| h)
    }

    /// Proyección Q/K/V/O bajo el bloque de cross-attention
    pub fn cross_projection(&self, role: Role) -> Option<&ModuleHandle> {
        self.cross_projections
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, h)| h)
    }

    pub fn has_cross_attention(&self) -> bool {
        self.get(Role::LayerCrossAttn).is_some()
    }

    /// Roles resueltos en orden canónico
    pub fn roles(&self) -> impl Iterator<Item = (Role, &ModuleHandle)> {
        self.roles.iter().map(|(r, h)| (*r, h))
    }
}

/// Resultado de resolve(): cache completo de handles
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    fingerprint: u64,
    methods: MethodSet,
    base: ModuleHandle,
    embeddings: ModuleHandle,
    collection: ModuleHandle,
    layers: Vec<ResolvedLayer>,
}

impl ResolvedModel {
    /// Handle cacheado para (capa, rol). Sin recorrido: siempre la misma referencia.
    pub fn accessor(&self, layer_index: usize, role: Role) -> Result<&ModuleHandle, AccessError> {
        if role.scope() == RoleScope::Model {
            return Err(AccessError::ModelScoped(role));
        }
        let layer = self.layer(layer_index)?;
        layer.get(role).ok_or(AccessError::RoleNotResolved {
            role,
            layer: layer_index,
        })
    }

    pub fn layer(&self, index: usize) -> Result<&ResolvedLayer, AccessError> {
        self.layers.get(index).ok_or(AccessError::LayerOutOfRange {
            index,
            len: self.layers.len(),
        })
    }

    pub fn layers(&self) -> &[ResolvedLayer] {
        &self.layers
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn base(&self) -> &ModuleHandle {
        &self.base
    }

    pub fn embeddings(&self) -> &ModuleHandle {
        &self.embeddings
    }

    pub fn layer_collection(&self) -> &ModuleHandle {
        &self.collection
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// Fingerprint del RoleMap que produjo este cache
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Resumen JSON para reportes (rutas de la capa 0 como muestra)
    pub fn summary(&self) -> Value {
        let mut roles = serde_json::Map::new();
        if let Some(first) = self.layers.first() {
            for (role, handle) in first.roles() {
                roles.insert(
                    role.key().to_string(),
                    json!({ "path": handle.path(), "type": handle.type_name() }),
                );
            }
        }

        let methods: Vec<&str> = self.methods.iter().map(|m| m.name()).collect();

        json!({
            "fingerprint": format!("{:016x}", self.fingerprint),
            "methods": methods,
            "base_model": self.base.path(),
            "embeddings": self.embeddings.path(),
            "layer_collection": self.collection.path(),
            "num_layers": self.layers.len(),
            "cross_attention": self.layers.iter().any(ResolvedLayer::has_cross_attention),
            "layer0_roles": roles,
        })
    }
}

/// Modelo adaptado: dueño de la raíz y de su cache resuelto.
///
/// La resolución ocurre en el primer recorrido y vive lo que vive el modelo.
pub struct AdaptedModel {
    root: ModuleRef,
    interface: Arc<AdapterInterface>,
    resolved: OnceLock<ResolvedModel>,
}

impl AdaptedModel {
    pub fn new(root: ModuleRef, interface: Arc<AdapterInterface>) -> Self {
        Self {
            root,
            interface,
            resolved: OnceLock::new(),
        }
    }

    /// Resuelve en la primera llamada; después devuelve el cache.
    pub fn resolved(&self) -> Result<&ResolvedModel, ResolutionError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let resolved = self.interface.resolve(&self.root)?;
        Ok(self.resolved.get_or_init(|| resolved))
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    pub fn interface(&self) -> &Arc<AdapterInterface> {
        &self.interface
    }

    pub fn root(&self) -> &ModuleRef {
        &self.root
    }

    /// Suelta el cache y devuelve la raíz
    pub fn teardown(self) -> ModuleRef {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;

    use super::*;
    use crate::interface::methods::AdapterMethod;
    use crate::module::ModuleNode;

    fn linear() -> ModuleNode {
        ModuleNode::new("Linear")
    }

    fn llama_layer() -> ModuleNode {
        ModuleNode::new("LlamaDecoderLayer")
            .with_child(
                "self_attn",
                ModuleNode::new("LlamaAttention")
                    .with_child("q_proj", linear())
                    .with_child("k_proj", linear())
                    .with_child("v_proj", linear())
                    .with_child("o_proj", linear()),
            )
            .with_child(
                "mlp",
                ModuleNode::new("LlamaMLP")
                    .with_child("gate_proj", linear())
                    .with_child("up_proj", linear())
                    .with_child("down_proj", linear()),
            )
            .with_child("input_layernorm", ModuleNode::new("RMSNorm"))
            .with_child("post_attention_layernorm", ModuleNode::new("RMSNorm"))
    }

    fn llama_model(num_layers: usize) -> ModuleRef {
        let mut layers = ModuleNode::new("ModuleList");
        for i in 0..num_layers {
            layers = layers.with_child(i.to_string(), llama_layer());
        }
        Arc::new(
            ModuleNode::new("LlamaForCausalLM")
                .with_child(
                    "model",
                    ModuleNode::new("LlamaModel")
                        .with_child("embed_tokens", ModuleNode::new("Embedding"))
                        .with_child("layers", layers)
                        .with_child("norm", ModuleNode::new("RMSNorm")),
                )
                .with_child("lm_head", linear()),
        )
    }

    fn llama_roles() -> crate::interface::role_map::RoleMapBuilder {
        RoleMap::builder()
            .base_model("model")
            .role(Role::ModelEmbeddings, "embed_tokens")
            .role(Role::ModelLayers, "layers")
            .role(Role::LayerSelfAttn, "self_attn")
            .absent(Role::LayerCrossAttn)
            .role(Role::AttnQProj, "q_proj")
            .role(Role::AttnKProj, "k_proj")
            .role(Role::AttnVProj, "v_proj")
            .role(Role::AttnOProj, "o_proj")
            .role(Role::LayerIntermediateProj, "mlp.up_proj")
            .role(Role::LayerOutputProj, "mlp.down_proj")
            .role(Role::LayerPreSelfAttn, "input_layernorm")
            .absent(Role::LayerPreCrossAttn)
            .role(Role::LayerPreFfn, "post_attention_layernorm")
    }

    fn all_methods() -> MethodSet {
        MethodSet::new(AdapterMethod::ALL)
    }

    #[test]
    fn test_construct_succeeds_with_optional_absent() {
        let map = llama_roles().build().unwrap();
        assert!(AdapterInterface::construct(map, all_methods()).is_ok());
    }

    #[test]
    fn test_construct_names_exact_missing_role() {
        for role in MethodSet::new([AdapterMethod::Lora]).mandatory_roles() {
            let mut builder = RoleMap::builder();
            for (r, entry) in llama_roles().build().unwrap().iter() {
                if r != role {
                    builder = builder.entry(r, entry.as_path().map(ToString::to_string));
                }
            }
            let err = AdapterInterface::construct(
                builder.base_model("model").build().unwrap(),
                MethodSet::new([AdapterMethod::Lora]),
            )
            .unwrap_err();
            assert_eq!(
                err,
                ConfigError::MissingRole {
                    role,
                    declared_absent: false
                }
            );
        }
    }

    #[test]
    fn test_construct_rejects_absent_mandatory_role() {
        let map = RoleMap::builder()
            .role(Role::ModelEmbeddings, "embed_tokens")
            .role(Role::ModelLayers, "layers")
            .role(Role::LayerSelfAttn, "self_attn")
            .role(Role::AttnOProj, "o_proj")
            .role(Role::LayerOutputProj, "mlp.fc2")
            .role(Role::LayerPreSelfAttn, "input_layernorm")
            .absent(Role::LayerPreFfn)
            .build()
            .unwrap();
        let err = AdapterInterface::construct(map, MethodSet::new([AdapterMethod::Bottleneck]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRole {
                role: Role::LayerPreFfn,
                declared_absent: true
            }
        );
    }

    #[test]
    fn test_construct_reports_first_in_canonical_order() {
        // Falta todo salvo embeddings: el primero es model_layers
        let map = RoleMap::builder()
            .role(Role::ModelEmbeddings, "embed_tokens")
            .build()
            .unwrap();
        let err = AdapterInterface::construct(map, all_methods()).unwrap_err();
        assert_eq!(err.role(), Some(Role::ModelLayers));
    }

    #[test]
    fn test_construct_rejects_empty_method_set() {
        let map = llama_roles().build().unwrap();
        let err = AdapterInterface::construct(map, MethodSet::default()).unwrap_err();
        assert_eq!(err, ConfigError::EmptyMethodSet);
    }

    #[test]
    fn test_reft_only_needs_base_roles() {
        let map = RoleMap::builder()
            .role(Role::ModelEmbeddings, "embed_tokens")
            .role(Role::ModelLayers, "layers")
            .build()
            .unwrap();
        assert!(AdapterInterface::construct(map, MethodSet::new([AdapterMethod::Reft])).is_ok());
    }

    #[test]
    fn test_resolve_one_layer_per_layer_in_order() {
        let iface = AdapterInterface::construct(llama_roles().build().unwrap(), all_methods()).unwrap();
        let resolved = iface.resolve(&llama_model(4)).unwrap();

        assert_eq!(resolved.num_layers(), 4);
        for (i, layer) in resolved.layers().iter().enumerate() {
            assert_eq!(layer.index(), i);
            assert_eq!(layer.handle().path(), format!("model.layers.{}", i));
        }
        assert_eq!(resolved.embeddings().path(), "model.embed_tokens");
        assert_eq!(resolved.layer_collection().path(), "model.layers");

        let down = resolved.accessor(2, Role::LayerOutputProj).unwrap();
        assert_eq!(down.path(), "model.layers.2.mlp.down_proj");
        let q = resolved.accessor(3, Role::AttnQProj).unwrap();
        assert_eq!(q.path(), "model.layers.3.self_attn.q_proj");
    }

    #[test]
    fn test_resolved_roles_in_canonical_order() {
        let iface = AdapterInterface::construct(llama_roles().build().unwrap(), all_methods()).unwrap();
        let resolved = iface.resolve(&llama_model(1)).unwrap();
        let roles: Vec<Role> = resolved.layers()[0].roles().map(|(r, _)| r).collect();
        assert!(roles.windows(2).all(|w| w[0] < w[1]));
        assert!(!roles.contains(&Role::LayerCrossAttn));
    }

    #[test]
    fn test_resolve_fails_on_missing_segment() {
        let map = llama_roles()
            .role(Role::LayerLn2, "post_feedforward_layernorm")
            .build()
            .unwrap();
        let iface = AdapterInterface::construct(map, all_methods()).unwrap();
        let err = iface.resolve(&llama_model(3)).unwrap_err();

        match err {
            ResolutionError::PathNotFound { target, layer, segment, .. } => {
                assert_eq!(target, "layer_ln_2");
                // La capa 0 es la primera en fallar
                assert_eq!(layer, Some(0));
                assert_eq!(segment, "post_feedforward_layernorm");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_fails_on_bad_base_model() {
        let map = llama_roles().base_model("transformer").build().unwrap();
        let iface = AdapterInterface::construct(map, all_methods()).unwrap();
        let err = iface.resolve(&llama_model(2)).unwrap_err();
        assert!(matches!(err, ResolutionError::PathNotFound { ref target, layer: None, .. } if target == "base_model"));
    }

    #[test]
    fn test_resolve_fails_on_empty_layer_collection() {
        let iface = AdapterInterface::construct(llama_roles().build().unwrap(), all_methods()).unwrap();
        let err = iface.resolve(&llama_model(0)).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::NoLayers {
                path: "model.layers".into()
            }
        );
    }

    #[test]
    fn test_accessor_is_idempotent() {
        let iface = AdapterInterface::construct(llama_roles().build().unwrap(), all_methods()).unwrap();
        let resolved = iface.resolve(&llama_model(2)).unwrap();

        let a = resolved.accessor(1, Role::AttnVProj).unwrap();
        let b = resolved.accessor(1, Role::AttnVProj).unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(a.ptr_eq(b));
    }

    #[test]
    fn test_accessor_errors() {
        let iface = AdapterInterface::construct(llama_roles().build().unwrap(), all_methods()).unwrap();
        let resolved = iface.resolve(&llama_model(2)).unwrap();

        assert_eq!(
            resolved.accessor(5, Role::AttnQProj).unwrap_err(),
            AccessError::LayerOutOfRange { index: 5, len: 2 }
        );
        assert_eq!(
            resolved.accessor(0, Role::LayerCrossAttn).unwrap_err(),
            AccessError::RoleNotResolved {
                role: Role::LayerCrossAttn,
                layer: 0
            }
        );
        assert_eq!(
            resolved.accessor(0, Role::ModelEmbeddings).unwrap_err(),
            AccessError::ModelScoped(Role::ModelEmbeddings)
        );
    }

    #[test]
    fn test_projections_relative_to_layer_without_attention_block() {
        // Capa plana: q_proj cuelga directamente de la capa
        let layer = ModuleNode::new("Layer").with_child("q_proj", linear());
        let root: ModuleRef = Arc::new(
            ModuleNode::new("Root")
                .with_child("wte", ModuleNode::new("Embedding"))
                .with_child("h", ModuleNode::new("ModuleList").with_child("0", layer)),
        );
        let map = RoleMap::builder()
            .role(Role::ModelEmbeddings, "wte")
            .role(Role::ModelLayers, "h")
            .role(Role::AttnQProj, "q_proj")
            .build()
            .unwrap();
        let iface = AdapterInterface::construct(map, MethodSet::new([AdapterMethod::Reft])).unwrap();
        let resolved = iface.resolve(&root).unwrap();
        assert_eq!(resolved.accessor(0, Role::AttnQProj).unwrap().path(), "h.0.q_proj");
    }

    #[test]
    fn test_cross_attention_projections() {
        let attn = || {
            ModuleNode::new("Attention")
                .with_child("q", linear())
                .with_child("k", linear())
                .with_child("v", linear())
                .with_child("o", linear())
        };
        let layer = ModuleNode::new("T5Layer")
            .with_child("self_attn", attn())
            .with_child("cross_attn", attn())
            .with_child("ffn", ModuleNode::new("FFN").with_child("wi", linear()).with_child("wo", linear()));
        let root: ModuleRef = Arc::new(
            ModuleNode::new("Decoder")
                .with_child("embed", ModuleNode::new("Embedding"))
                .with_child("block", ModuleNode::new("ModuleList").with_child("0", layer)),
        );
        let map = RoleMap::builder()
            .role(Role::ModelEmbeddings, "embed")
            .role(Role::ModelLayers, "block")
            .role(Role::LayerSelfAttn, "self_attn")
            .role(Role::LayerCrossAttn, "cross_attn")
            .role(Role::AttnQProj, "q")
            .role(Role::AttnKProj, "k")
            .role(Role::AttnVProj, "v")
            .role(Role::AttnOProj, "o")
            .role(Role::LayerIntermediateProj, "ffn.wi")
            .role(Role::LayerOutputProj, "ffn.wo")
            .build()
            .unwrap();
        let iface = AdapterInterface::construct(map, MethodSet::new([AdapterMethod::Lora])).unwrap();
        let resolved = iface.resolve(&root).unwrap();
        let layer = resolved.layer(0).unwrap();

        assert!(layer.has_cross_attention());
        assert_eq!(layer.get(Role::AttnKProj).unwrap().path(), "block.0.self_attn.k");
        assert_eq!(layer.cross_projection(Role::AttnKProj).unwrap().path(), "block.0.cross_attn.k");
    }

    #[test]
    fn test_summary_fields() {
        let iface = AdapterInterface::construct(llama_roles().build().unwrap(), all_methods()).unwrap();
        let resolved = iface.resolve(&llama_model(2)).unwrap();
        let summary = resolved.summary();
        assert_eq!(summary["num_layers"], 2);
        assert_eq!(summary["layer0_roles"]["attn_q_proj"]["path"], "model.layers.0.self_attn.q_proj");
        assert_eq!(summary["cross_attention"], false);
    }

    #[test]
    fn test_adapted_model_resolves_once() {
        let iface = Arc::new(
            AdapterInterface::construct(llama_roles().build().unwrap(), all_methods()).unwrap(),
        );
        let adapted = AdaptedModel::new(llama_model(2), Arc::clone(&iface));
        assert!(!adapted.is_resolved());

        let first = adapted.resolved().unwrap() as *const ResolvedModel;
        let second = adapted.resolved().unwrap() as *const ResolvedModel;
        assert!(adapted.is_resolved());
        assert_eq!(first, second);

        let root = adapted.teardown();
        assert_eq!(root.type_name(), "LlamaForCausalLM");
    }

    #[test]
    fn test_adapted_model_retains_nothing_on_failure() {
        let map = llama_roles().role(Role::LayerLn1, "missing_norm").build().unwrap();
        let iface = Arc::new(AdapterInterface::construct(map, all_methods()).unwrap());
        let adapted = AdaptedModel::new(llama_model(2), iface);

        assert!(adapted.resolved().is_err());
        assert!(!adapted.is_resolved());
    }

    #[test]
    fn test_first_missing_role_independent_of_declaration_order() {
        // Sin attn_k_proj ni layer_output_proj: siempre gana attn_k_proj
        let declared: Vec<(Role, Option<String>)> = llama_roles()
            .build()
            .unwrap()
            .iter()
            .filter(|(r, _)| !matches!(r, Role::AttnKProj | Role::LayerOutputProj))
            .map(|(r, e)| (r, e.as_path().map(ToString::to_string)))
            .collect();

        let mut rng = rand::thread_rng();
        for _ in 0..16 {
            let mut shuffled = declared.clone();
            shuffled.shuffle(&mut rng);
            let map = shuffled
                .into_iter()
                .fold(RoleMap::builder().base_model("model"), |b, (r, p)| b.entry(r, p))
                .build()
                .unwrap();
            let err = AdapterInterface::construct(map, MethodSet::new([AdapterMethod::Lora]))
                .unwrap_err();
            assert_eq!(err.role(), Some(Role::AttnKProj));
        }
    }

    #[test]
    fn test_first_bad_path_independent_of_declaration_order() {
        let mut declared: Vec<(Role, Option<String>)> = llama_roles()
            .build()
            .unwrap()
            .iter()
            .map(|(r, e)| (r, e.as_path().map(ToString::to_string)))
            .collect();
        // Dos rutas rotas: attn_v_proj va antes que layer_pre_ffn
        for (role, path) in declared.iter_mut() {
            match role {
                Role::AttnVProj => *path = Some("value".to_string()),
                Role::LayerPreFfn => *path = Some("ffn_norm".to_string()),
                _ => {}
            }
        }

        let mut rng = rand::thread_rng();
        for _ in 0..16 {
            let mut shuffled = declared.clone();
            shuffled.shuffle(&mut rng);
            let map = shuffled
                .into_iter()
                .fold(RoleMap::builder().base_model("model"), |b, (r, p)| b.entry(r, p))
                .build()
                .unwrap();
            let iface = AdapterInterface::construct(map, all_methods()).unwrap();
            match iface.resolve(&llama_model(2)).unwrap_err() {
                ResolutionError::PathNotFound { target, layer, segment, .. } => {
                    assert_eq!(target, "attn_v_proj");
                    assert_eq!(layer, Some(0));
                    assert_eq!(segment, "value");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_role_map_shared_across_models() {
        let map = Arc::new(llama_roles().build().unwrap());
        let iface = Arc::new(AdapterInterface::construct(Arc::clone(&map), all_methods()).unwrap());

        let a = AdaptedModel::new(llama_model(2), Arc::clone(&iface));
        let b = AdaptedModel::new(llama_model(3), Arc::clone(&iface));
        assert_eq!(a.resolved().unwrap().num_layers(), 2);
        assert_eq!(b.resolved().unwrap().num_layers(), 3);
        assert!(Arc::ptr_eq(a.interface().role_map(), &map));
    }
}
