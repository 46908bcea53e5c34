// src/module/mod.rs
// ============================================================================
// MODULE - Árbol de submódulos de un modelo vivo
// ============================================================================
//
// El resolver no conoce ninguna arquitectura concreta. Solo necesita una
// capacidad: "dame el sub-objeto con este nombre". Todo lo demás (rutas con
// puntos, colecciones de capas) se construye encima de eso.
//
// ============================================================================

pub mod tree;

use std::fmt;
use std::sync::Arc;

pub use tree::{ModuleNode, ParamInfo};

/// Referencia compartida a un submódulo.
pub type ModuleRef = Arc<dyn Module>;

/// Capacidad mínima que el resolver exige al modelo.
///
/// `children()` debe devolver los hijos en orden de declaración; para una
/// colección de capas ese orden ES el orden de las capas.
pub trait Module: Send + Sync {
    /// Nombre del tipo (ej: "Linear", "ModuleList", "LlamaDecoderLayer")
    fn type_name(&self) -> &str;

    /// Busca un hijo directo por nombre. None si no existe.
    fn child(&self, name: &str) -> Option<ModuleRef>;

    /// Hijos directos en orden
    fn children(&self) -> Vec<(String, ModuleRef)>;

    /// Parámetros propios (no los de los hijos)
    fn parameters(&self) -> &[ParamInfo] {
        &[]
    }

    /// Número de hijos directos
    fn num_children(&self) -> usize {
        self.children().len()
    }
}

/// Handle a un submódulo resuelto: ruta completa desde la raíz + referencia viva.
#[derive(Clone)]
pub struct ModuleHandle {
    path: String,
    module: ModuleRef,
}

impl ModuleHandle {
    pub fn new(path: impl Into<String>, module: ModuleRef) -> Self {
        Self {
            path: path.into(),
            module,
        }
    }

    /// Handle para la raíz del modelo (ruta vacía)
    pub fn root(module: ModuleRef) -> Self {
        Self::new(String::new(), module)
    }

    /// Ruta completa con puntos, ej: "model.layers.3.mlp.down_proj"
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    pub fn type_name(&self) -> &str {
        self.module.type_name()
    }

    /// Desciende un segmento. La ruta del hijo se deriva de la del padre.
    pub fn child(&self, name: &str) -> Option<ModuleHandle> {
        let module = self.module.child(name)?;
        Some(Self::new(join_path(&self.path, name), module))
    }

    /// Hijos directos como handles, en orden
    pub fn children(&self) -> Vec<ModuleHandle> {
        self.module
            .children()
            .into_iter()
            .map(|(name, module)| Self::new(join_path(&self.path, &name), module))
            .collect()
    }

    /// Mismo objeto vivo (identidad, no igualdad estructural)
    pub fn ptr_eq(&self, other: &ModuleHandle) -> bool {
        Arc::ptr_eq(&self.module, &other.module)
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("path", &self.path)
            .field("type", &self.module.type_name())
            .finish()
    }
}

/// Une un prefijo y un segmento con '.', sin punto inicial si el prefijo está vacío
pub fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}
