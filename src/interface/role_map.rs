// src/interface/role_map.rs
// ============================================================================
// ROLE MAP - Rol canónico → ruta en el árbol del modelo
// ============================================================================
//
// Tres estados por rol:
//   - Present(ruta)  → declarado
//   - Absent         → declarado como inexistente (ej: sin cross-attention)
//   - sin entrada    → no configurado
//
// El mapa es inmutable tras build() y se comparte vía Arc entre instancias
// de la misma familia de arquitectura.
//
// ============================================================================

use std::collections::BTreeMap;

use xxhash_rust::xxh3::xxh3_64;

use super::error::ConfigError;
use super::methods::MethodSet;
use super::path::ModulePath;
use super::roles::Role;

/// Entrada de un rol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolePath {
    Present(ModulePath),
    Absent,
}

impl RolePath {
    pub fn as_path(&self) -> Option<&ModulePath> {
        match self {
            Self::Present(p) => Some(p),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Mapa inmutable de roles
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleMap {
    base_model: Option<ModulePath>,
    entries: BTreeMap<Role, RolePath>,
}

impl RoleMap {
    pub fn builder() -> RoleMapBuilder {
        RoleMapBuilder::default()
    }

    /// Prefijo desde la raíz del checkpoint hasta el modelo base (ej: "model")
    pub fn base_model(&self) -> Option<&ModulePath> {
        self.base_model.as_ref()
    }

    pub fn get(&self, role: Role) -> Option<&RolePath> {
        self.entries.get(&role)
    }

    /// Ruta si el rol está presente
    pub fn path(&self, role: Role) -> Option<&ModulePath> {
        self.entries.get(&role).and_then(RolePath::as_path)
    }

    pub fn is_absent(&self, role: Role) -> bool {
        matches!(self.entries.get(&role), Some(RolePath::Absent))
    }

    pub fn is_unset(&self, role: Role) -> bool {
        !self.entries.contains_key(&role)
    }

    /// Entradas en orden canónico
    pub fn iter(&self) -> impl Iterator<Item = (Role, &RolePath)> {
        self.entries.iter().map(|(r, p)| (*r, p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Todos los roles obligatorios que faltan, en orden canónico.
    /// El bool indica si fue declarado Absent (vs no configurado).
    pub fn missing_roles(&self, methods: &MethodSet) -> Vec<(Role, bool)> {
        methods
            .mandatory_roles()
            .into_iter()
            .filter_map(|role| match self.entries.get(&role) {
                Some(RolePath::Present(_)) => None,
                Some(RolePath::Absent) => Some((role, true)),
                None => Some((role, false)),
            })
            .collect()
    }

    /// Hash estable de la forma canónica. No depende del orden de declaración.
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(self.canonical_form().as_bytes())
    }

    fn canonical_form(&self) -> String {
        let mut out = String::new();
        if let Some(base) = &self.base_model {
            out.push_str("base_model=");
            out.push_str(&base.to_string());
            out.push(';');
        }
        for (role, entry) in &self.entries {
            out.push_str(role.key());
            out.push('=');
            match entry {
                RolePath::Present(p) => out.push_str(&p.to_string()),
                RolePath::Absent => out.push('~'),
            }
            out.push(';');
        }
        out
    }
}

/// Builder de RoleMap. Valida sintaxis de rutas y duplicados en build().
#[derive(Debug, Clone, Default)]
pub struct RoleMapBuilder {
    base_model: Option<String>,
    entries: Vec<(Role, Option<String>)>,
}

impl RoleMapBuilder {
    pub fn base_model(mut self, path: impl Into<String>) -> Self {
        self.base_model = Some(path.into());
        self
    }

    pub fn role(mut self, role: Role, path: impl Into<String>) -> Self {
        self.entries.push((role, Some(path.into())));
        self
    }

    pub fn absent(mut self, role: Role) -> Self {
        self.entries.push((role, None));
        self
    }

    /// Some(ruta) → Present, None → Absent
    pub fn entry(mut self, role: Role, path: Option<String>) -> Self {
        self.entries.push((role, path));
        self
    }

    pub fn build(self) -> Result<RoleMap, ConfigError> {
        let base_model = match self.base_model {
            Some(raw) => Some(ModulePath::parse(&raw).map_err(|e| ConfigError::InvalidPath {
                role: "base_model".to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        // Orden canónico para que el primer error sea determinista
        let mut entries = self.entries;
        entries.sort_by_key(|(role, _)| *role);

        let mut map = BTreeMap::new();
        for (role, raw) in entries {
            let entry = match raw {
                Some(raw) => RolePath::Present(ModulePath::parse(&raw).map_err(|e| {
                    ConfigError::InvalidPath {
                        role: role.key().to_string(),
                        reason: e.to_string(),
                    }
                })?),
                None => RolePath::Absent,
            };
            if map.insert(role, entry).is_some() {
                return Err(ConfigError::DuplicateRole(role));
            }
        }

        Ok(RoleMap {
            base_model,
            entries: map,
        })
    }
}
