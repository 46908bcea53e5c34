// src/interface/path.rs
// ============================================================================
// MODULE PATH - Intérprete de rutas con puntos ("mlp.down_proj")
// ============================================================================
//
// Resolver "a.b.c" = child("a") → child("b") → child("c"). Es asociativo:
// resolver "b.c" desde "a" da el mismo objeto que "a.b.c" desde la raíz.
//
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::module::ModuleHandle;

use super::error::ResolutionError;

/// Ruta validada, al menos un segmento y ninguno vacío
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath {
    segments: Vec<String>,
}

/// Ruta mal formada
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PathSyntaxError(pub String);

impl ModulePath {
    pub fn parse(path: &str) -> Result<Self, PathSyntaxError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(PathSyntaxError("empty path".to_string()));
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            if segment.is_empty() {
                return Err(PathSyntaxError(format!("empty segment in '{}'", trimmed)));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(PathSyntaxError(format!(
                    "whitespace in segment '{}' of '{}'",
                    segment, trimmed
                )));
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Nunca vacía tras parse; existe por simetría con len()
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// "a.b" + "c.d" → "a.b.c.d"
    pub fn join(&self, other: &ModulePath) -> ModulePath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        ModulePath { segments }
    }

    /// Recorre la ruta desde `start`. `target` y `layer` solo alimentan el error.
    pub fn resolve_from(
        &self,
        start: &ModuleHandle,
        target: &str,
        layer: Option<usize>,
    ) -> Result<ModuleHandle, ResolutionError> {
        let mut current = start.clone();

        for segment in &self.segments {
            current = match current.child(segment) {
                Some(next) => next,
                None => {
                    return Err(ResolutionError::PathNotFound {
                        target: target.to_string(),
                        layer,
                        path: self.to_string(),
                        segment: segment.clone(),
                        parent: current.path().to_string(),
                    });
                }
            };
        }

        Ok(current)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for ModulePath {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ModulePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModulePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
