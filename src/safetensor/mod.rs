// src/safetensor/mod.rs
// ============================================================================
// SAFETENSOR INDEX - Lee solo los headers de un checkpoint HuggingFace
// ============================================================================
//
// Formato:
//   [u64 LE: tamaño del header][header JSON][datos]
//
// No se leen datos de tensores: para resolver roles basta con los nombres.
// Los shards se parsean en paralelo (rayon).
//
// ============================================================================

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use rayon::prelude::*;
use serde::Deserialize;

use crate::module::{ModuleNode, ModuleRef};

/// Límite razonable para el header JSON (100 MB)
const MAX_HEADER_SIZE: usize = 100 * 1024 * 1024;

/// Información de un tensor en el header
#[derive(Debug, Clone, Deserialize)]
pub struct TensorInfo {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data_offsets: [usize; 2],
}

/// Header de un shard
#[derive(Debug, Deserialize)]
pub struct SafetensorHeader {
    #[serde(flatten)]
    pub tensors: HashMap<String, TensorInfo>,
    #[serde(rename = "__metadata__")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Lee el header de un shard vía mmap
pub fn read_header(path: &Path) -> Result<SafetensorHeader> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;

    // Solo se tocan las páginas del header
    let mmap = unsafe { Mmap::map(&file)? };

    if mmap.len() < 8 {
        bail!("{} is too small to be a safetensors file", path.display());
    }

    let header_size = LittleEndian::read_u64(&mmap[..8]) as usize;
    if header_size > MAX_HEADER_SIZE || 8 + header_size > mmap.len() {
        bail!(
            "Invalid header size {} in {} (file is {} bytes)",
            header_size,
            path.display(),
            mmap.len()
        );
    }

    let header: SafetensorHeader = serde_json::from_slice(&mmap[8..8 + header_size])
        .with_context(|| format!("Invalid safetensor header JSON in {}", path.display()))?;

    Ok(header)
}

/// Índice de todos los tensores de un checkpoint (posiblemente sharded)
#[derive(Debug, Default)]
pub struct SafetensorIndex {
    shards: Vec<PathBuf>,
    tensors: HashMap<String, (usize, TensorInfo)>,
}

impl SafetensorIndex {
    /// Un único archivo
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        Self::from_paths(vec![path])
    }

    /// Todos los *.safetensors de un directorio
    pub fn from_folder(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Cannot read directory {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "safetensors"))
            .collect();

        if paths.is_empty() {
            return Err(anyhow!("No .safetensors files in {}", dir.display()));
        }

        // Ordenar para consistencia
        paths.sort();
        Self::from_paths(paths)
    }

    fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        let headers: Vec<SafetensorHeader> = paths
            .par_iter()
            .map(|p| read_header(p))
            .collect::<Result<_>>()?;

        let mut tensors = HashMap::new();
        for (idx, header) in headers.into_iter().enumerate() {
            for (name, info) in header.tensors {
                if let Some((prev, _)) = tensors.insert(name.clone(), (idx, info)) {
                    log::warn!(
                        "Tensor '{}' appears in {} and {}; keeping the latter",
                        name,
                        paths[prev].display(),
                        paths[idx].display()
                    );
                }
            }
        }

        log::info!("Indexed {} tensors from {} shard(s)", tensors.len(), paths.len());

        Ok(Self {
            shards: paths,
            tensors,
        })
    }

    /// Número total de tensores
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn shards(&self) -> &[PathBuf] {
        &self.shards
    }

    pub fn tensor_info(&self, name: &str) -> Option<&TensorInfo> {
        self.tensors.get(name).map(|(_, info)| info)
    }

    /// Nombres ordenados
    pub fn tensor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Árbol de módulos del checkpoint
    pub fn module_tree(&self) -> ModuleRef {
        ModuleNode::from_parameters(
            self.tensors
                .iter()
                .map(|(name, (_, info))| (name.as_str(), info.dtype.clone(), info.shape.clone())),
        )
    }
}
