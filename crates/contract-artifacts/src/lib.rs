//! A registry of compiled contract artifacts.
//!
//! The registry is built from the output directory of a Solidity build tool.
//! Both Foundry's `out/` layout and Hardhat's `artifacts/` layout are
//! supported. Every entry pairs the contract's ABI (its constructor and
//! callable methods) with the creation bytecode used to deploy it.
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use ethers::{
    abi::{Abi, Constructor},
    types::Bytes,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse artifact {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("artifact {} has invalid bytecode: {reason}", path.display())]
    InvalidBytecode { path: PathBuf, reason: String },
    #[error("{} is not a deployable contract artifact", path.display())]
    NotDeployable { path: PathBuf },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: Option<String>,
    abi: Option<Abi>,
    #[serde(default)]
    bytecode: Option<RawBytecode>,
}

/// Hardhat stores the bytecode as a hex string while Foundry nests it in an
/// object alongside the source map and link references.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl RawBytecode {
    fn hex(&self) -> &str {
        match self {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        }
    }
}

/// A compiled contract.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    name: String,
    abi: Abi,
    bytecode: Bytes,
    path: Option<PathBuf>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, abi: Abi, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
            path: None,
        }
    }

    /// Loads a single artifact file. Unlike a registry scan, this fails if
    /// the file isn't a deployable contract.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_artifact(path, &contents)?.ok_or_else(|| ArtifactError::NotDeployable {
            path: path.to_path_buf(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// The creation bytecode, without constructor arguments.
    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    /// The file that the artifact was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.abi.constructor()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.abi.functions_by_name(name).is_ok()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.abi.functions.keys().map(String::as_str)
    }
}

/// Parses an artifact. Returns `None` for JSON files that aren't contract
/// artifacts (like build info) and for artifacts without creation bytecode
/// (like interfaces and abstract contracts).
fn parse_artifact(path: &Path, contents: &str) -> Result<Option<Artifact>, ArtifactError> {
    let raw: RawArtifact =
        serde_json::from_str(contents).map_err(|source| ArtifactError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    let (abi, bytecode) = match (raw.abi, raw.bytecode) {
        (Some(abi), Some(bytecode)) => (abi, bytecode),
        _ => return Ok(None),
    };
    let bytecode = bytecode
        .hex()
        .parse::<Bytes>()
        .map_err(|err| ArtifactError::InvalidBytecode {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    if bytecode.is_empty() {
        return Ok(None);
    }

    // Foundry names multi-version artifacts `Name.0.8.28.json`, so we only
    // keep the part of the stem before the first dot.
    let name = match raw.contract_name {
        Some(name) => name,
        None => path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.split('.').next())
            .unwrap_or_default()
            .to_string(),
    };

    Ok(Some(Artifact {
        name,
        abi,
        bytecode,
        path: Some(path.to_path_buf()),
    }))
}

fn is_artifact_file(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    // Hardhat writes a `.dbg.json` file next to every artifact.
    file_name.ends_with(".json") && !file_name.ends_with(".dbg.json")
}

fn get_artifact_files(dir: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
    let io_error = |source| ArtifactError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|name| name == "build-info") {
                continue;
            }
            files.extend(get_artifact_files(&path)?);
        } else if is_artifact_file(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Compiled artifacts indexed by contract name.
#[derive(Clone, Debug, Default)]
pub struct ArtifactRegistry {
    artifacts: BTreeMap<String, Artifact>,
}

impl ArtifactRegistry {
    /// Scans a build output directory for deployable artifacts. Files that
    /// can't be used are skipped and logged. When two artifacts share a
    /// name, the one with the lexicographically smaller path wins.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        let mut files = get_artifact_files(dir)?;
        files.sort();

        let mut registry = Self::default();
        for path in files {
            let contents = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;
            match parse_artifact(&path, &contents) {
                Ok(Some(artifact)) => {
                    if let Some(existing) = registry.get(artifact.name()) {
                        warn!(
                            name = artifact.name(),
                            kept = ?existing.path(),
                            skipped = %path.display(),
                            "duplicate artifact name"
                        );
                        continue;
                    }
                    registry.insert(artifact);
                }
                Ok(None) => debug!(path = %path.display(), "skipping non-deployable artifact"),
                Err(err) => warn!(%err, "skipping unusable artifact"),
            }
        }
        debug!(dir = %dir.display(), count = registry.len(), "loaded artifacts");

        Ok(registry)
    }

    pub fn insert(&mut self, artifact: Artifact) -> Option<Artifact> {
        self.artifacts.insert(artifact.name.clone(), artifact)
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
