//! Material descriptors and the CPU half of material resolution.
//!
//! A descriptor is a JSON document listing named objects, each with an
//! ordered list of `{name, value}` attributes. Attributes named after one of
//! the five PBR texture roles point at an image relative to the descriptor.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::asset_server::{self, TextureError, TextureOptions};

#[derive(Error, Debug)]
pub enum MaterialError {
    #[error("failed to read material descriptor {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse material descriptor {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("material '{material}': {source}")]
    Texture {
        material: String,
        #[source]
        source: TextureError,
    },
}

/// Decoded BGRA8 pixels plus their mip chain.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// `mips[0]` is the full-size image, each next level half the size.
    pub mips: Vec<Vec<u8>>,
    pub srgb: bool,
}

impl TextureData {
    pub fn pixels(&self) -> &[u8] {
        &self.mips[0]
    }

    /// A single-level 1x1 texture.
    pub fn solid(name: &str, bgra: [u8; 4]) -> Self {
        Self {
            name: name.to_string(),
            width: 1,
            height: 1,
            mips: vec![bgra.to_vec()],
            srgb: false,
        }
    }
}

/// The texture slots of a PBR material, in binding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureRole {
    BaseColor,
    Metallic,
    Roughness,
    AmbientOcclusion,
    Normal,
}

impl TextureRole {
    pub const ALL: [TextureRole; 5] = [
        TextureRole::BaseColor,
        TextureRole::Metallic,
        TextureRole::Roughness,
        TextureRole::AmbientOcclusion,
        TextureRole::Normal,
    ];

    /// Maps a descriptor attribute name to a role. Unknown names give `None`.
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "baseColor" => Some(Self::BaseColor),
            "metallic" => Some(Self::Metallic),
            "roughness" => Some(Self::Roughness),
            "ambientOcclusion" => Some(Self::AmbientOcclusion),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }

    pub fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Deserialize)]
struct MaterialAttribute {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct MaterialObject {
    name: String,
    attributes: Vec<MaterialAttribute>,
}

#[derive(Debug, Deserialize)]
struct MaterialDescriptor {
    objects: Vec<MaterialObject>,
}

/// One resolved material: whichever texture roles its descriptor named.
#[derive(Clone, Debug)]
pub struct MaterialData {
    pub name: String,
    pub textures: BTreeMap<TextureRole, TextureData>,
}

impl MaterialData {
    pub fn texture(&self, role: TextureRole) -> Option<&TextureData> {
        self.textures.get(&role)
    }
}

pub struct MaterialLibrary;

impl MaterialLibrary {
    /// Reads a descriptor and decodes every texture it references.
    ///
    /// Any failure aborts the whole load; a partial table is never returned.
    pub fn load(path: &Path) -> Result<HashMap<String, MaterialData>, MaterialError> {
        let text = std::fs::read_to_string(path).map_err(|source| MaterialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let descriptor: MaterialDescriptor =
            serde_json::from_str(&text).map_err(|source| MaterialError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path.parent().unwrap_or(Path::new("./"));
        let mut materials = HashMap::with_capacity(descriptor.objects.len());

        for object in descriptor.objects {
            let mut textures = BTreeMap::new();

            for attribute in &object.attributes {
                let Some(role) = TextureRole::from_attribute(&attribute.name) else {
                    log::debug!(
                        "Material '{}': ignoring attribute '{}'",
                        object.name,
                        attribute.name
                    );
                    continue;
                };

                let texture_path = base_dir.join(&attribute.value);
                let texture = asset_server::load_texture(&texture_path, &TextureOptions::MATERIAL)
                    .map_err(|source| MaterialError::Texture {
                        material: object.name.clone(),
                        source,
                    })?;
                textures.insert(role, texture);
            }

            let material = MaterialData {
                name: object.name.clone(),
                textures,
            };
            if materials.insert(object.name.clone(), material).is_some() {
                log::warn!("Material '{}' declared twice, keeping the last one", object.name);
            }
        }

        log::info!("Loaded {} materials from {}", materials.len(), path.display());
        Ok(materials)
    }
}
