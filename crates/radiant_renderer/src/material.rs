use std::{collections::HashMap, path::Path, sync::Arc};

use log::info;
use radiant_assets::{MaterialData, MaterialError, MaterialLibrary, TextureData, TextureRole};

use crate::texture::GpuTexture;

/// Something that can bind its resources for a draw.
pub trait Material: Send + Sync {
    fn name(&self) -> &str;

    /// Binds this material's resources at bind group index `group`.
    fn bind(&self, pass: &mut wgpu::RenderPass<'_>, group: u32);
}

/// Five texture maps and a sampler, in [`TextureRole`] order.
pub struct PbrMaterial {
    name: String,
    bound: [bool; 5],
    // Bind group keeps these alive, held for inspection.
    textures: Vec<GpuTexture>,
    bind_group: wgpu::BindGroup,
}

/// Stand-in pixel (BGRA) for a map the descriptor did not provide.
fn fallback_pixel(role: TextureRole) -> [u8; 4] {
    match role {
        TextureRole::BaseColor | TextureRole::Roughness | TextureRole::AmbientOcclusion => [255, 255, 255, 255],
        TextureRole::Metallic => [0, 0, 0, 255],
        // tangent-space +Z
        TextureRole::Normal => [255, 128, 128, 255],
    }
}

impl PbrMaterial {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        data: &MaterialData,
    ) -> Self {
        let mut bound = [false; 5];
        let textures: Vec<GpuTexture> = TextureRole::ALL
            .iter()
            .map(|&role| match data.texture(role) {
                Some(texture) => {
                    bound[role.slot()] = true;
                    GpuTexture::from_data(device, queue, texture, Some(texture.name.as_str()))
                }
                None => {
                    let fallback = TextureData::solid("fallback", fallback_pixel(role));
                    GpuTexture::from_data(device, queue, &fallback, Some("Fallback Texture"))
                }
            })
            .collect();

        let mut entries: Vec<wgpu::BindGroupEntry> = textures
            .iter()
            .enumerate()
            .map(|(binding, texture)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: TextureRole::ALL.len() as u32,
            resource: wgpu::BindingResource::Sampler(&textures[TextureRole::BaseColor.slot()].sampler),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout,
            entries: &entries,
        });

        Self {
            name: data.name.clone(),
            bound,
            textures,
            bind_group,
        }
    }

    /// Whether `role` came from the descriptor rather than a fallback.
    pub fn is_bound(&self, role: TextureRole) -> bool {
        self.bound[role.slot()]
    }

    pub fn texture(&self, role: TextureRole) -> &GpuTexture {
        &self.textures[role.slot()]
    }
}

impl Material for PbrMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, pass: &mut wgpu::RenderPass<'_>, group: u32) {
        pass.set_bind_group(group, &self.bind_group, &[]);
    }
}

/// Loads a material descriptor and uploads every material it names.
///
/// Fails as a whole if the descriptor or any referenced image is unusable.
pub fn load(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    path: &Path,
) -> Result<HashMap<String, Arc<dyn Material>>, MaterialError> {
    let library = MaterialLibrary::load(path)?;
    let materials: HashMap<String, Arc<dyn Material>> = library
        .into_iter()
        .map(|(name, data)| {
            let material: Arc<dyn Material> = Arc::new(PbrMaterial::new(device, queue, layout, &data));
            (name, material)
        })
        .collect();
    info!("Uploaded {} materials from {:?}", materials.len(), path);
    Ok(materials)
}

#[cfg(test)]
mod tests {
    use radiant_assets::asset_server::tga_parser::encode_tga;

    use super::*;
    use crate::{context::GpuContext, programs::pbr_program::material_layout};

    #[test]
    fn fallbacks_fill_missing_maps() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("albedo.tga"), encode_tga(2, 2, &[200; 16])).unwrap();
        std::fs::write(
            dir.path().join("robot.json"),
            r#"{"objects": [{"name": "Body", "attributes": [
                {"name": "baseColor", "value": "albedo.tga"},
                {"name": "emissive", "value": "glow.tga"}
            ]}]}"#,
        )
        .unwrap();

        let layout = material_layout(&gpu.device);
        let library = MaterialLibrary::load(&dir.path().join("robot.json")).unwrap();
        let material = PbrMaterial::new(&gpu.device, &gpu.queue, &layout, &library["Body"]);

        assert_eq!(material.name(), "Body");
        assert!(material.is_bound(TextureRole::BaseColor));
        assert!(!material.is_bound(TextureRole::Normal));
        assert_eq!(material.texture(TextureRole::BaseColor).width(), 2);
        assert_eq!(material.texture(TextureRole::Normal).width(), 1);

        let table = load(&gpu.device, &gpu.queue, &layout, &dir.path().join("robot.json")).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table["Body"].name(), "Body");
    }

    #[test]
    fn missing_image_fails_whole_table() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("robot.json"),
            r#"{"objects": [{"name": "Body", "attributes": [{"name": "normal", "value": "nope.tga"}]}]}"#,
        )
        .unwrap();

        let layout = material_layout(&gpu.device);
        let result = load(&gpu.device, &gpu.queue, &layout, &dir.path().join("robot.json"));
        assert!(matches!(result, Err(MaterialError::Texture { .. })));
    }
}
