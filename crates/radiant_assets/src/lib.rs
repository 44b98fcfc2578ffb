//! CPU-side asset loading: images, material descriptors and glTF scenes.
//!
//! Nothing in this crate touches the GPU; the renderer uploads what these
//! loaders produce.

pub mod asset_server;
pub mod assets;
pub mod material;
pub mod scene;

pub use asset_server::{TextureError, TextureOptions, load_texture};
pub use assets::{MeshData, Vertex, VertexWeights, vertex_bounds};
pub use material::{MaterialData, MaterialError, MaterialLibrary, TextureData, TextureRole};
pub use scene::SceneData;
