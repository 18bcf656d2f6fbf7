pub mod backend;
pub mod builder;
pub mod camera;
pub mod color;
pub mod config;
pub mod debug_overlay;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod host;
pub mod input;
pub mod lighting;
pub mod material;
pub mod props;
pub mod render_loop;
pub mod rng;
pub mod scene_graph;
pub mod session;
pub mod texture;

#[cfg(not(target_arch = "wasm32"))]
pub mod app;
#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use error::SceneError;
pub use session::{MountOptions, SceneSession};
