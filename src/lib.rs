pub mod app;
pub mod cache;
pub mod camera3d;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod fbx;
pub mod material;
pub mod mesh;
pub mod model_store;
pub mod progress;
pub mod renderer;
pub mod scene_host;
pub mod tabs;
pub mod texture;
pub mod upload;
pub mod validate;
pub mod viewer;

pub use app::{run, run_with_overrides, App};
pub use error::ViewerError;
pub use viewer::Viewer;
