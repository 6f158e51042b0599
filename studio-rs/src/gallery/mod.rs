//! Durable storage for generated images

pub mod store;
pub mod types;

pub use store::{GalleryStore, SqliteGalleryStore};
pub use types::{ImageSummary, StoredImage};
