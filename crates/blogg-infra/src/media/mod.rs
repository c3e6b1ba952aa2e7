//! Image hosting implementations.

mod cloudinary;

pub use cloudinary::{CloudinaryConfig, CloudinaryImageHost};
