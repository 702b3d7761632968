mod image_repository_impl;
mod models;

pub use image_repository_impl::ImageRepositoryImpl;
