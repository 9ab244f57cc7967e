//! Application services layer scaffolding.

pub mod error;
pub mod loaders;
pub mod repos;
pub mod resolver;
pub mod translate;
