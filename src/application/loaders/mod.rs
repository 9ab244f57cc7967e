//! Lazy per-origin document loaders.

pub mod core;
pub mod theme;
pub mod user;

pub use self::core::CoreLoader;
pub use self::theme::ThemeLoader;
pub use self::user::UserLoader;
