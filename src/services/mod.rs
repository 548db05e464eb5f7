pub mod auth;
pub mod images;

pub use auth::{AuthService, Claims, IssuedToken};
pub use images::{ImageKind, ImageStore, IMAGES_ROUTE};
