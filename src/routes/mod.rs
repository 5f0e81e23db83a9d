mod api;
mod pages;

pub use api::{generate_certificate, view_certificate, GenerateResponse};
pub use pages::index;
