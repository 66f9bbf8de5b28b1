pub mod api;
pub mod config;
pub mod products;
pub mod session;

pub use api::{ProductStatus, Storefront};
pub use config::{CredentialOverrides, ShopCredentials};
pub use products::{ProductDraft, deactivate_product, update_product_price, upload_product};
pub use session::ShopSession;
