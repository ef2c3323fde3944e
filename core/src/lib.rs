pub mod canonical_url;
pub mod db;
pub mod error;
pub mod grocery;
pub mod models;
pub mod quantity;
pub mod service;

pub use error::{Error, Result};
pub use service::{PantryService, RecipeExtractor};
