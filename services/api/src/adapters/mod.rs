pub mod db;
pub mod gemini;
pub mod upload;

pub use db::DbAdapter;
pub use gemini::{GeminiConnector, GeminiImageAdapter};
