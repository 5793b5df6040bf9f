pub mod aprendiz_repository;
pub mod error;
pub mod ficha_repository;
pub mod import_log_repository;
pub mod models;

pub use aprendiz_repository::AprendizRepository;
pub use error::DbError;
pub use ficha_repository::FichaRepository;
pub use import_log_repository::ImportLogRepository;
pub use models::*;
