//! Database repository layer

pub mod comment_repo;
pub mod defect_repo;
pub mod history_repo;

pub use comment_repo::CommentRepository;
pub use defect_repo::{DefectRepository, DefectVisibility};
pub use history_repo::HistoryRepository;
