//! Business logic services layer

pub mod defect_service;
pub mod export;
pub mod history;
pub mod report_generator;
pub mod transitions;

pub use defect_service::DefectService;
pub use report_generator::ReportService;
