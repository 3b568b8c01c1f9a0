//! HTTP 处理器模块

pub mod comment;
pub mod defect;
pub mod health;
pub mod metrics;
pub mod report;
