//! 数据模型模块
//! 缺陷、评论、历史为库内模型，项目与报表描述跨服务线格式

pub mod comment;
pub mod defect;
pub mod envelope;
pub mod history;
pub mod project;
pub mod report;
pub mod role;
