//! 上游服务客户端
//! 目录校验走认证与项目服务，报表数据抓取走缺陷与项目服务

pub mod data_fetcher;
pub mod directory;

pub use data_fetcher::DataFetcher;
pub use directory::DirectoryClient;

use crate::error::AppError;

/// 把 reqwest 传输层错误归类为上游不可用
/// 超时与连接失败文案不同，两者都对应 503
pub(crate) fn transport_error(service: &str, e: &reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::upstream_unavailable(format!("{} timeout", service))
    } else {
        AppError::upstream_unavailable(format!("{} unavailable: {}", service, e))
    }
}
