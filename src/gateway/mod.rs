//! API 网关
//! 统一入口：本地校验 JWT 后按路径前缀把请求转发到上游服务

pub mod http;
pub mod routes;

pub use http::ProxyClient;
pub use routes::{gateway_router, GatewayState};
