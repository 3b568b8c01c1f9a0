//! 缺陷跟踪系统库
//! 缺陷服务、报表服务与网关共享的类型和工具

pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
