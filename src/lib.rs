//! cfr-coach - 销售异议处理陪练服务
//!
//! 模拟买卖双方人设进行角色扮演，按 CFR 四步法（认可、隔离、处理、推进）
//! 为销售发言评分，并用同一评分器分析已转写的真实通话。

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod scoring;
pub mod services;
