use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录（为空时只输出到标准输出）
    pub log_dir: Option<PathBuf>,
}

/// 数据文件配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
    /// 话术目录文件（技巧、魔法话术、破坏融洽规则）
    pub catalog_path: PathBuf,
    /// 人设 JSON 文件所在目录
    pub personas_dir: PathBuf,
}

/// 评分策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// 推进到下一个异议所需的最低总分
    pub resolution_min_total: u8,
    /// 推进时是否要求没有触发破坏融洽的话术
    pub require_no_breakers: bool,
    /// 命中魔法话术时的配合度奖励
    pub magic_phrase_bonus: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            resolution_min_total: 8,
            require_no_breakers: true,
            magic_phrase_bonus: 1,
        }
    }
}

/// 通话分析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 用于识别销售方发言的关键词
    pub agent_keywords: Vec<String>,
    /// 报告中保留的错失机会数量上限
    pub max_missed_opportunities: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            agent_keywords: [
                "let me show you",
                "i can help",
                "our team",
                "i would recommend",
                "i'll send you",
                "my clients",
                "i appreciate that",
                "perfect",
                "does that make sense",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_missed_opportunities: 5,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 数据文件配置
    pub data: DataConfig,
    /// 评分策略
    pub scoring: ScoringConfig,
    /// 通话分析
    pub analysis: AnalysisConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            data: DataConfig {
                catalog_path: PathBuf::from("./data/catalog.json"),
                personas_dir: PathBuf::from("./data/personas"),
            },
            scoring: ScoringConfig::default(),
            analysis: AnalysisConfig::default(),
            app_name: "cfr-coach".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.server.host = "0.0.0.0".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config
    }
}
