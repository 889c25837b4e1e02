//! 基准测试配置

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};
use crate::report::ReportFormat;
use crate::script::{ScriptStep, default_script};

/// 默认目标平台名称
pub const DEFAULT_PLATFORM: &str = "Intel(R) OpenCL Graphics";

/// 基准测试配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// 目标平台名称（精确匹配）
    pub target_platform: String,
    /// 报告格式
    pub format: ReportFormat,
    /// 测量脚本
    pub script: Vec<ScriptStep>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            target_platform: DEFAULT_PLATFORM.to_string(),
            format: ReportFormat::Text,
            script: default_script(),
        }
    }
}

impl BenchConfig {
    /// 从 JSON 文件加载配置，缺省字段使用默认值
    pub fn from_file(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| match e {
            BenchError::Config { reason, .. } => BenchError::Config {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// 从 JSON 文本解析配置
    pub fn from_json(content: &str) -> BenchResult<Self> {
        serde_json::from_str(content).map_err(|e| BenchError::Config {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }
}
