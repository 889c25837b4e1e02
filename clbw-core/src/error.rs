//! 基准测试错误类型
//!
//! 所有错误都是终止性的：任何一次失败都结束本次运行，不做重试。
//! 错误沿调用栈返回，由命令行入口映射为诊断输出和退出码。

use std::panic::Location;

use thiserror::Error;

use crate::status::status_name;

/// 基准测试结果类型
pub type BenchResult<T> = Result<T, BenchError>;

/// 基准测试错误
#[derive(Debug, Error)]
pub enum BenchError {
    /// 命令行调用方式错误
    #[error("Usage: {program} <buffer_size>")]
    Usage { program: String },

    /// 缓冲区元素数过小
    #[error("Parameter <buffer_size> must be greater than 8.")]
    BufferTooSmall { requested: u64 },

    /// 缓冲区字节数超出地址空间
    #[error("Parameter <buffer_size> is too large.")]
    BufferTooLarge { requested: u64 },

    /// 没有名称匹配的平台
    #[error("Can't find the required platform")]
    PlatformNotFound { target: String },

    /// 选中平台下的设备少于两个
    #[error("Not enough devices are available")]
    NotEnoughDevices { found: usize },

    /// 设备索引越界
    #[error("Device index {index} is out of range ({count} devices)")]
    InvalidDeviceIndex { index: usize, count: usize },

    /// 运行时 API 返回非成功状态
    #[error(transparent)]
    Api(#[from] ApiError),

    /// 配置文件无法读取或解析
    #[error("Configuration error in {path}: {reason}")]
    Config { path: String, reason: String },

    /// 报告输出失败
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// 是否属于调用方式错误（输出到 stdout，不做任何设备枚举）
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Usage { .. } | Self::BufferTooSmall { .. } | Self::BufferTooLarge { .. }
        )
    }

    /// 生成面向终端的诊断文本
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Usage { .. } | Self::BufferTooSmall { .. } | Self::BufferTooLarge { .. } => {
                format!("{self}\n")
            }
            Self::Api(api) => api.diagnostic(),
            other => format!("\nEpic fail:\n{other}\n"),
        }
    }
}

/// 运行时调用失败，记录调用名称、检查位置和状态码
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed with status {code} at {file}:{line}")]
pub struct ApiError {
    pub operation: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub code: i32,
}

impl ApiError {
    /// 在调用方位置创建错误
    #[track_caller]
    pub fn new(operation: &'static str, code: i32) -> Self {
        let location = Location::caller();
        Self {
            operation,
            file: location.file(),
            line: location.line(),
            code,
        }
    }

    pub fn status_name(&self) -> &'static str {
        status_name(self.code)
    }

    pub fn diagnostic(&self) -> String {
        format!(
            "Error during operation '{}', in '{}' on line {}\nError code was \"{}\" ({})\n",
            self.operation,
            self.file,
            self.line,
            self.status_name(),
            self.code
        )
    }
}

/// 检查原始状态码，非成功时返回带调用位置的错误
#[track_caller]
pub fn check_status(operation: &'static str, code: i32) -> BenchResult<()> {
    if code == crate::status::CL_SUCCESS {
        Ok(())
    } else {
        Err(ApiError::new(operation, code).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{CL_INVALID_VALUE, CL_OUT_OF_RESOURCES, CL_SUCCESS};

    #[test]
    fn test_check_status_success() {
        assert!(check_status("clFinish", CL_SUCCESS).is_ok());
    }

    #[test]
    fn test_check_status_records_caller_location() {
        let line = line!() + 1;
        let err = check_status("clEnqueueCopyBuffer", CL_OUT_OF_RESOURCES).unwrap_err();
        match err {
            BenchError::Api(api) => {
                assert_eq!(api.operation, "clEnqueueCopyBuffer");
                assert_eq!(api.line, line);
                assert!(api.file.ends_with("error.rs"));
                assert_eq!(api.status_name(), "CL_OUT_OF_RESOURCES");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_diagnostic_format() {
        let api = ApiError {
            operation: "clCreateBuffer",
            file: "src/runtime/opencl.rs",
            line: 42,
            code: CL_INVALID_VALUE,
        };
        assert_eq!(
            api.diagnostic(),
            "Error during operation 'clCreateBuffer', in 'src/runtime/opencl.rs' on line 42\n\
             Error code was \"CL_INVALID_VALUE\" (-30)\n"
        );
    }

    #[test]
    fn test_fatal_diagnostic_format() {
        let err = BenchError::NotEnoughDevices { found: 1 };
        assert_eq!(err.diagnostic(), "\nEpic fail:\nNot enough devices are available\n");
        assert!(!err.is_usage());
    }

    #[test]
    fn test_usage_diagnostic() {
        let err = BenchError::Usage {
            program: "clbw".to_string(),
        };
        assert!(err.is_usage());
        assert_eq!(err.diagnostic(), "Usage: clbw <buffer_size>\n");
    }

    #[test]
    fn test_buffer_size_diagnostics_are_distinct() {
        let small = BenchError::BufferTooSmall { requested: 8 };
        let large = BenchError::BufferTooLarge {
            requested: u64::MAX,
        };
        assert!(small.is_usage());
        assert!(large.is_usage());
        assert_eq!(small.diagnostic(), "Parameter <buffer_size> must be greater than 8.\n");
        assert_eq!(large.diagnostic(), "Parameter <buffer_size> is too large.\n");
    }
}
