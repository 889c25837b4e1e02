//! 多设备传输带宽基准测试
//!
//! 在同一平台的多个计算设备上测量四类传输的吞吐量：
//! - 主机 -> 设备写入
//! - 设备 -> 主机读取
//! - 设备 -> 设备复制
//! - 设备间内存迁移往返
//!
//! 设备访问通过 [`ComputeRuntime`] 抽象，`opencl` feature 启用真实的 OpenCL 运行时，
//! [`SimRuntime`] 在内存中模拟，供测试和无硬件环境使用。

pub mod bench;
pub mod config;
pub mod error;
pub mod host;
mod profile;
pub mod report;
pub mod runtime;
pub mod script;
pub mod session;
pub mod status;
pub mod timing;

pub use bench::run_benchmark;
pub use config::{BenchConfig, DEFAULT_PLATFORM};
pub use error::{ApiError, BenchError, BenchResult, check_status};
pub use host::{BufferSize, HostBuffer};
pub use report::{
    Endpoint, JsonReport, JsonReporter, Measurement, ReportFormat, Reporter, TextReporter,
    TransferKind,
};
#[cfg(feature = "opencl")]
pub use runtime::OpenClRuntime;
pub use runtime::{ComputeRuntime, ReleaseLog, SimFault, SimRuntime};
pub use script::{ScriptStep, default_script, run_script};
pub use session::{MIN_DEVICES, Session, discover};
pub use timing::{Clock, MonotonicClock, SteppingClock};
