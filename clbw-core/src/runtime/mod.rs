//! 计算运行时抽象
//!
//! 会话只通过 [`ComputeRuntime`] 访问平台、设备、上下文、命令队列和设备缓冲区。
//! 所有入队操作都是阻塞的，或者返回一个事件并由调用方立即等待。
//!
//! - `opencl`: 基于 `opencl3` 的真实运行时（需要 `opencl` feature）
//! - `sim`: 内存中的模拟运行时，用于测试和无硬件环境

#[cfg(feature = "opencl")]
pub mod opencl;
pub mod sim;

#[cfg(feature = "opencl")]
pub use opencl::OpenClRuntime;
pub use sim::{ReleaseLog, SimFault, SimRuntime};

use crate::error::BenchResult;

/// 运行时调用名称，用于诊断和故障注入
pub mod ops {
    pub const GET_PLATFORM_IDS: &str = "clGetPlatformIDs";
    pub const GET_PLATFORM_INFO: &str = "clGetPlatformInfo";
    pub const GET_DEVICE_IDS: &str = "clGetDeviceIDs";
    pub const GET_DEVICE_INFO: &str = "clGetDeviceInfo";
    pub const CREATE_CONTEXT: &str = "clCreateContext";
    pub const CREATE_COMMAND_QUEUE: &str = "clCreateCommandQueue";
    pub const CREATE_BUFFER: &str = "clCreateBuffer";
    pub const ENQUEUE_WRITE_BUFFER: &str = "clEnqueueWriteBuffer";
    pub const ENQUEUE_READ_BUFFER: &str = "clEnqueueReadBuffer";
    pub const ENQUEUE_COPY_BUFFER: &str = "clEnqueueCopyBuffer";
    pub const ENQUEUE_MIGRATE_MEM_OBJECTS: &str = "clEnqueueMigrateMemObjects";
    pub const WAIT_FOR_EVENTS: &str = "clWaitForEvents";
    pub const RELEASE_MEM_OBJECT: &str = "clReleaseMemObject";
    pub const RELEASE_COMMAND_QUEUE: &str = "clReleaseCommandQueue";
    pub const RELEASE_CONTEXT: &str = "clReleaseContext";
}

/// 计算运行时
///
/// 关联类型对应运行时的不透明句柄。句柄的释放由各自的 `Drop` 负责，
/// 会话在拆除阶段按缓冲区、队列、上下文的顺序释放它们。
pub trait ComputeRuntime {
    type Platform;
    type Device;
    type Context;
    type Queue;
    type Buffer;
    type Event;

    /// 枚举所有平台
    fn platforms(&self) -> BenchResult<Vec<Self::Platform>>;

    /// 平台名称
    fn platform_name(&self, platform: &Self::Platform) -> BenchResult<String>;

    /// 枚举平台下的所有设备（任意类型）。没有设备时返回空列表。
    fn devices(&self, platform: &Self::Platform) -> BenchResult<Vec<Self::Device>>;

    /// 设备名称
    fn device_name(&self, device: &Self::Device) -> BenchResult<String>;

    /// 创建绑定所有设备的上下文
    fn create_context(&self, devices: &[Self::Device]) -> BenchResult<Self::Context>;

    /// 为指定设备创建按序执行的命令队列
    fn create_queue(&self, context: &Self::Context, device: &Self::Device)
    -> BenchResult<Self::Queue>;

    /// 创建可读写的设备缓冲区，容量为 `elements` 个 f64
    fn create_buffer(&self, context: &Self::Context, elements: usize) -> BenchResult<Self::Buffer>;

    /// 阻塞写入：主机 -> 设备
    fn write_buffer(
        &self,
        queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        host: &[f64],
    ) -> BenchResult<()>;

    /// 阻塞读取：设备 -> 主机
    fn read_buffer(
        &self,
        queue: &Self::Queue,
        buffer: &Self::Buffer,
        host: &mut [f64],
    ) -> BenchResult<()>;

    /// 入队设备间复制 `src -> dst`，返回完成事件
    fn copy_buffer(
        &self,
        queue: &Self::Queue,
        src: &Self::Buffer,
        dst: &mut Self::Buffer,
    ) -> BenchResult<Self::Event>;

    /// 入队内存迁移，把缓冲区迁移到 `queue` 所属设备，返回完成事件
    fn migrate_buffer(&self, queue: &Self::Queue, buffer: &Self::Buffer)
    -> BenchResult<Self::Event>;

    /// 等待事件完成
    fn wait(&self, event: Self::Event) -> BenchResult<()>;
}
