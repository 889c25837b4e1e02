//! OpenCL 运行时
//!
//! 基于 `opencl3` 的真实运行时实现。每个调用的状态码都在调用点立即检查，
//! 失败时返回带调用名称和源码位置的 [`ApiError`]。
//!
//! 上下文、命令队列、缓冲区和事件都由 `opencl3` 的 RAII 类型持有，
//! 离开作用域时调用对应的 `clRelease*`。

use std::ptr;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{CL_DEVICE_TYPE_ALL, Device};
use opencl3::error_codes::ClError;
use opencl3::event::Event;
use opencl3::memory::{Buffer, CL_MEM_READ_WRITE, ClMem};
use opencl3::platform::{Platform, get_platforms};
use opencl3::types::{CL_BLOCKING, cl_device_id, cl_double, cl_mem};

use super::{ComputeRuntime, ops};
use crate::error::{ApiError, BenchResult};
use crate::status::CL_DEVICE_NOT_FOUND;

/// 检查 `opencl3` 调用结果，错误位置记录为调用方
#[track_caller]
fn checked<T>(result: Result<T, ClError>, operation: &'static str) -> BenchResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(ClError(code)) => Err(ApiError::new(operation, code).into()),
    }
}

/// OpenCL 设备缓冲区及其元素数
pub struct ClBuffer {
    inner: Buffer<cl_double>,
    elements: usize,
}

impl std::fmt::Debug for ClBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClBuffer")
            .field("elements", &self.elements)
            .field("bytes", &self.byte_len())
            .finish()
    }
}

impl ClBuffer {
    pub fn byte_len(&self) -> usize {
        self.elements * std::mem::size_of::<cl_double>()
    }
}

/// OpenCL 运行时
#[derive(Debug, Default)]
pub struct OpenClRuntime;

impl OpenClRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeRuntime for OpenClRuntime {
    type Platform = Platform;
    type Device = cl_device_id;
    type Context = Context;
    type Queue = CommandQueue;
    type Buffer = ClBuffer;
    type Event = Event;

    fn platforms(&self) -> BenchResult<Vec<Platform>> {
        checked(get_platforms(), ops::GET_PLATFORM_IDS)
    }

    fn platform_name(&self, platform: &Platform) -> BenchResult<String> {
        checked(platform.name(), ops::GET_PLATFORM_INFO)
    }

    fn devices(&self, platform: &Platform) -> BenchResult<Vec<cl_device_id>> {
        match platform.get_devices(CL_DEVICE_TYPE_ALL) {
            Ok(devices) => Ok(devices),
            // 平台下没有设备，由会话按"设备不足"处理
            Err(ClError(CL_DEVICE_NOT_FOUND)) => Ok(Vec::new()),
            Err(ClError(code)) => Err(ApiError::new(ops::GET_DEVICE_IDS, code).into()),
        }
    }

    fn device_name(&self, device: &cl_device_id) -> BenchResult<String> {
        checked(Device::new(*device).name(), ops::GET_DEVICE_INFO)
    }

    fn create_context(&self, devices: &[cl_device_id]) -> BenchResult<Context> {
        checked(
            Context::from_devices(devices, &[], None, ptr::null_mut()),
            ops::CREATE_CONTEXT,
        )
    }

    #[allow(deprecated)]
    fn create_queue(&self, context: &Context, device: &cl_device_id) -> BenchResult<CommandQueue> {
        // OpenCL 1.2 的 clCreateCommandQueue，属性为 0：按序执行、不开启 profiling
        // SAFETY: device 来自同一平台的枚举结果，并且已绑定到 context
        let queue = unsafe { CommandQueue::create(context, *device, 0) };
        checked(queue, ops::CREATE_COMMAND_QUEUE)
    }

    fn create_buffer(&self, context: &Context, elements: usize) -> BenchResult<ClBuffer> {
        // SAFETY: host_ptr 为空，且未使用 CL_MEM_USE_HOST_PTR / CL_MEM_COPY_HOST_PTR
        let buffer = unsafe {
            Buffer::<cl_double>::create(context, CL_MEM_READ_WRITE, elements, ptr::null_mut())
        };
        let inner = checked(buffer, ops::CREATE_BUFFER)?;
        log::debug!("device buffer allocated: {} elems", elements);
        Ok(ClBuffer { inner, elements })
    }

    fn write_buffer(
        &self,
        queue: &CommandQueue,
        buffer: &mut ClBuffer,
        host: &[f64],
    ) -> BenchResult<()> {
        // SAFETY: 阻塞写入，返回前 host 切片不再被运行时访问
        let result =
            unsafe { queue.enqueue_write_buffer(&mut buffer.inner, CL_BLOCKING, 0, host, &[]) };
        checked(result, ops::ENQUEUE_WRITE_BUFFER).map(drop)
    }

    fn read_buffer(
        &self,
        queue: &CommandQueue,
        buffer: &ClBuffer,
        host: &mut [f64],
    ) -> BenchResult<()> {
        // SAFETY: 阻塞读取，返回前数据已写入 host 切片
        let result =
            unsafe { queue.enqueue_read_buffer(&buffer.inner, CL_BLOCKING, 0, host, &[]) };
        checked(result, ops::ENQUEUE_READ_BUFFER).map(drop)
    }

    fn copy_buffer(
        &self,
        queue: &CommandQueue,
        src: &ClBuffer,
        dst: &mut ClBuffer,
    ) -> BenchResult<Event> {
        let size = src.byte_len().min(dst.byte_len());
        // SAFETY: 两个缓冲区属于同一上下文，源和目标不是同一对象，size 不超过任一方
        let result =
            unsafe { queue.enqueue_copy_buffer(&src.inner, &mut dst.inner, 0, 0, size, &[]) };
        checked(result, ops::ENQUEUE_COPY_BUFFER)
    }

    fn migrate_buffer(&self, queue: &CommandQueue, buffer: &ClBuffer) -> BenchResult<Event> {
        let mem_objects: [cl_mem; 1] = [buffer.inner.get()];
        // SAFETY: mem_objects 在调用期间有效，flags 为 0 表示迁移到队列所属设备
        let result =
            unsafe { queue.enqueue_migrate_mem_object(1, mem_objects.as_ptr(), 0, &[]) };
        checked(result, ops::ENQUEUE_MIGRATE_MEM_OBJECTS)
    }

    fn wait(&self, event: Event) -> BenchResult<()> {
        checked(event.wait(), ops::WAIT_FOR_EVENTS)
    }
}
