//! 模拟计算运行时
//!
//! 在主机内存中模拟平台、设备和缓冲区，数据在"设备"之间真实复制，
//! 因此写入/读取/复制/迁移的内容语义可以在没有加速器的环境下验证。
//! 支持按调用名称注入失败状态码，记录每个调用的次数，
//! 并在句柄释放时把对应的 `clRelease*` 调用写入 [`ReleaseLog`]。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{ComputeRuntime, ops};
use crate::error::{ApiError, BenchResult};
use crate::status::{
    CL_INVALID_BUFFER_SIZE, CL_INVALID_DEVICE, CL_INVALID_PLATFORM, CL_INVALID_VALUE,
};

/// 句柄释放记录，按释放顺序保存 `clRelease*` 调用名称
///
/// 与运行时共享，运行时被消费之后仍然可以读取。
#[derive(Debug, Clone, Default)]
pub struct ReleaseLog(Rc<RefCell<Vec<&'static str>>>);

impl ReleaseLog {
    /// 到目前为止的释放记录
    pub fn entries(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }

    fn record(&self, operation: &'static str) {
        self.0.borrow_mut().push(operation);
    }
}

/// 模拟平台句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPlatform {
    index: usize,
}

/// 模拟设备句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimDevice {
    platform: usize,
    index: usize,
}

impl SimDevice {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// 模拟上下文
#[derive(Debug)]
pub struct SimContext {
    devices: Vec<SimDevice>,
    releases: ReleaseLog,
}

impl Drop for SimContext {
    fn drop(&mut self) {
        self.releases.record(ops::RELEASE_CONTEXT);
    }
}

/// 模拟命令队列
#[derive(Debug)]
pub struct SimQueue {
    device: SimDevice,
    releases: ReleaseLog,
}

impl Drop for SimQueue {
    fn drop(&mut self) {
        self.releases.record(ops::RELEASE_COMMAND_QUEUE);
    }
}

/// 模拟设备缓冲区
#[derive(Debug)]
pub struct SimBuffer {
    data: Vec<f64>,
    /// 当前驻留的设备索引，迁移前为 None
    resident: Cell<Option<usize>>,
    releases: ReleaseLog,
}

impl SimBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn resident_device(&self) -> Option<usize> {
        self.resident.get()
    }
}

impl Drop for SimBuffer {
    fn drop(&mut self) {
        self.releases.record(ops::RELEASE_MEM_OBJECT);
    }
}

/// 模拟完成事件
#[derive(Debug)]
pub struct SimEvent {
    operation: &'static str,
}

/// 故障注入：指定调用在成功 `after` 次之后返回 `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimFault {
    pub operation: &'static str,
    pub after: u64,
    pub status: i32,
}

#[derive(Debug, Clone)]
struct PlatformSpec {
    name: String,
    devices: Vec<String>,
}

/// 模拟运行时
#[derive(Debug, Default)]
pub struct SimRuntime {
    platforms: Vec<PlatformSpec>,
    faults: Vec<SimFault>,
    calls: RefCell<HashMap<&'static str, u64>>,
    releases: ReleaseLog,
}

impl SimRuntime {
    /// 创建没有任何平台的模拟运行时
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个带 `device_count` 个设备的平台
    pub fn with_platform(mut self, name: impl Into<String>, device_count: usize) -> Self {
        let devices = (0..device_count)
            .map(|i| format!("Simulated Accelerator {i}"))
            .collect();
        self.platforms.push(PlatformSpec {
            name: name.into(),
            devices,
        });
        self
    }

    /// 注入一个故障
    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.faults.push(fault);
        self
    }

    /// 指定调用已发生的次数（包括失败的那一次）
    pub fn call_count(&self, operation: &str) -> u64 {
        self.calls.borrow().get(operation).copied().unwrap_or(0)
    }

    /// 本运行时创建的句柄的释放记录
    pub fn release_log(&self) -> ReleaseLog {
        self.releases.clone()
    }

    /// 记录一次调用并检查是否命中注入的故障
    #[track_caller]
    fn enter(&self, operation: &'static str) -> BenchResult<()> {
        let count = {
            let mut calls = self.calls.borrow_mut();
            let entry = calls.entry(operation).or_insert(0);
            *entry += 1;
            *entry
        };

        match self
            .faults
            .iter()
            .find(|f| f.operation == operation && count > f.after)
        {
            Some(fault) => {
                log::debug!("simulated fault: {} call #{} -> {}", operation, count, fault.status);
                Err(ApiError::new(operation, fault.status).into())
            }
            None => Ok(()),
        }
    }

    fn platform_spec(&self, platform: &SimPlatform) -> BenchResult<&PlatformSpec> {
        self.platforms
            .get(platform.index)
            .ok_or_else(|| ApiError::new(ops::GET_PLATFORM_INFO, CL_INVALID_PLATFORM).into())
    }
}

impl ComputeRuntime for SimRuntime {
    type Platform = SimPlatform;
    type Device = SimDevice;
    type Context = SimContext;
    type Queue = SimQueue;
    type Buffer = SimBuffer;
    type Event = SimEvent;

    fn platforms(&self) -> BenchResult<Vec<SimPlatform>> {
        self.enter(ops::GET_PLATFORM_IDS)?;
        Ok((0..self.platforms.len())
            .map(|index| SimPlatform { index })
            .collect())
    }

    fn platform_name(&self, platform: &SimPlatform) -> BenchResult<String> {
        self.enter(ops::GET_PLATFORM_INFO)?;
        Ok(self.platform_spec(platform)?.name.clone())
    }

    fn devices(&self, platform: &SimPlatform) -> BenchResult<Vec<SimDevice>> {
        self.enter(ops::GET_DEVICE_IDS)?;
        let spec = self.platform_spec(platform)?;
        Ok((0..spec.devices.len())
            .map(|index| SimDevice {
                platform: platform.index,
                index,
            })
            .collect())
    }

    fn device_name(&self, device: &SimDevice) -> BenchResult<String> {
        self.enter(ops::GET_DEVICE_INFO)?;
        self.platforms
            .get(device.platform)
            .and_then(|p| p.devices.get(device.index))
            .cloned()
            .ok_or_else(|| ApiError::new(ops::GET_DEVICE_INFO, CL_INVALID_DEVICE).into())
    }

    fn create_context(&self, devices: &[SimDevice]) -> BenchResult<SimContext> {
        self.enter(ops::CREATE_CONTEXT)?;
        if devices.is_empty() {
            return Err(ApiError::new(ops::CREATE_CONTEXT, CL_INVALID_VALUE).into());
        }
        Ok(SimContext {
            devices: devices.to_vec(),
            releases: self.releases.clone(),
        })
    }

    fn create_queue(&self, context: &SimContext, device: &SimDevice) -> BenchResult<SimQueue> {
        self.enter(ops::CREATE_COMMAND_QUEUE)?;
        if !context.devices.contains(device) {
            return Err(ApiError::new(ops::CREATE_COMMAND_QUEUE, CL_INVALID_DEVICE).into());
        }
        Ok(SimQueue {
            device: *device,
            releases: self.releases.clone(),
        })
    }

    fn create_buffer(&self, _context: &SimContext, elements: usize) -> BenchResult<SimBuffer> {
        self.enter(ops::CREATE_BUFFER)?;
        if elements == 0 {
            return Err(ApiError::new(ops::CREATE_BUFFER, CL_INVALID_BUFFER_SIZE).into());
        }
        Ok(SimBuffer {
            data: vec![0.0; elements],
            resident: Cell::new(None),
            releases: self.releases.clone(),
        })
    }

    fn write_buffer(
        &self,
        _queue: &SimQueue,
        buffer: &mut SimBuffer,
        host: &[f64],
    ) -> BenchResult<()> {
        self.enter(ops::ENQUEUE_WRITE_BUFFER)?;
        if host.len() > buffer.data.len() {
            return Err(ApiError::new(ops::ENQUEUE_WRITE_BUFFER, CL_INVALID_VALUE).into());
        }
        buffer.data[..host.len()].copy_from_slice(host);
        Ok(())
    }

    fn read_buffer(
        &self,
        _queue: &SimQueue,
        buffer: &SimBuffer,
        host: &mut [f64],
    ) -> BenchResult<()> {
        self.enter(ops::ENQUEUE_READ_BUFFER)?;
        if host.len() > buffer.data.len() {
            return Err(ApiError::new(ops::ENQUEUE_READ_BUFFER, CL_INVALID_VALUE).into());
        }
        host.copy_from_slice(&buffer.data[..host.len()]);
        Ok(())
    }

    fn copy_buffer(
        &self,
        queue: &SimQueue,
        src: &SimBuffer,
        dst: &mut SimBuffer,
    ) -> BenchResult<SimEvent> {
        self.enter(ops::ENQUEUE_COPY_BUFFER)?;
        if src.data.len() != dst.data.len() {
            return Err(ApiError::new(ops::ENQUEUE_COPY_BUFFER, CL_INVALID_VALUE).into());
        }
        dst.data.copy_from_slice(&src.data);
        dst.resident.set(Some(queue.device.index));
        Ok(SimEvent {
            operation: ops::ENQUEUE_COPY_BUFFER,
        })
    }

    fn migrate_buffer(&self, queue: &SimQueue, buffer: &SimBuffer) -> BenchResult<SimEvent> {
        self.enter(ops::ENQUEUE_MIGRATE_MEM_OBJECTS)?;
        buffer.resident.set(Some(queue.device.index));
        Ok(SimEvent {
            operation: ops::ENQUEUE_MIGRATE_MEM_OBJECTS,
        })
    }

    fn wait(&self, event: SimEvent) -> BenchResult<()> {
        self.enter(ops::WAIT_FOR_EVENTS)?;
        log::trace!("event for {} complete", event.operation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::status::CL_OUT_OF_RESOURCES;

    fn two_device_runtime() -> SimRuntime {
        SimRuntime::new().with_platform("Sim Platform", 2)
    }

    #[test]
    fn test_enumeration() {
        let rt = two_device_runtime().with_platform("Other", 0);
        let platforms = rt.platforms().unwrap();
        assert_eq!(platforms.len(), 2);
        assert_eq!(rt.platform_name(&platforms[0]).unwrap(), "Sim Platform");
        assert_eq!(rt.devices(&platforms[0]).unwrap().len(), 2);
        assert!(rt.devices(&platforms[1]).unwrap().is_empty());
        assert_eq!(rt.call_count(ops::GET_DEVICE_IDS), 2);
    }

    #[test]
    fn test_copy_moves_data_between_buffers() {
        let rt = two_device_runtime();
        let platform = rt.platforms().unwrap()[0];
        let devices = rt.devices(&platform).unwrap();
        let ctx = rt.create_context(&devices).unwrap();
        let queue = rt.create_queue(&ctx, &devices[1]).unwrap();
        let mut src = rt.create_buffer(&ctx, 16).unwrap();
        let mut dst = rt.create_buffer(&ctx, 16).unwrap();

        let payload: Vec<f64> = (0..16).map(|i| i as f64 * 0.5).collect();
        rt.write_buffer(&queue, &mut src, &payload).unwrap();
        let event = rt.copy_buffer(&queue, &src, &mut dst).unwrap();
        rt.wait(event).unwrap();

        assert_eq!(dst.as_slice(), payload.as_slice());
        assert_eq!(dst.resident_device(), Some(1));
    }

    #[test]
    fn test_queue_requires_context_device() {
        let rt = two_device_runtime().with_platform("Second", 1);
        let platforms = rt.platforms().unwrap();
        let first = rt.devices(&platforms[0]).unwrap();
        let foreign = rt.devices(&platforms[1]).unwrap();
        let ctx = rt.create_context(&first).unwrap();

        match rt.create_queue(&ctx, &foreign[0]) {
            Err(BenchError::Api(api)) => assert_eq!(api.code, CL_INVALID_DEVICE),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fault_after_n_calls() {
        let rt = two_device_runtime().with_fault(SimFault {
            operation: ops::GET_PLATFORM_IDS,
            after: 1,
            status: CL_OUT_OF_RESOURCES,
        });
        assert!(rt.platforms().is_ok());
        match rt.platforms() {
            Err(BenchError::Api(api)) => {
                assert_eq!(api.operation, ops::GET_PLATFORM_IDS);
                assert_eq!(api.code, CL_OUT_OF_RESOURCES);
                assert!(api.file.ends_with("sim.rs"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(rt.call_count(ops::GET_PLATFORM_IDS), 2);
    }

    #[test]
    fn test_handles_record_release() {
        let rt = two_device_runtime();
        let log = rt.release_log();
        let platform = rt.platforms().unwrap()[0];
        let devices = rt.devices(&platform).unwrap();
        let ctx = rt.create_context(&devices).unwrap();
        let queue = rt.create_queue(&ctx, &devices[0]).unwrap();
        let buffer = rt.create_buffer(&ctx, 16).unwrap();
        assert!(log.entries().is_empty());

        drop(buffer);
        drop(queue);
        drop(ctx);
        assert_eq!(
            log.entries(),
            vec![
                ops::RELEASE_MEM_OBJECT,
                ops::RELEASE_COMMAND_QUEUE,
                ops::RELEASE_CONTEXT
            ]
        );
    }
}
