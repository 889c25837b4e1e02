//! 基准测试会话
//!
//! 会话持有一次运行的全部状态：选中的平台、设备、上下文、每设备的命令队列和
//! 缓冲区，以及主机缓冲区。生命周期是线性的：
//!
//! 1. [`discover`]：枚举平台，按名称精确匹配选择第一个，枚举其设备
//! 2. [`Session::open`]：创建上下文、队列、缓冲区，并用主机数据初始化每个设备缓冲区
//! 3. 计时操作（见 `profile` 模块）
//! 4. [`Session::teardown`]：按缓冲区、队列、上下文的顺序释放设备资源

use crate::error::{BenchError, BenchResult};
use crate::host::{BufferSize, HostBuffer};
use crate::report::{Reporter, SetupEvent, SetupStep};
use crate::runtime::ComputeRuntime;

/// 至少需要的设备数
pub const MIN_DEVICES: usize = 2;

/// 发现阶段的结果
pub struct Discovery<R: ComputeRuntime> {
    pub platform_index: usize,
    pub platform_name: String,
    pub devices: Vec<R::Device>,
    pub device_names: Vec<String>,
}

/// 枚举平台并选择名称与 `target` 完全一致的第一个平台，再枚举其设备
///
/// 所有平台都会被报告。找不到平台或设备少于 [`MIN_DEVICES`] 时返回错误，
/// 此时尚未创建任何上下文或缓冲区。
pub fn discover<R: ComputeRuntime>(
    runtime: &R,
    target: &str,
    reporter: &mut dyn Reporter,
) -> BenchResult<Discovery<R>> {
    let platforms = runtime.platforms()?;
    reporter.setup(SetupEvent::StepOk(SetupStep::Platforms))?;

    let mut selected: Option<(usize, String)> = None;
    for (index, platform) in platforms.iter().enumerate() {
        let name = runtime.platform_name(platform)?;
        reporter.setup(SetupEvent::Platform {
            index,
            name: &name,
        })?;
        if selected.is_none() && name == target {
            selected = Some((index, name));
        }
    }

    let (platform_index, platform_name) = selected.ok_or_else(|| BenchError::PlatformNotFound {
        target: target.to_string(),
    })?;
    reporter.setup(SetupEvent::PlatformSelected {
        index: platform_index,
    })?;
    log::info!("selected platform {} ({})", platform_index, platform_name);

    let devices = runtime.devices(&platforms[platform_index])?;
    if devices.len() < MIN_DEVICES {
        return Err(BenchError::NotEnoughDevices {
            found: devices.len(),
        });
    }
    reporter.setup(SetupEvent::StepOk(SetupStep::Devices))?;

    let mut device_names = Vec::with_capacity(devices.len());
    for (index, device) in devices.iter().enumerate() {
        let name = runtime.device_name(device)?;
        reporter.setup(SetupEvent::Device {
            index,
            name: &name,
        })?;
        device_names.push(name);
    }

    Ok(Discovery {
        platform_index,
        platform_name,
        devices,
        device_names,
    })
}

/// 基准测试会话
///
/// 字段声明顺序即释放顺序：缓冲区、队列、上下文，最后是运行时本身。
pub struct Session<R: ComputeRuntime> {
    pub(crate) buffers: Vec<R::Buffer>,
    pub(crate) queues: Vec<R::Queue>,
    context: R::Context,
    devices: Vec<R::Device>,
    device_names: Vec<String>,
    platform_index: usize,
    platform_name: String,
    pub(crate) host: HostBuffer,
    pub(crate) buffer_size: BufferSize,
    pub(crate) runtime: R,
}

impl<R: ComputeRuntime> Session<R> {
    /// 发现平台和设备，创建所有资源，主机缓冲区使用随机数据
    pub fn open(
        runtime: R,
        target_platform: &str,
        buffer_size: BufferSize,
        reporter: &mut dyn Reporter,
    ) -> BenchResult<Self> {
        Self::open_with_host(runtime, target_platform, HostBuffer::random(buffer_size), reporter)
    }

    /// 与 [`Session::open`] 相同，但使用给定的主机数据
    pub fn open_with_host(
        runtime: R,
        target_platform: &str,
        host: HostBuffer,
        reporter: &mut dyn Reporter,
    ) -> BenchResult<Self> {
        let buffer_size = BufferSize::new(host.len() as u64)?;

        reporter.setup(SetupEvent::Begin)?;
        let discovery = discover(&runtime, target_platform, reporter)?;

        let context = runtime.create_context(&discovery.devices)?;
        reporter.setup(SetupEvent::StepOk(SetupStep::Context))?;

        let queues = discovery
            .devices
            .iter()
            .map(|device| runtime.create_queue(&context, device))
            .collect::<BenchResult<Vec<_>>>()?;
        reporter.setup(SetupEvent::StepOk(SetupStep::Queues))?;

        let mut buffers = discovery
            .devices
            .iter()
            .map(|_| runtime.create_buffer(&context, buffer_size.elements()))
            .collect::<BenchResult<Vec<_>>>()?;

        // 所有设备缓冲区用同一份主机数据初始化
        for (queue, buffer) in queues.iter().zip(buffers.iter_mut()) {
            runtime.write_buffer(queue, buffer, host.as_slice())?;
        }
        reporter.setup(SetupEvent::StepOk(SetupStep::Buffers))?;
        reporter.setup(SetupEvent::End)?;

        log::info!(
            "session ready: {} devices, {} elements ({} bytes) per buffer",
            discovery.devices.len(),
            buffer_size.elements(),
            buffer_size.bytes()
        );

        Ok(Self {
            buffers,
            queues,
            context,
            devices: discovery.devices,
            device_names: discovery.device_names,
            platform_index: discovery.platform_index,
            platform_name: discovery.platform_name,
            host,
            buffer_size,
            runtime,
        })
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn context(&self) -> &R::Context {
        &self.context
    }

    pub fn devices(&self) -> &[R::Device] {
        &self.devices
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device_names(&self) -> &[String] {
        &self.device_names
    }

    pub fn platform_index(&self) -> usize {
        self.platform_index
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn buffer_size(&self) -> BufferSize {
        self.buffer_size
    }

    pub fn host(&self) -> &HostBuffer {
        &self.host
    }

    /// 设备缓冲区
    pub fn buffer(&self, device: usize) -> BenchResult<&R::Buffer> {
        self.check_device(device)?;
        Ok(&self.buffers[device])
    }

    /// 把设备缓冲区读到新的主机数组（不经过共享主机缓冲区）
    pub fn read_device(&self, device: usize) -> BenchResult<Vec<f64>> {
        self.check_device(device)?;
        let mut data = vec![0.0; self.buffer_size.elements()];
        self.runtime
            .read_buffer(&self.queues[device], &self.buffers[device], &mut data)?;
        Ok(data)
    }

    /// 从头覆盖一个设备缓冲区，数据长度不能超过缓冲区元素数
    pub fn write_device(&mut self, device: usize, data: &[f64]) -> BenchResult<()> {
        self.check_device(device)?;
        self.runtime
            .write_buffer(&self.queues[device], &mut self.buffers[device], data)
    }

    pub(crate) fn check_device(&self, index: usize) -> BenchResult<()> {
        if index < self.devices.len() {
            Ok(())
        } else {
            Err(BenchError::InvalidDeviceIndex {
                index,
                count: self.devices.len(),
            })
        }
    }

    /// 释放所有设备资源并交还运行时
    pub fn teardown(self) -> R {
        let Session {
            buffers,
            queues,
            context,
            runtime,
            ..
        } = self;
        let device_count = queues.len();
        drop(buffers);
        drop(queues);
        drop(context);
        log::debug!("released {} buffers, {} queues and the context", device_count, device_count);
        runtime
    }
}
