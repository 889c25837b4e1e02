//! 计时操作
//!
//! 四种测量都遵循同一个形状：对每个适用的设备启动计时，
//! 连续发出 `repeat` 次阻塞操作，停止计时并计算吞吐量。
//! 一个例程中任何调用失败都会中止整个例程，已完成设备的结果也不返回。

use crate::error::BenchResult;
use crate::report::{Endpoint, Measurement, TransferKind};
use crate::runtime::ComputeRuntime;
use crate::session::Session;
use crate::timing::Clock;

/// 同时借用切片中两个不同的元素：`a` 只读，`b` 可变
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&T, &mut T) {
    assert_ne!(a, b, "pair_mut requires distinct indices");
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        (&lo[a], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(a);
        (&hi[0], &mut lo[b])
    }
}

impl<R: ComputeRuntime> Session<R> {
    fn transfer_bytes(&self) -> u64 {
        self.buffer_size.bytes() as u64
    }

    /// 主机 -> 设备：每个设备各写入 `repeat` 次
    pub fn profile_write(
        &mut self,
        repeat: u32,
        clock: &dyn Clock,
    ) -> BenchResult<Vec<Measurement>> {
        let bytes = self.transfer_bytes();
        let mut results = Vec::with_capacity(self.device_count());

        for device in 0..self.device_count() {
            let start = clock.now();
            for _ in 0..repeat {
                self.runtime.write_buffer(
                    &self.queues[device],
                    &mut self.buffers[device],
                    self.host.as_slice(),
                )?;
            }
            let elapsed = clock.since(start);
            results.push(Measurement::new(
                TransferKind::Write,
                Endpoint::Host,
                Endpoint::Device(device),
                repeat,
                bytes,
                elapsed,
            ));
        }

        Ok(results)
    }

    /// 设备 -> 主机：每个设备各读取 `repeat` 次，读入共享主机缓冲区
    pub fn profile_read(
        &mut self,
        repeat: u32,
        clock: &dyn Clock,
    ) -> BenchResult<Vec<Measurement>> {
        let bytes = self.transfer_bytes();
        let mut results = Vec::with_capacity(self.device_count());

        for device in 0..self.device_count() {
            let start = clock.now();
            for _ in 0..repeat {
                self.runtime.read_buffer(
                    &self.queues[device],
                    &self.buffers[device],
                    self.host.as_mut_slice(),
                )?;
            }
            let elapsed = clock.since(start);
            results.push(Measurement::new(
                TransferKind::Read,
                Endpoint::Device(device),
                Endpoint::Host,
                repeat,
                bytes,
                elapsed,
            ));
        }

        Ok(results)
    }

    /// 设备间复制：对每个 `i != src`，在 `queue[i]` 上把 `buffer[src]` 复制到
    /// `buffer[i]`，每次复制都等待其事件完成后再发出下一次
    pub fn profile_copy(
        &mut self,
        repeat: u32,
        src: usize,
        clock: &dyn Clock,
    ) -> BenchResult<Vec<Measurement>> {
        self.check_device(src)?;
        let bytes = self.transfer_bytes();
        let mut results = Vec::with_capacity(self.device_count().saturating_sub(1));

        for device in (0..self.device_count()).filter(|&i| i != src) {
            let start = clock.now();
            for _ in 0..repeat {
                let (source, target) = pair_mut(&mut self.buffers, src, device);
                let event = self.runtime.copy_buffer(&self.queues[device], source, target)?;
                self.runtime.wait(event)?;
            }
            let elapsed = clock.since(start);
            results.push(Measurement::new(
                TransferKind::Copy,
                Endpoint::Device(src),
                Endpoint::Device(device),
                repeat,
                bytes,
                elapsed,
            ));
        }

        Ok(results)
    }

    /// 内存迁移往返：对每个 `i != dst`，把 `buffer[i]` 迁移到 `queue[dst]` 并等待，
    /// 再把 `buffer[dst]` 迁移回 `queue[i]` 并等待，重复 `repeat` 次
    ///
    /// 每次迁移和每次等待的状态都单独检查。
    pub fn profile_migrate(
        &mut self,
        repeat: u32,
        dst: usize,
        clock: &dyn Clock,
    ) -> BenchResult<Vec<Measurement>> {
        self.check_device(dst)?;
        let bytes = self.transfer_bytes();
        let mut results = Vec::with_capacity(self.device_count().saturating_sub(1));

        for device in (0..self.device_count()).filter(|&i| i != dst) {
            let start = clock.now();
            for _ in 0..repeat {
                let event = self
                    .runtime
                    .migrate_buffer(&self.queues[dst], &self.buffers[device])?;
                self.runtime.wait(event)?;

                // 再迁回去，下一轮才能重复同样的迁移
                let event = self
                    .runtime
                    .migrate_buffer(&self.queues[device], &self.buffers[dst])?;
                self.runtime.wait(event)?;
            }
            let elapsed = clock.since(start);
            results.push(Measurement::new(
                TransferKind::Migrate,
                Endpoint::Device(device),
                Endpoint::Device(dst),
                repeat,
                bytes,
                elapsed,
            ));
        }

        Ok(results)
    }
}
