//! 一次完整运行：发现 -> 设置 -> 脚本 -> 拆除

use crate::config::BenchConfig;
use crate::error::BenchResult;
use crate::host::BufferSize;
use crate::report::Reporter;
use crate::runtime::ComputeRuntime;
use crate::script::run_script;
use crate::session::Session;
use crate::timing::Clock;

/// 执行一次完整的基准测试，返回交还的运行时
///
/// 第一个错误立即返回；设备资源随会话一起释放，报告不会被结束。
pub fn run_benchmark<R: ComputeRuntime>(
    runtime: R,
    config: &BenchConfig,
    buffer_size: BufferSize,
    clock: &dyn Clock,
    reporter: &mut dyn Reporter,
) -> BenchResult<R> {
    reporter.buffer_size(buffer_size.elements())?;

    let mut session = Session::open(runtime, &config.target_platform, buffer_size, reporter)?;
    let reported = run_script(&mut session, &config.script, clock, reporter)?;
    log::info!("benchmark complete: {} measurements", reported);

    let runtime = session.teardown();
    reporter.finish()?;
    Ok(runtime)
}
