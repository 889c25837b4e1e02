//! 基准测试脚本
//!
//! 一次运行执行的测量序列以数据表示，默认脚本见 [`default_script`]，
//! 也可以通过配置文件替换。

use serde::{Deserialize, Serialize};

use crate::error::BenchResult;
use crate::report::Reporter;
use crate::runtime::ComputeRuntime;
use crate::session::Session;
use crate::timing::Clock;

/// 脚本步骤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    /// 输出一行标题
    Section { title: String },
    /// 输出一个空行
    Blank,
    /// 主机 -> 每个设备
    Write { repeat: u32 },
    /// 每个设备 -> 主机
    Read { repeat: u32 },
    /// `src` -> 其他每个设备
    Copy { repeat: u32, src: usize },
    /// 其他每个设备与 `dst` 之间的迁移往返
    Migrate { repeat: u32, dst: usize },
}

impl ScriptStep {
    fn section(title: &str) -> Self {
        Self::Section {
            title: title.to_string(),
        }
    }
}

/// 默认脚本：读写、复制预热、更新后复制、乒乓复制、迁移
pub fn default_script() -> Vec<ScriptStep> {
    use ScriptStep::{Blank, Copy, Migrate, Read, Write};

    let mut steps = vec![
        ScriptStep::section("Profiling read and write operations with 100 repetitions"),
        Write { repeat: 100 },
        Read { repeat: 100 },
        Blank,
        ScriptStep::section("Profiling copy from 0 to 1; first warm-up, then 100 repetitions"),
        Copy { repeat: 1, src: 0 },
        Copy { repeat: 100, src: 0 },
        Copy { repeat: 1, src: 0 },
        Blank,
        ScriptStep::section(
            "Profiling copy from 0 to 1; first update buffers, then 100 repetitions",
        ),
        Write { repeat: 1 },
        Copy { repeat: 100, src: 0 },
        Blank,
        ScriptStep::section("Profiling ping-pong copy between 0 and 1, 3 times"),
    ];
    for _ in 0..3 {
        steps.push(Copy { repeat: 1, src: 1 });
        steps.push(Copy { repeat: 1, src: 0 });
    }
    steps.extend([
        Blank,
        ScriptStep::section(
            "Profiling migrate operation to 0, first warm-up, then increase repetitions",
        ),
        Migrate { repeat: 1, dst: 0 },
        Migrate { repeat: 1, dst: 0 },
        Migrate { repeat: 10, dst: 0 },
        Migrate { repeat: 100, dst: 0 },
    ]);
    steps
}

/// 依次执行脚本步骤，返回报告的测量条数
///
/// 任何步骤失败都立即返回，之后的步骤不再执行。
pub fn run_script<R: ComputeRuntime>(
    session: &mut Session<R>,
    steps: &[ScriptStep],
    clock: &dyn Clock,
    reporter: &mut dyn Reporter,
) -> BenchResult<usize> {
    let mut reported = 0;

    for step in steps {
        log::debug!("script step: {:?}", step);
        let measurements = match step {
            ScriptStep::Section { title } => {
                reporter.section(title)?;
                continue;
            }
            ScriptStep::Blank => {
                reporter.blank()?;
                continue;
            }
            ScriptStep::Write { repeat } => session.profile_write(*repeat, clock)?,
            ScriptStep::Read { repeat } => session.profile_read(*repeat, clock)?,
            ScriptStep::Copy { repeat, src } => session.profile_copy(*repeat, *src, clock)?,
            ScriptStep::Migrate { repeat, dst } => session.profile_migrate(*repeat, *dst, clock)?,
        };

        for measurement in &measurements {
            reporter.measurement(measurement)?;
        }
        reported += measurements.len();
    }

    Ok(reported)
}
