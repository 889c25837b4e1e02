//! 测量结果与报告输出
//!
//! 提供两种报告：
//! - [`TextReporter`]: 人类可读的逐行文本
//! - [`JsonReporter`]: 运行结束时输出一个 JSON 文档

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BenchResult;

/// 报告格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// 文本格式
    #[default]
    Text,
    /// JSON格式
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported report format: {other}")),
        }
    }
}

/// 传输类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// 主机 -> 设备
    Write,
    /// 设备 -> 主机
    Read,
    /// 设备 -> 设备复制
    Copy,
    /// 设备间内存迁移（往返）
    Migrate,
}

/// 传输端点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Host,
    Device(usize),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => write!(f, "H"),
            Self::Device(index) => write!(f, "{index}"),
        }
    }
}

/// 一次测量的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub kind: TransferKind,
    pub source: Endpoint,
    pub target: Endpoint,
    /// 重复次数
    pub repeat: u32,
    /// 单次传输的字节数
    pub bytes: u64,
    /// 报告的耗时（秒），迁移为往返耗时的一半
    #[serde(with = "non_finite")]
    pub seconds: f64,
    /// 吞吐量（GB/s）
    #[serde(with = "non_finite")]
    pub gigabytes_per_second: f64,
}

impl Measurement {
    /// 根据总耗时计算吞吐量
    ///
    /// `GB/s = bytes / 1e9 / elapsed * repeat`。迁移是往返操作：
    /// 报告耗时减半，吞吐量乘以 `2 * repeat`。耗时为零时吞吐量为无穷大。
    pub fn new(
        kind: TransferKind,
        source: Endpoint,
        target: Endpoint,
        repeat: u32,
        bytes: u64,
        elapsed: Duration,
    ) -> Self {
        let elapsed = elapsed.as_secs_f64();
        let gigabytes = bytes as f64 / 1e9;
        let (seconds, gigabytes_per_second) = match kind {
            TransferKind::Migrate => (elapsed / 2.0, gigabytes / elapsed * 2.0 * f64::from(repeat)),
            _ => (elapsed, gigabytes / elapsed * f64::from(repeat)),
        };
        Self {
            kind,
            source,
            target,
            repeat,
            bytes,
            seconds,
            gigabytes_per_second,
        }
    }

    /// 单次传输的数据量（GB）
    pub fn gigabytes(&self) -> f64 {
        self.bytes as f64 / 1e9
    }

    /// 测量标签，例如 `Hto0`、`1toH`、`0to1`、`1mg0`
    pub fn tag(&self) -> String {
        match self.kind {
            TransferKind::Migrate => format!("{}mg{}", self.source, self.target),
            _ => format!("{}to{}", self.source, self.target),
        }
    }

    /// 文本报告中的一行
    pub fn line(&self) -> String {
        format!(
            "  {}: {:3} times {:>9} GB in {:>9} seconds at {:>8} GB/s",
            self.tag(),
            self.repeat,
            sci(self.gigabytes(), 3),
            sci(self.seconds, 3),
            fixed(self.gigabytes_per_second, 2)
        )
    }
}

/// 非有限值的 C 风格写法，有限值返回 None
fn non_finite_text(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("nan")
    } else if value == f64::INFINITY {
        Some("inf")
    } else if value == f64::NEG_INFINITY {
        Some("-inf")
    } else {
        None
    }
}

/// 按 C `%.Nf` 的规则格式化定点数，非有限值写作 `nan`/`inf`/`-inf`
pub fn fixed(value: f64, precision: usize) -> String {
    match non_finite_text(value) {
        Some(text) => text.to_string(),
        None => format!("{value:.precision$}"),
    }
}

/// 按 C `%.Ne` 的规则格式化科学计数法：指数带符号且至少两位
pub fn sci(value: f64, precision: usize) -> String {
    if let Some(text) = non_finite_text(value) {
        return text.to_string();
    }
    let formatted = format!("{value:.precision$e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => formatted,
    }
}

/// 吞吐量和耗时的 JSON 表示
///
/// 有限值写成数字，非有限值写成字符串 `"nan"`、`"inf"` 或 `"-inf"`，
/// 保证报告可以原样读回。
mod non_finite {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        match super::non_finite_text(*value) {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_f64(*value),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "nan" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid number: {other:?}"))),
            },
        }
    }
}

/// 设置阶段的各个调用步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Platforms,
    Devices,
    Context,
    Queues,
    Buffers,
}

impl SetupStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::Platforms => "clGetPlatformIDs",
            Self::Devices => "clGetDeviceIDs",
            Self::Context => "clCreateContext",
            Self::Queues => "clCreateCommandQueue",
            Self::Buffers => "clCreateBuffer",
        }
    }
}

/// 发现与设置阶段的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupEvent<'a> {
    Begin,
    StepOk(SetupStep),
    Platform { index: usize, name: &'a str },
    PlatformSelected { index: usize },
    Device { index: usize, name: &'a str },
    End,
}

/// 报告输出
pub trait Reporter {
    /// 发现与设置阶段的进度
    fn setup(&mut self, event: SetupEvent<'_>) -> BenchResult<()>;

    /// 缓冲区大小
    fn buffer_size(&mut self, elements: usize) -> BenchResult<()>;

    /// 一组测量的标题
    fn section(&mut self, title: &str) -> BenchResult<()>;

    /// 分隔空行
    fn blank(&mut self) -> BenchResult<()>;

    /// 一条测量结果
    fn measurement(&mut self, measurement: &Measurement) -> BenchResult<()>;

    /// 运行结束
    fn finish(&mut self) -> BenchResult<()>;
}

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// 文本报告
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn setup(&mut self, event: SetupEvent<'_>) -> BenchResult<()> {
        match event {
            SetupEvent::Begin | SetupEvent::End => writeln!(self.out, "{RULE}")?,
            SetupEvent::StepOk(step) => writeln!(self.out, "  {:.<23} ok", step.label())?,
            SetupEvent::Platform { index, name } => {
                writeln!(self.out, "    Platform ({index}) {name}")?
            }
            SetupEvent::PlatformSelected { index } => {
                writeln!(self.out, "    Platform ({index}) selected")?
            }
            SetupEvent::Device { index, name } => {
                writeln!(self.out, "    Device ({index}) {name}")?
            }
        }
        Ok(())
    }

    fn buffer_size(&mut self, elements: usize) -> BenchResult<()> {
        writeln!(self.out, "buffer_size: {elements}")?;
        Ok(())
    }

    fn section(&mut self, title: &str) -> BenchResult<()> {
        writeln!(self.out, "{title}")?;
        Ok(())
    }

    fn blank(&mut self) -> BenchResult<()> {
        writeln!(self.out)?;
        Ok(())
    }

    fn measurement(&mut self, measurement: &Measurement) -> BenchResult<()> {
        writeln!(self.out, "{}", measurement.line())?;
        Ok(())
    }

    fn finish(&mut self) -> BenchResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// JSON 报告文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub started_at: Option<DateTime<Utc>>,
    pub buffer_size: usize,
    pub platforms: Vec<String>,
    pub selected_platform: Option<usize>,
    pub devices: Vec<String>,
    pub measurements: Vec<Measurement>,
}

/// JSON 报告：收集所有事件，在 [`Reporter::finish`] 时一次性输出
pub struct JsonReporter<W: Write> {
    out: W,
    report: JsonReport,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            report: JsonReport {
                started_at: Some(Utc::now()),
                ..JsonReport::default()
            },
        }
    }

    pub fn report(&self) -> &JsonReport {
        &self.report
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn setup(&mut self, event: SetupEvent<'_>) -> BenchResult<()> {
        match event {
            SetupEvent::Platform { name, .. } => self.report.platforms.push(name.to_string()),
            SetupEvent::PlatformSelected { index } => self.report.selected_platform = Some(index),
            SetupEvent::Device { name, .. } => self.report.devices.push(name.to_string()),
            SetupEvent::StepOk(step) => log::info!("{} ok", step.label()),
            SetupEvent::Begin | SetupEvent::End => {}
        }
        Ok(())
    }

    fn buffer_size(&mut self, elements: usize) -> BenchResult<()> {
        self.report.buffer_size = elements;
        Ok(())
    }

    fn section(&mut self, title: &str) -> BenchResult<()> {
        log::info!("{title}");
        Ok(())
    }

    fn blank(&mut self) -> BenchResult<()> {
        Ok(())
    }

    fn measurement(&mut self, measurement: &Measurement) -> BenchResult<()> {
        self.report.measurements.push(measurement.clone());
        Ok(())
    }

    fn finish(&mut self) -> BenchResult<()> {
        serde_json::to_writer_pretty(&mut self.out, &self.report).map_err(std::io::Error::from)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
