//! 命令行参数解析

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, Command, value_parser};
use clbw_core::{BenchConfig, BenchError, BenchResult, BufferSize, ReportFormat};

/// 模拟后端的默认设备数
pub const DEFAULT_SIM_DEVICES: usize = 2;

const DEFAULT_BACKEND: &str = if cfg!(feature = "opencl") {
    "opencl"
} else {
    "sim"
};

/// 计算运行时后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    OpenCl,
    Sim,
}

/// 解析后的运行参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub buffer_size: BufferSize,
    pub platform: Option<String>,
    pub config: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    pub backend: Backend,
    pub sim_devices: usize,
}

/// 一次调用的结果：运行，或者只打印帮助/版本信息
#[derive(Debug)]
pub enum Invocation {
    Run(CliArgs),
    Info(clap::Error),
}

pub fn build_command() -> Command {
    Command::new("clbw")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Measure host/device and device/device transfer bandwidth across OpenCL devices")
        .arg(
            Arg::new("buffer_size")
                .value_name("BUFFER_SIZE")
                .help("Number of doubles per buffer (must be greater than 8)")
                .required(true),
        )
        .arg(
            Arg::new("platform")
                .short('p')
                .long("platform")
                .value_name("NAME")
                .help("Target platform name, matched exactly")
                .required(false),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .value_parser(value_parser!(PathBuf))
                .required(false),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Report format (text, json)")
                .value_parser(["text", "json"])
                .required(false),
        )
        .arg(
            Arg::new("backend")
                .short('b')
                .long("backend")
                .value_name("BACKEND")
                .help("Compute runtime (opencl, sim)")
                .value_parser(["opencl", "sim"])
                .default_value(DEFAULT_BACKEND),
        )
        .arg(
            Arg::new("sim-devices")
                .long("sim-devices")
                .value_name("NUM")
                .help("Number of devices on the simulated platform")
                .value_parser(value_parser!(usize))
                .default_value("2"),
        )
}

/// 解析命令行，`args` 的第一个元素是程序名
///
/// 参数缺失、多余或无法解析时返回 [`BenchError::Usage`]，
/// 缓冲区大小不大于 8 时返回 [`BenchError::BufferTooSmall`]，
/// 字节数超出地址空间时返回 [`BenchError::BufferTooLarge`]。
pub fn parse_args<I, T>(program: &str, args: I) -> BenchResult<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let usage = || BenchError::Usage {
        program: program.to_string(),
    };

    let matches = match build_command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return Ok(Invocation::Info(err));
        }
        Err(err) => {
            log::debug!("argument error: {}", err);
            return Err(usage());
        }
    };

    let raw = matches
        .get_one::<String>("buffer_size")
        .ok_or_else(usage)?;
    let requested: u64 = raw.trim().parse().map_err(|_| usage())?;
    let buffer_size = BufferSize::new(requested)?;

    Ok(Invocation::Run(CliArgs {
        buffer_size,
        platform: matches.get_one::<String>("platform").cloned(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        format: parse_format(&matches),
        backend: match matches.get_one::<String>("backend").map(String::as_str) {
            Some("sim") => Backend::Sim,
            _ => Backend::OpenCl,
        },
        sim_devices: matches
            .get_one::<usize>("sim-devices")
            .copied()
            .unwrap_or(DEFAULT_SIM_DEVICES),
    }))
}

/// 输出帮助或版本信息
pub fn print_info(info: &clap::Error, out: &mut impl Write) -> std::io::Result<()> {
    write!(out, "{}", info.render())?;
    out.flush()
}

fn parse_format(matches: &ArgMatches) -> Option<ReportFormat> {
    matches
        .get_one::<String>("format")
        .and_then(|s| s.parse().ok())
}

impl CliArgs {
    /// 加载配置文件（如果有），再用命令行参数覆盖
    pub fn resolve_config(&self) -> BenchResult<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::from_file(path)?,
            None => BenchConfig::default(),
        };

        if let Some(platform) = &self.platform {
            config.target_platform = platform.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        Ok(config)
    }
}
