//! 多设备传输带宽基准测试命令行入口

mod args;

use std::process::ExitCode;

use clbw_core::{
    BenchConfig, BenchError, BufferSize, ComputeRuntime, JsonReporter, MonotonicClock,
    ReportFormat, Reporter, SimRuntime, TextReporter, run_benchmark,
};
use log::{debug, info};

use crate::args::{Backend, CliArgs, Invocation};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "warn")).init();

    let argv: Vec<String> = std::env::args().collect();
    let program = argv.first().cloned().unwrap_or_else(|| "clbw".to_string());

    match args::parse_args(&program, &argv) {
        Ok(Invocation::Info(info)) => {
            // 帮助和版本信息
            match args::print_info(&info, &mut std::io::stdout().lock()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => fail(&anyhow::Error::from(err).context("failed to print help")),
            }
        }
        Ok(Invocation::Run(cli)) => match run(&cli) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => fail(&err),
        },
        Err(err) => fail(&err.into()),
    }
}

/// 打印诊断信息并返回失败退出码
///
/// 用法错误写到 stdout，其余写到 stderr。
fn fail(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<BenchError>() {
        Some(bench) if bench.is_usage() => print!("{}", bench.diagnostic()),
        Some(bench) => eprint!("{}", bench.diagnostic()),
        None => eprint!("\nEpic fail:\n{err:#}\n"),
    }
    ExitCode::FAILURE
}

fn run(cli: &CliArgs) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;
    debug!("configuration: {:?}", config);

    let mut reporter: Box<dyn Reporter> = match config.format {
        ReportFormat::Text => Box::new(TextReporter::new(std::io::stdout().lock())),
        ReportFormat::Json => Box::new(JsonReporter::new(std::io::stdout().lock())),
    };

    match cli.backend {
        Backend::Sim => {
            info!(
                "using simulated runtime with {} devices on \"{}\"",
                cli.sim_devices, config.target_platform
            );
            let runtime =
                SimRuntime::new().with_platform(config.target_platform.clone(), cli.sim_devices);
            execute(runtime, &config, cli.buffer_size, reporter.as_mut())
        }
        Backend::OpenCl => execute_opencl(&config, cli.buffer_size, reporter.as_mut()),
    }
}

#[cfg(feature = "opencl")]
fn execute_opencl(
    config: &BenchConfig,
    buffer_size: BufferSize,
    reporter: &mut dyn Reporter,
) -> anyhow::Result<()> {
    execute(clbw_core::OpenClRuntime::new(), config, buffer_size, reporter)
}

#[cfg(not(feature = "opencl"))]
fn execute_opencl(
    _config: &BenchConfig,
    _buffer_size: BufferSize,
    _reporter: &mut dyn Reporter,
) -> anyhow::Result<()> {
    anyhow::bail!(
        "OpenCL support was not compiled in; \
         rebuild with the `opencl` feature or use `--backend sim`"
    )
}

fn execute<R: ComputeRuntime>(
    runtime: R,
    config: &BenchConfig,
    buffer_size: BufferSize,
    reporter: &mut dyn Reporter,
) -> anyhow::Result<()> {
    let clock = MonotonicClock::new();
    run_benchmark(runtime, config, buffer_size, &clock, reporter)?;
    Ok(())
}
