//! hxv-cli - HX 网络摄像机录像转换工具
//!
//! 把摄像机 SD 卡上的 `.265` 录像重封装为普通播放器可以打开的 Matroska 文件,
//! 并提供块索引、恢复扫描与文件信息查看.

mod discover;
mod logging;
mod report;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use rayon::prelude::*;

use hxv::{Progress, RewrapOptions, RewrapSummary};
use hxv_core::HxError;
use hxv_format::IoContext;
use hxv_format::demuxers::hx::recovery::{self, DEFAULT_CHUNK_SIZE};

#[derive(Parser, Debug)]
#[command(name = "hxv-cli", version, about = "HX 网络摄像机录像转换工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON 配置文件 (重封装选项)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 重封装为标准容器
    Convert(ConvertArgs),
    /// 输出块索引 (CSV)
    Index {
        /// 输入文件
        file: PathBuf,
        /// CSV 输出文件 (默认写到标准输出)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// 启用恢复扫描
        #[arg(long)]
        recover: bool,
    },
    /// 恢复扫描, 列出找到的标签与候选块
    Scan {
        /// 输入文件
        file: PathBuf,
        /// 分块大小 (字节)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// 显示文件信息
    Info {
        /// 输入文件
        file: PathBuf,
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// 输入文件
    #[arg(short, long, conflicts_with = "indir", required_unless_present = "indir")]
    input: Option<PathBuf>,

    /// 输出文件 (默认与输入同名, 替换扩展名)
    #[arg(short, long, conflicts_with_all = ["indir", "outdir"])]
    output: Option<PathBuf>,

    /// 输入目录
    #[arg(long)]
    indir: Option<PathBuf>,

    /// 输出目录 (默认与输入文件同目录)
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// 递归处理子目录
    #[arg(short, long)]
    recursive: bool,

    /// 输出格式 (mkv)
    #[arg(short, long)]
    format: Option<String>,

    /// 覆盖已存在的输出文件
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// 文件头损坏或扫描提前结束时启用恢复扫描
    #[arg(long)]
    recover: bool,

    /// 并行转换的文件数 (默认为 CPU 核数)
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("hxv-cli", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if let Err(e) = run(cli) {
        error!("{e:#}");
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let base = match &cli.config {
        Some(path) => RewrapOptions::from_json_file(path)
            .with_context(|| format!("无法加载配置 {}", path.display()))?,
        None => RewrapOptions::default(),
    };

    match cli.command {
        Command::Convert(args) => convert(args, base),
        Command::Index { file, csv, recover } => {
            let chunk_size = recover.then_some(base.recovery_chunk_size);
            index(&file, csv.as_deref(), chunk_size)
        }
        Command::Scan { file, chunk_size } => scan(&file, chunk_size),
        Command::Info { file, json } => show_info(&file, json),
    }
}

fn convert(args: ConvertArgs, base: RewrapOptions) -> Result<()> {
    let options = RewrapOptions {
        format: args.format.clone().unwrap_or(base.format),
        overwrite: args.overwrite || base.overwrite,
        recover: args.recover || base.recover,
        recovery_chunk_size: base.recovery_chunk_size,
    };

    if let Some(input) = &args.input {
        let summary =
            hxv::rewrap_file(input, args.output.as_deref(), &options, progress_printer())?;
        eprintln!();
        print_summary(input, &summary);
        return Ok(());
    }

    let Some(indir) = &args.indir else {
        bail!("必须指定 -i <输入文件> 或 --indir <输入目录>");
    };
    let inputs = discover::discover_inputs(indir, args.recursive)?;
    if inputs.is_empty() {
        warn!("{} 中没有找到 HX 录像文件", indir.display());
        return Ok(());
    }
    info!("找到 {} 个 HX 录像文件", inputs.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .thread_name(|idx| format!("convert-{idx}"))
        .build()
        .context("创建线程池失败")?;

    let results: Vec<(PathBuf, Result<RewrapSummary, HxError>)> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| {
                let outdir = args.outdir.as_deref();
                let output = discover::output_path_for(input, indir, outdir, &options.format);
                let result = create_parent(&output)
                    .and_then(|()| hxv::rewrap_file(input, Some(output.as_path()), &options, |_| {}));
                (input.clone(), result)
            })
            .collect()
    });

    let mut failed = 0usize;
    for (input, result) in &results {
        match result {
            Ok(summary) => print_summary(input, summary),
            Err(HxError::NoBlocks(_)) => warn!("{}: 没有任何数据块, 已跳过", input.display()),
            Err(HxError::OutputExists(path)) => {
                warn!("{}: 输出文件 {path} 已存在, 使用 -y 覆盖", input.display())
            }
            Err(e) => {
                error!("{}: {e}", input.display());
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed}/{} 个文件转换失败", results.len());
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), HxError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// 单文件模式的进度显示, 百分比变化时刷新
fn progress_printer() -> impl FnMut(Progress) {
    let mut last_percent = None;
    move |p: Progress| {
        let percent = p.blocks_done * 100 / p.blocks_total.max(1);
        if last_percent != Some(percent) {
            last_percent = Some(percent);
            eprint!("\r进度: {percent:3}% ({}/{})", p.blocks_done, p.blocks_total);
        }
    }
}

fn print_summary(input: &Path, summary: &RewrapSummary) {
    println!(
        "{} → {}: {} 个视频包, {} 个音频包, 时长 {:.3}s{}",
        input.display(),
        summary.output.display(),
        summary.video_packets,
        summary.audio_packets,
        summary.duration_ms.unwrap_or(0) as f64 / 1000.0,
        if summary.recovered { " (恢复扫描)" } else { "" },
    );
}

fn index(file: &Path, csv: Option<&Path>, recovery_chunk_size: Option<usize>) -> Result<()> {
    let blocks = hxv::index_file(file, recovery_chunk_size)
        .with_context(|| format!("无法索引 {}", file.display()))?;
    match csv {
        Some(path) => {
            let out = std::fs::File::create(path)
                .with_context(|| format!("无法创建 {}", path.display()))?;
            report::write_block_csv(out, &blocks)?;
            info!("写入 {} 行到 {}", blocks.len(), path.display());
        }
        None => report::write_block_csv(std::io::stdout().lock(), &blocks)?,
    }
    Ok(())
}

fn scan(file: &Path, chunk_size: usize) -> Result<()> {
    let mut io = IoContext::open_read(file)?;
    let hits = recovery::find_tags(&mut io, chunk_size)?;
    let candidates = recovery::validate_candidates(&mut io, &hits)?;

    println!("{:>12}  {:4}  {:>10}  {:>12}  {}", "offset", "tag", "length", "end", "valid");
    for c in &candidates {
        println!(
            "{:>12}  {:4}  {:>10}  {:>12}  {}",
            c.hit.offset,
            String::from_utf8_lossy(&c.hit.tag),
            c.length.map_or_else(|| "-".to_string(), |l| l.to_string()),
            c.end.map_or_else(|| "-".to_string(), |e| e.to_string()),
            if c.valid { "yes" } else { "no" },
        );
    }
    let valid = candidates.iter().filter(|c| c.valid).count();
    println!("共 {} 个标签, {} 个有效", candidates.len(), valid);
    Ok(())
}

fn show_info(file: &Path, json: bool) -> Result<()> {
    let info = hxv::file_info(file)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("文件: {}", file.display());
    println!("类型: {}", info.kind);
    println!("尺寸: {}x{}", info.width, info.height);
    println!("大小: {} 字节", info.size);
    match info.duration {
        Some(d) => println!("时长: {d:.3}s"),
        None => println!("时长: 未知"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("hxv-cli").chain(args.iter().copied()))
    }

    #[test]
    fn test_单文件与目录参数互斥() {
        assert!(parse(&["convert", "--indir", "rec", "-o", "out.mkv"]).is_err());
        assert!(parse(&["convert", "-i", "a.265", "--indir", "rec"]).is_err());
        assert!(parse(&["convert", "-i", "a.265", "--outdir", "out"]).is_ok());

        let cli = parse(&["convert", "-i", "a.265", "-o", "a.mkv"]).unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("应解析为 convert");
        };
        assert_eq!(args.output, Some(PathBuf::from("a.mkv")));
        assert!(args.indir.is_none());

        let cli = parse(&["convert", "--indir", "rec", "--outdir", "out"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Convert(ConvertArgs { indir: Some(_), .. })
        ));
    }
}
