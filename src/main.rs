use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use tracing_subscriber::EnvFilter;

use king_images::api::{BiliClient, QrcodeLogin, QrcodeStatus};
use king_images::config::Config;
use king_images::core::{BatchUploader, ProgressCallback, UploadFile};
use king_images::store::Gallery;
use king_images::utils::{format_duration, format_speed};

#[derive(Parser)]
#[command(name = "king-images", about = "图床客户端：批量上传、图库管理、扫码登录")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 批量上传图片
    Upload {
        /// 要上传的文件
        files: Vec<PathBuf>,
        /// 并发数，默认取配置
        #[arg(short = 'n', long)]
        concurrency: Option<usize>,
    },
    /// 扫码登录，凭证写回配置文件
    Login,
    /// 导出图库数据为 JSON
    Export {
        /// 输出文件，默认带日期的文件名
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 从 JSON 导入图库数据
    Import { path: PathBuf },
    /// 列出图库内容
    List,
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("king-images error: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = if cli.config.exists() {
        Config::load(&cli.config).context("failed to load config")?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Upload { files, concurrency } => cmd_upload(&config, files, concurrency).await,
        Command::Login => cmd_login(config, &cli.config).await,
        Command::Export { output } => cmd_export(&config, output).await,
        Command::Import { path } => cmd_import(&config, path).await,
        Command::List => cmd_list(&config).await,
    }
}

fn build_client(config: &Config) -> BiliClient {
    let mut client = BiliClient::new(&config.api_base);
    if let Some(certificate) = config.certificate() {
        client = client.with_certificate(certificate);
    }
    client
}

async fn cmd_upload(
    config: &Config,
    paths: Vec<PathBuf>,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    if paths.is_empty() {
        anyhow::bail!("no files to upload");
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = UploadFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file);
    }

    let on_progress: ProgressCallback = Arc::new(|snapshot| {
        let mut stdout = std::io::stdout();
        let _ = execute!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine));
        let _ = write!(
            stdout,
            "[{}/{}] {:>5.1}%  {}  剩余 {}  {}",
            snapshot.current,
            snapshot.total,
            snapshot.percent,
            format_speed(snapshot.speed),
            format_duration(snapshot.remaining_time),
            snapshot.current_file_name,
        );
        let _ = stdout.flush();
    });

    let client = Arc::new(build_client(config));
    let uploader = BatchUploader::new(client)
        .with_concurrency(concurrency.unwrap_or(config.concurrency));
    let result = uploader.upload_batch(files, Some(on_progress)).await;
    println!();

    // 成功和失败分开报告，部分失败是常态不是异常
    println!("成功上传 {} 张图片", result.success_count);
    if result.failed_count > 0 {
        println!("{} 张图片上传失败:", result.failed_count);
        for failure in &result.failed {
            println!("  {}: {}", failure.file.name, failure.error_message);
        }
    }

    if !result.success.is_empty() {
        let mut gallery = Gallery::open(&config.gallery_path).await?;
        gallery.bulk_put(result.success.clone());
        gallery.save().await?;

        for record in &result.success {
            println!("  {} -> {}", record.name, record.url);
        }
    }

    Ok(())
}

async fn cmd_login(mut config: Config, config_path: &PathBuf) -> anyhow::Result<()> {
    let client = build_client(&config);
    let login = QrcodeLogin::begin(&client)
        .await
        .context("failed to request login qrcode")?;

    println!("请用手机 APP 扫描以下链接对应的二维码（3 分钟内有效）:");
    println!("{}", login.qrcode_url());

    let mut last_status = None;
    let certificate = loop {
        let status = login.poll().await?;
        match status {
            QrcodeStatus::Confirmed(certificate) => break Some(certificate),
            QrcodeStatus::Expired => break None,
            QrcodeStatus::Scanned => {
                if last_status != Some(QrcodeStatus::Scanned) {
                    println!("已扫描，请在手机上确认登录");
                }
            }
            QrcodeStatus::Waiting => {}
        }
        last_status = Some(status);
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    };

    match certificate {
        Some(certificate) => {
            config.set_certificate(&certificate);
            config.save(config_path).context("failed to save config")?;
            println!("登录成功，凭证已写入 {}", config_path.display());
        }
        None => anyhow::bail!("二维码已过期，请重新登录"),
    }

    Ok(())
}

async fn cmd_export(config: &Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    let gallery = Gallery::open(&config.gallery_path).await?;
    let output = output.unwrap_or_else(|| PathBuf::from(Gallery::default_export_name()));

    tokio::fs::write(&output, gallery.export_json()?).await?;
    println!("已导出 {} 条图片数据到 {}", gallery.len(), output.display());
    Ok(())
}

async fn cmd_import(config: &Config, path: PathBuf) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut gallery = Gallery::open(&config.gallery_path).await?;
    let count = gallery.import_json(&json).context("import rejected")?;
    gallery.save().await?;

    println!("成功导入 {count} 张图片数据");
    Ok(())
}

async fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let gallery = Gallery::open(&config.gallery_path).await?;
    if gallery.is_empty() {
        println!("图库为空");
        return Ok(());
    }

    for record in gallery.to_array() {
        println!(
            "{}  {}x{}  {}  {}",
            record.name, record.width, record.height, record.file_type, record.url
        );
    }
    Ok(())
}
