use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use result_scrape::config::Config;
use result_scrape::utils::logging;
use result_scrape::{App, ScrapeRequest};
use tracing::error;

const USAGE: &str = "用法: result_scrape <USN前缀> <范围> <查询页URL> [学期]\n示例: result_scrape 1AB21CS 1-20,45 https://results.example.edu/index.php 5";

#[tokio::main]
async fn main() -> ExitCode {
    // 加载配置
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<Config> {
    match std::env::var("RESULT_SCRAPE_CONFIG") {
        Ok(path) => Config::from_toml_file(Path::new(&path)).context("加载配置文件失败"),
        Err(_) => Ok(Config::from_env()),
    }
}

fn parse_request() -> Result<ScrapeRequest> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !(3..=4).contains(&args.len()) {
        bail!("参数数量错误\n{}", USAGE);
    }

    let mut request = ScrapeRequest::new(&args[0], args[1].as_str(), args[2].as_str());
    if let Some(semester) = args.get(3) {
        let semester: u8 = semester
            .parse()
            .with_context(|| format!("学期必须是数字: '{}'", semester))?;
        request = request.with_semester(semester);
    }
    Ok(request)
}

async fn run(config: Config) -> Result<()> {
    let request = parse_request()?;

    // 初始化并运行应用
    let app = App::initialize(config)?;
    let summary = app.run(&request).await?;

    match summary.exported {
        Some(path) => println!("✅ 成功查询 {} 个 USN, 结果已导出: {}", summary.report.retrieved, path.display()),
        None => println!("⚠️ 没有数据: 所有 USN 都不存在或查询失败"),
    }

    Ok(())
}
