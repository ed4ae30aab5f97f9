use anyhow::{ensure, Context};
use clap::Parser;
use flat_sql::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 日志写到 stderr，stdout 只输出查询结果
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    ensure!(cli.folder.is_dir(), "数据目录不存在: {}", cli.folder.display());

    let succeeded = cli
        .run()
        .with_context(|| format!("在 {} 上运行失败", cli.folder.display()))?;
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
