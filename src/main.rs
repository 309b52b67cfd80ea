use anyhow::Result;
use homework_grader::utils::logging;
use homework_grader::{App, Config, Mode};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::load()?;

    // 运行模式：extract（默认）/ analyze
    let mode = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Mode>()?,
        None => Mode::default(),
    };

    App::from_config(config).run(mode).await?;

    Ok(())
}
