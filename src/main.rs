use anyhow::Result;
use robot_order::utils::logging;
use robot_order::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（配置文件 + 环境变量）
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let _report = App::initialize(config).await?.run().await?;

    Ok(())
}
