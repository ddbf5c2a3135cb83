use robot_order::browser::{connect_to_browser_and_page, launch_headless_browser};
use robot_order::config::Config;
use robot_order::utils::logging;
use robot_order::App;

#[tokio::test]
#[ignore] // 默认忽略，需要本机 Chrome 和网络：cargo test -- --ignored
async fn test_full_run_against_live_site() {
    // 初始化日志
    logging::init(true);

    // 加载配置
    let config = Config::load().expect("加载配置失败");
    let archive_path = config.archive_path.clone();

    let report = App::initialize(config)
        .await
        .expect("初始化失败")
        .run()
        .await
        .expect("运行失败");

    assert_eq!(report.stats.submitted, report.stats.total);
    assert_eq!(report.archive.entries.len(), report.stats.receipts.len());
    assert!(archive_path.exists(), "应该生成压缩包");
}

#[tokio::test]
#[ignore]
async fn test_headless_browser_launch() {
    logging::init(false);

    let config = Config::from_env();

    let result = launch_headless_browser(config.chrome_executable.as_deref()).await;

    assert!(result.is_ok(), "应该能够成功启动浏览器");
}

#[tokio::test]
#[ignore] // 需要先以 --remote-debugging-port 启动 Chrome
async fn test_connect_returns_blank_page() {
    logging::init(false);

    let config = Config::from_env();

    let (_browser, page) = connect_to_browser_and_page(config.browser_debug_port)
        .await
        .expect("连接浏览器失败");

    let url = page.url().await.expect("读取页面地址失败");
    assert_eq!(url.as_deref(), Some("about:blank"));
}
