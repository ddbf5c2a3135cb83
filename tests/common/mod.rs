//! 集成测试共用的假页面驱动、假渲染器和本地 HTTP 服务

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};
use robot_order::error::{AppError, AppResult};
use robot_order::infrastructure::{PageDriver, Selector};
use robot_order::services::HtmlRenderer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// 记录所有操作的假页面
///
/// `read_html` 前 `receipt_failures` 次返回 `SelectorNotFound`，模拟回执没出现
pub struct FakeDriver {
    modal: bool,
    receipt_failures: AtomicU32,
    actions: Mutex<Vec<String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::failing_receipts(0)
    }

    pub fn failing_receipts(times: u32) -> Self {
        Self {
            modal: true,
            receipt_failures: AtomicU32::new(times),
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn without_modal(mut self) -> Self {
        self.modal = false;
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.actions().iter().filter(|a| a.starts_with(prefix)).count()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        self.record(format!("navigate:{}", url));
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, _timeout: Duration) -> AppResult<bool> {
        self.record(format!("wait_for:{}", selector));
        Ok(self.modal)
    }

    async fn click(&self, selector: &Selector) -> AppResult<()> {
        self.record(format!("click:{}", selector));
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> AppResult<()> {
        self.record(format!("fill:{}={}", selector, value));
        Ok(())
    }

    async fn select(&self, selector: &Selector, value: &str) -> AppResult<()> {
        self.record(format!("select:{}={}", selector, value));
        Ok(())
    }

    async fn read_html(&self, selector: &Selector) -> AppResult<String> {
        self.record(format!("read_html:{}", selector));
        let failing = self
            .receipt_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::selector_not_found(selector.to_string(), 10));
        }
        Ok("<h3>Receipt</h3><p>Thank you for your order!</p>".to_string())
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        self.record(format!("screenshot:{}", path.display()));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        write_png(path, 32, 48);
        Ok(())
    }
}

/// 始终返回单页空白 PDF 的渲染器
pub struct FakeRenderer;

#[async_trait]
impl HtmlRenderer for FakeRenderer {
    async fn render_pdf(&self, _html: &str) -> AppResult<Vec<u8>> {
        Ok(blank_pdf())
    }
}

pub fn blank_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([20, 120, 200]))
        .save(path)
        .unwrap();
}

/// 启动一个只服务一个路径的本地 HTTP 服务，返回基础地址
///
/// 访问 `path` 返回 200 和 `body`，其余路径返回 404
pub async fn serve(path: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let requested = request.split_whitespace().nth(1).unwrap_or("/");

                let (status, content) = if requested == path {
                    ("200 OK", body)
                } else {
                    ("404 Not Found", String::new())
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content.len(),
                    content
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}
