//! 回执生成服务 - 业务能力层
//!
//! 负责两件事：
//! - 把 `#receipt` 的 HTML 片段渲染成 PDF
//! - 把订单截图追加为 PDF 的最后一页

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, Page};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{AppResult, BrowserError, ReceiptError};
use crate::models::ReceiptPaths;

/// 截图页宽度（A4 宽度，单位 pt）
const SCREENSHOT_PAGE_WIDTH: i64 = 595;

/// HTML 转 PDF 能力
#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    async fn render_pdf(&self, html: &str) -> AppResult<Vec<u8>>;
}

/// 基于 Chromium `Page.printToPDF` 的渲染器
///
/// 使用独立页面，不影响下单页面的状态。只能在无头模式下工作。
pub struct ChromePdfRenderer {
    page: Page,
}

impl ChromePdfRenderer {
    pub async fn new(browser: &Browser) -> AppResult<Self> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PdfRender {
                source: Box::new(e),
            })?;
        Ok(Self { page })
    }
}

#[async_trait]
impl HtmlRenderer for ChromePdfRenderer {
    async fn render_pdf(&self, html: &str) -> AppResult<Vec<u8>> {
        let document = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>{}</body></html>",
            html
        );
        let render_err = |e: chromiumoxide::error::CdpError| BrowserError::PdfRender {
            source: Box::new(e),
        };

        self.page.set_content(document).await.map_err(render_err)?;
        let bytes = self
            .page
            .pdf(PrintToPdfParams::default())
            .await
            .map_err(render_err)?;
        Ok(bytes)
    }
}

/// 回执生成服务
pub struct ReceiptBuilder {
    renderer: Box<dyn HtmlRenderer>,
    output_dir: PathBuf,
}

impl ReceiptBuilder {
    pub fn new(renderer: Box<dyn HtmlRenderer>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            output_dir: output_dir.into(),
        }
    }

    pub fn receipts_dir(&self) -> PathBuf {
        self.output_dir.join("receipts")
    }

    pub fn paths(&self, order_number: &str) -> ReceiptPaths {
        ReceiptPaths::new(&self.output_dir, order_number)
    }

    /// 把 HTML 片段渲染成回执 PDF，已存在的同名回执会被覆盖
    ///
    /// # 返回
    /// 返回 PDF 路径
    pub async fn build(&self, order_number: &str, html_fragment: &str) -> AppResult<PathBuf> {
        let path = self.paths(order_number).pdf;
        let bytes = self.renderer.render_pdf(html_fragment).await?;

        let io_err = |source| ReceiptError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, &bytes).map_err(io_err)?;

        debug!("回执已生成: {} ({} 字节)", path.display(), bytes.len());
        Ok(path)
    }

    /// 把截图追加为回执的最后一页
    ///
    /// # 返回
    /// 返回追加后的总页数
    pub fn attach_screenshot(&self, order_number: &str, image_path: &Path) -> AppResult<usize> {
        let pdf_path = self.paths(order_number).pdf;
        append_image_page(&pdf_path, image_path)
    }

    /// 读取 PDF 页数
    pub fn page_count(path: &Path) -> AppResult<usize> {
        let doc = load_pdf(path)?;
        Ok(doc.get_pages().len())
    }
}

fn load_pdf(path: &Path) -> AppResult<Document> {
    Document::load(path).map_err(|source| {
        ReceiptError::Pdf {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}

/// 在 PDF 末尾追加一页，内容为整页铺满的图片
fn append_image_page(pdf_path: &Path, image_path: &Path) -> AppResult<usize> {
    let pdf_err = |source| ReceiptError::Pdf {
        path: pdf_path.display().to_string(),
        source,
    };

    let image = image::open(image_path)
        .map_err(|source| ReceiptError::Image {
            path: image_path.display().to_string(),
            source,
        })?
        .to_rgb8();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ReceiptError::EmptyImage {
            path: image_path.display().to_string(),
        }
        .into());
    }

    let pixels = deflate(image.as_raw()).map_err(|source| ReceiptError::Io {
        path: image_path.display().to_string(),
        source,
    })?;

    let mut doc = load_pdf(pdf_path)?;
    let pages_id = page_tree_root(&doc).map_err(pdf_err)?;

    let page_height = (SCREENSHOT_PAGE_WIDTH * i64::from(height) / i64::from(width)).max(1);

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        pixels,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(SCREENSHOT_PAGE_WIDTH),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(page_height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().map_err(pdf_err)?,
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(SCREENSHOT_PAGE_WIDTH),
            Object::Integer(page_height),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    let pages = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(pdf_err)?;
    pages
        .get_mut(b"Kids")
        .and_then(Object::as_array_mut)
        .map_err(pdf_err)?
        .push(Object::Reference(page_id));
    let count = pages.get(b"Count").and_then(Object::as_i64).map_err(pdf_err)?;
    pages.set("Count", count + 1);

    doc.save(pdf_path).map_err(|source| ReceiptError::Io {
        path: pdf_path.display().to_string(),
        source,
    })?;

    let total = doc.get_pages().len();
    debug!("截图已追加到 {}，共 {} 页", pdf_path.display(), total);
    Ok(total)
}

/// 页面树根节点 `/Root /Pages`
fn page_tree_root(doc: &Document) -> lopdf::Result<ObjectId> {
    let root_id = doc.trailer.get(b"Root").and_then(Object::as_reference)?;
    doc.get_dictionary(root_id)?
        .get(b"Pages")
        .and_then(Object::as_reference)
}

fn deflate(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 生成单页空白 PDF
    fn blank_pdf() -> Vec<u8> {
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

    struct BlankRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HtmlRenderer for BlankRenderer {
        async fn render_pdf(&self, _html: &str) -> AppResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(blank_pdf())
        }
    }

    fn builder(dir: &Path) -> ReceiptBuilder {
        ReceiptBuilder::new(
            Box::new(BlankRenderer {
                calls: AtomicUsize::new(0),
            }),
            dir,
        )
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
            .save(path)
            .unwrap();
    }

    #[tokio::test]
    async fn test_build_writes_receipt_at_deterministic_path() {
        let dir = tempfile::tempdir().unwrap();
        let receipts = builder(dir.path());

        let path = receipts.build("1", "<p>Receipt</p>").await.unwrap();

        assert_eq!(path, dir.path().join("receipts").join("receipt1.pdf"));
        assert_eq!(ReceiptBuilder::page_count(&path).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_attach_screenshot_adds_exactly_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let receipts = builder(dir.path());
        let pdf = receipts.build("5", "<p>Receipt</p>").await.unwrap();
        let png = dir.path().join("order_summary5.png");
        write_png(&png, 40, 80);

        let before = ReceiptBuilder::page_count(&pdf).unwrap();
        let after = receipts.attach_screenshot("5", &png).unwrap();

        assert_eq!(after, before + 1);
        assert_eq!(ReceiptBuilder::page_count(&pdf).unwrap(), 2);

        // 截图页按 A4 宽度等比缩放
        let doc = Document::load(&pdf).unwrap();
        let last_page = *doc.get_pages().values().last().unwrap();
        let media_box = doc
            .get_dictionary(last_page)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(media_box[2].as_i64().unwrap(), 595);
        assert_eq!(media_box[3].as_i64().unwrap(), 1190);
    }

    #[tokio::test]
    async fn test_rebuild_overwrites_previous_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let receipts = builder(dir.path());
        let png = dir.path().join("shot.png");
        write_png(&png, 10, 10);

        receipts.build("3", "<p>first</p>").await.unwrap();
        receipts.attach_screenshot("3", &png).unwrap();
        let pdf = receipts.build("3", "<p>second</p>").await.unwrap();

        assert_eq!(ReceiptBuilder::page_count(&pdf).unwrap(), 1);
        assert_eq!(receipts.attach_screenshot("3", &png).unwrap(), 2);
    }

    #[test]
    fn test_attach_to_missing_pdf_fails() {
        let dir = tempfile::tempdir().unwrap();
        let receipts = builder(dir.path());
        let png = dir.path().join("shot.png");
        write_png(&png, 10, 10);

        let err = receipts.attach_screenshot("404", &png).unwrap_err();

        assert!(err.is_recoverable());
    }
}
