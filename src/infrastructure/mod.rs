pub mod js_executor;
pub mod page_driver;
pub mod selector;

pub use js_executor::{ElementReply, JsExecutor};
pub use page_driver::{ChromePage, PageDriver};
pub use selector::Selector;
