pub mod archiver;
pub mod file_fetcher;
pub mod receipt_builder;
pub mod table_reader;

pub use archiver::{ArchiveSummary, Archiver};
pub use file_fetcher::FileFetcher;
pub use receipt_builder::{ChromePdfRenderer, HtmlRenderer, ReceiptBuilder};
pub use table_reader::{TableReader, TableRow};
