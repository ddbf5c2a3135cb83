pub mod order;
pub mod receipt;

pub use order::{OrderRecord, ORDER_COLUMNS};
pub use receipt::{ReceiptArtifact, ReceiptPaths};
