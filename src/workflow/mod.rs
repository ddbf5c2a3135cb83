pub mod order_ctx;
pub mod order_flow;
pub mod retry;

pub use order_ctx::OrderCtx;
pub use order_flow::{OrderFlow, OrderFormSelectors, SubmitOutcome};
pub use retry::{Backoff, RetryPolicy};
