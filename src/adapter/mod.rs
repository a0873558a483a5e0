//! Adapter: frozen-weight linear maps with trainable low-rank corrections
//!
//! An adapter wraps a frozen weight/bias pair and owns two small trainable
//! factors A and B. The forward pass applies W + α·A·B without ever
//! mutating the frozen base.

mod init;
mod lora;

pub use init::InitStrategy;
pub use lora::LoraAdapter;
