//! Safe 多签交易的领域模型：待执行调用、批次交易与 multisend 编码。

pub mod multisend;
pub mod types;

pub use multisend::{decode_multisend, encode_multisend};
pub use types::{Operation, PendingCall, SafeContext, SafeTransaction, SignedSafeTransaction};
