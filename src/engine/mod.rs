//! 任务调用工作流：记录调用、打包为多签批次、预览、签名提交与通知。

mod batcher;
mod error;
mod preview;
mod recorder;
mod runner;
mod stage;
mod submit;
mod task;


pub use error::TaskError;
pub use recorder::CallRecorder;
pub use runner::TaskRunner;
pub use stage::{RunMode, RunStage};
pub use task::Task;
