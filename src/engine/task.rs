use async_trait::async_trait;

use super::error::TaskError;
use super::recorder::CallRecorder;

/// 运营任务：通过 `CallRecorder` 描述要打包进同一笔多签交易的调用。
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn execute(&self, recorder: &mut CallRecorder) -> Result<(), TaskError>;
}
