use crate::error::HandlerError;
use crate::handler::{Handler, HandlerData};
use async_trait::async_trait;
use tracing::debug;

pub const HANDLER_NOOP: &str = "noop";

/// 只记录日志。
pub struct NoopHandler {
    id: String,
}

impl NoopHandler {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

#[async_trait]
impl Handler for NoopHandler {
    fn name(&self) -> &str {
        HANDLER_NOOP
    }

    async fn start(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn post(&self, data: &HandlerData) -> Result<(), HandlerError> {
        debug!(target: "mc.handler", handler = %self.id, keys = ?data.keys().collect::<Vec<_>>(), "noop_post");
        Ok(())
    }
}
