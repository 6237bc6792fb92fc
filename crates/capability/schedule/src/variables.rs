use crate::error::ScheduleError;
use domain::{WebhookConfig, parse_duration_or};
use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// webhook 自定义变量默认超时。
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// 以当前变量为 JSON body 调用 webhook，返回响应中的对象。
pub async fn load_webhook_variables(
    client: &reqwest::Client,
    config: &WebhookConfig,
    variables: &Map<String, Value>,
) -> Result<Map<String, Value>, ScheduleError> {
    if config.url.trim().is_empty() {
        return Err(ScheduleError::Webhook("url is empty".to_string()));
    }
    let method = if config.method.trim().is_empty() {
        Method::POST
    } else {
        Method::from_bytes(config.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|err| ScheduleError::Webhook(err.to_string()))?
    };
    let timeout = parse_duration_or(&config.timeout, DEFAULT_WEBHOOK_TIMEOUT)?;

    let mut request = client
        .request(method, config.url.trim())
        .timeout(timeout)
        .json(variables);
    for (name, value) in &config.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    let response = request.send().await?.error_for_status()?;
    let status = response.status();
    let body: Value = response.json().await?;
    debug!(target: "mc.schedule", url = %config.url, status = %status, "webhook_variables_loaded");
    match body {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ScheduleError::Webhook(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
