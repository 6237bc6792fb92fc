use crate::error::ProcessorError;
use crate::processor::MessageProcessor;
use domain::labels::{is_ignored, merge_labels, merge_others};
use domain::{EventType, Field, Message, MessageType, Others, Payload, topics};
use mc_script::{ScriptError, value_to_text};
use serde_json::{Value, json};
use tracing::warn;

/// 脚本结果中的保留键。
const KEY_VALUE: &str = "value";
const KEY_OTHERS: &str = "others";

impl MessageProcessor {
    /// 逐个载荷更新字段；单个载荷失败不影响其余载荷，返回最后一个错误。
    pub(crate) async fn set_field_data(&self, message: &Message) -> Result<(), ProcessorError> {
        let mut result = Ok(());
        for payload in &message.payloads {
            let extras = match self.update_field(message, payload, true).await {
                Ok(extras) => extras,
                Err(err) => {
                    warn!(
                        target: "mc.processor",
                        gateway = %message.gateway_id,
                        node = %message.node_id,
                        source = %message.source_id,
                        field = %payload.key,
                        error = %err,
                        "field_update_failed"
                    );
                    result = Err(err);
                    continue;
                }
            };
            for extra in extras {
                if let Err(err) = self.update_field(message, &extra, false).await {
                    warn!(target: "mc.processor", field = %extra.key, error = %err, "extra_field_update_failed");
                    result = Err(err);
                }
            }
        }
        result
    }

    /// 更新单个字段，返回脚本产生的额外字段载荷。
    async fn update_field(
        &self,
        message: &Message,
        payload: &Payload,
        run_script: bool,
    ) -> Result<Vec<Payload>, ProcessorError> {
        let mut field = self
            .stores
            .fields
            .get_field(
                &message.gateway_id,
                &message.node_id,
                &message.source_id,
                &payload.key,
            )
            .await?
            .unwrap_or_else(|| {
                Field::new(
                    &message.gateway_id,
                    &message.node_id,
                    &message.source_id,
                    &payload.key,
                )
            });

        let mut value = Value::String(payload.value.clone());
        let mut extras = Vec::new();
        if run_script && message.is_received && !field.formatter.on_receive.trim().is_empty() {
            let input = json!({
                "value": payload.value,
                "lastValue": field.current.json_value(),
                "previousValue": field.previous.json_value(),
            });
            let output = self
                .script
                .execute(&field.formatter.on_receive, &input)
                .await?;
            value = match output {
                Value::Null => {
                    return Err(ScriptError::InvalidResult("script returned nil".to_string()).into());
                }
                Value::Object(map) => {
                    let mut primary = None;
                    for (key, item) in map {
                        match key.as_str() {
                            KEY_VALUE => primary = Some(item),
                            KEY_OTHERS => {
                                if let Value::Object(others) = item {
                                    let others: Others = others.into_iter().collect();
                                    merge_others(&mut field.others, &field.labels, &others);
                                }
                            }
                            _ => extras.push(Payload {
                                key,
                                value: value_to_text(&item),
                                metric_type: payload.metric_type,
                                unit: String::new(),
                                labels: payload.labels.clone(),
                                others: Others::new(),
                            }),
                        }
                    }
                    match primary {
                        Some(Value::Null) | None => {
                            return Err(ScriptError::InvalidResult(
                                "script result has no value".to_string(),
                            )
                            .into());
                        }
                        Some(primary) => primary,
                    }
                }
                scalar => scalar,
            };
        }

        merge_labels(&mut field.labels, &payload.labels);
        merge_others(&mut field.others, &field.labels, &payload.others);
        if let Some(Value::String(name)) = payload.others.get("name")
            && !is_ignored(&field.labels, "name")
        {
            field.name = name.clone();
        }
        if !is_ignored(&field.labels, "metricType") {
            field.metric_type = payload.metric_type;
        }
        if !is_ignored(&field.labels, "unit") {
            field.unit = payload.unit.clone();
        }

        let converted = field.metric_type.convert(&value)?;
        field.shift_value(converted, message.is_received, message.timestamp);
        field.last_seen = Some(message.timestamp);

        self.stores.fields.save_field(field.clone()).await?;
        self.publish_event(
            topics::EVENT_FIELD_SET,
            EventType::Set,
            "field",
            field.key(),
            &field,
        );
        self.write_field_metric(&field).await?;
        Ok(extras)
    }

    /// 设备请求字段值：本地有值时直接回一条 set 消息。
    pub(crate) async fn request_field_data(&self, message: &Message) -> Result<(), ProcessorError> {
        let mut response = Message::new(
            &message.gateway_id,
            &message.node_id,
            &message.source_id,
            MessageType::Set,
        );
        for payload in &message.payloads {
            let field = self
                .stores
                .fields
                .get_field(
                    &message.gateway_id,
                    &message.node_id,
                    &message.source_id,
                    &payload.key,
                )
                .await?;
            let Some(field) = field else {
                continue;
            };
            self.publish_event(
                topics::EVENT_FIELD_REQUEST,
                EventType::Request,
                "field",
                field.key(),
                &field,
            );
            if field.current.value.is_none() {
                continue;
            }
            response.payloads.push(Payload {
                key: field.field_id.clone(),
                value: field.current.string_value(),
                metric_type: field.metric_type,
                unit: field.unit.clone(),
                labels: field.labels.clone(),
                others: Others::new(),
            });
        }
        if response.payloads.is_empty() {
            return Ok(());
        }
        self.publish(&topics::to_provider(&message.gateway_id), &response)
    }
}
