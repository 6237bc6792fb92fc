use crate::error::ProcessorError;
use crate::processor::MessageProcessor;
use chrono::{DateTime, Utc};
use domain::{Field, FieldValue, MetricType, Node};
use mc_storage::MetricPoint;
use tracing::debug;

impl MessageProcessor {
    /// 字段指标写入：none 不写，binary 只在值变化时写，geo 拆成三个字段。
    pub(crate) async fn write_field_metric(&self, field: &Field) -> Result<(), ProcessorError> {
        match field.metric_type {
            MetricType::None => return Ok(()),
            MetricType::Binary if !field.is_changed() => {
                debug!(target: "mc.metric", field = %field.key(), "binary_metric_unchanged");
                return Ok(());
            }
            _ => {}
        }
        let Some(value) = field.current.value.clone() else {
            return Ok(());
        };
        let timestamp = field.current.timestamp.unwrap_or_else(Utc::now);
        let point = MetricPoint::new(field.metric_type, timestamp)
            .with_tag("id", field.key())
            .with_tag("gatewayId", field.gateway_id.clone())
            .with_tag("nodeId", field.node_id.clone())
            .with_tag("sourceId", field.source_id.clone())
            .with_tag("fieldId", field.field_id.clone());
        let point = match value {
            FieldValue::Geo(geo) => point
                .with_field("latitude", FieldValue::F64(geo.latitude))
                .with_field("longitude", FieldValue::F64(geo.longitude))
                .with_field("altitude", FieldValue::F64(geo.altitude)),
            other => point.with_field("value", other),
        };
        self.stores.metrics.write(point).await?;
        mc_telemetry::record_metric_write();
        debug!(target: "mc.metric", field = %field.key(), "field_metric_written");
        Ok(())
    }

    pub(crate) async fn write_battery_metric(
        &self,
        node: &Node,
        level: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ProcessorError> {
        let point = MetricPoint::new(MetricType::GaugeFloat, timestamp)
            .with_tag("id", node.key())
            .with_tag("gatewayId", node.gateway_id.clone())
            .with_tag("nodeId", node.node_id.clone())
            .with_tag("fieldId", "batteryLevel")
            .with_field("value", FieldValue::F64(level));
        self.stores.metrics.write(point).await?;
        mc_telemetry::record_metric_write();
        debug!(target: "mc.metric", node = %node.key(), level, "battery_metric_written");
        Ok(())
    }
}
