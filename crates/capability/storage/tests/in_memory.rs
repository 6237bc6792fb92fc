use domain::{Field, FieldValue, GatewayConfig, MetricType, Node, PluginConfig};
use mc_storage::{
    FieldStore, InMemoryMetricStore, MetricPoint, MetricStore, NodeStore, Stores, init_stores,
};

#[tokio::test]
async fn missing_rows_are_none_not_errors() {
    let stores = Stores::in_memory();
    let node = stores.nodes.get_node("gw-1", "4").await.expect("query");
    assert!(node.is_none());
    let field = stores
        .fields
        .get_field("gw-1", "4", "1", "temp")
        .await
        .expect("query");
    assert!(field.is_none());
    let gateway = stores.gateways.get("gw-1").await.expect("query");
    assert!(gateway.is_none());
}

#[tokio::test]
async fn save_overwrites_and_lists_sorted() {
    let stores = Stores::in_memory();
    for node_id in ["2", "1"] {
        stores
            .nodes
            .save_node(Node::new("gw-1", node_id))
            .await
            .expect("save");
    }
    stores
        .nodes
        .save_node(Node::new("gw-2", "1"))
        .await
        .expect("save");

    let mut renamed = Node::new("gw-1", "1");
    renamed.name = "kitchen".to_string();
    stores.nodes.save_node(renamed).await.expect("save");

    let nodes = stores.nodes.list_nodes(Some("gw-1")).await.expect("list");
    let ids: Vec<&str> = nodes.iter().map(|node| node.node_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(nodes[0].name, "kitchen");
    assert_eq!(stores.nodes.list_nodes(None).await.expect("list").len(), 3);
    assert!(stores.nodes.delete_node("gw-2", "1").await.expect("delete"));
}

#[tokio::test]
async fn field_round_trip() {
    let stores = Stores::in_memory();
    let mut field = Field::new("gw-1", "4", "1", "temp");
    field.metric_type = MetricType::GaugeFloat;
    field.shift_value(FieldValue::F64(21.5), true, chrono::Utc::now());
    stores.fields.save_field(field.clone()).await.expect("save");

    let restored = stores
        .fields
        .get_field("gw-1", "4", "1", "temp")
        .await
        .expect("query")
        .expect("field");
    assert_eq!(restored, field);
    let listed = stores
        .fields
        .list_fields("gw-1", "4", "1")
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn resource_store_keys_by_id() {
    let stores = Stores::in_memory();
    let gateway = GatewayConfig {
        id: "gw-1".to_string(),
        ..Default::default()
    };
    stores.gateways.save(gateway).await.expect("save");
    assert!(stores.gateways.get("gw-1").await.expect("get").is_some());
    assert!(
        stores
            .gateways
            .save(GatewayConfig::default())
            .await
            .is_err()
    );
    assert!(stores.gateways.delete("gw-1").await.expect("delete"));
    assert!(stores.gateways.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn metric_points_are_retained() {
    let metrics = InMemoryMetricStore::new();
    let point = MetricPoint::new(MetricType::Gauge, chrono::Utc::now())
        .with_tag("id", "gw-1.4.1.temp")
        .with_field("value", FieldValue::I64(3));
    metrics.write(point.clone()).await.expect("write");
    assert_eq!(metrics.points(), vec![point]);
    assert_eq!(metrics.points_tagged("id", "gw-1.4.1.temp").len(), 1);
}

#[test]
fn init_rejects_unknown_plugins() {
    assert!(init_stores(&PluginConfig::default(), &PluginConfig::default()).is_ok());
    assert!(init_stores(&PluginConfig::with_type("mongodb"), &PluginConfig::default()).is_err());
    assert!(init_stores(&PluginConfig::default(), &PluginConfig::with_type("influxdb")).is_err());
    assert!(init_stores(&PluginConfig::default(), &PluginConfig::with_type("memory")).is_ok());
}
