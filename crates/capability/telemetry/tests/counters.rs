use mc_telemetry::{LoggerOptions, init_tracing, metrics, record_handler_post, record_sleeping_dropped};

#[test]
fn counters_accumulate() {
    let before = metrics().snapshot();
    record_sleeping_dropped(3);
    record_handler_post(true);
    record_handler_post(false);
    let after = metrics().snapshot();
    assert!(after.sleeping_dropped >= before.sleeping_dropped + 3);
    assert!(after.handler_posts_ok > before.handler_posts_ok);
    assert!(after.handler_posts_failed > before.handler_posts_failed);
}

#[test]
fn init_tracing_is_idempotent() {
    let options = LoggerOptions {
        encoding: "json".to_string(),
        ..Default::default()
    };
    init_tracing(&options);
    init_tracing(&LoggerOptions::default());
}

#[test]
fn defaults_to_console_development() {
    let options = LoggerOptions::default();
    assert!(!options.is_json());
    assert!(!options.is_production());
    assert_eq!(options.level, "info");
}

#[test]
fn metric_level_only_targets_metric_logs() {
    let options = LoggerOptions {
        level: "warn".to_string(),
        metric_level: "DEBUG".to_string(),
        ..Default::default()
    };
    assert_eq!(options.metric_directive().as_deref(), Some("mc.metric=debug"));
    assert_eq!(options.filter_directives(), "warn,mc.metric=debug");

    let plain = LoggerOptions::default();
    assert_eq!(plain.metric_directive(), None);
    assert_eq!(plain.filter_directives(), "info");
}
