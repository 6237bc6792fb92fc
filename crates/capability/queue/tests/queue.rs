use mc_queue::{BoundedQueue, QueueConfig, QueueError, consumer_fn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn drops_when_full_and_reports() {
    let gate = Arc::new(Semaphore::new(0));
    let consumer_gate = Arc::clone(&gate);
    let dropped = Arc::new(Mutex::new(Vec::new()));
    let dropped_sink = Arc::clone(&dropped);

    let queue = BoundedQueue::new(
        QueueConfig::new("full", 2, 1),
        Arc::new(consumer_fn(move |_item: u32| {
            let gate = Arc::clone(&consumer_gate);
            async move {
                let permit = gate.acquire().await.map_err(QueueError::consumer)?;
                permit.forget();
                Ok(())
            }
        })),
        move |item| dropped_sink.lock().expect("lock").push(item),
    );

    assert!(queue.produce(1));
    assert!(queue.produce(2));
    assert!(!queue.produce(3));
    assert!(queue.size() <= queue.capacity());
    assert_eq!(dropped.lock().expect("lock").as_slice(), &[3]);

    gate.add_permits(2);
    wait_until(|| queue.size() == 0).await;
    queue.stop().await;
}

#[tokio::test]
async fn retry_exhaustion_drops_after_three_attempts() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let dropped = Arc::new(AtomicUsize::new(0));
    let dropped_counter = Arc::clone(&dropped);

    let queue = BoundedQueue::new(
        QueueConfig::new("retry", 10, 1).with_retry(2, Duration::from_millis(100)),
        Arc::new(consumer_fn(move |_item: &'static str| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(QueueError::Consumer("always".to_string()))
            }
        })),
        move |_| {
            dropped_counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    assert!(queue.produce("job"));
    assert_eq!(queue.size(), 1);
    wait_until(|| dropped.load(Ordering::SeqCst) == 1).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    wait_until(|| queue.size() == 0).await;
    queue.stop().await;
}

#[tokio::test]
async fn panicking_consumer_does_not_kill_worker() {
    let processed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&processed);
    let dropped = Arc::new(AtomicUsize::new(0));
    let dropped_counter = Arc::clone(&dropped);

    let queue = BoundedQueue::new(
        QueueConfig::new("panic", 10, 1),
        Arc::new(consumer_fn(move |item: u32| {
            let sink = Arc::clone(&sink);
            async move {
                if item == 2 {
                    panic!("boom");
                }
                sink.lock().expect("lock").push(item);
                Ok(())
            }
        })),
        move |_| {
            dropped_counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    for item in 1..=3 {
        assert!(queue.produce(item));
    }
    wait_until(|| queue.size() == 0).await;
    assert_eq!(processed.lock().expect("lock").as_slice(), &[1, 3]);
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
    queue.stop().await;
}

#[tokio::test]
async fn single_worker_preserves_order() {
    let processed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&processed);
    let queue = BoundedQueue::new(
        QueueConfig::new("order", 100, 1),
        Arc::new(consumer_fn(move |item: u32| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().expect("lock").push(item);
                Ok(())
            }
        })),
        |_| {},
    );
    for item in 0..50 {
        assert!(queue.produce(item));
    }
    wait_until(|| queue.size() == 0).await;
    let expected: Vec<u32> = (0..50).collect();
    assert_eq!(*processed.lock().expect("lock"), expected);
    queue.stop().await;
}

#[tokio::test]
async fn stop_is_idempotent_and_rejects_new_items() {
    let gate = Arc::new(Semaphore::new(0));
    let consumer_gate = Arc::clone(&gate);
    let dropped = Arc::new(Mutex::new(Vec::new()));
    let dropped_sink = Arc::clone(&dropped);

    let queue = BoundedQueue::new(
        QueueConfig::new("stop", 10, 1),
        Arc::new(consumer_fn(move |_item: u32| {
            let gate = Arc::clone(&consumer_gate);
            async move {
                let _permit = gate.acquire().await.map_err(QueueError::consumer)?;
                Ok(())
            }
        })),
        move |item| dropped_sink.lock().expect("lock").push(item),
    );

    assert!(queue.produce(1));
    assert!(queue.produce(2));
    wait_until(|| queue.size() == 2).await;
    // 让处理中的条目完成，剩余条目在停止时被丢弃。
    gate.add_permits(1);
    queue.stop().await;
    queue.stop().await;

    assert!(queue.is_stopped());
    assert!(!queue.produce(3));
    assert_eq!(queue.size(), 0);
    let dropped = dropped.lock().expect("lock").clone();
    assert!(dropped.contains(&3));
}

#[tokio::test]
async fn resize_reports_change() {
    let queue = BoundedQueue::new(
        QueueConfig::new("resize", 5, 1),
        Arc::new(consumer_fn(|_item: u32| async { Ok(()) })),
        |_| {},
    );
    assert!(!queue.resize(5));
    assert!(queue.resize(10));
    assert_eq!(queue.capacity(), 10);
    queue.stop().await;
}

#[tokio::test]
async fn shrinking_drops_pending_overflow() {
    let gate = Arc::new(Semaphore::new(0));
    let consumer_gate = Arc::clone(&gate);
    let dropped = Arc::new(Mutex::new(Vec::new()));
    let dropped_sink = Arc::clone(&dropped);

    let queue = BoundedQueue::new(
        QueueConfig::new("shrink", 5, 1),
        Arc::new(consumer_fn(move |_item: u32| {
            let gate = Arc::clone(&consumer_gate);
            async move {
                let permit = gate.acquire().await.map_err(QueueError::consumer)?;
                permit.forget();
                Ok(())
            }
        })),
        move |item| dropped_sink.lock().expect("lock").push(item),
    );

    for item in 1..=5 {
        assert!(queue.produce(item));
    }
    assert_eq!(queue.size(), 5);

    assert!(queue.resize(2));
    assert_eq!(queue.capacity(), 2);
    assert!(queue.size() <= queue.capacity());
    let mut overflow = dropped.lock().expect("lock").clone();
    overflow.sort_unstable();
    assert_eq!(overflow, vec![3, 4, 5]);
    assert!(!queue.produce(6));

    gate.add_permits(2);
    wait_until(|| queue.size() == 0).await;
    queue.stop().await;
}
