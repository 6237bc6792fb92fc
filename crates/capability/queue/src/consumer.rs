use crate::error::QueueError;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// 队列消费者。
#[async_trait]
pub trait QueueConsumer<T>: Send + Sync {
    async fn consume(&self, item: T) -> Result<(), QueueError>;
}

/// 闭包消费者。
pub struct FnConsumer<F, T> {
    func: F,
    _item: PhantomData<fn(T)>,
}

/// 用异步闭包构造消费者。
pub fn consumer_fn<T, F, Fut>(func: F) -> FnConsumer<F, T>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), QueueError>> + Send,
{
    FnConsumer {
        func,
        _item: PhantomData,
    }
}

#[async_trait]
impl<T, F, Fut> QueueConsumer<T> for FnConsumer<F, T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), QueueError>> + Send,
{
    async fn consume(&self, item: T) -> Result<(), QueueError> {
        (self.func)(item).await
    }
}
