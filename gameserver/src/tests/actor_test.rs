use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use shared::tool::error::ActorError;

use crate::actor::{mailbox, spawn_actor, Actor, Flow, Promise};

/// 합계가 `stop_at` 이상이 되면 멈추는 액터
struct Counter {
    total: u32,
    stop_at: u32,
    delay: Duration,
}

#[async_trait]
impl Actor for Counter {
    type Event = u32;
    type Reply = u32;

    fn name(&self) -> String {
        "Counter".into()
    }

    async fn handle(&mut self, event: u32, promise: Promise<u32>) -> Flow {
        tokio::time::sleep(self.delay).await;
        self.total += event;
        promise.resolve(self.total);
        if self.total >= self.stop_at {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

fn counter(stop_at: u32, delay: Duration) -> Counter {
    Counter {
        total: 0,
        stop_at,
        delay,
    }
}

#[tokio::test]
async fn test_send_to_dead_actor() {
    let (handle, task) = spawn_actor(counter(10, Duration::ZERO), 8, CancellationToken::new());

    assert_eq!(handle.send(5).await, Ok(5));
    assert_eq!(handle.send(5).await, Ok(10));
    task.await.unwrap();

    assert!(handle.is_closed());
    assert_eq!(handle.send(1).await, Err(ActorError::ActorDead));
    assert_eq!(handle.send_async(1).await, Err(ActorError::ActorDead));
    println!("✅ 종료된 액터 전송 테스트 통과");
}

#[tokio::test]
async fn test_pending_promises_closed_on_stop() {
    let (handle, task) = spawn_actor(
        counter(1, Duration::from_millis(50)),
        8,
        CancellationToken::new(),
    );

    // 첫 요청 처리 중에 나머지가 메일박스에 쌓인 뒤 액터가 멈춤
    let (a, b, c) = tokio::join!(handle.send(1), handle.send(1), handle.send(1));
    assert_eq!(a, Ok(1));
    assert_eq!(b, Err(ActorError::Closed));
    assert_eq!(c, Err(ActorError::Closed));
    task.await.unwrap();
}

#[tokio::test]
async fn test_cancel_stops_actor() {
    let token = CancellationToken::new();
    let (handle, task) = spawn_actor(counter(u32::MAX, Duration::ZERO), 8, token.clone());
    assert_eq!(handle.send(3).await, Ok(3));

    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handle.send(1).await, Err(ActorError::ActorDead));
}

#[tokio::test]
async fn test_try_send_full_mailbox() {
    let (handle, mut mailbox) = mailbox::<u32, u32>(1);

    assert_eq!(handle.try_send(1), Ok(()));
    assert_eq!(handle.try_send(2), Err(ActorError::MailboxFull));

    assert_eq!(mailbox.close_and_drain(), 1);
    assert_eq!(handle.try_send(3), Err(ActorError::ActorDead));
}

#[tokio::test]
async fn test_dropped_promise_rejects() {
    let (handle, mut mailbox) = mailbox::<u32, u32>(4);
    let request = tokio::spawn(async move { handle.send(7).await });

    let envelope = mailbox.recv().await.unwrap();
    assert_eq!(envelope.event, 7);
    assert!(envelope.promise.is_awaited());
    drop(envelope);

    assert_eq!(request.await.unwrap(), Err(ActorError::Closed));
}
