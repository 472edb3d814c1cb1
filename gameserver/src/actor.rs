//! 액터 런타임
//!
//! 로비와 방은 각각 하나의 태스크에서 메일박스를 순서대로 처리하는 액터입니다.
//! 메일박스의 모든 메시지는 한 번만 쓸 수 있는 [`Promise`]를 함께 싣고 다니며,
//! 액터가 응답 없이 종료되면 남은 약속은 모두 `ActorError::Closed`로 거절됩니다.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use shared::tool::error::ActorError;

/// 기본 메일박스 크기
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// 단일 사용 응답 약속
///
/// `resolve`로 한 번 완료되며, 완료되지 않은 채 버려지면 `Closed`로 거절됩니다.
pub struct Promise<R> {
    tx: Option<oneshot::Sender<Result<R, ActorError>>>,
}

impl<R> Promise<R> {
    fn pair() -> (Self, oneshot::Receiver<Result<R, ActorError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// 응답을 기다리는 쪽이 없는 약속 (fire-and-forget)
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// 응답 전달
    pub fn resolve(mut self, value: R) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Ok(value));
        }
    }

    /// 응답 없이 닫음
    pub fn close(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(ActorError::Closed));
        }
    }

    /// 기다리는 쪽이 있는지 확인
    pub fn is_awaited(&self) -> bool {
        self.tx.as_ref().map(|tx| !tx.is_closed()).unwrap_or(false)
    }
}

impl<R> Drop for Promise<R> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(ActorError::Closed));
        }
    }
}

/// 메일박스 항목
pub struct Envelope<E, R> {
    pub event: E,
    pub promise: Promise<R>,
}

/// 액터에 메시지를 보내는 핸들
pub struct ActorHandle<E, R> {
    tx: mpsc::Sender<Envelope<E, R>>,
}

impl<E, R> Clone for ActorHandle<E, R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E, R> std::fmt::Debug for ActorHandle<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<E: Send + 'static, R: Send + 'static> ActorHandle<E, R> {
    /// 메시지를 보내고 응답을 기다림
    ///
    /// 메일박스가 가득 차면 자리가 날 때까지 기다립니다.
    /// 액터가 이미 종료되었으면 기다리지 않고 `ActorDead`를 반환합니다.
    pub async fn send(&self, event: E) -> Result<R, ActorError> {
        let (promise, rx) = Promise::pair();
        self.tx
            .send(Envelope { event, promise })
            .await
            .map_err(|_| ActorError::ActorDead)?;
        rx.await.unwrap_or(Err(ActorError::Closed))
    }

    /// 메시지를 보내기만 하고 응답은 기다리지 않음
    pub async fn send_async(&self, event: E) -> Result<(), ActorError> {
        self.tx
            .send(Envelope {
                event,
                promise: Promise::detached(),
            })
            .await
            .map_err(|_| ActorError::ActorDead)
    }

    /// 메일박스에 자리가 없으면 바로 포기
    pub fn try_send(&self, event: E) -> Result<(), ActorError> {
        self.tx
            .try_send(Envelope {
                event,
                promise: Promise::detached(),
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ActorError::MailboxFull,
                mpsc::error::TrySendError::Closed(_) => ActorError::ActorDead,
            })
    }

    /// 액터 태스크가 종료되었는지 확인
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// 같은 액터를 가리키는지 확인
    pub fn same_actor(&self, other: &Self) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// 액터가 소유하는 메일박스
pub struct Mailbox<E, R> {
    rx: mpsc::Receiver<Envelope<E, R>>,
}

impl<E, R> Mailbox<E, R> {
    pub async fn recv(&mut self) -> Option<Envelope<E, R>> {
        self.rx.recv().await
    }

    /// 새 메시지를 막고 남은 메시지를 모두 거절
    ///
    /// 거절한 메시지 수를 반환합니다.
    pub fn close_and_drain(&mut self) -> usize {
        self.rx.close();
        let mut dropped = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            envelope.promise.close();
            dropped += 1;
        }
        dropped
    }
}

/// 크기가 정해진 메일박스와 핸들 생성
pub fn mailbox<E, R>(capacity: usize) -> (ActorHandle<E, R>, Mailbox<E, R>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ActorHandle { tx }, Mailbox { rx })
}

/// 메시지 하나를 처리한 뒤 계속 돌지 여부
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// 메일박스를 순서대로 처리하는 액터
#[async_trait]
pub trait Actor: Send + 'static {
    type Event: Send + 'static;
    type Reply: Send + 'static;

    /// 로그에 표시할 이름
    fn name(&self) -> String;

    /// 메일박스 처리 전에 한 번 호출 (`Stop`이면 바로 종료)
    async fn started(&mut self) -> Flow {
        Flow::Continue
    }

    /// 메시지 하나 처리
    ///
    /// `promise`는 반드시 완료하거나 버려야 합니다 (버리면 `Closed`).
    async fn handle(&mut self, event: Self::Event, promise: Promise<Self::Reply>) -> Flow;

    /// 메일박스 루프가 끝난 직후 호출
    async fn stopped(&mut self) {}
}

/// 액터 태스크 시작
pub fn spawn_actor<A: Actor>(
    actor: A,
    capacity: usize,
    token: CancellationToken,
) -> (ActorHandle<A::Event, A::Reply>, JoinHandle<()>) {
    let (handle, mailbox) = mailbox(capacity);
    let task = tokio::spawn(run_actor(actor, mailbox, token));
    (handle, task)
}

/// 이미 만든 메일박스로 액터 실행
pub async fn run_actor<A: Actor>(
    mut actor: A,
    mut mailbox: Mailbox<A::Event, A::Reply>,
    token: CancellationToken,
) {
    let name = actor.name();
    debug!("액터 시작: {}", name);

    let mut flow = actor.started().await;
    while flow == Flow::Continue {
        let envelope = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("액터 취소: {}", name);
                break;
            }
            envelope = mailbox.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        flow = actor.handle(envelope.event, envelope.promise).await;
    }

    actor.stopped().await;
    let dropped = mailbox.close_and_drain();
    if dropped > 0 {
        trace!("{}: 처리하지 못한 메시지 {}개 거절", name, dropped);
    }
    debug!("액터 종료: {}", name);
}
