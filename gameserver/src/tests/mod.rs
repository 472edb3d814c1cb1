//! 게임 서버 테스트
//!
//! - actor_test: 메일박스와 약속 동작
//! - room_test: 채널 끝점으로 로비/방 액터 직접 검증
//! - server_test: 실제 소켓을 통한 인증과 방 흐름

mod actor_test;

use std::net::SocketAddr;

use tokio::sync::mpsc::UnboundedReceiver;

use shared::protocol::GameServerMessage;

use crate::GameSender;

/// 소켓 없는 테스트용 쓰기 끝점
pub(crate) fn channel_sender(port: u16) -> (GameSender, UnboundedReceiver<GameServerMessage>) {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    GameSender::channel(addr)
}

/// 지금까지 받은 메시지 모두 꺼내기
pub(crate) fn drain(rx: &mut UnboundedReceiver<GameServerMessage>) -> Vec<GameServerMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}
