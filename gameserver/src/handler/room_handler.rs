//! 로비 입퇴장과 방 생명주기 메시지 처리
//!
//! 방 생성은 로비 액터에, 나머지는 현재 방 액터에 요청합니다.

use tracing::debug;

use shared::protocol::game::{
    ClientRoomCreate, ClientRoomJoin, GameClientMessage, ServerEventLobbyJoined,
    ServerEventLobbyLeft, ServerRoomInfoResponse, ServerRoomJoin, ServerRoomLeave,
};
use shared::tool::error::{AppError, RoomError};

use super::connection_handler::ConnectionState;
use crate::service::{RoomEvent, RoomHandle, RoomJoinRequest, RoomReply, RoomSettings};
use crate::GameContext;

/// 이 모듈이 처리하는 메시지인지 확인
pub fn is_room_message(message: &GameClientMessage) -> bool {
    matches!(
        message,
        GameClientMessage::ClientMultiplayerJoin(_)
            | GameClientMessage::ClientMultiplayerLeave(_)
            | GameClientMessage::ClientEventLobbyJoin(_)
            | GameClientMessage::ClientEventLobbyLeave(_)
            | GameClientMessage::ClientRoomCreate(_)
            | GameClientMessage::ClientRoomJoin(_)
            | GameClientMessage::ClientRoomLeave(_)
            | GameClientMessage::ClientRoomKick(_)
            | GameClientMessage::ClientRoomEdit(_)
            | GameClientMessage::ClientRoomInfo(_)
            | GameClientMessage::ClientRoomAction(_)
    )
}

pub async fn handle(
    ctx: &GameContext,
    state: &mut ConnectionState,
    message: GameClientMessage,
) -> Result<(), AppError> {
    match message {
        GameClientMessage::ClientMultiplayerJoin(_) => {
            ctx.lobby
                .join(state.lobby_entry(), state.sender.clone())
                .await?;
            state.in_lobby = true;
            Ok(())
        }
        GameClientMessage::ClientMultiplayerLeave(_) => {
            ctx.lobby.leave(state.conn_id, true).await?;
            state.in_lobby = false;
            Ok(())
        }
        GameClientMessage::ClientEventLobbyJoin(_) => {
            state.sender.send_message(ServerEventLobbyJoined {}).await
        }
        GameClientMessage::ClientEventLobbyLeave(_) => {
            state.sender.send_message(ServerEventLobbyLeft {}).await
        }
        GameClientMessage::ClientRoomCreate(create) => create_room(ctx, state, &create).await,
        GameClientMessage::ClientRoomJoin(join) => join_room(ctx, state, join).await,
        GameClientMessage::ClientRoomLeave(_) => leave_room(state).await,
        GameClientMessage::ClientRoomKick(kick) => {
            let event = RoomEvent::PlayerKick {
                conn_id: state.conn_id,
                kick_conn_id: kick.conn_id,
            };
            room_request(state, event).await
        }
        GameClientMessage::ClientRoomEdit(edit) => {
            let event = RoomEvent::SettingsChange {
                conn_id: state.conn_id,
                changes: edit.changes.0,
            };
            room_request(state, event).await
        }
        GameClientMessage::ClientRoomInfo(info) => {
            let entry = match ctx.lobby.get_room(info.room_number) {
                Some(room) => match room.request(RoomEvent::Info).await {
                    Ok(RoomReply::Info(entry)) => Some(entry),
                    _ => None,
                },
                None => None,
            };
            state
                .sender
                .send_message(ServerRoomInfoResponse {
                    found: entry.is_some() as u8,
                    room: entry.unwrap_or_default(),
                })
                .await
        }
        GameClientMessage::ClientRoomAction(action) => {
            let event = RoomEvent::RoomAction {
                conn_id: state.conn_id,
                data: action.data,
            };
            room_request(state, event).await
        }
        other => {
            debug!(conn_id = state.conn_id, "방 메시지가 아님: {:?}", other);
            Ok(())
        }
    }
}

fn join_request(state: &ConnectionState, password: String) -> RoomJoinRequest {
    RoomJoinRequest {
        entry: state.player.room_entry(state.conn_id),
        conn: state.sender.clone(),
        password,
    }
}

/// 입장 실패 응답
async fn send_join_failure(
    state: &ConnectionState,
    error: &RoomError,
    room_number: i16,
) -> Result<(), AppError> {
    debug!(conn_id = state.conn_id, room = room_number, "방 입장 실패: {}", error);
    state
        .sender
        .send_message(ServerRoomJoin {
            status: error.join_status(),
            room_name: String::new(),
            room_number,
        })
        .await
}

async fn create_room(
    ctx: &GameContext,
    state: &mut ConnectionState,
    create: &ClientRoomCreate,
) -> Result<(), AppError> {
    leave_current_room(state).await;

    let settings = RoomSettings::from(create);
    let creator = join_request(state, settings.password.clone());
    match ctx.lobby.create_room(settings, creator).await {
        Ok(room) => {
            state.room = Some(room);
            Ok(())
        }
        Err(e) => send_join_failure(state, &e, -1).await,
    }
}

async fn join_room(
    ctx: &GameContext,
    state: &mut ConnectionState,
    join: ClientRoomJoin,
) -> Result<(), AppError> {
    // 같은 방 재입장은 방 액터가 멤버 여부를 판단 (강퇴된 경우 다시 입장)
    let same_room = state
        .room
        .as_ref()
        .is_some_and(|current| current.number() == join.room_number && !current.is_closed());
    if !same_room {
        leave_current_room(state).await;
    }

    let Some(room) = ctx.lobby.get_room(join.room_number) else {
        state.room = None;
        return send_join_failure(state, &RoomError::UnknownRoom(join.room_number), join.room_number)
            .await;
    };

    let request = join_request(state, join.password);
    match room.request(RoomEvent::PlayerJoin(request)).await {
        Ok(_) => {
            state.room = Some(room);
            Ok(())
        }
        Err(e) => {
            state.room = None;
            let e = match e {
                RoomError::Actor(_) => RoomError::UnknownRoom(join.room_number),
                e => e,
            };
            send_join_failure(state, &e, join.room_number).await
        }
    }
}

async fn leave_room(state: &mut ConnectionState) -> Result<(), AppError> {
    match state.room.take() {
        Some(room) => {
            let event = RoomEvent::PlayerLeave {
                conn_id: state.conn_id,
            };
            match room.request(event).await {
                Ok(_) => Ok(()),
                Err(e) => {
                    debug!(conn_id = state.conn_id, "방 퇴장 실패: {}", e);
                    state
                        .sender
                        .send_message(ServerRoomLeave { room_number: -1 })
                        .await
                }
            }
        }
        None => {
            state
                .sender
                .send_message(ServerRoomLeave { room_number: -1 })
                .await
        }
    }
}

/// 다른 방으로 옮기기 전에 현재 방에서 퇴장
async fn leave_current_room(state: &mut ConnectionState) {
    if let Some(room) = state.room.take() {
        let event = RoomEvent::PlayerLeave {
            conn_id: state.conn_id,
        };
        if let Err(e) = room.request(event).await {
            debug!(conn_id = state.conn_id, "이전 방 퇴장 실패: {}", e);
        }
    }
}

fn current_room(state: &ConnectionState) -> Result<RoomHandle, RoomError> {
    state.room.clone().ok_or(RoomError::NotInRoom)
}

/// 현재 방에 요청
///
/// 방이 사라졌거나 더 이상 멤버가 아니면 연결 상태에서 방을 지웁니다.
pub async fn room_request(state: &mut ConnectionState, event: RoomEvent) -> Result<(), AppError> {
    let room = current_room(state)?;
    match room.request(event).await {
        Ok(_) => Ok(()),
        Err(e) => {
            if matches!(e, RoomError::NotInRoom | RoomError::Actor(_)) {
                state.room = None;
            }
            Err(e.into())
        }
    }
}
