//! 게임 진행 메시지 처리
//!
//! 모두 현재 방 액터의 이벤트로 바꿔서 전달합니다.

use tracing::debug;

use shared::protocol::game::GameClientMessage;
use shared::tool::error::AppError;

use super::connection_handler::ConnectionState;
use super::room_handler::room_request;
use crate::service::{LobbyEvent, RoomEvent, ShotAction};
use crate::GameContext;

pub async fn handle(
    ctx: &GameContext,
    state: &mut ConnectionState,
    message: GameClientMessage,
) -> Result<(), AppError> {
    let conn_id = state.conn_id;
    let event = match message {
        GameClientMessage::ClientPlayerReady(ready) => RoomEvent::PlayerReady {
            conn_id,
            ready: ready.is_ready(),
        },
        GameClientMessage::ClientSetIdleStatus(idle) => RoomEvent::PlayerIdle {
            conn_id,
            idle: idle.idle != 0,
        },
        GameClientMessage::ClientPlayerStartGame(_) => RoomEvent::StartGame { conn_id },
        GameClientMessage::ClientLoadProgress(load) => RoomEvent::LoadingProgress {
            conn_id,
            progress: load.progress,
        },
        GameClientMessage::ClientReadyStartHole(_) => RoomEvent::GameReady { conn_id },
        GameClientMessage::ClientShotCommit(shot) => RoomEvent::Shot {
            conn_id,
            action: ShotAction::Commit(shot.data),
        },
        GameClientMessage::ClientShotRotate(rotate) => RoomEvent::Shot {
            conn_id,
            action: ShotAction::Rotate(rotate.angle),
        },
        GameClientMessage::ClientShotPower(power) => RoomEvent::Shot {
            conn_id,
            action: ShotAction::Power(power.level),
        },
        GameClientMessage::ClientShotClubChange(change) => RoomEvent::Shot {
            conn_id,
            action: ShotAction::ClubChange(change.club),
        },
        GameClientMessage::ClientShotItemUse(item) => RoomEvent::Shot {
            conn_id,
            action: ShotAction::ItemUse(item.item_type_id),
        },
        GameClientMessage::ClientShotCometRelief(relief) => RoomEvent::Shot {
            conn_id,
            action: ShotAction::CometRelief {
                x: relief.x,
                y: relief.y,
                z: relief.z,
            },
        },
        GameClientMessage::ClientUserTypingIndicator(typing) => {
            // 방 밖의 타이핑 표시는 메신저용
            if state.room.is_none() {
                return Ok(());
            }
            RoomEvent::Shot {
                conn_id,
                action: ShotAction::Typing(typing.status),
            }
        }
        GameClientMessage::ClientShotSync(sync) => RoomEvent::ShotSync {
            conn_id,
            data: sync.data,
        },
        GameClientMessage::ClientRoomSync(_) => RoomEvent::TurnEnd { conn_id },
        GameClientMessage::ClientHoleEnd(_) => RoomEvent::HoleEnd { conn_id },
        GameClientMessage::ClientShotActiveUserAcknowledge(_) => {
            RoomEvent::ActiveUserAcknowledge { conn_id }
        }
        GameClientMessage::ClientFirstShotReady(_) => RoomEvent::FirstShotReady { conn_id },
        GameClientMessage::ClientMessageSend(chat) => {
            let nickname = state.player.display_name().to_string();
            if state.room.is_some() {
                RoomEvent::Chat {
                    conn_id,
                    nickname,
                    message: chat.message,
                }
            } else {
                ctx.lobby
                    .notify(LobbyEvent::Chat {
                        nickname,
                        message: chat.message,
                    })
                    .await?;
                return Ok(());
            }
        }
        other => {
            debug!(conn_id, "처리하지 않는 메시지: {:?}", other);
            return Ok(());
        }
    };

    room_request(state, event).await
}
