//! 게임 서버 연결 처리
//!
//! 연결 메시지 → 세션 인증 → 초기 데이터 전송 → 메시지 루프 → 방/로비 퇴장

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shared::model::{Player, ServerType};
use shared::net::ServerConn;
use shared::protocol::game::{
    ChannelEntry, ClientAuth, GameClientMessage, GameServerMessage, LobbyPlayerEntry,
    ServerAchievementProgress,
    ServerAuthError, ServerChannelJoined, ServerChannelList, ServerCharData,
    ServerGameServerList, ServerLoginBonusStatus, ServerMessageConnect, ServerPlayerData,
    ServerPlayerInventory,
};
use shared::protocol::hello::game_hello;
use shared::protocol::MessageSet;
use shared::tool::error::{AppError, AuthError, StoreError};

use super::{game_handler, room_handler};
use crate::service::{RoomEvent, RoomHandle};
use crate::{GameContext, GameSender};

/// 게임 서버 연결
pub type GameConn = ServerConn<GameClientMessage, GameServerMessage>;

/// 인벤토리 한 페이지의 최대 항목 수
pub const INVENTORY_PAGE_SIZE: usize = 50;

/// 인증된 연결의 상태
pub struct ConnectionState {
    pub conn_id: u32,
    pub player: Player,
    pub sender: GameSender,
    pub in_lobby: bool,
    pub room: Option<RoomHandle>,
}

impl ConnectionState {
    pub fn context(&self) -> String {
        format!("Conn#{}", self.conn_id)
    }

    /// 현재 방 번호를 반영한 로비 인원 항목
    pub fn lobby_entry(&self) -> LobbyPlayerEntry {
        let mut entry = self.player.lobby_entry(self.conn_id);
        if let Some(room) = &self.room {
            entry.room_number = room.number();
        }
        entry
    }
}

/// 연결 하나 처리
pub async fn handle_connection(
    ctx: Arc<GameContext>,
    stream: TcpStream,
    addr: SocketAddr,
    token: CancellationToken,
) -> Result<()> {
    let mut conn = GameConn::new(stream, addr, ctx.services.tables.clone());
    conn.send_hello(&game_hello(conn.key())).await?;

    let auth = tokio::select! {
        _ = token.cancelled() => {
            conn.close().await;
            return Ok(());
        }
        message = conn.read_message() => match message? {
            GameClientMessage::ClientAuth(auth) => auth,
            other => {
                conn.close().await;
                return Err(anyhow!("첫 메시지가 ClientAuth가 아닙니다: {}", other.name()));
            }
        },
    };

    let mut state = match authenticate(&ctx, &conn, &auth).await {
        Ok(state) => state,
        Err(e) => {
            info!("게임 서버 인증 실패 ({}): {}", addr, e);
            conn.send_message(ServerAuthError {
                code: e.login_error_code(),
            })
            .await?;
            conn.close().await;
            return Ok(());
        }
    };
    ctx.online.fetch_add(1, Ordering::Relaxed);
    info!(
        conn_id = state.conn_id,
        player_id = state.player.player_id,
        "게임 서버 입장: {} ({})",
        state.player.display_name(),
        addr
    );

    let result = match send_initial_data(&ctx, &state).await {
        Ok(()) => message_loop(&ctx, &mut conn, &mut state, &token).await,
        Err(e) => Err(e.into()),
    };

    cleanup(&ctx, &mut state).await;
    ctx.online.fetch_sub(1, Ordering::Relaxed);
    conn.close().await;
    result
}

/// 세션 키 → 세션 → 플레이어 → 캐릭터, 인벤토리
async fn authenticate(
    ctx: &GameContext,
    conn: &GameConn,
    auth: &ClientAuth,
) -> Result<ConnectionState, AuthError> {
    let services = &ctx.services;
    let session = match services.sessions.get_session_by_key(&auth.login_key).await {
        Ok(session) => session,
        Err(StoreError::Expired(_)) => return Err(AuthError::SessionExpired(auth.player_id)),
        Err(_) => return Err(AuthError::InvalidSessionKey),
    };

    let mut player = services
        .accounts
        .get_player(session.player_id)
        .await
        .map_err(|_| AuthError::PlayerNotFound(session.player_id))?;
    player.characters = services.accounts.characters(player.player_id).await?;
    player.inventory = services.accounts.inventory(player.player_id).await?;

    services
        .sessions
        .update_session_expiry(session.session_id)
        .await?;

    Ok(ConnectionState {
        conn_id: session.session_id,
        player,
        sender: conn.sender(),
        in_lobby: false,
        room: None,
    })
}

async fn send_initial_data(ctx: &GameContext, state: &ConnectionState) -> Result<(), AppError> {
    let sender = &state.sender;
    let player = &state.player;

    sender
        .send_message(ServerPlayerData {
            sub_type: 0,
            data: player.main_data(),
        })
        .await?;
    sender
        .send_message(ServerCharData {
            characters: player
                .characters
                .iter()
                .map(|c| c.to_wire())
                .collect::<Vec<_>>()
                .into(),
        })
        .await?;
    sender
        .send_message(ServerAchievementProgress::default())
        .await?;

    for page in inventory_pages(player) {
        sender.send_message(page).await?;
    }

    sender.send_message(ServerMessageConnect {}).await?;
    sender.send_message(channel_list(ctx)).await?;
    Ok(())
}

/// 인벤토리를 페이지 단위로 분할 (빈 인벤토리도 한 페이지)
pub fn inventory_pages(player: &Player) -> Vec<ServerPlayerInventory> {
    let total = player.inventory.len().min(u16::MAX as usize) as u16;
    if player.inventory.is_empty() {
        return vec![ServerPlayerInventory {
            total,
            items: Default::default(),
        }];
    }
    player
        .inventory
        .chunks(INVENTORY_PAGE_SIZE)
        .map(|chunk| ServerPlayerInventory {
            total,
            items: chunk.iter().map(|i| i.to_wire()).collect::<Vec<_>>().into(),
        })
        .collect()
}

fn channel_list(ctx: &GameContext) -> ServerChannelList {
    let online = ctx.online.load(Ordering::Relaxed).min(u16::MAX as usize) as u16;
    let channels: Vec<ChannelEntry> = ctx
        .services
        .game_config
        .channels
        .iter()
        .map(|channel| ChannelEntry {
            name: channel.name.as_str().into(),
            max_users: channel.max_users,
            num_users: online.min(channel.max_users),
            id: channel.id,
            flags: 0,
        })
        .collect();
    ServerChannelList {
        channels: channels.into(),
    }
}

async fn message_loop(
    ctx: &GameContext,
    conn: &mut GameConn,
    state: &mut ConnectionState,
    token: &CancellationToken,
) -> Result<()> {
    loop {
        let message = tokio::select! {
            _ = token.cancelled() => {
                debug!(conn_id = state.conn_id, "게임 연결 취소");
                return Ok(());
            }
            message = conn.read_message() => message,
        };

        let message = match message {
            Ok(message) => message,
            Err(e) if e.is_closed() => {
                debug!(conn_id = state.conn_id, "클라이언트 연결 종료");
                return Ok(());
            }
            Err(e) => {
                e.log(&state.context());
                return Err(e.into());
            }
        };

        if let Err(e) = dispatch(ctx, state, message).await {
            if e.is_connection_fatal() {
                return Err(e.into());
            }
            e.log(&state.context());
        }
    }
}

/// 메시지 분류별 처리
async fn dispatch(
    ctx: &GameContext,
    state: &mut ConnectionState,
    message: GameClientMessage,
) -> Result<(), AppError> {
    match message {
        GameClientMessage::ClientAuth(_) => {
            warn!(conn_id = state.conn_id, "인증 이후의 ClientAuth 무시");
            Ok(())
        }
        GameClientMessage::ClientException(exception) => {
            warn!(
                conn_id = state.conn_id,
                "클라이언트 예외 보고: {}", exception.message
            );
            Ok(())
        }
        GameClientMessage::ClientRequestDailyReward(_) => {
            state
                .sender
                .send_message(ServerLoginBonusStatus {
                    status: 0,
                    item_type_id: 0,
                    quantity: 0,
                    consecutive_days: 1,
                })
                .await
        }
        GameClientMessage::ClientJoinChannel(join) => {
            let status = match ctx.services.game_config.channel(join.channel_id) {
                Some(_) => 0,
                None => 1,
            };
            state
                .sender
                .send_message(ServerChannelJoined { status })
                .await
        }
        GameClientMessage::ClientRequestServerList(_) => {
            let servers = ctx.services.topology.list_servers(ServerType::Game).await?;
            state
                .sender
                .send_message(ServerGameServerList {
                    servers: servers.iter().map(|s| s.to_entry()).collect::<Vec<_>>().into(),
                })
                .await
        }
        GameClientMessage::ClientBuyItem(buy) => {
            debug!(conn_id = state.conn_id, "아이템 구매 요청 {}건", buy.items.len());
            Ok(())
        }
        GameClientMessage::ClientEquipmentUpdate(update) => {
            debug!(
                conn_id = state.conn_id,
                kind = update.kind,
                "장비 변경 ({}바이트)",
                update.data.0.len()
            );
            if state.in_lobby {
                ctx.lobby.update(state.lobby_entry()).await?;
            }
            Ok(())
        }
        message if room_handler::is_room_message(&message) => {
            room_handler::handle(ctx, state, message).await
        }
        message => game_handler::handle(ctx, state, message).await,
    }
}

/// 방과 로비에서 퇴장
async fn cleanup(ctx: &GameContext, state: &mut ConnectionState) {
    if let Some(room) = state.room.take() {
        let conn_id = state.conn_id;
        if let Err(e) = room.request(RoomEvent::PlayerLeave { conn_id }).await {
            debug!(conn_id, "방 퇴장 실패: {}", e);
        }
    }
    if state.in_lobby {
        state.in_lobby = false;
        if let Err(e) = ctx.lobby.leave(state.conn_id, false).await {
            debug!(conn_id = state.conn_id, "로비 퇴장 실패: {}", e);
        }
    }
    debug!(conn_id = state.conn_id, "연결 정리 완료");
}
