//! 로그인 연결 처리
//!
//! 한 연결의 전체 흐름을 순서대로 기다리는 선형 코루틴입니다.
//! 연결 메시지 → 인증 → 닉네임 → 시작 클럽 세트 → 캐릭터 → 세션 키 → 서버 목록 → 서버 선택

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shared::model::{Character, Player, ServerType};
use shared::net::ServerConn;
use shared::protocol::common::ServerList;
use shared::protocol::hello::login_hello;
use shared::protocol::MessageSet;
use shared::protocol::login::{
    LoginClientMessage, LoginServerMessage, LoginStatus, Server0011, ServerGameServerList,
    ServerGameSessionKey, ServerLogin, ServerLoginSessionKey, ServerMessageServerList,
    ServerNicknameCheckResponse,
};
use shared::tool::error::AppError;

use crate::LoginContext;

/// 로그인 서버 연결
pub type LoginConn = ServerConn<LoginClientMessage, LoginServerMessage>;

/// 닉네임 최대 길이 (문자 수)
pub const MAX_NICKNAME_CHARS: usize = 16;

/// 닉네임 형식 검사
pub fn is_valid_nickname(nickname: &str) -> bool {
    let trimmed = nickname.trim();
    !trimmed.is_empty() && nickname.chars().count() <= MAX_NICKNAME_CHARS
}

/// 연결 하나 처리
///
/// 취소 토큰이 취소되면 진행 중인 단계와 관계없이 연결을 닫습니다.
pub async fn handle_connection(
    ctx: Arc<LoginContext>,
    stream: TcpStream,
    addr: SocketAddr,
    token: CancellationToken,
) -> Result<()> {
    let conn = LoginConn::new(stream, addr, ctx.tables.clone());
    tokio::select! {
        _ = token.cancelled() => {
            debug!("로그인 연결 취소: {}", addr);
            Ok(())
        }
        result = login_flow(&ctx, conn) => result,
    }
}

async fn login_flow(ctx: &LoginContext, mut conn: LoginConn) -> Result<()> {
    let addr = conn.addr();
    conn.send_hello(&login_hello(conn.key(), ctx.server_id)).await?;

    // 1. 계정 인증
    let login = match conn.read_message().await? {
        LoginClientMessage::ClientLogin(login) => login,
        other => return Err(anyhow!("첫 메시지가 ClientLogin이 아닙니다: {}", other.name())),
    };

    let mut player = match ctx.accounts.authenticate(&login.username, &login.password).await {
        Ok(player) => player,
        Err(e) => {
            info!("로그인 실패 ({}): {}", addr, e);
            conn.send_message(ServerLogin {
                status: LoginStatus::Error {
                    code: e.login_error_code(),
                },
            })
            .await?;
            conn.close().await;
            return Ok(());
        }
    };
    info!(player_id = player.player_id, "로그인: {} ({})", player.username, addr);

    // 2. 닉네임
    if player.nickname.is_none() {
        let nickname = choose_nickname(&mut conn).await?;
        ctx.accounts.set_nickname(player.player_id, &nickname).await?;
        player.nickname = Some(nickname);
    }

    // 3. 시작 클럽 세트
    if player.equipped.club_id == 0 {
        let club = ctx
            .accounts
            .add_item(player.player_id, ctx.game_config.default_club_set_type_id, 1)
            .await?;
        ctx.accounts.set_club_set(player.player_id, club.item_id).await?;
        debug!(player_id = player.player_id, "시작 클럽 세트 지급: {}", club.item_id);
    }

    // 4. 첫 캐릭터
    if ctx.accounts.characters(player.player_id).await?.is_empty() {
        provision_character(ctx, &mut conn, &player).await?;
    }

    // 5. 세션 발급
    let session = ctx
        .sessions
        .add_session(player.player_id, &addr.to_string())
        .await?;

    conn.send_message(Server0011 { unknown: 0 }).await?;
    conn.send_message(ServerLoginSessionKey {
        key: session.key.clone(),
    })
    .await?;
    conn.send_message(ServerLogin {
        status: LoginStatus::Success {
            username: player.username.clone(),
            player_id: player.player_id,
            nickname: player.display_name().to_string(),
        },
    })
    .await?;

    // 6. 서버 목록
    conn.send_message(ServerMessageServerList {
        servers: server_list(ctx, ServerType::Message).await?,
    })
    .await?;
    conn.send_message(ServerGameServerList {
        servers: server_list(ctx, ServerType::Game).await?,
    })
    .await?;

    // 7. 서버 선택
    loop {
        match conn.read_message().await? {
            LoginClientMessage::ClientSelectServer(select) => {
                debug!(player_id = player.player_id, "서버 선택: {}", select.server_id);
                break;
            }
            other => debug!("서버 선택 대기 중 무시: {}", other.name()),
        }
    }

    conn.send_message(ServerGameSessionKey {
        status: 0,
        key: session.key,
    })
    .await?;
    info!(player_id = player.player_id, "로그인 완료, 연결 종료: {}", addr);
    conn.close().await;
    Ok(())
}

/// 닉네임이 확정될 때까지 확인/설정 요청 처리
async fn choose_nickname(conn: &mut LoginConn) -> Result<String, AppError> {
    conn.send_message(ServerLogin {
        status: LoginStatus::SetNickname { unknown: 0 },
    })
    .await?;

    loop {
        match conn.read_message().await? {
            LoginClientMessage::ClientCheckNickname(check) => {
                let status = if is_valid_nickname(&check.nickname) { 0 } else { 1 };
                conn.send_message(ServerNicknameCheckResponse {
                    status,
                    nickname: check.nickname,
                })
                .await?;
            }
            LoginClientMessage::ClientSetNickname(set) => {
                if is_valid_nickname(&set.nickname) {
                    return Ok(set.nickname);
                }
                warn!("잘못된 닉네임 거부: {:?}", set.nickname);
                conn.send_message(ServerNicknameCheckResponse {
                    status: 1,
                    nickname: set.nickname,
                })
                .await?;
            }
            other => debug!("닉네임 대기 중 무시: {}", other.name()),
        }
    }
}

/// 첫 캐릭터 생성 후 장착
async fn provision_character(
    ctx: &LoginContext,
    conn: &mut LoginConn,
    player: &Player,
) -> Result<(), AppError> {
    conn.send_message(ServerLogin {
        status: LoginStatus::SetCharacter {},
    })
    .await?;

    let select = loop {
        match conn.read_message().await? {
            LoginClientMessage::ClientSelectCharacter(select) => break select,
            other => debug!("캐릭터 선택 대기 중 무시: {}", other.name()),
        }
    };

    let character = Character {
        char_type_id: select.char_type_id,
        hair_color: select.hair_color as u8,
        part_type_ids: ctx.game_config.part_type_ids(select.char_type_id),
        ..Default::default()
    };
    let character = ctx.accounts.add_character(player.player_id, character).await?;
    ctx.accounts
        .set_active_character(player.player_id, character.id)
        .await?;
    info!(
        player_id = player.player_id,
        "캐릭터 생성: {:#x} (id {})", character.char_type_id, character.id
    );
    Ok(())
}

async fn server_list(ctx: &LoginContext, server_type: ServerType) -> Result<ServerList, AppError> {
    let servers = ctx.topology.list_servers(server_type).await?;
    Ok(servers.iter().map(|s| s.to_entry()).collect::<Vec<_>>().into())
}
