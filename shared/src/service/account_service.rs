//! 계정 저장소
//!
//! 플레이어, 캐릭터, 인벤토리를 다루는 외부 저장소의 인터페이스와 메모리 구현입니다.
//! 백엔드는 `DATABASE_URL`로 생성 시점에 결정됩니다.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::password_helper::{hash_password, validate_username, verify_password};
use crate::model::{Character, InventoryItem, Player};
use crate::tool::error::{AppError, AuthError, StoreError};

/// 계정 저장소 인터페이스
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 계정 생성
    async fn register(&self, username: &str, password: &str) -> Result<Player, StoreError>;

    /// 계정 이름과 비밀번호로 인증
    async fn authenticate(&self, username: &str, password: &str) -> Result<Player, AuthError>;

    async fn get_player(&self, player_id: u32) -> Result<Player, StoreError>;

    async fn set_nickname(&self, player_id: u32, nickname: &str) -> Result<(), StoreError>;

    async fn characters(&self, player_id: u32) -> Result<Vec<Character>, StoreError>;

    /// 캐릭터 추가 (ID는 저장소가 배정)
    async fn add_character(&self, player_id: u32, character: Character)
        -> Result<Character, StoreError>;

    /// 장착 캐릭터 변경
    async fn set_active_character(&self, player_id: u32, character_id: u32)
        -> Result<(), StoreError>;

    async fn inventory(&self, player_id: u32) -> Result<Vec<InventoryItem>, StoreError>;

    /// 아이템 지급 (ID는 저장소가 배정)
    async fn add_item(
        &self,
        player_id: u32,
        item_type_id: u32,
        quantity: u32,
    ) -> Result<InventoryItem, StoreError>;

    /// 클럽 세트 장착 (인벤토리에 있는 아이템이어야 함)
    async fn set_club_set(&self, player_id: u32, item_id: u32) -> Result<(), StoreError>;
}

#[derive(Default)]
struct AccountData {
    players: HashMap<u32, Player>,
    by_username: HashMap<String, u32>,
    next_player_id: u32,
    next_character_id: u32,
    next_item_id: u32,
}

impl AccountData {
    fn player_mut(&mut self, player_id: u32) -> Result<&mut Player, StoreError> {
        self.players
            .get_mut(&player_id)
            .ok_or_else(|| StoreError::NotFound(format!("플레이어 {}", player_id)))
    }
}

/// 메모리 계정 저장소
///
/// 모든 작업은 하나의 잠금 안에서 끝나므로 작업 단위로 원자적입니다.
/// bcrypt 계산은 잠금 밖의 블로킹 스레드에서 수행합니다.
pub struct MemoryAccountStore {
    data: Mutex<AccountData>,
    bcrypt_cost: u32,
}

impl MemoryAccountStore {
    pub fn new(bcrypt_cost: u32) -> Self {
        Self {
            data: Mutex::new(AccountData {
                next_player_id: 1,
                next_character_id: 1,
                next_item_id: 1,
                ..Default::default()
            }),
            bcrypt_cost,
        }
    }

    pub fn player_count(&self) -> usize {
        self.data.lock().players.len()
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new(super::password_helper::DEFAULT_COST)
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Backend(format!("해시 작업 실패: {}", e)))?
        .map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn register(&self, username: &str, password: &str) -> Result<Player, StoreError> {
        validate_username(username).map_err(|e| StoreError::Backend(e.to_string()))?;
        if self.data.lock().by_username.contains_key(username) {
            return Err(StoreError::Duplicate(username.to_string()));
        }

        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let password_hash = blocking(move || hash_password(&password, cost)).await?;

        let mut data = self.data.lock();
        // 해시 계산 중에 같은 이름이 등록되었을 수 있음
        if data.by_username.contains_key(username) {
            return Err(StoreError::Duplicate(username.to_string()));
        }
        let player_id = data.next_player_id;
        data.next_player_id += 1;

        let player = Player {
            player_id,
            username: username.to_string(),
            password_hash,
            ..Default::default()
        };
        data.by_username.insert(player.username.clone(), player_id);
        data.players.insert(player_id, player.clone());
        info!(player_id, "계정 생성: {}", username);
        Ok(player)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Player, AuthError> {
        let player = {
            let data = self.data.lock();
            data.by_username
                .get(username)
                .and_then(|id| data.players.get(id))
                .cloned()
                .ok_or_else(|| AuthError::UnknownUsername(username.to_string()))?
        };

        let password = password.to_string();
        let hash = player.password_hash.clone();
        let valid = blocking(move || verify_password(&password, &hash)).await?;
        if !valid {
            return Err(AuthError::InvalidPassword(username.to_string()));
        }

        debug!(player_id = player.player_id, "인증 성공: {}", username);
        Ok(player)
    }

    async fn get_player(&self, player_id: u32) -> Result<Player, StoreError> {
        self.data.lock().player_mut(player_id).map(|p| p.clone())
    }

    async fn set_nickname(&self, player_id: u32, nickname: &str) -> Result<(), StoreError> {
        self.data.lock().player_mut(player_id)?.nickname = Some(nickname.to_string());
        Ok(())
    }

    async fn characters(&self, player_id: u32) -> Result<Vec<Character>, StoreError> {
        Ok(self.data.lock().player_mut(player_id)?.characters.clone())
    }

    async fn add_character(
        &self,
        player_id: u32,
        mut character: Character,
    ) -> Result<Character, StoreError> {
        let mut data = self.data.lock();
        let id = data.next_character_id;
        let player = data.player_mut(player_id)?;
        character.id = id;
        player.characters.push(character.clone());
        data.next_character_id += 1;
        Ok(character)
    }

    async fn set_active_character(
        &self,
        player_id: u32,
        character_id: u32,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock();
        let player = data.player_mut(player_id)?;
        if !player.characters.iter().any(|c| c.id == character_id) {
            return Err(StoreError::NotFound(format!("캐릭터 {}", character_id)));
        }
        player.equipped.character_id = character_id;
        Ok(())
    }

    async fn inventory(&self, player_id: u32) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(self.data.lock().player_mut(player_id)?.inventory.clone())
    }

    async fn add_item(
        &self,
        player_id: u32,
        item_type_id: u32,
        quantity: u32,
    ) -> Result<InventoryItem, StoreError> {
        let mut data = self.data.lock();
        let item_id = data.next_item_id;
        let player = data.player_mut(player_id)?;
        let item = InventoryItem {
            item_id,
            item_type_id,
            quantity,
        };
        player.inventory.push(item);
        data.next_item_id += 1;
        Ok(item)
    }

    async fn set_club_set(&self, player_id: u32, item_id: u32) -> Result<(), StoreError> {
        let mut data = self.data.lock();
        let player = data.player_mut(player_id)?;
        if !player.inventory.iter().any(|i| i.item_id == item_id) {
            return Err(StoreError::NotFound(format!("아이템 {}", item_id)));
        }
        player.equipped.club_id = item_id;
        Ok(())
    }
}

/// `DATABASE_URL`에 맞는 계정 저장소 생성
///
/// 현재는 `memory://`만 지원합니다.
pub fn open_account_store(
    database_url: &str,
    bcrypt_cost: u32,
) -> Result<Arc<dyn AccountStore>, AppError> {
    if database_url.starts_with("memory://") {
        info!("메모리 계정 저장소 사용");
        Ok(Arc::new(MemoryAccountStore::new(bcrypt_cost)))
    } else {
        Err(AppError::Configuration(format!(
            "지원하지 않는 DATABASE_URL: {}",
            database_url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::password_helper::MIN_COST;

    fn store() -> MemoryAccountStore {
        MemoryAccountStore::new(MIN_COST)
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let store = store();
        let player = store.register("alice", "secret").await.unwrap();
        assert_eq!(player.player_id, 1);
        assert!(player.nickname.is_none());

        let authed = store.authenticate("alice", "secret").await.unwrap();
        assert_eq!(authed.player_id, player.player_id);

        assert!(matches!(
            store.authenticate("alice", "wrong").await,
            Err(AuthError::InvalidPassword(_))
        ));
        assert!(matches!(
            store.authenticate("bob", "secret").await,
            Err(AuthError::UnknownUsername(_))
        ));
        assert!(matches!(
            store.register("alice", "again").await,
            Err(StoreError::Duplicate(_))
        ));
        println!("✅ 계정 생성/인증 테스트 통과");
    }

    #[tokio::test]
    async fn test_provisioning() {
        let store = store();
        let player = store.register("carol", "pw").await.unwrap();
        let id = player.player_id;

        store.set_nickname(id, "Carol").await.unwrap();
        let character = store
            .add_character(
                id,
                Character {
                    char_type_id: 0x0400_0001,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store.set_active_character(id, character.id).await.unwrap();
        assert!(store.set_active_character(id, 999).await.is_err());

        let club = store.add_item(id, 0x1000_0000, 1).await.unwrap();
        store.set_club_set(id, club.item_id).await.unwrap();
        assert!(store.set_club_set(id, club.item_id + 100).await.is_err());

        let player = store.get_player(id).await.unwrap();
        assert_eq!(player.nickname.as_deref(), Some("Carol"));
        assert_eq!(player.equipped.character_id, character.id);
        assert_eq!(player.equipped.club_id, club.item_id);
        assert_eq!(store.characters(id).await.unwrap().len(), 1);
        assert_eq!(store.inventory(id).await.unwrap(), vec![club]);
        assert!(matches!(
            store.get_player(42).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_open_account_store() {
        assert!(open_account_store("memory://", MIN_COST).is_ok());
        assert!(matches!(
            open_account_store("mysql://localhost/golf", MIN_COST),
            Err(AppError::Configuration(_))
        ));
    }
}
