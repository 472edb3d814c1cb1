//! 서버 토폴로지 모델

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::common::ServerEntry;

/// 서버 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    Login,
    Game,
    Message,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Login => "login",
            ServerType::Game => "game",
            ServerType::Message => "message",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "login" => Ok(ServerType::Login),
            "game" => Ok(ServerType::Game),
            "message" => Ok(ServerType::Message),
            other => Err(format!("알 수 없는 서버 종류: {}", other)),
        }
    }
}

/// 서버 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "type")]
    pub server_type: ServerType,
    pub id: u32,
    pub name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub num_users: u32,
    #[serde(default)]
    pub max_users: u32,
    #[serde(default)]
    pub flags: u32,
}

impl ServerInfo {
    /// 서버 목록 메시지 항목
    pub fn to_entry(&self) -> ServerEntry {
        ServerEntry {
            name: self.name.as_str().into(),
            server_id: self.id,
            max_users: self.max_users,
            num_users: self.num_users,
            address: self.address.as_str().into(),
            port: self.port,
            unknown: 0,
            flags: self.flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_entry() {
        let json = r#"{ "type": "game", "id": 20201, "name": "Rookie",
                        "address": "127.0.0.1", "port": 20201, "max_users": 2000 }"#;
        let info: ServerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.server_type, ServerType::Game);
        assert_eq!(info.num_users, 0);

        let entry = info.to_entry();
        assert_eq!(entry.server_id, 20201);
        assert_eq!(entry.address.as_str(), "127.0.0.1");
        assert_eq!(entry.port, 20201);
    }

    #[test]
    fn test_server_type_parse() {
        assert_eq!("Message".parse::<ServerType>(), Ok(ServerType::Message));
        assert!("relay".parse::<ServerType>().is_err());
        assert_eq!(ServerType::Login.to_string(), "login");
    }
}
