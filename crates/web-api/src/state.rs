use std::sync::Arc;

use application::{ChatGateway, ChatService};
use infrastructure::LocalRoomHub;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGateway>,
    pub chat_service: Arc<ChatService>,
    /// 与网关共用的广播分组，连接循环在这里注册出站通道
    pub hub: Arc<LocalRoomHub>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        gateway: Arc<ChatGateway>,
        chat_service: Arc<ChatService>,
        hub: Arc<LocalRoomHub>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            gateway,
            chat_service,
            hub,
            jwt_service,
        }
    }
}
