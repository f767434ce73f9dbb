//! 基础设施层实现。
//!
//! 提供进程内房间广播分组、内存与 PostgreSQL 仓储等适配器，实现应用层定义的接口。

pub mod broadcast;
pub mod memory;
pub mod repository;

pub use broadcast::LocalRoomHub;
pub use memory::{InMemoryMessageRepository, InMemoryUserRepository};
pub use repository::{create_pg_pool, PgMessageRepository, PgUserRepository, MIGRATOR};
