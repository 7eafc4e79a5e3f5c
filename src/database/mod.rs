pub mod episode_state;
mod redis_connection;

pub use episode_state::*;
pub use redis_connection::RedisDatabase;
