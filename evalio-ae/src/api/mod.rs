//! HTTP API for evalio-ae

pub mod answers;
pub mod caller;
pub mod health;
pub mod sessions;
pub mod tts;

pub use answers::answer_routes;
pub use caller::{CallerId, USER_HEADER};
pub use health::health_routes;
pub use sessions::session_routes;
pub use tts::tts_routes;
