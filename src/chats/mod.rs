//! Chat records and the repository that owns them

pub mod clock;
pub mod repository;
pub mod types;

pub use clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
pub use repository::{ChatRepository, ChatsState};
pub use types::{Chat, ChatRecord, Message, ModelSettings, ModelSettingsPatch, Role};
