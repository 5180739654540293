use super::ids::ChatId;
use std::sync::Arc;

/// The fixed set of chat ids allowed to run admin commands and to receive
/// operator broadcasts.
#[derive(Debug, Clone, Default)]
pub struct Admins(Arc<[ChatId]>);

impl Admins {
    pub fn new(ids: impl IntoIterator<Item = ChatId>) -> Self {
        let mut ids: Vec<ChatId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        Self(ids.into())
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.0.binary_search(&chat_id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChatId> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
