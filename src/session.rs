//! Bounded conversation window with decaying memory capacity.

use std::collections::VecDeque;

use chat_backend::{ChatMessage, ChatRole};

/// Number of exchanges retained in the window.
pub const SESSION_CAPACITY: usize = 5;
/// Memory level of a fresh session.
pub const MEMORY_LEVEL_MAX: u8 = 100;
/// Memory level never decays below this floor.
pub const MEMORY_LEVEL_FLOOR: u8 = 20;

const USER_EVICTION_COST: u8 = 10;
const ASSISTANT_EVICTION_COST: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeRole {
    User,
    Assistant,
}

impl ExchangeRole {
    fn eviction_cost(self) -> u8 {
        match self {
            Self::User => USER_EVICTION_COST,
            Self::Assistant => ASSISTANT_EVICTION_COST,
        }
    }

    /// Speaker label used in transcript renders.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "SCP-079",
        }
    }
}

/// One turn of conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    role: ExchangeRole,
    content: String,
}

impl Exchange {
    pub fn new(role: ExchangeRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn role(&self) -> ExchangeRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Model-facing form of this exchange.
    pub fn to_chat_message(&self) -> ChatMessage {
        let role = match self.role {
            ExchangeRole::User => ChatRole::User,
            ExchangeRole::Assistant => ChatRole::Assistant,
        };
        ChatMessage::new(role, self.content.clone())
    }
}

/// Ordered exchange log holding at most [`SESSION_CAPACITY`] entries.
///
/// Every eviction lowers `memory_level` by the evicted role's cost, floored
/// at [`MEMORY_LEVEL_FLOOR`]. Only [`ConversationSession::reset`] raises it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    exchanges: VecDeque<Exchange>,
    memory_level: u8,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            exchanges: VecDeque::with_capacity(SESSION_CAPACITY + 1),
            memory_level: MEMORY_LEVEL_MAX,
        }
    }

    /// Appends an exchange, evicting the oldest one when over capacity.
    ///
    /// Returns the evicted exchange, if any.
    pub fn append(&mut self, role: ExchangeRole, content: impl Into<String>) -> Option<Exchange> {
        self.exchanges.push_back(Exchange::new(role, content));
        if self.exchanges.len() <= SESSION_CAPACITY {
            return None;
        }

        let evicted = self.exchanges.pop_front()?;
        self.memory_level = self
            .memory_level
            .saturating_sub(evicted.role.eviction_cost())
            .max(MEMORY_LEVEL_FLOOR);
        Some(evicted)
    }

    /// Current exchanges, oldest first.
    pub fn snapshot(&self) -> Vec<Exchange> {
        self.exchanges.iter().cloned().collect()
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn reset(&mut self) {
        self.exchanges.clear();
        self.memory_level = MEMORY_LEVEL_MAX;
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn memory_level(&self) -> u8 {
        self.memory_level
    }
}
