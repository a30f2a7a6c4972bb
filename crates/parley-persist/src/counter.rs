//! Denormalized child counts kept on parent rows.
//!
//! `applications.chats_count` and `chats.messages_count` are adjusted by the
//! same transaction that inserts or deletes the child, so a committed
//! parent's count always equals its number of children.

use crate::error::{PersistError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    ChatsCount,
    MessagesCount,
}

impl CounterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterField::ChatsCount => "chats_count",
            CounterField::MessagesCount => "messages_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    pub field: CounterField,
    pub delta: i64,
}

impl CounterUpdate {
    pub fn increment(field: CounterField) -> Self {
        Self { field, delta: 1 }
    }

    pub fn decrement(field: CounterField) -> Self {
        Self { field, delta: -1 }
    }

    /// Apply the delta to an in-memory count
    pub fn apply(&self, current: i64) -> Result<i64> {
        let next = current.checked_add(self.delta).ok_or_else(|| {
            PersistError::Internal(format!("{} overflowed", self.field.as_str()))
        })?;

        if next < 0 {
            return Err(PersistError::Internal(format!(
                "{} would drop below zero",
                self.field.as_str()
            )));
        }
        Ok(next)
    }

    /// `$inc` fragment for the parent update
    #[cfg(feature = "mongodb")]
    pub fn to_inc_doc(&self) -> bson::Document {
        let mut doc = bson::Document::new();
        doc.insert(self.field.as_str(), self.delta);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_and_decrement() {
        let inc = CounterUpdate::increment(CounterField::ChatsCount);
        let dec = CounterUpdate::decrement(CounterField::ChatsCount);
        assert_eq!(inc.apply(2).unwrap(), 3);
        assert_eq!(dec.apply(3).unwrap(), 2);
    }

    #[test]
    fn test_never_negative() {
        let dec = CounterUpdate::decrement(CounterField::MessagesCount);
        assert!(matches!(dec.apply(0), Err(PersistError::Internal(_))));
    }

    #[cfg(feature = "mongodb")]
    #[test]
    fn test_inc_doc() {
        let doc = CounterUpdate::increment(CounterField::MessagesCount).to_inc_doc();
        assert_eq!(doc, bson::doc! { "messages_count": 1_i64 });
    }
}
