pub mod application;
pub mod chat;
pub mod message;

pub use application::MongoApplicationRepository;
pub use chat::MongoChatRepository;
pub use message::MongoMessageRepository;

/// Cursor limit for a window; anything past i64::MAX is unbounded in practice
pub(crate) fn cursor_limit(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Cursor skip for a window; the server only accepts values up to i64::MAX
pub(crate) fn cursor_skip(offset: u64) -> u64 {
    offset.min(i64::MAX as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::options::FindOptions;

    #[test]
    fn test_cursor_skip_clamps_huge_offsets() {
        assert_eq!(cursor_skip(40), 40);
        assert_eq!(cursor_skip(u64::MAX), i64::MAX as u64);
    }

    #[test]
    fn test_huge_page_window_still_serializes() {
        let offset = (500_000_000_000_000_000u64 - 1).saturating_mul(20);
        let options = FindOptions::builder()
            .skip(cursor_skip(offset))
            .limit(cursor_limit(20))
            .build();

        let doc = bson::to_document(&options).unwrap();
        assert_eq!(doc.get_i64("skip").unwrap(), i64::MAX);
    }
}
