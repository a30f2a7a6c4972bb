use std::sync::Arc;

use chrono::Utc;
use parley_search::{MemorySearchIndex, MessageDocument, SearchError, SearchGateway, SearchIndex};
use parley_types::PageRequest;

fn doc(token: &str, chat: i64, number: i64, body: &str) -> MessageDocument {
    MessageDocument {
        application_token: token.to_string(),
        chat_number: chat,
        message_number: number,
        body: body.to_string(),
        created_at: Utc::now(),
    }
}

async fn seeded() -> SearchGateway {
    let index = Arc::new(MemorySearchIndex::new());
    // Inserted out of order on purpose
    for document in [
        doc("tok", 1, 3, "hello there"),
        doc("tok", 1, 1, "hello world"),
        doc("tok", 1, 2, "goodbye world"),
        doc("tok", 2, 1, "hello from another chat"),
        doc("other", 1, 1, "hello from another app"),
    ] {
        index.index_message(&document).await.unwrap();
    }
    SearchGateway::new(index)
}

#[tokio::test]
async fn finds_matches_in_message_order() {
    let gateway = seeded().await;

    let page = gateway
        .search("tok", 1, "hello", PageRequest::new(1, 20))
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    let numbers: Vec<_> = page.results.iter().map(|d| d.message_number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 20);
}

#[tokio::test]
async fn windows_results_but_keeps_total() {
    let gateway = seeded().await;

    let page = gateway
        .search("tok", 1, "WORLD", PageRequest::new(2, 1))
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].body, "goodbye world");
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let gateway = seeded().await;

    let err = gateway
        .search("tok", 1, "  ", PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery(_)));
}

#[tokio::test]
async fn reindexing_replaces_document() {
    let index = Arc::new(MemorySearchIndex::new());
    index.index_message(&doc("tok", 1, 1, "first")).await.unwrap();
    index.index_message(&doc("tok", 1, 1, "second")).await.unwrap();
    assert_eq!(index.len(), 1);
}
