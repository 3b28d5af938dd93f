mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::ScriptedGenerator;
use sopdesk_core::config::SentimentSettings;
use sopdesk_core::traits::SentimentStore;
use sopdesk_core::types::{EmailMessage, EmailThread, Sentiment, SentimentRecord};
use sopdesk_core::{Error, ParseError};
use sopdesk_rag::store::MemoryStore;
use sopdesk_rag::{SentimentClassifier, ThreadSentimentOutcome};

fn thread(id: &str, content: &str) -> EmailThread {
    EmailThread {
        id: id.into(),
        topic: "Delivery".into(),
        messages: vec![EmailMessage {
            sender_name: "Cy".into(),
            sender_email: "cy@example.com".into(),
            received_at: None,
            subject: String::new(),
            content: content.into(),
            from_support: false,
        }],
    }
}

fn classifier(generator: ScriptedGenerator, fallback: Option<Sentiment>) -> SentimentClassifier {
    SentimentClassifier::new(Arc::new(generator), &SentimentSettings { fallback, refresh_after_mins: 300 }).unwrap()
}

#[test]
fn out_of_range_refresh_window_is_an_error() {
    for refresh_after_mins in [i64::MAX / 2, -1] {
        let settings = SentimentSettings { fallback: None, refresh_after_mins };
        let result = SentimentClassifier::new(Arc::new(ScriptedGenerator::new()), &settings);
        assert!(matches!(result, Err(Error::InvalidConfig(_))), "{refresh_after_mins} should be rejected");
    }
}

#[tokio::test]
async fn labels_are_read_loosely() {
    let c = classifier(
        ScriptedGenerator::new()
            .reply("third time", "**Critical**")
            .reply("thanks", "Neutral.")
            .reply("update", " needs attention\n"),
        None,
    );
    assert_eq!(c.classify(&thread("a", "This is the third time I ask!")).await.unwrap(), Sentiment::Critical);
    assert_eq!(c.classify(&thread("b", "Got it, thanks")).await.unwrap(), Sentiment::Neutral);
    assert_eq!(c.classify(&thread("c", "Any update?")).await.unwrap(), Sentiment::NeedsAttention);
}

#[tokio::test]
async fn unknown_label_uses_the_configured_fallback() {
    let with = classifier(ScriptedGenerator::new().otherwise("Happy"), Some(Sentiment::Positive));
    assert_eq!(with.classify(&thread("a", "Great job")).await.unwrap(), Sentiment::Positive);

    let without = classifier(ScriptedGenerator::new().otherwise("Happy"), None);
    let err = without.classify(&thread("a", "Great job")).await.unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::UnknownSentiment(_))));
}

#[tokio::test]
async fn recent_sentiment_is_not_recomputed() {
    let store = MemoryStore::new();
    let c = classifier(ScriptedGenerator::new().otherwise("Critical"), None);
    let now = Utc::now();
    store
        .record(&SentimentRecord { thread_id: "a".into(), sentiment: Sentiment::Neutral, updated_at: now - Duration::hours(1) })
        .await
        .unwrap();

    let skipped = c.refresh_thread_sentiment(&thread("a", "Where is it?"), &store, now).await.unwrap();
    assert!(skipped.is_none());
    assert_eq!(store.latest("a").await.unwrap().unwrap().sentiment, Sentiment::Neutral);

    let later = now + Duration::hours(5);
    let updated = c.refresh_thread_sentiment(&thread("a", "Where is it?"), &store, later).await.unwrap();
    assert_eq!(updated.unwrap().sentiment, Sentiment::Critical);
    assert_eq!(store.latest("a").await.unwrap().unwrap().updated_at, later);
}

#[tokio::test]
async fn refresh_all_isolates_failures() {
    let store = MemoryStore::new()
        .with_thread(thread("ok", "Thanks for the update"))
        .with_thread(thread("bad", "Where is my parcel"));
    let c = classifier(ScriptedGenerator::new().reply("Thanks", "Neutral").fail("parcel", "timeout"), None);

    let outcomes = c.refresh_all(&store, &store).await.unwrap();

    assert!(matches!(&outcomes[0], ThreadSentimentOutcome::Updated { sentiment: Sentiment::Neutral, .. }));
    assert!(matches!(&outcomes[1], ThreadSentimentOutcome::Failed { error: Error::Generation(_), .. }));
    assert!(store.latest("bad").await.unwrap().is_none());
}
