//! Store and history-dump integration tests

use chatkeeper::db::{
    LoggedMessage, MessageDirection, MessageLogRepo, SettingsRepo, SourceRepo, DEST_CHANNEL_KEY,
};
use chatkeeper::sources::load_jsonl;

mod common;
use common::{nov, setup_test_db};

#[test]
fn repos_share_one_database() {
    let db = setup_test_db();
    let settings = SettingsRepo::new(db.clone());
    let sources = SourceRepo::new(db.clone());
    let log = MessageLogRepo::new(db);

    settings.set_dest_channel(Some(-100_900)).unwrap();
    sources.add(-1001, "Tech").unwrap();
    log.log(&LoggedMessage {
        date: nov(2, 9),
        chat_id: -1001,
        sender_id: 0,
        text: "hello".to_string(),
        direction: MessageDirection::Incoming,
    })
    .unwrap();

    assert_eq!(settings.dest_channel().unwrap(), Some(-100_900));
    assert_eq!(sources.ids().unwrap().into_iter().collect::<Vec<_>>(), vec![-1001]);
    assert_eq!(log.count().unwrap(), 1);
    assert_eq!(log.count_for_chat(-1001).unwrap(), 1);
    assert_eq!(log.count_for_chat(-1002).unwrap(), 0);
}

#[test]
fn file_store_persists_across_pools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatkeeper.db");

    {
        let db = chatkeeper::db::init(&path).unwrap();
        SettingsRepo::new(db).set(DEST_CHANNEL_KEY, "off").unwrap();
    }

    let db = chatkeeper::db::init(&path).unwrap();
    let settings = SettingsRepo::new(db);
    assert_eq!(settings.get(DEST_CHANNEL_KEY).unwrap().as_deref(), Some("off"));
    assert_eq!(settings.dest_channel().unwrap(), None);
}

#[test]
fn history_dump_resolves_media_next_to_it() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.jpg"), b"img").unwrap();
    let dump = dir.path().join("history.jsonl");
    std::fs::write(
        &dump,
        concat!(
            r#"{"id":1,"timestamp":"2024-11-01T08:00:00Z","text":"first","is_self_authored":true}"#,
            "\n",
            r#"{"id":2,"timestamp":"2024-11-01T09:00:00Z","media":{"kind":"photo","file_ref":"a.jpg"}}"#,
            "\n",
            r#"{"id":3,"timestamp":"2024-11-01T10:00:00Z","media":{"kind":"poll","file_ref":"x"}}"#,
            "\n",
        ),
    )
    .unwrap();

    let source = load_jsonl(&dump).unwrap();
    let ids: Vec<i64> = source.messages().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert!(source.messages()[2].is_self_authored);
    assert_eq!(
        source.messages()[0].media.as_ref().map(|m| m.kind),
        Some(chatkeeper::export::MediaKind::Other)
    );
}

#[test]
fn malformed_dump_line_is_reported_with_position() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("history.jsonl");
    std::fs::write(&dump, "{\"id\":1,\"timestamp\":\"2024-11-01T08:00:00Z\"}\nnot json\n").unwrap();

    let err = load_jsonl(&dump).unwrap_err();
    assert!(err.to_string().contains("history.jsonl:2"), "{err}");
}
