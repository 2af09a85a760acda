use crate::auth::Identity;
use crate::relay::{Connection, Dispatch, Message, RoomRegistry, Session};
use crate::store::InMemoryMessageStore;
use std::sync::Arc;
use tokio::sync::mpsc;

fn connection(id: &str, capacity: usize) -> (Arc<Connection>, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(capacity);
    let identity = Identity::new(format!("user-{id}"), format!("{id}@example.com"));
    (Arc::new(Connection::with_id(id, identity, tx)), rx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_racing_close_leaves_no_membership() {
    for round in 0..50 {
        let registry = Arc::new(RoomRegistry::new());
        let (conn, _rx) = connection(&format!("c{round}"), 16);
        registry.register(&conn).unwrap();

        let mut joins = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            let conn = conn.clone();
            joins.push(tokio::spawn(async move {
                let _ = registry.join(&format!("room-{i}"), &conn);
            }));
        }
        let closer = {
            let registry = registry.clone();
            let conn = conn.clone();
            tokio::spawn(async move { registry.close_connection(&conn, "race") })
        };

        for join in joins {
            join.await.unwrap();
        }
        assert!(closer.await.unwrap());

        assert!(registry.rooms_of(conn.id()).is_empty(), "round {round}");
        assert_eq!(registry.room_count(), 0, "round {round}");
        assert_eq!(registry.connection_count(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_broadcasts_and_disconnects() {
    let registry = Arc::new(RoomRegistry::new());
    let session = Arc::new(Session::new(
        registry.clone(),
        Arc::new(InMemoryMessageStore::new()),
    ));

    let mut conns = Vec::new();
    let mut receivers = Vec::new();
    for i in 0..10 {
        let (conn, rx) = connection(&format!("c{i}"), 256);
        registry.register(&conn).unwrap();
        registry.join("lobby", &conn).unwrap();
        conns.push(conn);
        receivers.push(rx);
    }

    let mut tasks = Vec::new();
    for (i, conn) in conns.iter().enumerate() {
        let session = session.clone();
        let registry = registry.clone();
        let conn = conn.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..5 {
                let frame = format!(r#"{{"type":"message","room_id":"lobby","text":"{i}-{n}"}}"#);
                session.handle_frame(&conn, &frame).await.unwrap();
            }
            if i % 2 == 0 {
                registry.close_connection(&conn, "client disconnected");
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(registry.member_count("lobby"), 5);
    for (i, conn) in conns.iter().enumerate() {
        assert_eq!(registry.is_member("lobby", conn.id()), i % 2 == 1);
    }
}

#[tokio::test]
async fn test_closed_sender_message_is_dropped() {
    let registry = Arc::new(RoomRegistry::new());
    let store = Arc::new(InMemoryMessageStore::new());
    let session = Session::new(registry.clone(), store.clone());
    let (a, _rx_a) = connection("a", 8);
    let (b, mut rx_b) = connection("b", 8);
    for conn in [&a, &b] {
        registry.register(conn).unwrap();
        registry.join("r1", conn).unwrap();
    }

    registry.close_connection(&a, "client disconnected");
    let dispatch = session
        .handle_frame(&a, r#"{"type":"message","room_id":"r1","text":"late"}"#)
        .await
        .unwrap();

    assert_eq!(dispatch, Dispatch::Dropped);
    assert!(rx_b.try_recv().is_err());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_join_after_close_is_refused() {
    let registry = Arc::new(RoomRegistry::new());
    let session = Session::new(registry.clone(), Arc::new(InMemoryMessageStore::new()));
    let (a, _rx) = connection("a", 8);
    registry.register(&a).unwrap();
    registry.close_connection(&a, "client disconnected");

    assert!(session
        .handle_frame(&a, r#"{"type":"join","room_id":"r1"}"#)
        .await
        .is_err());
    assert_eq!(registry.room_count(), 0);
}
