use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use roomrelay::auth::Identity;
use roomrelay::relay::{Broadcaster, Connection, Message, RoomRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;

fn populate(registry: &RoomRegistry, members: usize) -> Vec<(Arc<Connection>, mpsc::Receiver<Message>)> {
    (0..members)
        .map(|i| {
            let (tx, rx) = mpsc::channel(1024);
            let conn = Arc::new(Connection::new(Identity::new(format!("u{i}"), format!("user {i}")), tx));
            registry.register(&conn).unwrap();
            registry.join("bench", &conn).unwrap();
            (conn, rx)
        })
        .collect()
}

fn benchmark_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    for members in [1usize, 10, 100, 1000] {
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());
        let mut conns = populate(&registry, members);

        group.bench_with_input(BenchmarkId::from_parameter(members), &members, |b, _| {
            b.iter(|| {
                let report = broadcaster.broadcast_text(black_box("bench"), r#"{"type":"message"}"#);
                for (_, rx) in conns.iter_mut() {
                    while rx.try_recv().is_ok() {}
                }
                report
            });
        });
    }

    group.finish();
}

fn benchmark_join_leave(c: &mut Criterion) {
    let registry = RoomRegistry::new();
    let (tx, _rx) = mpsc::channel(1);
    let conn = Arc::new(Connection::new(Identity::new("u", "user"), tx));

    c.bench_function("join_leave_all", |b| {
        b.iter(|| {
            registry.join(black_box("r1"), &conn).unwrap();
            registry.join(black_box("r2"), &conn).unwrap();
            registry.leave_all(conn.id())
        });
    });
}

criterion_group!(benches, benchmark_broadcast, benchmark_join_leave);
criterion_main!(benches);
