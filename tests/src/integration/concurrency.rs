//! # Concurrency
//!
//! Races between connections. Each connection is driven from its own thread
//! (or session worker), as the transport would.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use mc_01_ledger_store::LedgerStore;
    use mc_05_session_controller::SessionWorker;
    use shared_types::{InboundEvent, OutboundEvent, RecordUpdate};
    use tokio::sync::watch;

    use crate::integration::fixtures::World;

    #[test]
    fn test_concurrent_credits_are_not_lost() {
        let world = Arc::new(World::in_memory());
        const ADMINS: usize = 4;
        const GRANTS: usize = 50;
        const MESSAGES: usize = 100;

        let mut clients = Vec::new();
        for i in 0..ADMINS {
            let name = format!("admin{}", i);
            world.seed(&name, RecordUpdate::none().with_admin(true));
            clients.push(world.join(&name));
        }
        let ada = world.join("ada");
        let barrier = Arc::new(Barrier::new(ADMINS + 1));

        let mut handles: Vec<_> = clients
            .into_iter()
            .map(|admin| {
                let world = Arc::clone(&world);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..GRANTS {
                        world.say(&admin, "!grant ada 1");
                    }
                })
            })
            .collect();
        handles.push({
            let world = Arc::clone(&world);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..MESSAGES {
                    world.say(&ada, &format!("message {}", i));
                }
            })
        });
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            world.balance("ada"),
            Some((ADMINS * GRANTS + MESSAGES) as i64)
        );
    }

    #[test]
    fn test_claim_race_has_single_winner() {
        let world = Arc::new(World::in_memory());
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let world = Arc::clone(&world);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut client = world.connect();
                    barrier.wait();
                    world.claim(&client, "ada");
                    client
                        .events()
                        .iter()
                        .any(|e| matches!(e, OutboundEvent::ClaimAccepted { .. }))
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(world.registry().active_count(), 1);
        assert_eq!(world.ledger().all().unwrap().len(), 1);
    }

    #[test]
    fn test_rename_race_to_same_name() {
        for _ in 0..20 {
            let world = Arc::new(World::in_memory());
            world.seed("ada", RecordUpdate::credit(10).with_ticket(true));
            world.seed("bob", RecordUpdate::credit(20).with_ticket(true));
            let ada = world.join("ada");
            let bob = world.join("bob");
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [ada, bob]
                .into_iter()
                .map(|client| {
                    let world = Arc::clone(&world);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        world.say(&client, "!rename zed");
                        client
                    })
                })
                .collect();
            let clients: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let holder = world.registry().holder_of("zed").expect("one rename won");
            let record = world.ledger().get("zed").unwrap().unwrap();
            assert!(!record.has_ticket);

            let loser = clients.iter().find(|c| c.conn != holder).unwrap();
            let loser_name = world.registry().name_of(&loser.conn).unwrap();
            let loser_record = world.ledger().get(&loser_name).unwrap().unwrap();
            assert!(loser_record.has_ticket, "loser keeps its ticket");
            assert_eq!(world.ledger().all().unwrap().len(), 2);
            assert_eq!(record.balance + loser_record.balance, 30);
        }
    }

    #[test]
    fn test_rename_and_claim_race_stays_consistent() {
        for _ in 0..20 {
            let world = Arc::new(World::in_memory());
            world.seed("ada", RecordUpdate::none().with_ticket(true));
            let ada = world.join("ada");
            let eve = world.connect();
            let barrier = Arc::new(Barrier::new(2));

            let renamer = {
                let world = Arc::clone(&world);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    world.say(&ada, "!rename zed");
                    ada
                })
            };
            let claimer = {
                let world = Arc::clone(&world);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    world.claim(&eve, "zed");
                    eve
                })
            };
            let ada = renamer.join().unwrap();
            let eve = claimer.join().unwrap();

            let holder = world.registry().holder_of("zed").expect("someone holds zed");
            if holder == ada.conn {
                assert_eq!(world.registry().name_of(&eve.conn), None);
                assert!(world.ledger().get("ada").unwrap().is_none());
                assert!(world.registry().holder_of("ada").is_none());
            } else {
                assert_eq!(holder, eve.conn);
                assert_eq!(world.registry().name_of(&ada.conn).as_deref(), Some("ada"));
                assert!(world.ledger().get("ada").unwrap().unwrap().has_ticket);
            }
            assert!(world.ledger().get("zed").unwrap().is_some());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_workers_chat_concurrently() {
        let world = World::in_memory();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = SessionWorker::new(Arc::clone(&world.controller), shutdown_rx);
        const CLIENTS: usize = 8;
        const MESSAGES: usize = 25;

        let mut handles = Vec::new();
        for i in 0..CLIENTS {
            let handle = worker.spawn();
            handle
                .send(InboundEvent::ClaimName {
                    name: format!("user{}", i),
                })
                .await;
            handles.push(handle);
        }

        let senders: Vec<_> = handles
            .iter()
            .map(|handle| {
                let sender = handle.sender();
                tokio::spawn(async move {
                    for n in 0..MESSAGES {
                        let text = format!("line {}", n);
                        sender.send(InboundEvent::Message { text }).await.unwrap();
                    }
                })
            })
            .collect();
        for task in senders {
            task.await.unwrap();
        }
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle.close())
                .await
                .unwrap();
        }

        for i in 0..CLIENTS {
            assert_eq!(world.balance(&format!("user{}", i)), Some(MESSAGES as i64));
        }
        assert_eq!(world.registry().active_count(), 0);
    }
}
