//! # Session Flows
//!
//! End-to-end scenarios through the session controller with real ledgers,
//! registry and dispatcher.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mc_01_ledger_store::{FileBackedKVStore, FileLedger, KvLedgerStore, LedgerStore};
    use mc_03_command_interpreter::Hand;
    use mc_05_session_controller::SessionState;
    use shared_types::{OutboundEvent, RecordUpdate};

    use crate::integration::fixtures::World;

    fn file_ledger(path: &std::path::Path) -> Arc<FileLedger> {
        Arc::new(KvLedgerStore::open(FileBackedKVStore::open(path).unwrap()).unwrap())
    }

    // =========================================================================
    // FULL SCENARIO
    // =========================================================================

    #[test]
    fn test_claim_chat_grant_and_reconnect() {
        let world = World::in_memory();
        world.seed("root", RecordUpdate::none().with_admin(true));
        let mut root = world.join("root");

        // Ada claims and starts at zero.
        let mut ada = world.connect();
        world.claim(&ada, "Ada");
        assert_eq!(
            ada.events(),
            vec![OutboundEvent::ClaimAccepted { name: "Ada".into() }]
        );
        assert_eq!(root.texts(), vec!["Ada joined (2 online)".to_string()]);
        assert_eq!(world.balance("Ada"), Some(0));

        // One plain message earns the per-message reward.
        world.say(&ada, "helloworld");
        assert_eq!(world.balance("Ada"), Some(1));
        world.say(&ada, "!balance");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("Ada: 1 points | inventory: empty")
        );

        // Bob cannot take a live name.
        let mut bob = world.connect();
        world.claim(&bob, "Ada");
        assert_eq!(
            bob.events(),
            vec![OutboundEvent::ClaimRejected {
                reason: "the name 'Ada' is already in use".into()
            }]
        );
        assert_eq!(world.controller.state(&bob.conn), SessionState::Unidentified);
        assert_eq!(world.registry().holder_of("Ada"), Some(ada.conn));

        // Grant is announced to every connection, including unidentified ones.
        root.events();
        ada.events();
        world.say(&root, "!grant Ada 500");
        let notice = OutboundEvent::status("root granted 500 points to Ada (balance now 501)");
        assert_eq!(root.events(), vec![notice.clone()]);
        assert_eq!(ada.events(), vec![notice.clone()]);
        assert_eq!(bob.events(), vec![notice]);
        assert_eq!(world.balance("Ada"), Some(501));

        // The record outlives the connection.
        world.disconnect(ada);
        let mut ada = world.join("Ada");
        world.say(&ada, "!balance");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("Ada: 501 points | inventory: empty")
        );
    }

    #[test]
    fn test_balance_survives_process_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin");

        {
            let world = World::with_ledger(file_ledger(&path));
            let ada = world.join("ada");
            world.say(&ada, "one");
            world.say(&ada, "two");
            world.say(&ada, "three");
        }

        let world = World::with_ledger(file_ledger(&path));
        let mut ada = world.join("ada");
        world.say(&ada, "!balance");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("ada: 3 points | inventory: empty")
        );
    }

    // =========================================================================
    // RENAME
    // =========================================================================

    #[test]
    fn test_rename_carries_record_and_frees_old_name() {
        let world = World::in_memory();
        world.seed("ada", RecordUpdate::credit(1500).with_admin(true));
        let mut ada = world.join("ada");
        let mut bob = world.join("bob");
        ada.events();

        world.say(&ada, "!buy rename-ticket");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("bought rename-ticket for 1000 points, balance now 500")
        );

        world.say(&ada, "!rename lovelace");
        assert_eq!(
            ada.events(),
            vec![
                OutboundEvent::IdentityChanged {
                    old: "ada".into(),
                    new: "lovelace".into()
                },
                OutboundEvent::result("you are now known as lovelace"),
            ]
        );
        assert_eq!(
            bob.texts().last().map(String::as_str),
            Some("ada is now known as lovelace")
        );

        assert!(world.ledger().get("ada").unwrap().is_none());
        let record = world.ledger().get("lovelace").unwrap().unwrap();
        assert_eq!(record.balance, 500);
        assert!(record.is_admin);
        assert!(!record.has_ticket);

        // Old name is claimable again, new one is not.
        let mut eve = world.connect();
        world.claim(&eve, "lovelace");
        assert!(matches!(
            eve.events().as_slice(),
            [OutboundEvent::ClaimRejected { .. }]
        ));
        world.claim(&eve, "ada");
        assert_eq!(
            eve.events().first(),
            Some(&OutboundEvent::ClaimAccepted { name: "ada".into() })
        );
        assert_eq!(world.balance("ada"), Some(0));

        // Later chat is credited to the new name.
        world.say(&ada, "still here");
        assert_eq!(world.balance("lovelace"), Some(500));
        world.say(&bob, "hi");
        assert_eq!(world.balance("bob"), Some(1));
    }

    #[test]
    fn test_failed_rename_leaves_everything_intact() {
        let world = World::in_memory();
        world.seed("ada", RecordUpdate::credit(40).with_ticket(true));
        world.seed("ghost", RecordUpdate::credit(7));
        let mut ada = world.join("ada");
        let _bob = world.join("bob");

        // Live name and offline record are both taken.
        for target in ["bob", "ghost", "ada"] {
            world.say(&ada, &format!("!rename {}", target));
            assert_eq!(
                ada.last_result(),
                Some(format!("the name '{}' is already in use", target))
            );
        }

        let record = world.ledger().get("ada").unwrap().unwrap();
        assert_eq!(record.balance, 40);
        assert!(record.has_ticket);
        assert_eq!(world.balance("ghost"), Some(7));
        assert_eq!(world.registry().name_of(&ada.conn).as_deref(), Some("ada"));
        assert!(!world.registry().is_claimed("ghost"));
    }

    #[test]
    fn test_rename_without_ticket_is_rejected() {
        let world = World::in_memory();
        let mut ada = world.join("ada");

        world.say(&ada, "!rename lovelace");

        assert_eq!(
            ada.last_result().as_deref(),
            Some("you need a rename ticket first, see !shop")
        );
        assert!(world.ledger().get("lovelace").unwrap().is_none());
    }

    // =========================================================================
    // ECONOMY
    // =========================================================================

    #[test]
    fn test_purchase_rejections_do_not_mutate() {
        let world = World::in_memory();
        world.seed("ada", RecordUpdate::credit(999));
        let mut ada = world.join("ada");

        world.say(&ada, "!buy rename-ticket");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("not enough points: you have 999, need 1000")
        );
        let record = world.ledger().get("ada").unwrap().unwrap();
        assert_eq!((record.balance, record.has_ticket), (999, false));

        world.seed("ada", RecordUpdate::credit(2001));
        world.say(&ada, "!buy rename-ticket");
        world.say(&ada, "!buy rename-ticket");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("you already own that item")
        );
        let record = world.ledger().get("ada").unwrap().unwrap();
        assert_eq!((record.balance, record.has_ticket), (2000, true));
    }

    #[test]
    fn test_dice_loss_stops_at_zero() {
        let world = World::in_memory();
        world.seed("ada", RecordUpdate::credit(120));
        let mut ada = world.join("ada");

        world.dice.push([1, 6]);
        world.say(&ada, "!roll");

        assert_eq!(
            ada.last_result().as_deref(),
            Some("you rolled 1, the house rolled 6: the house wins (balance 0)")
        );
        assert_eq!(world.balance("ada"), Some(0));
    }

    #[test]
    fn test_dice_win_and_tie() {
        let world = World::in_memory();
        let ada = world.join("ada");

        world.dice.push([6, 2, 3, 3]);
        world.say(&ada, "!roll");
        assert_eq!(world.balance("ada"), Some(500));
        world.say(&ada, "!roll");
        assert_eq!(world.balance("ada"), Some(500));
    }

    #[test]
    fn test_savings_are_kept_across_reconnect_and_shielded_from_wagers() {
        let world = World::in_memory();
        world.seed("ada", RecordUpdate::credit(300));
        let mut ada = world.join("ada");

        world.say(&ada, "!deposit 200");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("deposited 200 points (points 100, bank 200)")
        );

        // Only cash can be staked.
        world.say(&ada, "!rps rock 150");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("not enough points: you have 100, need 150")
        );

        world.dice.push_hands([Hand::Paper]);
        world.say(&ada, "!rps rock 100");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("you threw rock, the house threw paper: you lose 100 points (balance 0)")
        );

        world.disconnect(ada);
        let mut ada = world.join("ada");
        world.say(&ada, "!withdraw");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("withdrew 200 points (points 200, bank 0)")
        );
        world.say(&ada, "!balance");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("ada: 200 points | inventory: empty")
        );
    }

    #[test]
    fn test_ranking_and_stats() {
        let world = World::in_memory();
        world.seed("carol", RecordUpdate::credit(30));
        world.seed("bob", RecordUpdate::credit(10));
        let mut ada = world.join("ada");
        world.say(&ada, "!stats");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("users: 3 | total points: 40 | mean points: 13")
        );

        world.say(&ada, "!ranking");
        assert_eq!(
            ada.last_result().as_deref(),
            Some("ranking (top 10)\n1. carol - 30 points\n2. bob - 10 points\n3. ada - 0 points")
        );
    }

    #[test]
    fn test_non_admin_grant_is_refused_privately() {
        let world = World::in_memory();
        let mut ada = world.join("ada");
        let mut bob = world.join("bob");
        ada.events();

        world.say(&ada, "!grant bob 100");

        assert_eq!(
            ada.last_result().as_deref(),
            Some("only admins can use !grant")
        );
        assert!(bob.events().is_empty());
        assert_eq!(world.balance("bob"), Some(0));
    }

    #[test]
    fn test_flood_reply_is_private() {
        let world = World::in_memory();
        let mut ada = world.join("ada");
        let mut bob = world.join("bob");
        ada.events();

        world.say(&ada, "!flood");

        let payload = ada.last_result().unwrap();
        assert_eq!(
            payload,
            "[:[^].[-]:]~[:[Rust].[6₩]:]".repeat(50)
        );
        assert!(bob.events().is_empty());
        assert_eq!(world.balance("ada"), Some(0));
    }
}
