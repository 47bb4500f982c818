#![forbid(unsafe_code)]
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use tempfile::tempdir;
use weekshare::{
    AssignmentSource, EngineError, JsonStorage, Ledger, MemoryStorage, Scheduler, ShareId, Storage, SwapEvent,
    SwapId, SwapNotice, SwapNotifier, SwapProposal, SwapRequest, SwapStatus, WeekKind,
    WeekService,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 10, 18, 30, 0).unwrap()
}

fn seeded_service() -> (WeekService<MemoryStorage>, Vec<ShareId>) {
    let service = WeekService::new(MemoryStorage::default());
    service.seed_default_shares().unwrap();
    service.generate_year(2025, Some(0)).unwrap();
    let seq = service
        .sequence()
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    (service, seq)
}

fn proposal(from: &ShareId, to: &ShareId, week_a: u32, week_b: u32) -> SwapProposal {
    SwapProposal {
        requesting: from.clone(),
        receiving: to.clone(),
        year: 2025,
        week_a,
        week_b,
        message: None,
    }
}

/// Stockage dont les sauvegardes peuvent être forcées en échec.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    fail_saves: AtomicBool,
}

impl Storage for FlakyStorage {
    fn load(&self) -> anyhow::Result<Ledger> {
        self.inner.load()
    }
    fn save(&self, ledger: &Ledger) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save(ledger)
    }
}

#[derive(Default, Clone)]
struct Recorder {
    seen: Arc<Mutex<Vec<(SwapEvent, String)>>>,
}

impl SwapNotifier for Recorder {
    fn notify(&self, notice: &SwapNotice) -> anyhow::Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push((notice.event, notice.recipient.clone()));
        Ok(())
    }
}

struct Broken;

impl SwapNotifier for Broken {
    fn notify(&self, _notice: &SwapNotice) -> anyhow::Result<()> {
        anyhow::bail!("smtp unreachable")
    }
}

#[test]
fn accept_locks_both_weeks_and_survives_regeneration() {
    let (service, seq) = seeded_service();
    let (fk, ht) = (&seq[0], &seq[1]);

    // FK a la semaine 1, HT la semaine 2
    let swap = service.propose_swap(fk, proposal(fk, ht, 1, 2), now()).unwrap();
    assert_eq!(swap.status, SwapStatus::Pending);

    let accepted = service.accept_swap(&swap.id, ht, now()).unwrap();
    assert_eq!(accepted.status, SwapStatus::Accepted);
    assert_eq!(accepted.resolved_at, Some(now()));

    let check = |ledger: &Ledger| {
        let w1 = ledger.find_assignment(2025, 1).unwrap();
        assert_eq!(w1.kind, WeekKind::Share { share_id: ht.clone() });
        assert_eq!(w1.source, AssignmentSource::Swap);
        assert!(w1.is_locked);
        let w2 = ledger.find_assignment(2025, 2).unwrap();
        assert_eq!(w2.kind, WeekKind::Share { share_id: fk.clone() });
        assert_eq!(w2.source, AssignmentSource::Swap);
        assert!(w2.is_locked);
    };
    check(&service.snapshot().unwrap());

    service.generate_year(2025, Some(0)).unwrap();
    check(&service.snapshot().unwrap());
}

#[test]
fn reject_has_no_assignment_side_effects() {
    let (service, seq) = seeded_service();
    let before = service.snapshot().unwrap().assignments;
    let swap = service
        .propose_swap(&seq[2], proposal(&seq[2], &seq[3], 3, 4), now())
        .unwrap();
    let rejected = service.reject_swap(&swap.id, &seq[3], now()).unwrap();
    assert_eq!(rejected.status, SwapStatus::Rejected);
    assert_eq!(service.snapshot().unwrap().assignments, before);
}

#[test]
fn only_receiver_may_resolve() {
    let (service, seq) = seeded_service();
    let swap = service
        .propose_swap(&seq[0], proposal(&seq[0], &seq[1], 1, 2), now())
        .unwrap();

    for outsider in [&seq[0], &seq[4]] {
        assert!(matches!(
            service.accept_swap(&swap.id, outsider, now()),
            Err(EngineError::Authorization(_))
        ));
        assert!(matches!(
            service.reject_swap(&swap.id, outsider, now()),
            Err(EngineError::Authorization(_))
        ));
    }
    let ledger = service.snapshot().unwrap();
    assert_eq!(ledger.find_swap(&swap.id).unwrap().status, SwapStatus::Pending);
}

#[test]
fn terminal_states_are_final() {
    let (service, seq) = seeded_service();
    let accepted = service
        .propose_swap(&seq[0], proposal(&seq[0], &seq[1], 1, 2), now())
        .unwrap();
    service.accept_swap(&accepted.id, &seq[1], now()).unwrap();
    assert!(matches!(
        service.accept_swap(&accepted.id, &seq[1], now()),
        Err(EngineError::InvalidState(_))
    ));
    assert!(matches!(
        service.reject_swap(&accepted.id, &seq[1], now()),
        Err(EngineError::InvalidState(_))
    ));

    let rejected = service
        .propose_swap(&seq[2], proposal(&seq[2], &seq[3], 3, 4), now())
        .unwrap();
    service.reject_swap(&rejected.id, &seq[3], now()).unwrap();
    assert!(matches!(
        service.accept_swap(&rejected.id, &seq[3], now()),
        Err(EngineError::InvalidState(_))
    ));
}

#[test]
fn unknown_swap_is_not_found() {
    let (service, seq) = seeded_service();
    assert!(matches!(
        service.accept_swap(&SwapId::new("nope"), &seq[0], now()),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn failed_second_upsert_rolls_back_everything() {
    let (service, seq) = seeded_service();
    let mut ledger = service.snapshot().unwrap();
    let swap = SwapRequest {
        id: SwapId::new("broken"),
        requesting_share_id: seq[0].clone(),
        receiving_share_id: seq[1].clone(),
        year: 2025,
        week_a: 1,
        // 2025 n'a que 52 semaines : la seconde écriture échoue
        week_b: 60,
        status: SwapStatus::Pending,
        created_at: now(),
        resolved_at: None,
    };
    ledger.swaps.push(swap.clone());

    let mut scheduler = Scheduler::from_ledger(ledger.clone());
    let err = scheduler.accept_swap(&swap.id, &seq[1], now()).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(scheduler.ledger(), &ledger);

    let service = WeekService::new(MemoryStorage::new(ledger.clone()));
    assert!(service.accept_swap(&swap.id, &seq[1], now()).is_err());
    let after = service.snapshot().unwrap();
    assert_eq!(after.find_swap(&swap.id).unwrap().status, SwapStatus::Pending);
    assert_eq!(after.find_assignment(2025, 1), ledger.find_assignment(2025, 1));
}

#[test]
fn storage_failure_keeps_swap_pending() {
    let service = WeekService::new(FlakyStorage::default());
    service.seed_default_shares().unwrap();
    service.generate_year(2025, None).unwrap();
    let seq: Vec<ShareId> = service.sequence().unwrap().into_iter().map(|s| s.id).collect();
    let swap = service
        .propose_swap(&seq[0], proposal(&seq[0], &seq[1], 1, 2), now())
        .unwrap();

    service.storage().fail_saves.store(true, Ordering::SeqCst);
    let err = service.accept_swap(&swap.id, &seq[1], now()).unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));

    service.storage().fail_saves.store(false, Ordering::SeqCst);
    let ledger = service.snapshot().unwrap();
    assert_eq!(ledger.find_swap(&swap.id).unwrap().status, SwapStatus::Pending);
    assert_eq!(ledger.find_assignment(2025, 1).unwrap().source, AssignmentSource::Generated);

    // un nouvel essai aboutit
    service.accept_swap(&swap.id, &seq[1], now()).unwrap();
}

#[test]
fn concurrent_accepts_only_one_wins() {
    let (service, seq) = seeded_service();
    let swap = service
        .propose_swap(&seq[0], proposal(&seq[0], &seq[1], 5, 6), now())
        .unwrap();

    let results: Vec<Result<SwapRequest, EngineError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| service.accept_swap(&swap.id, &seq[1], now())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let invalid = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::InvalidState(_))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(invalid, 3);
}

#[test]
fn separate_services_on_one_file_accept_only_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weekshare.json");
    let setup = WeekService::new(JsonStorage::open(&path).unwrap());
    setup.seed_default_shares().unwrap();
    setup.generate_year(2025, Some(0)).unwrap();
    let seq: Vec<ShareId> = setup.sequence().unwrap().into_iter().map(|s| s.id).collect();

    for round in 0..10u32 {
        let swap = setup
            .propose_swap(&seq[0], proposal(&seq[0], &seq[1], 2 * round + 1, 2 * round + 2), now())
            .unwrap();
        let barrier = Barrier::new(2);
        let results: Vec<Result<SwapRequest, EngineError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        // chaque appelant a son propre service, comme deux processus
                        let service = WeekService::new(JsonStorage::open(&path).unwrap());
                        barrier.wait();
                        service.accept_swap(&swap.id, &seq[1], now())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "round {round}");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(EngineError::InvalidState(_)))));
        let ledger = setup.snapshot().unwrap();
        assert_eq!(ledger.find_swap(&swap.id).unwrap().status, SwapStatus::Accepted);
    }
}

#[test]
fn proposal_does_not_check_week_ownership() {
    let (service, seq) = seeded_service();
    // semaine 2 appartient à HT, pas à FK
    let swap = service
        .propose_swap(&seq[0], proposal(&seq[0], &seq[2], 2, 22), now())
        .unwrap();
    assert_eq!(swap.status, SwapStatus::Pending);
}

#[test]
fn notifications_follow_commit() {
    let recorder = Recorder::default();
    let service = WeekService::new(MemoryStorage::default()).with_notifier(recorder.clone());
    service.seed_default_shares().unwrap();
    let seq: Vec<ShareId> = service.sequence().unwrap().into_iter().map(|s| s.id).collect();

    let swap = service
        .propose_swap(&seq[0], proposal(&seq[0], &seq[1], 1, 2), now())
        .unwrap();
    let _ = service.accept_swap(&swap.id, &seq[4], now());
    service.accept_swap(&swap.id, &seq[1], now()).unwrap();

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (SwapEvent::Proposed, "HT".to_string()),
            (SwapEvent::Accepted, "FK".to_string()),
        ]
    );
}

#[test]
fn notification_failure_does_not_block_acceptance() {
    let service = WeekService::new(MemoryStorage::default()).with_notifier(Broken);
    service.seed_default_shares().unwrap();
    let seq: Vec<ShareId> = service.sequence().unwrap().into_iter().map(|s| s.id).collect();
    let swap = service
        .propose_swap(&seq[0], proposal(&seq[0], &seq[1], 1, 2), now())
        .unwrap();
    service.accept_swap(&swap.id, &seq[1], now()).unwrap();
    let ledger = service.snapshot().unwrap();
    assert_eq!(ledger.find_swap(&swap.id).unwrap().status, SwapStatus::Accepted);
}
