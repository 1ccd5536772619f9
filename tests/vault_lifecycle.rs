//! End-to-end lifecycle tests for the vault, sweeper and cipher together.
//!
//! These exercise the exactly-once guarantees under real concurrency on a
//! multi-threaded runtime.

use burnbox::audit::{AuditAction, MemoryAuditSink};
use burnbox::crypto::CipherBox;
use burnbox::vault::{
    ExpirySweeper, ManualClock, SecretHandle, SecretVault, SharedVault, VaultConfig, VaultError,
};
use burnbox::{AppError, SecretService};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    vault: SharedVault,
    service: SecretService,
    clock: Arc<ManualClock>,
    audit: Arc<MemoryAuditSink>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::default());
    let audit = Arc::new(MemoryAuditSink::new());
    let vault = Arc::new(SecretVault::with_clock(
        VaultConfig::default(),
        audit.clone(),
        clock.clone(),
    ));
    let service = SecretService::new(vault.clone(), Arc::new(CipherBox::ephemeral()));
    Harness {
        vault,
        service,
        clock,
        audit,
    }
}

fn is_not_found<T>(result: &Result<T, AppError>) -> bool {
    matches!(result, Err(AppError::Vault(VaultError::NotFound)))
}

#[tokio::test]
async fn create_retrieve_then_not_found() {
    let h = harness();
    let handle = h.service.create("hello", None, Some(300), None).await.unwrap();
    let key = handle.to_string();

    assert_eq!(h.service.retrieve(&key, None).await.unwrap().as_str(), "hello");
    assert!(is_not_found(&h.service.retrieve(&key, None).await));
}

#[tokio::test]
async fn expired_secret_is_gone_for_retrieve_and_delete() {
    let h = harness();
    let handle = h.service.create("x", None, Some(300), None).await.unwrap();
    let key = handle.to_string();

    h.clock.advance(ChronoDuration::seconds(301));

    assert!(is_not_found(&h.service.retrieve(&key, None).await));
    assert!(is_not_found(&h.service.delete(&key, None).await));
    assert_eq!(h.audit.count(AuditAction::Expire), 1);
}

#[tokio::test]
async fn delete_then_retrieve_is_not_found() {
    let h = harness();
    let handle = h.service.create("y", None, None, None).await.unwrap();
    let key = handle.to_string();

    h.service.delete(&key, None).await.unwrap();
    assert!(is_not_found(&h.service.retrieve(&key, None).await));
}

#[tokio::test]
async fn never_created_handles_are_not_found() {
    let h = harness();
    for _ in 0..10 {
        let key = SecretHandle::generate().to_string();
        assert!(is_not_found(&h.service.retrieve(&key, None).await));
        assert!(is_not_found(&h.service.delete(&key, None).await));
    }
    assert!(h.audit.events().is_empty());
}

#[tokio::test]
async fn short_ttl_is_clamped_to_five_minutes() {
    let h = harness();
    let handle = h.service.create("z", None, Some(10), None).await.unwrap();

    h.clock.advance(ChronoDuration::seconds(299));
    assert_eq!(h.vault.sweep_expired().await, 0);

    let key = handle.to_string();
    assert_eq!(h.service.retrieve(&key, None).await.unwrap().as_str(), "z");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_retrieves_yield_exactly_one_winner() {
    const RACERS: usize = 64;

    for _ in 0..20 {
        let h = harness();
        let handle = h.vault.create(b"race".to_vec(), None, None, None).await.unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(RACERS));
        let mut tasks = Vec::with_capacity(RACERS);
        for _ in 0..RACERS {
            let vault = h.vault.clone();
            let barrier = barrier.clone();
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                vault.retrieve(&handle, None).await
            }));
        }

        let mut wins = 0;
        let mut losses = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(bytes) => {
                    assert_eq!(bytes, b"race".to_vec());
                    wins += 1;
                }
                Err(VaultError::NotFound) => losses += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(losses, RACERS - 1);
        assert_eq!(h.audit.count(AuditAction::Retrieve), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn retrieve_racing_delete_has_one_winner() {
    for _ in 0..100 {
        let h = harness();
        let handle = h.vault.create(vec![1], None, None, None).await.unwrap();

        let reader = {
            let vault = h.vault.clone();
            tokio::spawn(async move { vault.retrieve(&handle, None).await.is_ok() })
        };
        let deleter = {
            let vault = h.vault.clone();
            tokio::spawn(async move { vault.delete(&handle, None).await.is_ok() })
        };

        let read = reader.await.unwrap();
        let deleted = deleter.await.unwrap();
        assert!(read ^ deleted, "exactly one of retrieve/delete must win");

        let terminal = h
            .audit
            .events_for(&handle)
            .into_iter()
            .filter(|e| e.action != AuditAction::Create)
            .count();
        assert_eq!(terminal, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sweep_racing_retrieve_reports_expiry_once() {
    for _ in 0..50 {
        let h = harness();
        let handle = h.vault.create(vec![1], None, None, None).await.unwrap();
        h.clock.advance(ChronoDuration::seconds(301));

        let sweep = {
            let vault = h.vault.clone();
            tokio::spawn(async move { vault.sweep_expired().await })
        };
        let read = {
            let vault = h.vault.clone();
            tokio::spawn(async move { vault.retrieve(&handle, None).await })
        };

        let _ = sweep.await.unwrap();
        assert_eq!(read.await.unwrap(), Err(VaultError::NotFound));
        assert_eq!(h.audit.count(AuditAction::Expire), 1);
        assert!(h.vault.is_empty().await);
    }
}

#[tokio::test(start_paused = true)]
async fn sweeper_evicts_without_any_reads() {
    let h = harness();
    let stale = h.vault.create(vec![1], None, Some(300), None).await.unwrap();
    let fresh = h.vault.create(vec![2], None, Some(7200), None).await.unwrap();

    let sweeper = ExpirySweeper::new(h.vault.clone(), Duration::from_secs(60)).spawn();

    h.clock.advance(ChronoDuration::seconds(360));
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(h.vault.len().await, 1);
    assert_eq!(h.vault.retrieve(&stale, None).await, Err(VaultError::NotFound));
    assert!(h.vault.retrieve(&fresh, None).await.is_ok());

    sweeper.shutdown().await;
    assert_eq!(h.audit.count(AuditAction::Expire), 1);
}

#[tokio::test]
async fn independent_vaults_do_not_share_state() {
    let a = harness();
    let b = harness();
    let handle = a.vault.create(vec![1], None, None, None).await.unwrap();

    assert_eq!(b.vault.retrieve(&handle, None).await, Err(VaultError::NotFound));
    assert!(a.vault.retrieve(&handle, None).await.is_ok());
}
