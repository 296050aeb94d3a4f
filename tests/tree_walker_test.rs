//! Tests for the concurrent tree walker
//!
//! These tests run the walker against an in-memory tree and verify that:
//! 1. Counting visits every branch and sums all files
//! 2. Counting fails as a whole when any listing fails
//! 3. Searching returns the first match and abandons the other branches
//! 4. Sibling listings run concurrently, bounded by the optional fetch limit

mod common;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::FakeRemote;
use gitscan_mcp::walker::TreeWalker;
use tokio_util::sync::CancellationToken;

fn walker_over(remote: &Arc<FakeRemote>) -> TreeWalker {
    TreeWalker::new(remote.clone(), "test-token")
}

fn sample_tree() -> FakeRemote {
    FakeRemote::from_paths(&["a.txt", "dir1/b.txt", "dir1/c.yml", "dir2/"])
}

#[tokio::test]
async fn test_count_files_in_sample_tree() {
    let remote = Arc::new(sample_tree());
    let walker = walker_over(&remote);

    let count = walker.count_files(remote.root()).await.unwrap();

    assert_eq!(count, 3);
    // Both directories are listed exactly once
    assert_eq!(remote.listing_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_count_files_of_empty_listing() {
    let remote = Arc::new(FakeRemote::from_paths(&[]));
    let walker = walker_over(&remote);

    assert_eq!(walker.count_files(Vec::new()).await.unwrap(), 0);
    assert_eq!(remote.listing_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_count_files_in_deep_tree() {
    let remote = Arc::new(FakeRemote::from_paths(&[
        "README.md",
        "src/lib.rs",
        "src/walker/mod.rs",
        "src/walker/search.rs",
        "src/walker/deep/er/still.rs",
        "docs/",
        "tests/a.rs",
        "tests/b.rs",
    ]));
    let walker = walker_over(&remote);

    assert_eq!(walker.count_files(remote.root()).await.unwrap(), 7);
}

#[tokio::test]
async fn test_count_files_ignores_other_entries() {
    let remote = Arc::new(sample_tree().with_other("vendor").with_other("dir1/link"));
    let walker = walker_over(&remote);

    assert_eq!(walker.count_files(remote.root()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_count_files_fails_when_any_listing_fails() {
    let remote = Arc::new(
        FakeRemote::from_paths(&["a.txt", "ok/b.txt", "ok/deeper/c.txt", "broken/d.txt"])
            .failing("broken"),
    );
    let walker = walker_over(&remote);

    let result = walker.count_files(remote.root()).await;

    let error = result.unwrap_err();
    assert!(error.to_string().contains("500"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_count_files_failure_abandons_slow_siblings() {
    let remote = Arc::new(
        FakeRemote::from_paths(&["slow/inner/x.txt", "broken/"])
            .failing("broken")
            .delayed("slow", Duration::from_millis(300)),
    );
    let walker = walker_over(&remote);

    let started = Instant::now();
    assert!(walker.count_files(remote.root()).await.is_err());
    assert!(started.elapsed() < Duration::from_millis(300));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let completed = remote.completed();
    assert!(!completed.contains(&"slow".to_string()));
    assert!(!completed.contains(&"slow/inner".to_string()));
}

#[tokio::test]
async fn test_count_lists_siblings_concurrently() {
    let mut remote = FakeRemote::from_paths(&["d1/f", "d2/f", "d3/f", "d4/f"]);
    for dir in ["d1", "d2", "d3", "d4"] {
        remote = remote.delayed(dir, Duration::from_millis(50));
    }
    let remote = Arc::new(remote);
    let walker = walker_over(&remote);

    assert_eq!(walker.count_files(remote.root()).await.unwrap(), 4);
    assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_fetch_limit_bounds_listings_in_flight() {
    let mut remote = FakeRemote::from_paths(&["d1/f", "d2/f", "d3/f", "d4/f", "d4/sub/g"]);
    for dir in ["d1", "d2", "d3", "d4", "d4/sub"] {
        remote = remote.delayed(dir, Duration::from_millis(20));
    }
    let remote = Arc::new(remote);
    let walker = walker_over(&remote).with_fetch_limit(NonZeroUsize::new(2).unwrap());

    assert_eq!(walker.count_files(remote.root()).await.unwrap(), 5);
    assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_find_yml_in_sample_tree() {
    let remote = Arc::new(sample_tree());
    let walker = walker_over(&remote);

    let found = walker.find_by_suffix(remote.root(), ".yml").await.unwrap();

    let found = found.expect("c.yml should be found");
    assert_eq!(found.path, "dir1/c.yml");
    assert_eq!(found.download_url.as_deref(), Some("fake://blob/dir1/c.yml"));
}

#[tokio::test]
async fn test_find_prefers_files_of_the_current_level() {
    let remote = Arc::new(FakeRemote::from_paths(&["sub/deep.yml", "top.yml"]));
    let walker = walker_over(&remote);

    let found = walker.find_by_suffix(remote.root(), ".yml").await.unwrap();

    assert_eq!(found.unwrap().path, "top.yml");
    assert_eq!(remote.listing_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_find_without_match_visits_everything() {
    let remote = Arc::new(FakeRemote::from_paths(&[
        "a.txt",
        "dir1/b.txt",
        "dir1/nested/c.md",
        "dir2/",
    ]));
    let walker = walker_over(&remote);

    let found = walker.find_by_suffix(remote.root(), ".yml").await.unwrap();

    assert!(found.is_none());
    let mut completed = remote.completed();
    completed.sort();
    assert_eq!(completed, vec!["dir1", "dir1/nested", "dir2"]);
}

#[tokio::test]
async fn test_find_reports_failure_only_without_match() {
    let remote = Arc::new(FakeRemote::from_paths(&["a.txt", "broken/x.yml"]).failing("broken"));
    let walker = walker_over(&remote);

    assert!(walker.find_by_suffix(remote.root(), ".yml").await.is_err());

    let remote = Arc::new(
        FakeRemote::from_paths(&["broken/x.yml", "fine/y.yml"])
            .failing("broken")
            .delayed("fine", Duration::from_millis(20)),
    );
    let walker = walker_over(&remote);

    let found = walker.find_by_suffix(remote.root(), ".yml").await.unwrap();
    assert_eq!(found.unwrap().path, "fine/y.yml");
}

#[tokio::test]
async fn test_find_cancels_slow_branches() {
    let remote = Arc::new(
        FakeRemote::from_paths(&["slow/inner/late.yml", "fast/hit.yml"])
            .delayed("slow", Duration::from_millis(300)),
    );
    let walker = walker_over(&remote);
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let found = walker
        .find_first_with_cancellation(
            remote.root(),
            |node| node.name.ends_with(".yml"),
            cancel.clone(),
        )
        .await
        .unwrap();

    assert_eq!(found.unwrap().path, "fast/hit.yml");
    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(cancel.is_cancelled());

    // The abandoned branch never finishes its listing nor descends further
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(remote.completed(), vec!["fast"]);
}

#[tokio::test]
async fn test_find_stops_when_cancelled_from_outside() {
    let (remote, hold) = FakeRemote::from_paths(&["held/x.yml"]).held("held");
    let remote = Arc::new(remote);
    let walker = walker_over(&remote);
    let cancel = CancellationToken::new();

    let search = {
        let walker = walker.clone();
        let root = remote.root();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            walker
                .find_first_with_cancellation(root, |node| node.name.ends_with(".yml"), cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let found = tokio::time::timeout(Duration::from_secs(1), search)
        .await
        .expect("search should stop after cancellation")
        .unwrap()
        .unwrap();
    assert!(found.is_none());

    hold.add_permits(1);
    assert!(remote.completed().is_empty());
}

#[tokio::test]
async fn test_find_with_custom_predicate() {
    let remote = Arc::new(sample_tree());
    let walker = walker_over(&remote);

    let found = walker
        .find_first(remote.root(), |node| node.name == "b.txt")
        .await
        .unwrap();

    assert_eq!(found.unwrap().path, "dir1/b.txt");
}
