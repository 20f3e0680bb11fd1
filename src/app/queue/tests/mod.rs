//! Unit tests for the task queue
//!
//! These tests pin down ordering, non-overlap and failure isolation using
//! paused Tokio time so that sleeps inside actions are deterministic.

#[cfg(test)]
mod queue_tests {
    use super::super::*;
    use crate::errors::QueueError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_actions_never_overlap() {
        // Test that at most one action is inside its body at any instant
        let queue = TaskQueue::new("overlap");
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            handles.push(queue.enqueue(move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_start_in_submission_order() {
        // Test that a later, faster action still waits for an earlier slow one
        let queue = TaskQueue::new("fifo");
        let order = Arc::new(Mutex::new(Vec::new()));

        let slow_order = Arc::clone(&order);
        let slow = queue.enqueue(move || async move {
            slow_order.lock().unwrap().push("a-start");
            sleep(Duration::from_secs(1)).await;
            slow_order.lock().unwrap().push("a-end");
        });

        let fast_order = Arc::clone(&order);
        let fast = queue.enqueue(move || async move {
            fast_order.lock().unwrap().push("b");
        });

        fast.await.unwrap();
        slow.await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["a-start", "a-end", "b"]);
    }

    #[tokio::test]
    async fn test_results_are_delivered_to_their_own_handle() {
        let queue = TaskQueue::new("results");

        let a = queue.enqueue(|| async { "a".to_string() });
        let b = queue.enqueue(|| async { Err::<u8, _>("nope") });

        assert_eq!(a.await.unwrap(), "a");
        // Domain errors are values, the queue just hands them back
        assert_eq!(b.await.unwrap(), Err("nope"));
    }

    #[tokio::test]
    async fn test_panicking_action_does_not_stall_queue() {
        // Test that a panic settles only its own handle and later work runs
        let queue = TaskQueue::new("panics");

        let bad = queue.enqueue(|| async {
            panic!("boom");
        });
        let good = queue.enqueue(|| async { 42u32 });

        let err = bad.await.unwrap_err();
        assert_eq!(
            err,
            QueueError::ActionPanicked {
                queue: "panics".to_string()
            }
        );
        assert_eq!(good.await.unwrap(), 42);

        let stats = queue.stats();
        assert_eq!(stats.total_enqueued, 2);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.panicked_count, 1);
        assert_eq!(stats.settled_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_still_runs_action() {
        let queue = TaskQueue::new("dropped");
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        drop(queue.enqueue(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        queue.enqueue(|| async {}).await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_len_and_busy_track_pending_work() {
        let queue = TaskQueue::new("lengths");
        assert!(!queue.is_busy());
        assert!(queue.is_empty());

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let first = queue.enqueue(move || async move {
            let _ = release_rx.await;
        });
        let second = queue.enqueue(|| async {});
        let third = queue.enqueue(|| async {});

        // Let the drain loop pick up the first action
        tokio::task::yield_now().await;
        assert!(queue.is_busy());
        assert_eq!(queue.len(), 2);

        release_tx.send(()).unwrap();
        first.await.unwrap();
        second.await.unwrap();
        third.await.unwrap();

        // The drain loop clears the busy flag after its last action
        sleep(Duration::from_millis(1)).await;
        assert!(!queue.is_busy());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.stats().completed_count, 3);
    }

    #[tokio::test]
    async fn test_queue_restarts_after_going_idle() {
        let queue = TaskQueue::new("restart");

        assert_eq!(queue.enqueue(|| async { 1 }).await.unwrap(), 1);
        tokio::task::yield_now().await;
        assert_eq!(queue.enqueue(|| async { 2 }).await.unwrap(), 2);
    }
}
