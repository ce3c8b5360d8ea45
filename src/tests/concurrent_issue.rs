#[cfg(test)]
mod test {

    use std::collections::HashSet;
    use std::time::Duration;

    use crate::store::HashAlgorithm;
    use crate::store::StoreSettings;
    use crate::store::TokenHasher;
    use crate::tests::common::{settings, started_store};

    const TASKS: usize = 16;
    const PER_TASK: usize = 64;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_issuers_never_share_a_digest() {
        let store = started_store(Duration::from_secs(60), Duration::from_millis(50)).await;

        let mut handles = Vec::new();
        for _ in 0..TASKS {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut tokens = Vec::with_capacity(PER_TASK);
                for _ in 0..PER_TASK {
                    tokens.push(store.new_token().await.unwrap());
                }
                tokens
            }));
        }

        let mut digests = HashSet::new();
        let mut all = Vec::new();
        for handle in handles {
            for token in handle.await.unwrap() {
                digests.insert(HashAlgorithm::Sha256.digest(&token));
                all.push(token);
            }
        }

        assert_eq!(digests.len(), TASKS * PER_TASK);
        assert_eq!(store.len().await, TASKS * PER_TASK);
        for token in &all {
            assert!(store.checkout(token).await.unwrap());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_redemption_succeeds_once() {
        let store = started_store(Duration::from_secs(60), Duration::from_secs(1)).await;
        let token = store.new_token().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..TASKS {
            let store = store.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                store.checkout_and_drop(&token).await.unwrap()
            }));
        }

        let mut redeemed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                redeemed += 1;
            }
        }
        assert_eq!(redeemed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn checkouts_race_with_stop_without_panicking() {
        let store = started_store(Duration::from_secs(60), Duration::from_millis(10)).await;
        let mut tokens = Vec::new();
        for _ in 0..100 {
            tokens.push(store.new_token().await.unwrap());
        }

        let checker = {
            let store = store.clone();
            let tokens = tokens.clone();
            tokio::spawn(async move {
                for token in &tokens {
                    let _ = store.checkout(token).await.unwrap();
                }
            })
        };
        store.stop().await;
        checker.await.unwrap();

        for token in &tokens {
            assert!(!store.checkout(token).await.unwrap());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn restarts_race_with_in_flight_operations() {
        const WORKERS: usize = 8;
        const ROUNDS: usize = 200;
        const RESTARTS: usize = 20;

        let store = started_store(Duration::from_secs(60), Duration::from_millis(20)).await;

        let mut workers = Vec::new();
        for _ in 0..WORKERS {
            let store = store.clone();
            workers.push(tokio::spawn(async move {
                for _ in 0..ROUNDS {
                    // outcomes depend on where the restarts land, only errors matter
                    let token = store.new_token().await.unwrap();
                    store.checkout(&token).await.unwrap();
                    store.checkout_and_drop(&token).await.unwrap();
                    store.drop_token(&token).await.unwrap();
                }
            }));
        }

        let mut stale = None;
        for round in 0..RESTARTS {
            stale = Some(store.new_token().await.unwrap());
            let hash = if round % 2 == 0 {
                HashAlgorithm::Sha512
            } else {
                HashAlgorithm::Sha256
            };
            store
                .start(StoreSettings {
                    hash,
                    ..settings(Duration::from_secs(60), Duration::from_millis(20))
                })
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }

        for worker in workers {
            worker.await.unwrap();
        }

        let fresh = store.new_token().await.unwrap();
        assert!(store.checkout(&fresh).await.unwrap());
        let stale = stale.expect("issued before the last restart");
        assert!(!store.checkout(&stale).await.unwrap());

        store.stop().await;
        assert!(store.is_empty().await);
        assert!(!store.checkout(&fresh).await.unwrap());
    }
}
