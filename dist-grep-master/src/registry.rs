use std::sync::Arc;

use dist_grep_core::Address;
use tokio::sync::RwLock;
use tracing::info;

/// Every worker that has announced itself, in registration order.
///
/// Append-only for the life of the process. Registering the same address twice
/// keeps both entries, so that worker gets twice the share of round-robin work.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: Arc<RwLock<Vec<Address>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, address: Address) {
        let mut workers = self.workers.write().await;
        info!("Registered worker: {:?} ({} total)", address, workers.len() + 1);
        workers.push(address);
    }

    /// Snapshot copy; later registrations do not show up in it.
    pub async fn list(&self) -> Vec<Address> {
        self.workers.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_preserves_registration_order_and_duplicates() {
        let registry = WorkerRegistry::new();
        registry.register(Address::new("http://a:8001")).await;
        registry.register(Address::new("http://b:8001")).await;
        registry.register(Address::new("http://a:8001")).await;

        assert_eq!(
            registry.list().await,
            vec![
                Address::new("http://a:8001"),
                Address::new("http://b:8001"),
                Address::new("http://a:8001"),
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_registry() {
        let registry = WorkerRegistry::new();
        registry.register(Address::new("http://a:8001")).await;

        let mut snapshot = registry.list().await;
        snapshot.clear();
        registry.register(Address::new("http://b:8001")).await;

        assert!(snapshot.is_empty());
        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_are_all_kept() {
        let registry = WorkerRegistry::new();
        let mut handles = vec![];
        for i in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.register(Address::new(format!("http://w{}:8001", i))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.list().await.len(), 50);
    }
}
