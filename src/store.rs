use crate::dataset::Dataset;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct DatasetEntry {
    pub created_at: DateTime<Utc>,
    pub dataset: Dataset,
}

/// Datasets held for the lifetime of the process.
///
/// Each entry has its own lock: a phase holds it for the whole pass, so two
/// runs over the same dataset queue up instead of interleaving rows.
#[derive(Clone, Default)]
pub struct DatasetStore {
    entries: Arc<Mutex<HashMap<Uuid, Arc<Mutex<DatasetEntry>>>>>,
}

impl DatasetStore {
    pub async fn insert(&self, dataset: Dataset) -> Uuid {
        let id = Uuid::new_v4();
        let entry = DatasetEntry {
            created_at: Utc::now(),
            dataset,
        };
        self.entries
            .lock()
            .await
            .insert(id, Arc::new(Mutex::new(entry)));
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<DatasetEntry>>> {
        self.entries.lock().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.entries.lock().await.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "GTIN,Name,Brand,Category,€ Price inc. shipping,Inventory\n1,a,b,c,1,1\n";

    #[tokio::test]
    async fn insert_get_remove() {
        let store = DatasetStore::default();
        let id = store.insert(Dataset::from_csv(INPUT).unwrap()).await;

        let entry = store.get(id).await.expect("entry");
        assert_eq!(entry.lock().await.dataset.len(), 1);

        assert!(store.remove(id).await);
        assert!(store.get(id).await.is_none());
        assert!(!store.remove(id).await);
    }
}
