//! An asynchronously maintained mirror of the main chain's committed
//! abstract hashes.
//!
//! Whether a remote-claimed block is finalized is decided against this
//! cache: a block is *committed* once the hash inside its abstract has been
//! observed on the main chain. The cache only ever grows and its height
//! only ever rises.

use crate::main_chain::{MainChainClient, MainChainError};
use spurplan::{BlockAbstract, BlockHash};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// The mirror of committed abstract hashes.
///
/// Point reads ([`is_present`](Self::is_present)) never block on the
/// runtime. All writes go through a single serial updater: readers that
/// observe a given [`current_height`](Self::current_height) are guaranteed
/// to see every hash committed up to that height.
pub struct AbstractCache {
    client: Arc<dyn MainChainClient>,
    hashes: Mutex<HashSet<BlockHash>>,
    current_height: AtomicU64,
    // Serializes update runs; the set above is only written while this is
    // held.
    updater: tokio::sync::Mutex<()>,
}

impl AbstractCache {
    /// Create a cache over the given main chain.
    ///
    /// The shared genesis block needs no abstract; its hash is seeded as
    /// committed.
    #[must_use]
    pub fn new(client: Arc<dyn MainChainClient>, genesis_hash: BlockHash) -> Self {
        let mut hashes = HashSet::new();
        hashes.insert(genesis_hash);
        Self {
            client,
            hashes: Mutex::new(hashes),
            current_height: AtomicU64::new(0),
            updater: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether the block with the given hash is committed.
    #[must_use]
    pub fn is_present(&self, hash: BlockHash) -> bool {
        self.hashes.lock().unwrap().contains(&hash)
    }

    /// The main-chain height this cache is complete up to.
    #[must_use]
    pub fn current_height(&self) -> u64 {
        self.current_height.load(Ordering::SeqCst)
    }

    /// Forward an abstract to the main chain.
    ///
    /// On success the hash will eventually appear in the cache through the
    /// update mechanism.
    pub async fn commit(
        &self,
        block_abstract: siegel::Signed<BlockAbstract>,
    ) -> Result<BlockHash, MainChainError> {
        self.client.commit(block_abstract).await
    }

    /// Note that the main chain has reached `height` and fetch the missing
    /// abstracts in the background.
    pub fn note_new_height(self: &Arc<Self>, height: u64) {
        if height <= self.current_height() {
            return;
        }
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(err) = cache.update_to(height).await {
                log::warn!("Background cache update to height {} failed: {}", height, err);
            }
        });
    }

    /// Ask the main chain for its latest height and update up to there.
    pub async fn update_to_latest(&self) -> Result<(), MainChainError> {
        let height = self.client.status().await?.latest_height;
        self.update_to(height).await
    }

    /// Update the cache up to `height`.
    ///
    /// On a query failure the run aborts without advancing the height; the
    /// next run retries from the same point.
    async fn update_to(&self, height: u64) -> Result<(), MainChainError> {
        let _guard = self.updater.lock().await;

        let start = self.current_height();
        for i in start + 1..=height {
            let abstracts = self.client.query(i).await.map_err(|err| {
                log::warn!(
                    "Could not get abstracts at height {}, perhaps the main chain is not (yet) reachable: {}",
                    i,
                    err
                );
                err
            })?;
            let mut hashes = self.hashes.lock().unwrap();
            for block_abstract in abstracts {
                hashes.insert(block_abstract.body().block_hash);
            }
        }

        // The height only rises once every hash below it is in the set.
        let previous = self.current_height.fetch_max(height, Ordering::SeqCst);
        if previous < height {
            log::debug!(
                "Updated the abstract cache from height {} to {}.",
                previous,
                height
            );
        }
        Ok(())
    }

    /// Block until the first full update succeeds, so that
    /// [`is_present`](Self::is_present) answers are meaningful.
    pub async fn initial_update(&self) {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            match self.update_to_latest().await {
                Ok(()) => break,
                Err(err) => {
                    let retry_time = 2;
                    log::info!(
                        "Could not update cache on startup, trying again in {}s: {}",
                        retry_time,
                        err
                    );
                    tokio::time::sleep(Duration::from_secs(retry_time)).await;
                }
            }
        }
        log::info!(
            "Successfully updated cache on startup; main chain is at height {}.",
            self.current_height()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::main_chain::MainChainError;
    use async_trait::async_trait;
    use siegel::{Identity, Signable, Signed};
    use spurplan::{BlockNumber, ChainStatus, NodeId};
    use std::sync::Mutex as StdMutex;

    fn test_hash(value: u8) -> BlockHash {
        BlockHash::from_hex(&hex_of(value)).unwrap()
    }

    fn hex_of(value: u8) -> String {
        format!("{:02x}", value).repeat(32)
    }

    fn signed_abstract(identity: &Identity, height: u64, hash: BlockHash) -> Signed<BlockAbstract> {
        #[allow(clippy::cast_possible_truncation)]
        let number = BlockNumber::new(height as u32);
        BlockAbstract::new(NodeId::new(0), number, hash)
            .sign(identity)
            .unwrap()
    }

    /// A main chain whose queries can be scripted to fail once per height.
    struct FlakyMainChain {
        abstracts: Vec<Signed<BlockAbstract>>,
        failing_heights: StdMutex<Vec<u64>>,
    }

    impl FlakyMainChain {
        fn new(hashes: &[BlockHash]) -> Self {
            let identity = Identity::generate();
            let abstracts = hashes
                .iter()
                .enumerate()
                .map(|(i, &hash)| signed_abstract(&identity, i as u64 + 1, hash))
                .collect();
            Self {
                abstracts,
                failing_heights: StdMutex::new(Vec::new()),
            }
        }

        fn fail_once_at(&self, height: u64) {
            self.failing_heights.lock().unwrap().push(height);
        }
    }

    #[async_trait]
    impl MainChainClient for FlakyMainChain {
        async fn status(&self) -> Result<ChainStatus, MainChainError> {
            Ok(ChainStatus {
                latest_height: self.abstracts.len() as u64,
            })
        }

        async fn query(&self, height: u64) -> Result<Vec<Signed<BlockAbstract>>, MainChainError> {
            let mut failing = self.failing_heights.lock().unwrap();
            if let Some(position) = failing.iter().position(|&h| h == height) {
                failing.remove(position);
                return Err(MainChainError::UnknownHeight(height));
            }
            drop(failing);

            #[allow(clippy::cast_possible_truncation)]
            let index = height as usize - 1;
            self.abstracts
                .get(index)
                .map(|a| vec![a.clone()])
                .ok_or(MainChainError::UnknownHeight(height))
        }

        async fn commit(
            &self,
            _block_abstract: Signed<BlockAbstract>,
        ) -> Result<BlockHash, MainChainError> {
            unimplemented!("not used by the cache tests")
        }
    }

    #[tokio::test]
    async fn update_mirrors_all_heights() {
        let chain = Arc::new(FlakyMainChain::new(&[test_hash(1), test_hash(2)]));
        let cache = AbstractCache::new(chain, test_hash(0));

        assert!(cache.is_present(test_hash(0))); // genesis is seeded
        assert!(!cache.is_present(test_hash(1)));

        cache.update_to_latest().await.unwrap();
        assert_eq!(cache.current_height(), 2);
        assert!(cache.is_present(test_hash(1)));
        assert!(cache.is_present(test_hash(2)));
    }

    #[tokio::test]
    async fn failed_query_aborts_without_advancing() {
        let chain = Arc::new(FlakyMainChain::new(&[
            test_hash(1),
            test_hash(2),
            test_hash(3),
        ]));
        chain.fail_once_at(2);
        let cache = AbstractCache::new(chain, test_hash(0));

        cache.update_to_latest().await.unwrap_err();
        assert_eq!(cache.current_height(), 0);
        assert!(!cache.is_present(test_hash(3)));

        // The next run retries from the same point and completes.
        cache.update_to_latest().await.unwrap();
        assert_eq!(cache.current_height(), 3);
        assert!(cache.is_present(test_hash(3)));
    }

    #[tokio::test]
    async fn noted_heights_arrive_in_the_background() {
        let chain = Arc::new(FlakyMainChain::new(&[test_hash(1)]));
        let cache = Arc::new(AbstractCache::new(chain, test_hash(0)));

        // Heights we already cover are ignored.
        cache.note_new_height(0);

        cache.note_new_height(1);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while cache.current_height() < 1 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "background update never ran"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(cache.is_present(test_hash(1)));
    }

    #[tokio::test]
    async fn height_is_monotone() {
        let chain = Arc::new(FlakyMainChain::new(&[test_hash(1)]));
        let cache = AbstractCache::new(chain, test_hash(0));

        cache.update_to_latest().await.unwrap();
        assert_eq!(cache.current_height(), 1);

        // A stale update request cannot lower the height.
        cache.update_to(0).await.unwrap();
        assert_eq!(cache.current_height(), 1);
    }
}
