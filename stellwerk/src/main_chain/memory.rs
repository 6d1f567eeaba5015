use super::{MainChainClient, MainChainError};
use async_trait::async_trait;
use siegel::Signed;
use spurplan::{BlockAbstract, BlockHash, ChainStatus};
use std::sync::Mutex;

/// An in-memory main chain: every commit becomes its own height.
///
/// Used as a test double and for single-machine setups. It checks abstract
/// signatures on commit (like the real chain's validators would) and
/// deduplicates by block hash.
#[derive(Debug, Default)]
pub struct MemoryMainChain {
    heights: Mutex<Vec<Vec<Signed<BlockAbstract>>>>,
}

impl MemoryMainChain {
    /// Create an empty main chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MainChainClient for MemoryMainChain {
    async fn status(&self) -> Result<ChainStatus, MainChainError> {
        let heights = self.heights.lock().unwrap();
        Ok(ChainStatus {
            latest_height: heights.len() as u64,
        })
    }

    async fn query(&self, height: u64) -> Result<Vec<Signed<BlockAbstract>>, MainChainError> {
        let heights = self.heights.lock().unwrap();
        let index = height
            .checked_sub(1)
            .ok_or(MainChainError::UnknownHeight(height))?;
        #[allow(clippy::cast_possible_truncation)]
        let index = index as usize;
        heights
            .get(index)
            .cloned()
            .ok_or(MainChainError::UnknownHeight(height))
    }

    async fn commit(
        &self,
        block_abstract: Signed<BlockAbstract>,
    ) -> Result<BlockHash, MainChainError> {
        block_abstract.verify()?;

        let block_hash = block_abstract.body().block_hash;
        let mut heights = self.heights.lock().unwrap();
        let already_committed = heights.iter().flatten().any(|committed| {
            committed.body().block_hash == block_hash
        });
        if !already_committed {
            heights.push(vec![block_abstract]);
        }
        Ok(block_hash)
    }
}
