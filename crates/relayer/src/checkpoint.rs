//! Durable per-chain resume points.
//!
//! A flat JSON map of chain id to last processed height, written through
//! on every store. Losing the latest write only costs re-processing a few
//! heights, which is idempotent at the destination because order ids
//! collide; that is why store failures are logged and never retried.

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use alloy_primitives::U256;
use compass_primitives::ChainId;
use parking_lot::Mutex;

#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    heights: Mutex<BTreeMap<ChainId, U256>>,
}

impl CheckpointStore {
    /// Open the store, loading any existing checkpoint file. A missing
    /// file is an empty store; a corrupt file is an error.
    pub fn open(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let path = path.into();
        let heights = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let raw: BTreeMap<String, String> = serde_json::from_str(&contents)
                    .map_err(|e| eyre::eyre!("corrupt checkpoint file {}: {e}", path.display()))?;
                let mut heights = BTreeMap::new();
                for (chain, height) in raw {
                    let chain: ChainId = chain
                        .parse()
                        .map_err(|e| eyre::eyre!("bad chain id {chain} in checkpoint file: {e}"))?;
                    let height = U256::from_str_radix(&height, 10)
                        .map_err(|e| eyre::eyre!("bad height for chain {chain}: {e}"))?;
                    heights.insert(chain, height);
                }
                heights
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(eyre::eyre!("cannot read {}: {err}", path.display())),
        };
        Ok(Self {
            path,
            heights: Mutex::new(heights),
        })
    }

    /// Last processed height for the chain, if one was ever stored.
    pub fn load(&self, chain: ChainId) -> Option<U256> {
        self.heights.lock().get(&chain).copied()
    }

    /// Record the last processed height. Heights never go backwards; a
    /// lower value is ignored. Persistence failures are logged, not
    /// retried.
    pub fn store(&self, chain: ChainId, height: U256) {
        let snapshot = {
            let mut heights = self.heights.lock();
            match heights.get(&chain) {
                Some(existing) if *existing > height => {
                    tracing::debug!(
                        chain,
                        %height,
                        %existing,
                        "ignoring checkpoint behind the stored height"
                    );
                    return;
                }
                _ => {}
            }
            heights.insert(chain, height);
            heights
                .iter()
                .map(|(chain, height)| (chain.to_string(), height.to_string()))
                .collect::<BTreeMap<_, _>>()
        };

        if let Err(err) = self.persist(&snapshot) {
            tracing::error!(chain, %height, %err, "failed to write checkpoint");
        }
    }

    fn persist(&self, snapshot: &BTreeMap<String, String>) -> io::Result<()> {
        let contents = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn roundtrip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.json");

        let store = CheckpointStore::open(&path).unwrap();
        assert_eq!(store.load(97), None);
        store.store(97, U256::from(12345u64));
        store.store(212, U256::from(7u64));

        let reopened = CheckpointStore::open(&path).unwrap();
        assert_eq!(reopened.load(97), Some(U256::from(12345u64)));
        assert_eq!(reopened.load(212), Some(U256::from(7u64)));
    }

    #[test]
    fn lower_store_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("checkpoints.json")).unwrap();
        store.store(1, U256::from(100u64));
        store.store(1, U256::from(99u64));
        assert_eq!(store.load(1), Some(U256::from(100u64)));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CheckpointStore::open(&path).is_err());
    }

    proptest! {
        #[test]
        fn stored_heights_are_monotone(updates in prop::collection::vec(any::<u64>(), 1..40)) {
            let dir = tempfile::tempdir().unwrap();
            let store = CheckpointStore::open(dir.path().join("checkpoints.json")).unwrap();
            let mut max = 0u64;
            for update in updates {
                store.store(5, U256::from(update));
                max = max.max(update);
                prop_assert_eq!(store.load(5), Some(U256::from(max)));
            }
        }
    }
}
