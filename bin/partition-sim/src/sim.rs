//! In-process network of nodes that gets split in two and then healed.

use std::{ops::Range, sync::Arc, time::Duration};

use anyhow::{anyhow, bail};
use canon_config::{ConsensusConfig, SimConfig};
use canon_consensus_logic::{
    status::ChainInfo,
    sync_manager::{start_sync_tasks, SyncManager},
};
use canon_db::stubs::get_stub_database;
use canon_primitives::{buf::Buf32, id::BlockId};
use canon_state::{block::Block, params::Params};
use serde::Serialize;
use tokio::time;
use tracing::*;

use crate::stake::{StakeLedger, Staker};

const GROUP_A_STAKER: u8 = 0xaa;
const GROUP_B_STAKER: u8 = 0xbb;

struct SimNode {
    name: String,
    sync: SyncManager,
}

pub struct Simulation {
    params: Arc<Params>,
    config: SimConfig,
    nodes: Vec<SimNode>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HeightHash {
    pub height: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<BlockId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeReport {
    pub node: String,
    pub block_hashes: Vec<HeightHash>,
    pub chain_info: ChainInfo,
}

#[derive(Clone, Debug, Serialize)]
pub struct SimReport {
    pub converged: bool,
    pub nodes: Vec<NodeReport>,
}

impl Simulation {
    /// Starts every node from the same genesis.
    pub fn start(
        params: Arc<Params>,
        consensus: &ConsensusConfig,
        config: SimConfig,
    ) -> anyhow::Result<Self> {
        let mut nodes = Vec::with_capacity(config.node_count);
        for i in 0..config.node_count {
            let sync = start_sync_tasks(
                get_stub_database(),
                StakeLedger::new(),
                params.clone(),
                consensus.clone(),
            )?;
            nodes.push(SimNode {
                name: format!("node-{i}"),
                sync,
            });
        }

        info!(nodes = %nodes.len(), "started nodes");
        Ok(Self {
            params,
            config,
            nodes,
        })
    }

    fn group_a(&self) -> Range<usize> {
        0..self.nodes.len() / 2
    }

    fn group_b(&self) -> Range<usize> {
        self.nodes.len() / 2..self.nodes.len()
    }

    /// Builds a chain off genesis the way one group's stakers would.
    fn stake(&self, staker: u8, len: usize, weight: u64) -> Vec<Block> {
        Staker::new(&self.params, Buf32::from([staker; 32])).produce_chain(len, weight)
    }

    /// Sends blocks to a range of nodes and waits for them to process them.
    async fn relay(&self, range: Range<usize>, blocks: &[Block]) -> anyhow::Result<()> {
        let targets = &self.nodes[range];
        for node in targets {
            for blk in blocks {
                if !node.sync.submit_block_async(blk.clone()).await {
                    bail!("{} stopped taking blocks", node.name);
                }
            }
        }

        let timeout = Duration::from_secs(self.config.settle_timeout_secs);
        for node in targets {
            time::timeout(timeout, node.sync.flush())
                .await
                .map_err(|_| anyhow!("{} didn't settle in time", node.name))??;
        }

        Ok(())
    }

    /// Plays out the partition and the heal.
    pub async fn play(&self) -> anyhow::Result<()> {
        let cfg = &self.config;
        let short = self.stake(GROUP_A_STAKER, cfg.short_len, cfg.short_weight);
        let long = self.stake(GROUP_B_STAKER, cfg.long_len, cfg.long_weight);

        info!(group_a = ?self.group_a(), group_b = ?self.group_b(), "partitioning network");
        self.relay(self.group_a(), &short).await?;
        self.relay(self.group_b(), &long).await?;
        for node in &self.nodes {
            let tip = node.sync.status().current_tip();
            info!(node = %node.name, tip = %tip.blkid, height = %tip.height, weight = %tip.weight, "partitioned tip");
        }

        info!("healing partition");
        self.relay(self.group_a(), &long).await?;
        self.relay(self.group_b(), &short).await?;

        Ok(())
    }

    /// Collects what every node thinks the chain is.
    pub fn report(&self) -> SimReport {
        let max_height = self.config.short_len.max(self.config.long_len) as u64 + 1;

        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let status = node.sync.status().read();
                let block_hashes = (1..=max_height)
                    .map(|height| match status.block_hash(height) {
                        Ok(hash) => HeightHash {
                            height,
                            hash: Some(hash),
                            error: None,
                        },
                        Err(e) => HeightHash {
                            height,
                            hash: None,
                            error: Some(e.to_string()),
                        },
                    })
                    .collect();

                NodeReport {
                    node: node.name.clone(),
                    block_hashes,
                    chain_info: status.chain_info(),
                }
            })
            .collect::<Vec<_>>();

        let converged = nodes.windows(2).all(|w| {
            w[0].block_hashes == w[1].block_hashes
                && w[0].chain_info.best_block_hash == w[1].chain_info.best_block_hash
        });

        SimReport { converged, nodes }
    }

    pub fn shutdown(self) -> anyhow::Result<()> {
        for node in self.nodes {
            node.sync.shutdown()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(config: SimConfig) -> SimReport {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let sim = Simulation::start(
            Arc::new(Params::default()),
            &ConsensusConfig::default(),
            config,
        )
        .unwrap();
        rt.block_on(sim.play()).unwrap();
        let report = sim.report();
        sim.shutdown().unwrap();
        report
    }

    #[test]
    fn test_default_scenario_converges() {
        let report = run(SimConfig::default());
        assert!(report.converged);
        assert_eq!(report.nodes.len(), 6);

        for node in &report.nodes {
            assert_eq!(node.chain_info.blocks, 5);
            assert_eq!(node.block_hashes.len(), 6);
            assert!(node.block_hashes[..5].iter().all(|h| h.hash.is_some()));
            assert_eq!(
                node.block_hashes[5].error.as_deref(),
                Some("Block height out of range")
            );
        }
    }

    #[test]
    fn test_heavier_short_chain_wins() {
        let report = run(SimConfig {
            node_count: 4,
            short_weight: 10,
            ..Default::default()
        });
        assert!(report.converged);
        assert!(report.nodes.iter().all(|n| n.chain_info.blocks == 2));
    }
}
