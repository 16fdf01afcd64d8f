//! Engine wiring: builds the EVM capability implementations from the
//! configuration and spawns the task set.

use std::sync::{Arc, atomic::AtomicBool};

use alloy_primitives::{Address, U256};
use compass_chain::{
    Connection, EvmConnection, EvmMapClient, EvmProofAssembler, EvmSubmitter, MapClient,
};
use eyre::WrapErr;
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{
    alert::Alerter,
    checkpoint::CheckpointStore,
    config::Config,
    cursor::SharedCursor,
    error::{RelayerError, Result},
    maintainer::Maintainer,
    messenger::Messenger,
    progress::ProgressController,
    router::{Router, SubmitterTask},
    sampler::TipSampler,
};

/// The running relayer: every task, plus the channels the binary drives
/// it through.
pub struct Engine {
    tasks: JoinSet<Result<()>>,
    /// Fatal conditions (Maintainer retry exhaustion). The orchestrator
    /// decides between restart and abort.
    pub sys_errors: mpsc::UnboundedReceiver<RelayerError>,
    /// Free-form out-of-band alarms.
    pub alerts: mpsc::UnboundedReceiver<String>,
    /// Keeps the system-error channel open even when no task holds a
    /// sender, so `sys_errors.recv()` pends instead of closing.
    _sys_tx: mpsc::UnboundedSender<RelayerError>,
}

impl Engine {
    /// Build the EVM stack from the configuration and spawn all tasks.
    /// Providers connect lazily; this fails only on bad configuration.
    pub fn spawn_from_config(config: &Config, shutdown: CancellationToken) -> eyre::Result<Self> {
        let store = Arc::new(CheckpointStore::open(&config.checkpoint_path)?);
        let (alerter, alerts) = Alerter::channel();
        let (sys_tx, sys_errors) = mpsc::unbounded_channel();
        let eligible = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        let lightnode: Address = config
            .map
            .lightnode
            .parse()
            .wrap_err("invalid map lightnode address")?;
        let mcs: Address = config.map.mcs.parse().wrap_err("invalid map mcs address")?;

        let submitter = match &config.map.private_key {
            Some(key) => EvmSubmitter::connect_with_signer(&config.map.rpc_url, mcs, lightnode, key)
                .wrap_err("cannot build map submitter")?,
            None => EvmSubmitter::connect(&config.map.rpc_url, mcs, lightnode)
                .wrap_err("cannot build map submitter")?,
        };

        let account = match (submitter.account(), &config.map.relayer_account) {
            (Some(account), _) => account,
            (None, Some(configured)) => configured
                .parse()
                .wrap_err("invalid relayer_account address")?,
            (None, None) => {
                tracing::warn!(
                    "no signer or relayer_account configured; status queries use the zero address"
                );
                Address::ZERO
            }
        };

        let map: Arc<dyn MapClient> = Arc::new(
            EvmMapClient::connect(
                &config.map.rpc_url,
                lightnode,
                account,
                config.map.block_interval(),
            )
            .wrap_err("cannot build map client")?,
        );

        let (router, router_rx) = Router::channel();
        tasks.spawn(SubmitterTask::new("map", submitter, router_rx, shutdown.clone()).run());

        // Destination tip sampler, feeding the rotation-window estimate.
        let map_conn: Arc<dyn Connection> =
            Arc::new(EvmConnection::connect("map", &config.map.rpc_url)?);
        let (dst_tip_tx, dst_tip_rx) = watch::channel(U256::ZERO);
        tasks.spawn(
            TipSampler::new(
                "map",
                map_conn,
                config.map.block_interval(),
                dst_tip_tx,
                shutdown.clone(),
            )
            .run(),
        );

        let mut cursors = Vec::with_capacity(config.chains.len());
        for chain in &config.chains {
            let conn: Arc<dyn Connection> =
                Arc::new(EvmConnection::connect(&chain.name, &chain.rpc_url)?);
            let cursor = SharedCursor::new(U256::ZERO);
            cursors.push((chain.chain_id, cursor.clone()));

            let messenger = Messenger::new(
                chain,
                config.map.chain_id,
                conn.clone(),
                map.clone(),
                Arc::new(EvmProofAssembler),
                router.clone(),
                store.clone(),
                alerter.clone(),
                eligible.clone(),
                cursor,
                shutdown.clone(),
            )?;
            tasks.spawn(messenger.run());

            if chain.sync_to_map {
                if let Some(epoch_size) = chain.epoch_size {
                    let maintainer = Maintainer::new(
                        chain,
                        config.map.chain_id,
                        epoch_size,
                        conn,
                        map.clone(),
                        router.clone(),
                        eligible.clone(),
                        sys_tx.clone(),
                        shutdown.clone(),
                    )?;
                    tasks.spawn(maintainer.run());
                } else {
                    tracing::info!(
                        chain = %chain.name,
                        "sync_to_map without epoch_size; header relay left to the destination"
                    );
                }
            }
        }

        tasks.spawn(
            ProgressController::new(map, eligible, dst_tip_rx, cursors, shutdown).run(),
        );

        Ok(Self {
            tasks,
            sys_errors,
            alerts,
            _sys_tx: sys_tx,
        })
    }

    /// Detach the alarm stream so the caller can drain it from its own
    /// task. Later calls get an already-closed channel.
    pub fn take_alerts(&mut self) -> mpsc::UnboundedReceiver<String> {
        let (_closed, empty) = mpsc::unbounded_channel();
        std::mem::replace(&mut self.alerts, empty)
    }

    /// Await every task. Clean shutdowns are expected; anything else is
    /// logged.
    pub async fn join(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) | Ok(Err(RelayerError::Shutdown)) => {}
                Ok(Err(err)) => tracing::error!(%err, "relayer task failed"),
                Err(err) => tracing::error!(%err, "relayer task panicked"),
            }
        }
    }
}
