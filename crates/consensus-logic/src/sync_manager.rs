//! High level sync manager which starts the fork choice worker and exposes
//! handles to feed it blocks and read the chain status.

use std::sync::Arc;
use std::thread;

use anyhow::anyhow;
use canon_config::ConsensusConfig;
use canon_db::traits::Database;
use canon_state::{block::Block, params::Params, transition::StateTransition};
use tokio::sync::{mpsc, oneshot};
use tracing::*;

use crate::errors::Error;
use crate::fork_choice_manager::{BlockOutcome, ForkChoiceManager};
use crate::genesis;
use crate::message::ForkChoiceMessage;
use crate::status::ChainStatusHandle;

pub struct SyncManager {
    params: Arc<Params>,

    fcm_tx: mpsc::Sender<ForkChoiceMessage>,
    status: ChainStatusHandle,
    worker: Option<thread::JoinHandle<()>>,
}

impl SyncManager {
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn get_params(&self) -> Arc<Params> {
        self.params.clone()
    }

    pub fn status(&self) -> &ChainStatusHandle {
        &self.status
    }

    /// If the worker is still taking messages.
    pub fn is_running(&self) -> bool {
        !self.fcm_tx.is_closed()
    }

    /// Submits a block without waiting for it to be processed. (synchronously)
    pub fn submit_block(&self, block: Block) -> bool {
        self.fcm_tx
            .blocking_send(ForkChoiceMessage::NewBlock(block, None))
            .is_ok()
    }

    /// Submits a block without waiting for it to be processed. (asynchronously)
    pub async fn submit_block_async(&self, block: Block) -> bool {
        self.fcm_tx
            .send(ForkChoiceMessage::NewBlock(block, None))
            .await
            .is_ok()
    }

    /// Submits a block and waits for the outcome. (synchronously)
    pub fn process_block_blocking(&self, block: Block) -> Result<BlockOutcome, Error> {
        let (tx, rx) = oneshot::channel();
        self.fcm_tx
            .blocking_send(ForkChoiceMessage::NewBlock(block, Some(tx)))
            .map_err(|_| Error::WorkerExited)?;
        rx.blocking_recv().map_err(|_| Error::WorkerExited)?
    }

    /// Submits a block and waits for the outcome. (asynchronously)
    pub async fn process_block(&self, block: Block) -> Result<BlockOutcome, Error> {
        let (tx, rx) = oneshot::channel();
        self.fcm_tx
            .send(ForkChoiceMessage::NewBlock(block, Some(tx)))
            .await
            .map_err(|_| Error::WorkerExited)?;
        rx.await.map_err(|_| Error::WorkerExited)?
    }

    /// Waits until everything submitted so far has been processed.
    /// (synchronously)
    pub fn flush_blocking(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.fcm_tx
            .blocking_send(ForkChoiceMessage::Flush(tx))
            .map_err(|_| Error::WorkerExited)?;
        rx.blocking_recv().map_err(|_| Error::WorkerExited)
    }

    /// Waits until everything submitted so far has been processed.
    /// (asynchronously)
    pub async fn flush(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.fcm_tx
            .send(ForkChoiceMessage::Flush(tx))
            .await
            .map_err(|_| Error::WorkerExited)?;
        rx.await.map_err(|_| Error::WorkerExited)
    }

    /// Stops the worker once it's drained its queue and waits for it.
    pub fn shutdown(self) -> anyhow::Result<()> {
        let Self { fcm_tx, worker, .. } = self;
        drop(fcm_tx);

        if let Some(handle) = worker {
            handle
                .join()
                .map_err(|_| anyhow!("fork choice worker panicked"))?;
        }

        Ok(())
    }
}

/// Starts the sync tasks using provided settings.  Writes genesis first if
/// the database is empty.  `transition` must be fresh, it's brought up to the
/// recovered tip before the worker starts.
pub fn start_sync_tasks<
    D: Database + Sync + Send + 'static,
    T: StateTransition + Send + 'static,
>(
    database: Arc<D>,
    transition: T,
    params: Arc<Params>,
    config: ConsensusConfig,
) -> anyhow::Result<SyncManager> {
    let (fcm_tx, fcm_rx) = mpsc::channel::<ForkChoiceMessage>(config.msg_queue_size);

    // Check if we have to do genesis.
    if genesis::check_needs_genesis(database.as_ref())? {
        info!("we need to do genesis!");
        genesis::init_genesis(&params, database.as_ref())?;
    }

    let fcm = ForkChoiceManager::load(params.clone(), config, database, transition)?;
    let status = fcm.status_handle().clone();

    let worker = thread::Builder::new()
        .name("fork-choice".to_owned())
        .spawn(move || fcm_worker_task(fcm, fcm_rx))?;

    Ok(SyncManager {
        params,
        fcm_tx,
        status,
        worker: Some(worker),
    })
}

fn fcm_worker_task<D: Database, T: StateTransition>(
    fcm: ForkChoiceManager<D, T>,
    fcm_rx: mpsc::Receiver<ForkChoiceMessage>,
) {
    info!(tip = %fcm.status_handle().current_tip().blkid, "starting fork choice worker");

    if let Err(e) = fcm_worker_task_inner(fcm, fcm_rx) {
        error!(err = %e, "fork choice worker aborted");
        return;
    }

    info!("fork choice worker exiting");
}

fn fcm_worker_task_inner<D: Database, T: StateTransition>(
    mut fcm: ForkChoiceManager<D, T>,
    mut fcm_rx: mpsc::Receiver<ForkChoiceMessage>,
) -> anyhow::Result<()> {
    loop {
        let Some(m) = fcm_rx.blocking_recv() else {
            break;
        };

        process_fcm_msg(m, &mut fcm)?;
    }

    Ok(())
}

fn process_fcm_msg<D: Database, T: StateTransition>(
    msg: ForkChoiceMessage,
    fcm: &mut ForkChoiceManager<D, T>,
) -> anyhow::Result<()> {
    match msg {
        ForkChoiceMessage::NewBlock(block, reply) => {
            let blkid = block.get_blockid();
            let res = fcm.on_block_received(block);

            let fatal = match &res {
                Ok(outcome) => {
                    trace!(%blkid, ?outcome, "processed block");
                    None
                }
                Err(e) if e.is_fatal() => Some(e.to_string()),
                Err(e) => {
                    warn!(%blkid, err = %e, "failed to process block");
                    None
                }
            };

            if let Some(reply) = reply {
                // Caller may have given up waiting.
                let _ = reply.send(res);
            }

            if let Some(msg) = fatal {
                return Err(anyhow!("processing block {blkid}: {msg}"));
            }
        }

        ForkChoiceMessage::Flush(done) => {
            let _ = done.send(());
        }
    }

    Ok(())
}
