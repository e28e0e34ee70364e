//! PollLoop - receive → dispatch-all → flush を空になるまで繰り返す
//!
//! # 状態遷移
//! - Running: 1 回 receive し、空なら Stopped へ
//! - Stopped: 終端。RunEnd を出して RunStats を返す
//!
//! # 失敗の扱い
//! - メッセージ単位のエラー（PayloadUnavailable / HandlerFailed）は
//!   カウントして DispatchError イベントにするだけ。バッチは止めない
//! - バッチ削除の部分失敗は AckPartialFailure イベントにして続行
//! - それ以外のバックエンドエラーはリトライせず、そのまま呼び出し側へ返す

use std::sync::Arc;

use crate::app::ack_buffer::AckBuffer;
use crate::app::dispatcher::Dispatcher;
use crate::domain::{RelayEvent, RunId, RunStats};
use crate::error::RelayError;
use crate::ports::{BackendError, Clock, EventSink, IdGenerator, QueueBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Stopped,
}

pub struct PollLoop {
    backend: Arc<dyn QueueBackend>,
    dispatcher: Dispatcher,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl PollLoop {
    pub fn new(
        backend: Arc<dyn QueueBackend>,
        dispatcher: Dispatcher,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            events,
            clock,
            ids,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Drain the queue until a receive comes back empty.
    ///
    /// Returns `Ok` even when individual messages failed; `Err` only for
    /// backend errors that abort the run.
    pub async fn run(&self) -> Result<RunStats, RelayError> {
        let run_id = self.ids.generate_run_id();
        let mut stats = RunStats::new(run_id, self.clock.now());
        let mut acks = AckBuffer::new();
        self.events.emit(&RelayEvent::RunStart { run_id });

        let mut state = LoopState::Running;
        while state == LoopState::Running {
            state = self
                .iterate(run_id, &mut stats, &mut acks)
                .await
                .inspect_err(|err| tracing::error!(%run_id, error = %err, "run aborted"))?;
        }

        stats.finish(self.clock.now());
        self.events.emit(&RelayEvent::RunEnd {
            run_id,
            processed: stats.processed,
            failed: stats.failed,
        });
        Ok(stats)
    }

    async fn iterate(
        &self,
        run_id: RunId,
        stats: &mut RunStats,
        acks: &mut AckBuffer,
    ) -> Result<LoopState, RelayError> {
        let batch = self.backend.receive_batch().await?;
        if batch.is_empty() {
            return Ok(LoopState::Stopped);
        }
        stats.record_batch();
        self.events.emit(&RelayEvent::BatchReceived {
            run_id,
            size: batch.len(),
        });

        for raw in &batch {
            match self.dispatcher.process(run_id, raw, acks).await {
                Ok(_) => stats.record_processed(),
                Err(err) => {
                    stats.record_failed();
                    self.events.emit(&RelayEvent::DispatchError {
                        run_id,
                        kind: err.kind,
                        cause: err.cause(),
                        context: err.context,
                    });
                }
            }
        }

        match acks.flush(self.backend.as_ref()).await {
            Ok(0) => {}
            Ok(count) => {
                stats.record_acknowledged(count);
                self.events.emit(&RelayEvent::AckFlushed { run_id, count });
            }
            Err(BackendError::PartialDelete { attempted, failed }) => {
                stats.record_acknowledged(attempted.saturating_sub(failed.len()));
                self.events
                    .emit(&RelayEvent::AckPartialFailure { run_id, failed });
            }
            Err(err) => return Err(err.into()),
        }

        Ok(LoopState::Running)
    }
}
