use fibers::sync::oneshot;
use futures::{Future, Poll};
use slog::Logger;
use std::sync::mpsc as std_mpsc;
use std::sync::mpsc::SendError;
use std::sync::Arc;
use std::thread;
use trackable::error::ErrorKindExt;

use crate::metrics::SimulatorMetrics;
use crate::partition::{PartitionAllocator, Strategy};
use crate::report::{AllocationReport, DeallocationReport, ResetReport};
use crate::simulator::command::{Command, CommandReceiver, CommandSender};
use crate::simulator::{SimulatorBuilder, SimulatorStatus};
use crate::{Error, ErrorKind, Result};

/// シミュレータの実行スレッド.
#[derive(Debug)]
pub struct SimulatorThread {
    metrics: SimulatorMetrics,
    allocator: PartitionAllocator,
    logger: Logger,
    command_rx: CommandReceiver,
}
impl SimulatorThread {
    /// シミュレータの実行スレッドを起動する.
    pub fn spawn<F>(
        builder: SimulatorBuilder,
        init_allocator: F,
    ) -> (SimulatorThreadHandle, SimulatorThreadMonitor)
    where
        F: FnOnce() -> Result<PartitionAllocator> + Send + 'static,
    {
        let metrics = SimulatorMetrics::new(&builder.metrics);
        metrics
            .status
            .set(f64::from(SimulatorStatus::Starting as u8));

        let (command_tx, command_rx) = std_mpsc::channel();
        let (monitored, monitor) = oneshot::monitor();
        let handle = SimulatorThreadHandle {
            command_tx,
            metrics: Arc::new(metrics.clone()),
            max_queue_len: builder.max_queue_len,
            logger: builder.logger.clone(),
        };

        let logger = builder.logger;
        thread::spawn(move || {
            let result = track!(init_allocator()).and_then(|allocator| {
                metrics.status.set(f64::from(SimulatorStatus::Running as u8));
                info!(logger, "Simulator started";
                      "total_size" => allocator.total_size(),
                      "instance" => allocator.instance_uuid().to_string());

                let mut simulator = SimulatorThread {
                    metrics: metrics.clone(),
                    allocator,
                    logger: logger.clone(),
                    command_rx,
                };
                loop {
                    match track!(simulator.run_once()) {
                        Err(e) => break Err(e),
                        Ok(false) => break Ok(()),
                        Ok(true) => {}
                    }
                }
            });
            metrics.status.set(f64::from(SimulatorStatus::Stopped as u8));
            match result {
                Ok(()) => info!(logger, "Simulator stopped"),
                Err(ref e) => warn!(logger, "Simulator terminated abnormally"; "reason" => %e),
            }
            monitored.exit(result);
        });

        (handle, SimulatorThreadMonitor(monitor))
    }

    fn run_once(&mut self) -> Result<bool> {
        match self.command_rx.recv() {
            Err(_) => {
                // 全てのハンドルが破棄された
                Ok(false)
            }
            Ok(command) => {
                self.metrics.dequeued_commands.increment(&command);
                debug!(self.logger, "Handle command"; "command" => command.name());
                track!(self.handle_command(command))
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Snapshot(c) => {
                c.reply(Ok(self.allocator.snapshot()));
                Ok(true)
            }
            Command::Allocate(c) => {
                let allocator = &mut self.allocator;
                let result = track!(c.strategy().parse::<Strategy>())
                    .and_then(|strategy| track!(allocator.allocate(strategy, c.size(), c.owner())));
                if let Err(ref e) = result {
                    self.metrics.failed_commands.allocate.increment();
                    debug!(self.logger, "Allocation failed";
                           "owner" => c.owner().as_u64(), "size" => c.size(),
                           "strategy" => c.strategy(), "kind" => ?e.kind());
                }
                let error = maybe_critical_error(&result);
                c.reply(Ok(AllocationReport::from_result(&result)));
                error.map_or(Ok(true), Err)
            }
            Command::Deallocate(c) => {
                let result = track!(self.allocator.deallocate(c.owner()));
                if result.is_err() {
                    self.metrics.failed_commands.deallocate.increment();
                    debug!(self.logger, "Deallocation failed"; "owner" => c.owner().as_u64());
                }
                let error = maybe_critical_error(&result);
                c.reply(Ok(DeallocationReport::from_result(&result)));
                error.map_or(Ok(true), Err)
            }
            Command::Reset(c) => {
                self.allocator.reset();
                c.reply(Ok(ResetReport::default()));
                Ok(true)
            }
            Command::Stop(_) => Ok(false),
        }
    }
}

/// アロケータの内部状態が壊れている可能性があるエラーかどうかを判定.
fn maybe_critical_error<T>(result: &Result<T>) -> Option<Error> {
    result.as_ref().err().and_then(|e| match *e.kind() {
        ErrorKind::InconsistentState | ErrorKind::Other => Some(e.clone()),
        _ => None,
    })
}

/// シミュレータの実行スレッドの死活監視用オブジェクト.
#[derive(Debug)]
pub struct SimulatorThreadMonitor(oneshot::Monitor<(), Error>);
impl Future for SimulatorThreadMonitor {
    type Item = ();
    type Error = Error;
    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        track!(self
            .0
            .poll()
            .map_err(|e| e.unwrap_or_else(|| ErrorKind::SimulatorTerminated
                .cause("`SimulatorThread` terminated unintentionally")
                .into())))
    }
}

/// シミュレータスレッドを操作するためのハンドル.
#[derive(Debug, Clone)]
pub struct SimulatorThreadHandle {
    command_tx: CommandSender,
    metrics: Arc<SimulatorMetrics>,
    max_queue_len: usize,
    logger: Logger,
}
impl SimulatorThreadHandle {
    pub fn send_command(&self, command: Command) {
        self.metrics.enqueued_commands.increment(&command);
        if let Err(SendError(command)) = self.command_tx.send(command) {
            self.metrics.dequeued_commands.increment(&command);
            self.metrics.failed_commands.increment(&command);
        }
    }
    pub fn metrics(&self) -> &Arc<SimulatorMetrics> {
        &self.metrics
    }
    pub fn max_queue_len(&self) -> usize {
        self.max_queue_len
    }
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}
