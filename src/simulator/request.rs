use futures::Future;
use trackable::error::ErrorKindExt;

use super::thread::SimulatorThreadHandle;
use crate::owner::OwnerId;
use crate::partition::{Snapshot, Statistics};
use crate::report::{AllocationReport, DeallocationReport, ResetReport};
use crate::simulator::command::{self, Command};
use crate::simulator::SimulatorStatus;
use crate::{Error, ErrorKind, Result};

/// シミュレータに対してリクエストを発行するためのビルダ.
///
/// 割当や解放の失敗(E.g., 空き領域不足)は`Future`のエラーにはならず、
/// `success`が`false`の結果として返される.
/// `Future`がエラーとなるのは、シミュレータが過負荷ないし停止済みの場合のみ.
///
/// # 注意
///
/// リクエストを発行した結果返される`Future`を効率的にポーリングするためには
/// [`fibers`]を使用する必要がある。
///
/// [`fibers`]: https://github.com/dwango/fibers-rs
#[derive(Debug)]
pub struct SimulatorRequest<'a> {
    simulator: &'a SimulatorThreadHandle,
    max_queue_len: Option<usize>,
    wait_for_running: bool,
}
impl<'a> SimulatorRequest<'a> {
    pub(crate) fn new(simulator: &'a SimulatorThreadHandle) -> Self {
        SimulatorRequest {
            simulator,
            max_queue_len: None,
            wait_for_running: false,
        }
    }

    /// アロケータの状態のスナップショットを取得する.
    pub fn snapshot(&self) -> impl Future<Item = Snapshot, Error = Error> {
        let (command, response) = command::TakeSnapshot::new();
        self.send_command(Command::Snapshot(command));
        response
    }

    /// アロケータの統計値を取得する.
    pub fn statistics(&self) -> impl Future<Item = Statistics, Error = Error> {
        self.snapshot().map(|snapshot| snapshot.stats)
    }

    /// `strategy`という名前の戦略で、サイズ`size`の領域を`owner`に割り当てる.
    ///
    /// 戦略名が未知の場合には、メッセージが`"Unknown strategy"`の結果が返される.
    pub fn allocate(
        &self,
        strategy: &str,
        size: u64,
        owner: OwnerId,
    ) -> impl Future<Item = AllocationReport, Error = Error> {
        let (command, response) = command::AllocateBlock::new(strategy.to_owned(), size, owner);
        self.send_command(Command::Allocate(command));
        response
    }

    /// `owner`に割り当てられている領域を解放する.
    pub fn deallocate(&self, owner: OwnerId) -> impl Future<Item = DeallocationReport, Error = Error> {
        let (command, response) = command::DeallocateBlock::new(owner);
        self.send_command(Command::Deallocate(command));
        response
    }

    /// アロケータを初期状態に戻す.
    pub fn reset(&self) -> impl Future<Item = ResetReport, Error = Error> {
        let (command, response) = command::ResetAllocator::new();
        self.send_command(Command::Reset(command));
        response
    }

    /// シミュレータを停止する.
    ///
    /// 停止の実行は`Simulator`インスタンスの保持者に制限したいので、
    /// このメソッドは`crate`のみを公開範囲とする.
    pub(crate) fn stop(&self) {
        self.send_command(Command::Stop(command::StopSimulator));
    }

    /// シミュレータのキューの最大長を指定する.
    ///
    /// もし要求発行時に、シミュレータのキューの長さがこの値以上の場合には、
    /// `ErrorKind::SimulatorBusy`エラーが返される.
    ///
    /// デフォルトは`SimulatorBuilder::max_queue_len`で指定された値.
    pub fn max_queue_len(&mut self, max: usize) -> &mut Self {
        self.max_queue_len = Some(max);
        self
    }

    /// シミュレータが起動処理中の場合には、その完了を待つように指示する.
    ///
    /// デフォルトでは、起動処理中にリクエストが発行された場合には、
    /// 即座に`ErrorKind::SimulatorBusy`エラーが返される.
    pub fn wait_for_running(&mut self) -> &mut Self {
        self.wait_for_running = true;
        self
    }

    fn send_command(&self, command: Command) {
        if let Command::Stop(_) = command {
            // 停止要求は起動中や過負荷時でも受け付ける
            self.simulator.send_command(command);
            return;
        }
        let metrics = self.simulator.metrics();
        if !self.wait_for_running && metrics.status() == SimulatorStatus::Starting {
            let e = track!(ErrorKind::SimulatorBusy.cause("The simulator is starting up"));
            command.failed(e.into());
            return;
        }
        if let Err(e) = track!(self.check_limit()) {
            warn!(self.simulator.logger(), "Request rejected"; "queue_len" => metrics.queue_len());
            metrics.busy_commands.increment(&command);
            command.failed(e)
        } else {
            self.simulator.send_command(command);
        }
    }

    fn check_limit(&self) -> Result<()> {
        let metrics = self.simulator.metrics();
        let max = self
            .max_queue_len
            .unwrap_or_else(|| self.simulator.max_queue_len());
        track_assert!(
            metrics.queue_len() < max,
            ErrorKind::SimulatorBusy,
            "value={}, max={}",
            metrics.queue_len(),
            max
        );
        Ok(())
    }
}
