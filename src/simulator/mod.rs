//! アロケータを共有するためのシミュレータ.
//!
//! 一つのシミュレータ(i.e., 一つのアロケータ)には、一つの管理スレッドが割り当てられて、
//! そのシミュレータに対するリクエストは全て直列化されて、到着順に処理される.
//!
//! そのため、複数のスレッドやハンドルから同時に要求が発行された場合でも、
//! 各要求はアロケータの一貫した状態を観測し、更新が失われることはない.
//!
//! [`PartitionAllocator`]自体はロックを持たないので、
//! 複数の利用者で共有したい場合には、このモジュールを経由すること.
//!
//! [`PartitionAllocator`]: ../partition/struct.PartitionAllocator.html
use futures::{Async, Future, Poll};
use std::sync::Arc;

pub use self::builder::SimulatorBuilder;
pub use self::request::SimulatorRequest;

pub(crate) use self::command::Command; // `metrics`モジュール用に公開されている

use self::thread::{SimulatorThreadHandle, SimulatorThreadMonitor};
use crate::metrics::SimulatorMetrics;
use crate::partition::PartitionAllocator;
use crate::{Error, Result};

mod builder;
mod command;
mod request;
mod thread;

/// [`PartitionAllocator`]への要求を直列化して処理するシミュレータ.
///
/// [モジュールドキュメント](index.html)も参照のこと.
///
/// # Future実装
///
/// `Simulator`は[Future]を実装している.
///
/// 実際の処理は、別スレッドで実行されるため`Future::poll`を呼び出さなくても進行上は支障はないが、
/// このメソッドによりシミュレータ(スレッド)の終了(正常ないし異常)を検知することが可能となる.
///
/// なお`Simulator`インスタンスが破棄されると、裏で動いている管理スレッドも停止させられるので、
/// `Future::poll`を呼び出さない場合でも、インスタンス自体は保持しておく必要がある.
///
/// [`PartitionAllocator`]: ../partition/struct.PartitionAllocator.html
/// [Future]: https://docs.rs/futures/0.1/futures/future/trait.Future.html
#[must_use]
#[derive(Debug)]
pub struct Simulator {
    monitor: SimulatorThreadMonitor,
    handle: SimulatorHandle,
    is_stopped: bool,
}
impl Simulator {
    /// デフォルト設定でシミュレータを起動する.
    ///
    /// 設定を変更したい場合には`SimulatorBuilder`を使用すること.
    pub fn spawn<F>(init_allocator: F) -> Simulator
    where
        F: FnOnce() -> Result<PartitionAllocator> + Send + 'static,
    {
        SimulatorBuilder::new().spawn(init_allocator)
    }

    /// シミュレータを操作するためのハンドルを返す.
    pub fn handle(&self) -> SimulatorHandle {
        self.handle.clone()
    }

    /// シミュレータに停止リクエストを発行する.
    ///
    /// 停止リクエストより前に発行された要求は、全て処理されてから停止する.
    /// このメソッドが返った時点でシミュレータが停止している保証はないので、
    /// 確実に終了を検知したい場合には`Future::poll`メソッド経由で知る必要がある.
    pub fn stop(&self) {
        self.handle().request().stop();
    }

    /// シミュレータの起動を待機するための`Future`を返す.
    pub fn wait_for_running(self) -> impl Future<Item = Self, Error = Error> {
        let handle = self.handle();
        let future = handle.request().wait_for_running().statistics();
        track_err!(future.map(move |_| self))
    }

    pub(crate) fn new(monitor: SimulatorThreadMonitor, handle: SimulatorHandle) -> Self {
        Simulator {
            monitor,
            handle,
            is_stopped: false,
        }
    }
}
impl Future for Simulator {
    type Item = ();
    type Error = Error;
    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        let result = track!(self.monitor.poll());
        if let Ok(Async::NotReady) = result {
        } else {
            self.is_stopped = true;
        }
        result
    }
}
impl Drop for Simulator {
    fn drop(&mut self) {
        if !self.is_stopped {
            self.stop();
        }
    }
}

/// シミュレータを操作するためのハンドル.
///
/// 自由に複製して、複数のスレッドから利用することができる.
#[derive(Debug, Clone)]
pub struct SimulatorHandle(SimulatorThreadHandle);
impl SimulatorHandle {
    /// シミュレータに発行するリクエストのビルダを返す.
    pub fn request(&self) -> SimulatorRequest {
        SimulatorRequest::new(&self.0)
    }

    /// シミュレータのメトリクスを返す.
    pub fn metrics(&self) -> &Arc<SimulatorMetrics> {
        self.0.metrics()
    }
}

/// シミュレータの稼働状態.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatorStatus {
    /// シミュレータは起動中.
    ///
    /// 具体的には、管理スレッドがアロケータの初期化(生成)関数を呼び出しているところ.
    Starting = 1,

    /// シミュレータは稼働中.
    Running = 2,

    /// シミュレータは停止済.
    Stopped = 0,
}

#[cfg(test)]
mod tests {
    use fibers_global::execute;
    use std::thread;
    use std::time::Duration;
    use trackable::result::TestResult;

    use super::*;
    use crate::owner::OwnerId;
    use crate::partition::Block;
    use crate::ErrorKind;

    #[test]
    fn simulator_works() -> TestResult {
        let simulator = SimulatorBuilder::new().spawn(|| PartitionAllocator::new(1024));
        let s = simulator.handle();
        let _ = execute(s.request().wait_for_running().statistics()); // 起動を待機

        let report = track!(execute(s.request().allocate("first_fit", 100, id(1))))?;
        assert!(report.success);
        assert_eq!(report.message, "Allocated successfully");
        assert_eq!(report.block, Some(Block::allocated(0, 100, id(1))));

        let report = track!(execute(s.request().allocate("next_fit", 10, id(2))))?;
        assert!(!report.success);
        assert_eq!(report.message, "Unknown strategy");

        let report = track!(execute(s.request().allocate("best_fit", 2000, id(2))))?;
        assert!(!report.success);
        assert_eq!(report.message, "Not enough memory");

        let stats = track!(execute(s.request().statistics()))?;
        assert_eq!(stats.allocated_total, 100);
        assert_eq!(stats.free_total, 924);

        assert!(track!(execute(s.request().deallocate(id(1))))?.success);
        assert!(!track!(execute(s.request().deallocate(id(1))))?.success);

        track!(execute(s.request().allocate("worst_fit", 10, id(3))))?;
        assert!(track!(execute(s.request().reset()))?.success);

        let snapshot = track!(execute(s.request().snapshot()))?;
        assert_eq!(snapshot.blocks, vec![Block::free(0, 1024)]);
        assert!(snapshot.history.is_empty());

        let metrics = s.metrics();
        assert_eq!(metrics.status(), SimulatorStatus::Running);
        assert_eq!(metrics.failed_commands().allocate(), 2);
        assert_eq!(metrics.failed_commands().deallocate(), 1);
        assert_eq!(metrics.dequeued_commands().allocate(), 4);
        assert_eq!(metrics.queue_len(), 0);
        Ok(())
    }

    #[test]
    fn stop_works() -> TestResult {
        let simulator = track!(execute(
            SimulatorBuilder::new()
                .spawn(|| PartitionAllocator::new(1024))
                .wait_for_running()
        ))?;
        let s = simulator.handle();

        simulator.stop();
        track!(execute(simulator))?;
        assert_eq!(s.metrics().status(), SimulatorStatus::Stopped);

        let result = execute(s.request().snapshot());
        assert_eq!(
            result.err().map(|e| *e.kind()),
            Some(ErrorKind::SimulatorTerminated)
        );
        Ok(())
    }

    #[test]
    fn init_failure_works() {
        let simulator = Simulator::spawn(|| PartitionAllocator::new(0));
        let s = simulator.handle();

        let result = execute(simulator);
        assert_eq!(
            result.err().map(|e| *e.kind()),
            Some(ErrorKind::InvalidInput)
        );
        assert_eq!(s.metrics().status(), SimulatorStatus::Stopped);

        let result = execute(s.request().allocate("first_fit", 10, id(1)));
        assert_eq!(
            result.err().map(|e| *e.kind()),
            Some(ErrorKind::SimulatorTerminated)
        );
    }

    #[test]
    fn busy_requests_are_rejected() -> TestResult {
        let simulator = track!(execute(
            SimulatorBuilder::new()
                .spawn(|| PartitionAllocator::new(1024))
                .wait_for_running()
        ))?;
        let s = simulator.handle();

        let result = execute(s.request().max_queue_len(0).allocate("first_fit", 10, id(1)));
        assert_eq!(
            result.err().map(|e| *e.kind()),
            Some(ErrorKind::SimulatorBusy)
        );
        assert_eq!(s.metrics().busy_commands().allocate(), 1);

        let report = track!(execute(s.request().allocate("first_fit", 10, id(1))))?;
        assert!(report.success);
        Ok(())
    }

    #[test]
    fn requests_during_startup() -> TestResult {
        let simulator = Simulator::spawn(|| {
            thread::sleep(Duration::from_millis(100));
            PartitionAllocator::new(16)
        });
        let s = simulator.handle();

        let result = execute(s.request().statistics());
        assert_eq!(
            result.err().map(|e| *e.kind()),
            Some(ErrorKind::SimulatorBusy)
        );

        let stats = track!(execute(s.request().wait_for_running().statistics()))?;
        assert_eq!(stats.free_total, 16);
        Ok(())
    }

    #[test]
    fn concurrent_requests_are_serialized() -> TestResult {
        let simulator = track!(execute(
            SimulatorBuilder::new()
                .spawn(|| PartitionAllocator::new(1000))
                .wait_for_running()
        ))?;

        let threads = (0..10)
            .map(|i| {
                let s = simulator.handle();
                thread::spawn(move || execute(s.request().allocate("first_fit", 100, id(i))))
            })
            .collect::<Vec<_>>();
        for t in threads {
            let report = track!(t.join().expect("thread panicked"))?;
            assert!(report.success);
        }

        let s = simulator.handle();
        let snapshot = track!(execute(s.request().snapshot()))?;
        assert_eq!(snapshot.stats.allocated_total, 1000);
        assert_eq!(snapshot.stats.free_fragment_count, 0);
        assert_eq!(snapshot.blocks.len(), 10);
        for (i, block) in snapshot.blocks.iter().enumerate() {
            assert_eq!(block.start(), i as u64 * 100);
        }

        let report = track!(execute(s.request().allocate("first_fit", 1, id(10))))?;
        assert!(!report.success);
        Ok(())
    }

    fn id(id: u64) -> OwnerId {
        OwnerId::new(id)
    }
}
