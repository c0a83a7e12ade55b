use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};

use super::thread::SimulatorThread;
use super::{Simulator, SimulatorHandle};
use crate::partition::PartitionAllocator;
use crate::Result;

/// `Simulator`のビルダ.
#[derive(Debug, Clone)]
pub struct SimulatorBuilder {
    pub(crate) metrics: MetricBuilder,
    pub(crate) max_queue_len: usize,
    pub(crate) logger: Logger,
}
impl SimulatorBuilder {
    /// デフォルトの最大キュー長.
    pub const DEFAULT_MAX_QUEUE_LEN: usize = 10_000;

    /// デフォルト設定で`SimulatorBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        SimulatorBuilder {
            metrics: MetricBuilder::new(),
            max_queue_len: Self::DEFAULT_MAX_QUEUE_LEN,
            logger: Logger::root(Discard, o!()),
        }
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// シミュレータの最大キュー長.
    ///
    /// 要求発行時に、キューの長さがこの値以上の場合には、
    /// その要求は`ErrorKind::SimulatorBusy`エラーで拒否される.
    /// シミュレータ自体は停止しない.
    ///
    /// 要求単位で上書きしたい場合には`SimulatorRequest::max_queue_len`を使用すること.
    ///
    /// デフォルト値は`10_000`.
    pub fn max_queue_len(&mut self, n: usize) -> &mut Self {
        self.max_queue_len = n;
        self
    }

    /// シミュレータスレッド用の logger を登録する
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// `init_allocator()`が生成するアロケータを扱う`Simulator`を起動する.
    ///
    /// 起動したシミュレータ用に、一つの専用OSスレッドが割り当てられ、
    /// スレッド起動後に、まず`init_allocator()`が呼び出される.
    ///
    /// # 注意
    ///
    /// 返り値の`Simulator`インスタンスが破棄されると、
    /// 起動したシミュレータスレッドも停止させられるので注意が必要.
    pub fn spawn<F>(&self, init_allocator: F) -> Simulator
    where
        F: FnOnce() -> Result<PartitionAllocator> + Send + 'static,
    {
        let (thread_handle, thread_monitor) = SimulatorThread::spawn(self.clone(), init_allocator);
        Simulator::new(thread_monitor, SimulatorHandle(thread_handle))
    }
}
impl Default for SimulatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
