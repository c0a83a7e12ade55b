use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};
use uuid::Uuid;

use crate::metrics::AllocatorMetrics;
use crate::partition::PartitionAllocator;
use crate::{ErrorKind, Result};

/// `PartitionAllocator`のビルダ.
#[derive(Debug, Clone)]
pub struct AllocatorBuilder {
    total_size: u64,
    event_log_capacity: Option<usize>,
    instance_uuid: Option<Uuid>,
    metrics: MetricBuilder,
    logger: Logger,
}
impl AllocatorBuilder {
    /// アドレス空間全体のサイズのデフォルト値.
    pub const DEFAULT_TOTAL_SIZE: u64 = 1024;

    /// 新しい`AllocatorBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        AllocatorBuilder {
            total_size: Self::DEFAULT_TOTAL_SIZE,
            event_log_capacity: None,
            instance_uuid: None,
            metrics: MetricBuilder::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// アドレス空間全体のサイズを設定する.
    ///
    /// ゼロは指定できない(`finish()`呼び出し時にエラーとなる).
    ///
    /// デフォルト値は`1024`.
    pub fn total_size(&mut self, size: u64) -> &mut Self {
        self.total_size = size;
        self
    }

    /// 操作履歴の最大保持数を設定する.
    ///
    /// この値を超えた分の履歴は、古いものから破棄される.
    ///
    /// デフォルトでは無制限.
    pub fn event_log_capacity(&mut self, capacity: usize) -> &mut Self {
        self.event_log_capacity = Some(capacity);
        self
    }

    /// アロケータインスタンスを識別するためのUUIDを設定する.
    ///
    /// 本メソッドが呼ばれていない場合は、ランダムなUUIDが割り当てられる.
    pub fn instance_uuid(&mut self, uuid: Uuid) -> &mut Self {
        self.instance_uuid = Some(uuid);
        self
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// アロケータ用の logger を登録する.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// 設定に従って`PartitionAllocator`を生成する.
    ///
    /// 生成直後のアドレス空間は、全体が一つの空き区画となっている.
    pub fn finish(&self) -> Result<PartitionAllocator> {
        track_assert!(self.total_size > 0, ErrorKind::InvalidInput; self.total_size);
        let instance_uuid = self.instance_uuid.unwrap_or_else(Uuid::new_v4);
        let metrics = AllocatorMetrics::new(&self.metrics, self.total_size);
        let logger = self.logger.new(o!("instance" => instance_uuid.to_string()));
        Ok(PartitionAllocator::new_with(
            self.total_size,
            self.event_log_capacity,
            instance_uuid,
            metrics,
            logger,
        ))
    }
}
impl Default for AllocatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
