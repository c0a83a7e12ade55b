//! 区画(パーティション)ベースのアロケータ.
//!
//! 固定サイズの線形アドレス空間を、アドレス順に並んだ「割当済み」ないし「空き」の区画列として管理し、
//! first-fit / best-fit / worst-fit の各戦略に基づいて割当を行う.
//!
//! アロケータが担当するのは区画の計算処理のみで、実際のメモリの確保等を行うことは無い.
//!
//! # 不変条件
//!
//! 全ての公開操作の前後で、以下が成立している:
//!
//! - 区画は開始位置の昇順に隙間なく並んでおり、先頭の区画の開始位置は`0`、サイズの合計はアドレス空間全体のサイズと等しい
//! - 空き区画同士が隣接することはない(解放時に即座に結合される)
//! - 割当済み区画の所有者IDは互いに異なる
//! - 全ての区画のサイズは正
//!
//! # 並行性
//!
//! `PartitionAllocator`は内部で排他制御を行わない.
//! 複数のスレッドから操作する場合には、利用側で直列化する必要がある
//! (e.g., [simulator]モジュールを使用する).
//!
//! [simulator]: ../simulator/index.html
use slog::Logger;
use std::collections::HashSet;
use uuid::Uuid;

pub use self::block::Block;
pub use self::builder::AllocatorBuilder;
pub use self::event::{Event, EventLog};
pub use self::fixed::{FixedAllocation, FixedPartitionStats, FixedPartitionTable};
pub use self::snapshot::Snapshot;
pub use self::stats::Statistics;
pub use self::strategy::Strategy;

use crate::metrics::AllocatorMetrics;
use crate::owner::OwnerId;
use crate::{ErrorKind, Result};

mod block;
mod builder;
mod event;
mod fixed;
mod snapshot;
mod stats;
mod strategy;

/// 区画ベースのアロケータ.
///
/// [モジュールドキュメント](index.html)も参照のこと.
///
/// # Examples
///
/// ```
/// use partsim::OwnerId;
/// use partsim::partition::{PartitionAllocator, Strategy};
///
/// let mut allocator = PartitionAllocator::new(1024).unwrap();
/// let block = allocator.allocate(Strategy::FirstFit, 100, OwnerId::new(1)).unwrap();
/// assert_eq!(block.start(), 0);
/// assert_eq!(allocator.statistics().free_total, 924);
///
/// allocator.deallocate(OwnerId::new(1)).unwrap();
/// assert_eq!(allocator.blocks().len(), 1);
/// ```
#[derive(Debug)]
pub struct PartitionAllocator {
    total_size: u64,
    blocks: Vec<Block>,
    events: EventLog,
    instance_uuid: Uuid,
    metrics: AllocatorMetrics,
    logger: Logger,
}
impl PartitionAllocator {
    /// デフォルト設定で、サイズが`total_size`のアロケータを生成する.
    ///
    /// 設定を変更したい場合には`AllocatorBuilder`を使用すること.
    ///
    /// # Errors
    ///
    /// `total_size`がゼロの場合には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn new(total_size: u64) -> Result<Self> {
        track!(AllocatorBuilder::new().total_size(total_size).finish())
    }

    pub(crate) fn new_with(
        total_size: u64,
        event_log_capacity: Option<usize>,
        instance_uuid: Uuid,
        metrics: AllocatorMetrics,
        logger: Logger,
    ) -> Self {
        PartitionAllocator {
            total_size,
            blocks: vec![Block::free(0, total_size)],
            events: EventLog::new(event_log_capacity),
            instance_uuid,
            metrics,
            logger,
        }
    }

    /// アドレス空間全体のサイズを返す.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// インスタンスの識別子を返す.
    pub fn instance_uuid(&self) -> Uuid {
        self.instance_uuid
    }

    /// アドレス順に並んだ区画列を返す.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// 操作履歴を返す.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// アロケータのメトリクスを返す.
    pub fn metrics(&self) -> &AllocatorMetrics {
        &self.metrics
    }

    /// `owner`に割り当てられている区画を返す.
    pub fn find(&self, owner: OwnerId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.owner() == Some(owner))
    }

    /// `strategy`に従って、`owner`に`size`分の区画を割り当てる.
    ///
    /// 選択された空き区画が要求サイズよりも大きい場合には、その区画は分割され、
    /// 先頭部分が割り当てられて、残りは直後に新しい空き区画として挿入される.
    ///
    /// 成功した場合には、割り当てた区画が返される.
    ///
    /// # Errors
    ///
    /// 以下の場合にはエラーが返され、アロケータの状態は変更されない:
    ///
    /// - `size`がゼロ、ないし`owner`が既に割当中: `ErrorKind::InvalidInput`
    /// - 要求サイズを満たす空き区画が存在しない: `ErrorKind::NoSpace`
    pub fn allocate(&mut self, strategy: Strategy, size: u64, owner: OwnerId) -> Result<Block> {
        if let Err(e) = track!(self.check_allocation_request(size, owner)) {
            self.metrics.invalid_requests.increment();
            debug!(self.logger, "Rejected allocation request";
                   "owner" => owner.as_u64(), "size" => size);
            return Err(e);
        }

        let candidates = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_free())
            .map(|(i, b)| (i, b.size()));
        let index = if let Some(index) = strategy.select(candidates, size) {
            index
        } else {
            self.metrics.nospace_failures.increment();
            debug!(self.logger, "No free block is large enough";
                   "owner" => owner.as_u64(), "size" => size, "strategy" => strategy.as_str());
            track_panic!(
                ErrorKind::NoSpace,
                "size={}, strategy={}, largest_free_block={}",
                size,
                strategy,
                self.statistics().largest_free_block
            );
        };

        if let Some(remainder) = self.blocks[index].split_off(size, owner) {
            debug!(self.logger, "Split a free block";
                   "start" => remainder.start(), "remainder" => remainder.size());
            self.blocks.insert(index + 1, remainder);
        }
        let block = self.blocks[index];
        self.events.push(Event::Allocated {
            owner,
            size,
            start: block.start(),
            strategy,
        });
        self.metrics.count_allocation(strategy, size);
        self.update_usage();
        Ok(block)
    }

    /// `owner`に割り当てられている区画を解放する.
    ///
    /// 解放された区画は、隣接する空き区画と即座に結合される.
    ///
    /// 成功した場合には、解放前の(結合前の)区画が返される.
    ///
    /// # Errors
    ///
    /// `owner`に割り当てられている区画が存在しない場合には、
    /// 種類が`ErrorKind::UnknownOwner`のエラーが返され、アロケータの状態は変更されない.
    pub fn deallocate(&mut self, owner: OwnerId) -> Result<Block> {
        let index = if let Some(index) = self.blocks.iter().position(|b| b.owner() == Some(owner))
        {
            index
        } else {
            self.metrics.invalid_requests.increment();
            debug!(self.logger, "Rejected deallocation request"; "owner" => owner.as_u64());
            track_panic!(ErrorKind::UnknownOwner, "owner={}", owner);
        };

        let released = self.blocks[index];
        self.blocks[index].release();
        self.events.push(Event::Deallocated {
            owner,
            start: released.start(),
            size: released.size(),
        });
        self.metrics.count_release(released.size());
        self.coalesce();
        self.update_usage();
        Ok(released)
    }

    /// アロケータを初期状態に戻す.
    ///
    /// 全ての区画と操作履歴が破棄され、アドレス空間全体が一つの空き区画となる.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.blocks.push(Block::free(0, self.total_size));
        self.events.clear();
        self.metrics.resets.increment();
        self.update_usage();
        info!(self.logger, "Allocator was reset"; "total_size" => self.total_size);
    }

    /// 現在の利用状況の統計値を返す.
    pub fn statistics(&self) -> Statistics {
        Statistics::from_blocks(&self.blocks, self.total_size)
    }

    /// 現在の状態(区画列・統計値・操作履歴)のスナップショットを返す.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            instance_uuid: self.instance_uuid,
            total_size: self.total_size,
            blocks: self.blocks.clone(),
            stats: self.statistics(),
            history: self.events.to_strings(),
        }
    }

    /// 区画列が不変条件を満たしているかどうかを検査する.
    ///
    /// # Errors
    ///
    /// 不変条件が満たされていない場合には、種類が`ErrorKind::InconsistentState`のエラーが返される.
    pub fn check_invariants(&self) -> Result<()> {
        track_assert!(!self.blocks.is_empty(), ErrorKind::InconsistentState);

        let mut next_start = 0;
        let mut prev_is_free = false;
        let mut owners = HashSet::new();
        for block in &self.blocks {
            track_assert!(block.size() > 0, ErrorKind::InconsistentState; block);
            track_assert!(block.start() == next_start, ErrorKind::InconsistentState;
                          block, next_start);
            track_assert!(!(prev_is_free && block.is_free()), ErrorKind::InconsistentState;
                          block);
            if let Some(owner) = block.owner() {
                track_assert!(owners.insert(owner), ErrorKind::InconsistentState; block);
            }
            next_start = block.end();
            prev_is_free = block.is_free();
        }
        track_assert!(next_start == self.total_size, ErrorKind::InconsistentState;
                      next_start, self.total_size);
        Ok(())
    }

    fn check_allocation_request(&self, size: u64, owner: OwnerId) -> Result<()> {
        track_assert!(size > 0, ErrorKind::InvalidInput, "size must be positive");
        track_assert!(
            self.find(owner).is_none(),
            ErrorKind::InvalidInput,
            "{} is already allocated",
            owner
        );
        Ok(())
    }

    // 隣接する空き区画の組がなくなるまで結合を繰り返す.
    fn coalesce(&mut self) {
        let mut i = 0;
        while i + 1 < self.blocks.len() {
            if self.blocks[i].is_free() && self.blocks[i + 1].is_free() {
                let next = self.blocks.remove(i + 1);
                self.blocks[i].absorb(next);
                self.metrics.coalesced_blocks.increment();
                debug!(self.logger, "Coalesced free blocks";
                       "start" => self.blocks[i].start(), "size" => self.blocks[i].size());
            } else {
                i += 1;
            }
        }
    }

    fn update_usage(&self) {
        let usage = self
            .blocks
            .iter()
            .filter(|b| b.is_allocated())
            .map(|b| b.size())
            .sum::<u64>();
        self.metrics.usage.set(usage as f64);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn it_works() -> TestResult {
        let mut allocator = track!(PartitionAllocator::new(1024))?;
        track!(allocator.check_invariants())?;
        assert_eq!(layout(&allocator), vec![(0, 1024, None)]);

        let block = track!(allocator.allocate(Strategy::FirstFit, 100, id(1)))?;
        assert_eq!(block, Block::allocated(0, 100, id(1)));
        assert_eq!(layout(&allocator), vec![(0, 100, Some(1)), (100, 924, None)]);

        track!(allocator.allocate(Strategy::FirstFit, 50, id(2)))?;
        assert_eq!(
            layout(&allocator),
            vec![(0, 100, Some(1)), (100, 50, Some(2)), (150, 874, None)]
        );

        let stats = allocator.statistics();
        assert_eq!(stats.allocated_total, 150);
        assert_eq!(stats.free_total, 874);
        assert!((stats.utilization_percent - 14.6484375).abs() < 1e-9);
        assert_eq!(stats.free_fragment_count, 1);
        assert_eq!(stats.total_block_count, 3);
        assert_eq!(stats.largest_free_block, 874);

        let released = track!(allocator.deallocate(id(1)))?;
        assert_eq!(released, Block::allocated(0, 100, id(1)));
        assert_eq!(
            layout(&allocator),
            vec![(0, 100, None), (100, 50, Some(2)), (150, 874, None)]
        );
        track!(allocator.check_invariants())?;

        track!(allocator.deallocate(id(2)))?;
        assert_eq!(layout(&allocator), vec![(0, 1024, None)]);
        track!(allocator.check_invariants())?;

        assert_eq!(
            allocator.events().to_strings(),
            vec![
                "Allocated 100KB to P1 at 0",
                "Allocated 50KB to P2 at 100",
                "Deallocated P1",
                "Deallocated P2",
            ]
        );

        let m = allocator.metrics();
        assert_eq!(m.allocated_blocks().first_fit(), 2);
        assert_eq!(m.allocated_units(), 150);
        assert_eq!(m.released_blocks(), 2);
        assert_eq!(m.coalesced_blocks(), 2);
        assert_eq!(m.usage(), 0);
        Ok(())
    }

    #[test]
    fn exact_fit_does_not_split() -> TestResult {
        let mut allocator = track!(PartitionAllocator::new(100))?;
        track!(allocator.allocate(Strategy::BestFit, 100, id(1)))?;
        assert_eq!(layout(&allocator), vec![(0, 100, Some(1))]);
        assert_eq!(allocator.statistics().free_fragment_count, 0);
        assert_eq!(allocator.statistics().largest_free_block, 0);
        assert_eq!(allocator.statistics().utilization_percent, 100.0);

        track!(allocator.deallocate(id(1)))?;
        track!(allocator.allocate(Strategy::WorstFit, 40, id(2)))?;
        track!(allocator.allocate(Strategy::WorstFit, 60, id(3)))?;
        assert_eq!(layout(&allocator), vec![(0, 40, Some(2)), (40, 60, Some(3))]);
        track!(allocator.check_invariants())?;
        Ok(())
    }

    #[test]
    fn strategies_diverge() -> TestResult {
        // 空き区画: [0, 500), [501, 701), [702, 1002)
        let allocator = track!(fragmented(&[500, 200, 300]))?;
        let free = allocator
            .blocks()
            .iter()
            .filter(|b| b.is_free())
            .map(|b| (b.start(), b.size()))
            .collect::<Vec<_>>();
        assert_eq!(free, vec![(0, 500), (501, 200), (702, 300)]);

        let expected = [
            (Strategy::FirstFit, 0),
            (Strategy::BestFit, 501),
            (Strategy::WorstFit, 0),
        ];
        for &(strategy, start) in &expected {
            let mut allocator = track!(fragmented(&[500, 200, 300]))?;
            let block = track!(allocator.allocate(strategy, 150, id(100)))?;
            assert_eq!(block.start(), start, "{}", strategy);
            track!(allocator.check_invariants())?;
        }

        // first-fitは、サイズに関わらずアドレスが最も小さい候補を選ぶ
        let mut allocator = track!(fragmented(&[300, 500, 200]))?;
        let block = track!(allocator.allocate(Strategy::FirstFit, 150, id(100)))?;
        assert_eq!(block.start(), 0);
        let mut allocator = track!(fragmented(&[300, 500, 200]))?;
        let block = track!(allocator.allocate(Strategy::WorstFit, 150, id(100)))?;
        assert_eq!(block.start(), 301);
        Ok(())
    }

    #[test]
    fn best_fit_prefers_lowest_address_on_tie() -> TestResult {
        let mut allocator = track!(fragmented(&[200, 200]))?;
        let block = track!(allocator.allocate(Strategy::BestFit, 150, id(100)))?;
        assert_eq!(block.start(), 0);

        let mut allocator = track!(fragmented(&[200, 200]))?;
        let block = track!(allocator.allocate(Strategy::WorstFit, 150, id(100)))?;
        assert_eq!(block.start(), 0);
        Ok(())
    }

    #[test]
    fn oversubscription_fails() -> TestResult {
        for &strategy in &Strategy::ALL {
            let mut allocator = track!(fragmented(&[500, 200, 300]))?;
            let before = allocator.blocks().to_vec();
            let events = allocator.events().len();

            // 空き容量の合計(1000)は足りているが、単一の空き区画には収まらない
            let result = allocator.allocate(strategy, 501, id(100));
            let e = result.err();
            assert_eq!(e.as_ref().map(|e| *e.kind()), Some(ErrorKind::NoSpace));
            let message = e.map(|e| e.to_string()).unwrap_or_default();
            assert!(message.contains("largest_free_block=500"), "{}", message);
            assert_eq!(allocator.blocks(), &before[..]);
            assert_eq!(allocator.events().len(), events);
            assert_eq!(allocator.metrics().nospace_failures(), 1);
        }
        Ok(())
    }

    #[test]
    fn invalid_requests_are_rejected() -> TestResult {
        let mut allocator = track!(PartitionAllocator::new(1024))?;
        track!(allocator.allocate(Strategy::FirstFit, 10, id(1)))?;
        let before = allocator.blocks().to_vec();

        let result = allocator.allocate(Strategy::FirstFit, 0, id(2));
        assert_eq!(result.err().map(|e| *e.kind()), Some(ErrorKind::InvalidInput));

        let result = allocator.allocate(Strategy::FirstFit, 10, id(1));
        assert_eq!(result.err().map(|e| *e.kind()), Some(ErrorKind::InvalidInput));

        let result = allocator.deallocate(id(3));
        assert_eq!(result.err().map(|e| *e.kind()), Some(ErrorKind::UnknownOwner));

        assert_eq!(allocator.blocks(), &before[..]);
        assert_eq!(allocator.events().len(), 1);
        assert_eq!(allocator.metrics().invalid_requests(), 3);

        // 解放後であれば、同じ所有者IDを再利用できる
        track!(allocator.deallocate(id(1)))?;
        let result = allocator.deallocate(id(1));
        assert_eq!(result.err().map(|e| *e.kind()), Some(ErrorKind::UnknownOwner));
        track!(allocator.allocate(Strategy::FirstFit, 10, id(1)))?;
        Ok(())
    }

    #[test]
    fn coalesce_with_both_neighbors() -> TestResult {
        let mut allocator = track!(PartitionAllocator::new(30))?;
        track!(allocator.allocate(Strategy::FirstFit, 10, id(1)))?;
        track!(allocator.allocate(Strategy::FirstFit, 10, id(2)))?;
        track!(allocator.allocate(Strategy::FirstFit, 10, id(3)))?;
        track!(allocator.deallocate(id(1)))?;
        track!(allocator.deallocate(id(3)))?;
        assert_eq!(
            layout(&allocator),
            vec![(0, 10, None), (10, 10, Some(2)), (20, 10, None)]
        );

        track!(allocator.deallocate(id(2)))?;
        assert_eq!(layout(&allocator), vec![(0, 30, None)]);
        assert_eq!(allocator.metrics().coalesced_blocks(), 2);
        Ok(())
    }

    #[test]
    fn reset_is_idempotent() -> TestResult {
        let mut allocator = track!(PartitionAllocator::new(1024))?;
        track!(allocator.allocate(Strategy::FirstFit, 100, id(1)))?;
        track!(allocator.allocate(Strategy::BestFit, 200, id(2)))?;

        allocator.reset();
        let once = (allocator.blocks().to_vec(), allocator.events().len());
        allocator.reset();
        let twice = (allocator.blocks().to_vec(), allocator.events().len());
        assert_eq!(once, twice);
        assert_eq!(once, (vec![Block::free(0, 1024)], 0));

        let stats = allocator.statistics();
        assert_eq!(stats.allocated_total, 0);
        assert_eq!(stats.free_total, 1024);
        assert_eq!(stats.utilization_percent, 0.0);
        assert_eq!(stats.free_fragment_count, 1);
        assert_eq!(stats.total_block_count, 1);
        assert_eq!(allocator.metrics().resets(), 2);

        // リセット後は、以前の所有者IDも再利用可能
        track!(allocator.allocate(Strategy::FirstFit, 100, id(1)))?;
        Ok(())
    }

    #[test]
    fn bounded_event_log() -> TestResult {
        let mut allocator = track!(AllocatorBuilder::new().event_log_capacity(2).finish())?;
        for i in 0..5 {
            track!(allocator.allocate(Strategy::FirstFit, 1, id(i)))?;
        }
        assert_eq!(
            allocator.events().to_strings(),
            vec!["Allocated 1KB to P3 at 3", "Allocated 1KB to P4 at 4"]
        );
        assert_eq!(allocator.events().dropped(), 3);
        Ok(())
    }

    #[test]
    fn invariants_hold_under_random_operations() -> TestResult {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut allocator = track!(PartitionAllocator::new(4096))?;
        let mut live = Vec::new();
        for i in 0..2000 {
            match rng.gen_range(0, 10) {
                0 => {
                    allocator.reset();
                    live.clear();
                }
                1..=4 if !live.is_empty() => {
                    let owner = live.swap_remove(rng.gen_range(0, live.len()));
                    track!(allocator.deallocate(owner))?;
                    let blocks = allocator.blocks();
                    assert!(blocks.windows(2).all(|w| !(w[0].is_free() && w[1].is_free())));
                }
                _ => {
                    let strategy = Strategy::ALL[rng.gen_range(0, 3)];
                    let size = rng.gen_range(1, 512);
                    let owner = id(i);
                    match allocator.allocate(strategy, size, owner) {
                        Ok(_) => live.push(owner),
                        Err(e) => assert_eq!(*e.kind(), ErrorKind::NoSpace),
                    }
                }
            }
            track!(allocator.check_invariants())?;
            let total = allocator.blocks().iter().map(|b| b.size()).sum::<u64>();
            assert_eq!(total, allocator.total_size());
            assert_eq!(allocator.metrics().usage(), allocator.statistics().allocated_total);
        }
        Ok(())
    }

    #[test]
    fn snapshot_works() -> TestResult {
        let mut allocator = track!(PartitionAllocator::new(1024))?;
        track!(allocator.allocate(Strategy::FirstFit, 100, id(1)))?;
        let snapshot = allocator.snapshot();
        assert_eq!(snapshot.total_size, 1024);
        assert_eq!(snapshot.blocks, allocator.blocks());
        assert_eq!(snapshot.stats, allocator.statistics());
        assert_eq!(snapshot.history, vec!["Allocated 100KB to P1 at 0"]);
        Ok(())
    }

    fn id(n: u64) -> OwnerId {
        OwnerId::new(n)
    }

    fn layout(allocator: &PartitionAllocator) -> Vec<(u64, u64, Option<u64>)> {
        allocator
            .blocks()
            .iter()
            .map(|b| (b.start(), b.size(), b.owner().map(|o| o.as_u64())))
            .collect()
    }

    // 指定サイズの空き区画群を、サイズ1の割当済み区画で区切って並べたアロケータを生成する.
    fn fragmented(free_sizes: &[u64]) -> Result<PartitionAllocator> {
        let total = free_sizes.iter().map(|s| s + 1).sum();
        let mut allocator = track!(PartitionAllocator::new(total))?;
        for (i, &size) in free_sizes.iter().enumerate() {
            let i = i as u64;
            track!(allocator.allocate(Strategy::FirstFit, size, id(1000 + i)))?;
            track!(allocator.allocate(Strategy::FirstFit, 1, id(2000 + i)))?;
        }
        for i in 0..free_sizes.len() as u64 {
            track!(allocator.deallocate(id(1000 + i)))?;
        }
        Ok(allocator)
    }
}
