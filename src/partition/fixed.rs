//! Fixed Partition Table
//!
//! あらかじめ決められた容量の区画群から、要求サイズ分を切り出していく単純なモデル.
//! 区画の分割・結合は行われず、各区画は「残り容量」のみを管理する.
use serde::Serialize;

use crate::partition::Strategy;
use crate::{ErrorKind, Result};

/// 固定区画への割当結果.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixedAllocation {
    /// 割当先の区画の番号.
    pub partition: usize,

    /// 割り当てたサイズ.
    pub size: u64,
}

/// 固定区画群の利用状況.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedPartitionStats {
    /// 区画の数.
    pub total_blocks: usize,

    /// 各区画の残り容量.
    pub remaining_space: Vec<u64>,

    /// これまでの割当(古い順).
    pub allocations: Vec<FixedAllocation>,
}

/// 固定容量の区画群.
///
/// # Examples
///
/// ```
/// use partsim::partition::{FixedPartitionTable, Strategy};
///
/// let mut table = FixedPartitionTable::default();
/// let a = table.allocate(Strategy::BestFit, 150).unwrap();
/// assert_eq!(a.partition, 2); // 200の区画
/// assert_eq!(table.remaining(), &[100, 500, 50, 300, 600]);
/// ```
#[derive(Debug, Clone)]
pub struct FixedPartitionTable {
    capacities: Vec<u64>,
    remaining: Vec<u64>,
    allocations: Vec<FixedAllocation>,
}
impl FixedPartitionTable {
    /// デフォルトの区画容量.
    pub const DEFAULT_CAPACITIES: [u64; 5] = [100, 500, 200, 300, 600];

    /// 指定された容量の区画群を生成する.
    ///
    /// # Errors
    ///
    /// 区画が一つもない場合には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn new(capacities: Vec<u64>) -> Result<Self> {
        track_assert!(!capacities.is_empty(), ErrorKind::InvalidInput);
        Ok(FixedPartitionTable {
            remaining: capacities.clone(),
            capacities,
            allocations: Vec::new(),
        })
    }

    /// 各区画の元々の容量を返す.
    pub fn capacities(&self) -> &[u64] {
        &self.capacities
    }

    /// 各区画の残り容量を返す.
    pub fn remaining(&self) -> &[u64] {
        &self.remaining
    }

    /// これまでの割当を古い順に返す.
    pub fn allocations(&self) -> &[FixedAllocation] {
        &self.allocations
    }

    /// `strategy`に従って、残り容量が`size`以上の区画から`size`分を切り出す.
    ///
    /// 戦略の適用対象は各区画の残り容量となる.
    ///
    /// # Errors
    ///
    /// - `size`がゼロの場合: `ErrorKind::InvalidInput`
    /// - 残り容量が足りる区画が存在しない場合: `ErrorKind::NoSpace`
    pub fn allocate(&mut self, strategy: Strategy, size: u64) -> Result<FixedAllocation> {
        track_assert!(size > 0, ErrorKind::InvalidInput, "size must be positive");
        let candidates = self.remaining.iter().cloned().enumerate();
        let partition = track_assert_some!(
            strategy.select(candidates, size),
            ErrorKind::NoSpace,
            "size={}, strategy={}",
            size,
            strategy
        );
        self.remaining[partition] -= size;
        let allocation = FixedAllocation { partition, size };
        self.allocations.push(allocation);
        Ok(allocation)
    }

    /// 全区画の残り容量を元に戻し、割当の記録を破棄する.
    pub fn reset(&mut self) {
        self.remaining.copy_from_slice(&self.capacities);
        self.allocations.clear();
    }

    /// 現在の利用状況を返す.
    pub fn stats(&self) -> FixedPartitionStats {
        FixedPartitionStats {
            total_blocks: self.remaining.len(),
            remaining_space: self.remaining.clone(),
            allocations: self.allocations.clone(),
        }
    }
}
impl Default for FixedPartitionTable {
    fn default() -> Self {
        FixedPartitionTable {
            capacities: Self::DEFAULT_CAPACITIES.to_vec(),
            remaining: Self::DEFAULT_CAPACITIES.to_vec(),
            allocations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn it_works() -> TestResult {
        let mut table = FixedPartitionTable::default();
        assert_eq!(
            track!(table.allocate(Strategy::FirstFit, 150))?,
            FixedAllocation {
                partition: 1,
                size: 150
            }
        );
        assert_eq!(track!(table.allocate(Strategy::BestFit, 100))?.partition, 0);
        assert_eq!(track!(table.allocate(Strategy::WorstFit, 100))?.partition, 4);
        assert_eq!(table.remaining(), &[0, 350, 200, 300, 500]);

        let result = table.allocate(Strategy::FirstFit, 501);
        assert_eq!(result.err().map(|e| *e.kind()), Some(ErrorKind::NoSpace));

        let stats = table.stats();
        assert_eq!(stats.total_blocks, 5);
        assert_eq!(stats.allocations.len(), 3);

        table.reset();
        assert_eq!(table.remaining(), table.capacities());
        assert!(table.allocations().is_empty());
        Ok(())
    }

    #[test]
    fn partitions_never_merge() -> TestResult {
        let mut table = track!(FixedPartitionTable::new(vec![100, 100]))?;
        track!(table.allocate(Strategy::FirstFit, 60))?;
        track!(table.allocate(Strategy::FirstFit, 60))?;

        // 残り容量の合計は80あるが、単一の区画には40しか残っていない
        let result = table.allocate(Strategy::BestFit, 50);
        assert_eq!(result.err().map(|e| *e.kind()), Some(ErrorKind::NoSpace));
        Ok(())
    }

    #[test]
    fn invalid_input() {
        assert!(FixedPartitionTable::new(Vec::new()).is_err());
        let mut table = FixedPartitionTable::default();
        let result = table.allocate(Strategy::FirstFit, 0);
        assert_eq!(result.err().map(|e| *e.kind()), Some(ErrorKind::InvalidInput));
    }
}
