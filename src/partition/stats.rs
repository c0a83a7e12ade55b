use serde::Serialize;

use crate::partition::Block;

/// アドレス空間の利用状況の統計値.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    /// 割当済み区画のサイズの合計.
    #[serde(rename = "allocated")]
    pub allocated_total: u64,

    /// 空き区画のサイズの合計.
    #[serde(rename = "free")]
    pub free_total: u64,

    /// 全体に占める割当済み領域の割合(百分率).
    #[serde(rename = "utilization")]
    pub utilization_percent: f64,

    /// 空き区画の数.
    ///
    /// 空き容量の合計が同じであれば、この値が大きいほど外部断片化が進んでいる.
    #[serde(rename = "fragmentation")]
    pub free_fragment_count: usize,

    /// 区画の総数.
    #[serde(rename = "total_blocks")]
    pub total_block_count: usize,

    /// 最大の空き区画のサイズ.
    ///
    /// これを超えるサイズの割当要求は、どの戦略を用いても失敗する.
    pub largest_free_block: u64,
}
impl Statistics {
    /// 区画列とアドレス空間全体のサイズから統計値を計算する.
    pub(crate) fn from_blocks(blocks: &[Block], total_size: u64) -> Self {
        let allocated_total = blocks
            .iter()
            .filter(|b| b.is_allocated())
            .map(|b| b.size())
            .sum::<u64>();
        let free_total = total_size - allocated_total;
        let free_fragment_count = blocks.iter().filter(|b| b.is_free()).count();
        let largest_free_block = blocks
            .iter()
            .filter(|b| b.is_free())
            .map(|b| b.size())
            .max()
            .unwrap_or(0);
        Statistics {
            allocated_total,
            free_total,
            utilization_percent: allocated_total as f64 / total_size as f64 * 100.0,
            free_fragment_count,
            total_block_count: blocks.len(),
            largest_free_block,
        }
    }
}
