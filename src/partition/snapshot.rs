use serde::Serialize;
use uuid::Uuid;

use crate::partition::{Block, Statistics};

/// アロケータの状態の読み取り専用スナップショット.
///
/// 可視化等のために、外部表現(e.g., JSON)へ変換されることを想定している.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// アロケータインスタンスの識別子.
    pub instance_uuid: Uuid,

    /// アドレス空間全体のサイズ.
    pub total_size: u64,

    /// アドレス順に並んだ区画列.
    pub blocks: Vec<Block>,

    /// 統計値.
    pub stats: Statistics,

    /// 操作履歴(古い順).
    pub history: Vec<String>,
}
