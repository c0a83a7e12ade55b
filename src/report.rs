//! 外部(E.g., HTTPサーバ)に返すための操作結果.
//!
//! 割当・解放の失敗はエラーではなく、`success`フラグが`false`の結果として表現される.
use serde::Serialize;

use crate::partition::Block;
use crate::{ErrorKind, Result};

/// 割当要求の結果.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationReport {
    /// 割当に成功したかどうか.
    pub success: bool,

    /// 人間が読める形式の結果メッセージ.
    pub message: String,

    /// 割り当てられた区画.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
}
impl AllocationReport {
    /// 割当成功時のメッセージ.
    pub const ALLOCATED: &'static str = "Allocated successfully";

    /// 空き領域不足時のメッセージ.
    pub const NO_SPACE: &'static str = "Not enough memory";

    /// 未知の戦略が指定された場合のメッセージ.
    pub const UNKNOWN_STRATEGY: &'static str = "Unknown strategy";

    /// 入力が不正な場合のメッセージ.
    pub const INVALID_REQUEST: &'static str = "Invalid request";

    /// `PartitionAllocator::allocate`等の結果から`AllocationReport`を生成する.
    pub fn from_result(result: &Result<Block>) -> Self {
        match result {
            Ok(block) => AllocationReport {
                success: true,
                message: Self::ALLOCATED.to_owned(),
                block: Some(*block),
            },
            Err(e) => {
                let message = match *e.kind() {
                    ErrorKind::NoSpace => Self::NO_SPACE,
                    ErrorKind::UnknownStrategy => Self::UNKNOWN_STRATEGY,
                    ErrorKind::InvalidInput => Self::INVALID_REQUEST,
                    _ => "Allocation failed",
                };
                AllocationReport {
                    success: false,
                    message: message.to_owned(),
                    block: None,
                }
            }
        }
    }
}

/// 解放要求の結果.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeallocationReport {
    /// 解放に成功したかどうか.
    pub success: bool,
}
impl DeallocationReport {
    /// `PartitionAllocator::deallocate`の結果から`DeallocationReport`を生成する.
    pub fn from_result(result: &Result<Block>) -> Self {
        DeallocationReport {
            success: result.is_ok(),
        }
    }
}

/// リセット要求の結果.
///
/// リセットは常に成功する.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    /// 常に`true`.
    pub success: bool,
}
impl Default for ResetReport {
    fn default() -> Self {
        ResetReport { success: true }
    }
}
