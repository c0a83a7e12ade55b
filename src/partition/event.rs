//! 状態変更操作の履歴.
use std::collections::VecDeque;
use std::fmt;

use crate::owner::OwnerId;
use crate::partition::Strategy;

/// アロケータの状態を変更した操作の記録.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// 割当が行われた.
    Allocated {
        /// 割当先の所有者.
        owner: OwnerId,

        /// 割り当てたサイズ.
        size: u64,

        /// 割り当てた区画の開始位置.
        start: u64,

        /// 割当先の選択に用いた戦略.
        strategy: Strategy,
    },

    /// 解放が行われた.
    Deallocated {
        /// 解放された区画の所有者.
        owner: OwnerId,

        /// 解放された区画の開始位置.
        start: u64,

        /// 解放された区画のサイズ.
        size: u64,
    },
}
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Event::Allocated {
                owner, size, start, ..
            } => write!(f, "Allocated {}KB to {} at {}", size, owner, start),
            Event::Deallocated { owner, .. } => write!(f, "Deallocated {}", owner),
        }
    }
}

/// 追記専用の操作履歴.
///
/// デフォルトでは無制限に記録を保持する.
/// 容量が指定されている場合にはリングバッファとして振る舞い、
/// 容量を超えた分は古いものから破棄される(破棄された数は`dropped()`で取得可能).
#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: Option<usize>,
    entries: VecDeque<Event>,
    dropped: u64,
}
impl EventLog {
    /// 新しい`EventLog`インスタンスを生成する.
    ///
    /// `capacity`が`None`の場合には、保持数は無制限となる.
    pub fn new(capacity: Option<usize>) -> Self {
        EventLog {
            capacity,
            entries: VecDeque::new(),
            dropped: 0,
        }
    }

    /// 記録を末尾に追加する.
    pub fn push(&mut self, event: Event) {
        if self.capacity == Some(0) {
            self.dropped += 1;
            return;
        }
        self.entries.push_back(event);
        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                self.entries.pop_front();
                self.dropped += 1;
            }
        }
    }

    /// 全ての記録を破棄する.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
    }

    /// 保持している記録を古い順に返す.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    /// 保持している記録の数.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 記録を一つも保持していない場合には`true`を返す.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 容量超過により破棄された記録の数.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// 各記録を人間が読める形式の文字列に変換したものを返す.
    pub fn to_strings(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.to_string()).collect()
    }
}
