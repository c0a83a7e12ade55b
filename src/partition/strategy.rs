//! Allocation Strategy

use serde::{Serialize, Serializer};
use std::cmp;
use std::fmt;
use std::str::FromStr;
use trackable::error::ErrorKindExt;

use crate::{Error, ErrorKind, Result};

/// 割当戦略.
///
/// いずれの戦略も、空き領域をアドレスの昇順に走査し、要求サイズ以上のものだけを候補とする.
/// 候補間で優劣が付かない場合には、先に現れた(アドレスが小さい)ものが選ばれる.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// 要求サイズを満たす最初の空き領域を選択する.
    FirstFit,

    /// 余剰(空き領域のサイズ - 要求サイズ)が最小となる空き領域を選択する.
    BestFit,

    /// 余剰が最大となる空き領域を選択する.
    WorstFit,
}
impl Strategy {
    /// 全ての戦略.
    pub const ALL: [Strategy; 3] = [Strategy::FirstFit, Strategy::BestFit, Strategy::WorstFit];

    /// 戦略の名前を返す.
    ///
    /// `FromStr`が受け付ける文字列と同じ.
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::FirstFit => "first_fit",
            Strategy::BestFit => "best_fit",
            Strategy::WorstFit => "worst_fit",
        }
    }

    /// `candidates`の中から、この戦略に従って`size`の割当先を選択する.
    ///
    /// `candidates`の各要素は「識別子」と「空き領域のサイズ」の組で、
    /// アドレスの昇順に列挙されている必要がある.
    ///
    /// 要求を満たす候補が存在しない場合には`None`が返される.
    pub fn select<K, I>(self, candidates: I, size: u64) -> Option<K>
    where
        I: IntoIterator<Item = (K, u64)>,
    {
        let mut fits = candidates.into_iter().filter(|&(_, len)| len >= size);
        let selected = match self {
            Strategy::FirstFit => fits.next(),
            // `min_by_key`は、最小値が複数ある場合には最初の要素を返す
            Strategy::BestFit => fits.min_by_key(|&(_, len)| len - size),
            Strategy::WorstFit => fits.min_by_key(|&(_, len)| cmp::Reverse(len - size)),
        };
        selected.map(|(key, _)| key)
    }
}
impl FromStr for Strategy {
    type Err = Error;

    /// `first_fit`, `best_fit`, `worst_fit`のいずれかの文字列から`Strategy`を生成する.
    ///
    /// # Errors
    ///
    /// それ以外の文字列の場合には、種類が`ErrorKind::UnknownStrategy`のエラーが返される.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first_fit" => Ok(Strategy::FirstFit),
            "best_fit" => Ok(Strategy::BestFit),
            "worst_fit" => Ok(Strategy::WorstFit),
            _ => Err(track!(ErrorKind::UnknownStrategy
                .cause(format!("Unknown strategy: {:?}", s)))
            .into()),
        }
    }
}
impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl Serialize for Strategy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
