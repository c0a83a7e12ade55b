//! 割当要求の所有者を識別するためのID.
//!
//! シミュレーション上では、各割当要求は一つの"プロセス"に対応しており、
//! ログ等では`P<番号>`の形式で表示される.
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use trackable::error::ErrorKindExt;

use crate::{Error, ErrorKind, Result};

/// 割当要求の所有者ID.
///
/// 同時に割当中のブロックの間では、所有者IDは一意である必要がある.
/// (解放後であれば、同じIDを再利用して良い)
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);
impl OwnerId {
    /// 新しい`OwnerId`インスタンスを生成する.
    ///
    /// # Examples
    ///
    /// ```
    /// use partsim::OwnerId;
    ///
    /// assert_eq!(OwnerId::new(3).to_string(), "P3");
    ///
    /// // 文字列からも生成可能
    /// assert_eq!("P3".parse::<OwnerId>().unwrap(), OwnerId::new(3));
    /// assert_eq!("3".parse::<OwnerId>().unwrap(), OwnerId::new(3));
    /// ```
    pub fn new(id: u64) -> Self {
        OwnerId(id)
    }

    /// IDの値を返す.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}
impl From<u64> for OwnerId {
    fn from(f: u64) -> Self {
        OwnerId(f)
    }
}
impl FromStr for OwnerId {
    type Err = Error;

    /// `"<番号>"`ないし`"P<番号>"`形式の文字列から`OwnerId`を生成する.
    ///
    /// 接頭辞の`P`は大文字・小文字のどちらでも良いが、付けられるのは一つだけ.
    /// 符号(`+`)は受け付けない.
    ///
    /// # Errors
    ///
    /// 番号部分が10進数の非負整数として解釈できない場合には、
    /// 種類が`ErrorKind::InvalidInput`のエラーが返される.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix('P')
            .or_else(|| s.strip_prefix('p'))
            .unwrap_or(s);
        track_assert!(
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
            ErrorKind::InvalidInput,
            "malformed owner id: {:?}",
            s
        );
        let id = track!(digits
            .parse::<u64>()
            .map_err(|e| ErrorKind::InvalidInput.cause(e)))?;
        Ok(OwnerId(id))
    }
}
impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}
impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}
impl Serialize for OwnerId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}
