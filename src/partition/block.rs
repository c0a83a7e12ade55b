//! Block

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::owner::OwnerId;

/// アドレス空間内の連続した一区画.
///
/// 区画は`[start, start + size)`の範囲を表す.
/// 所有者(`owner`)が存在する場合に限り、その区画は割当済みとみなされる.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    start: u64,
    size: u64,
    owner: Option<OwnerId>,
}
impl Block {
    /// 空き区画を生成する.
    pub fn free(start: u64, size: u64) -> Self {
        Block {
            start,
            size,
            owner: None,
        }
    }

    /// `owner`に割り当てられた区画を生成する.
    pub fn allocated(start: u64, size: u64, owner: OwnerId) -> Self {
        Block {
            start,
            size,
            owner: Some(owner),
        }
    }

    /// 区画の開始位置.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// 区画の長さ.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 区画の終端位置を返す.
    ///
    /// **注意**: 区画は`[start, end)`の範囲なので、`end`自体は区画に含まれない.
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    /// 区画の所有者.
    ///
    /// 空き区画の場合には`None`.
    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    /// 割当済みの区画かどうか.
    pub fn is_allocated(&self) -> bool {
        self.owner.is_some()
    }

    /// 空き区画かどうか.
    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    /// 空き区画の先頭から`size`分を`owner`に割り当てる.
    ///
    /// 区画自体は割当部分に縮められ、余剰分があればそれが新しい空き区画として返される.
    ///
    /// # Panics
    ///
    /// `self`が割当済み、あるいは`size`がゼロないし`self.size()`を超えている場合には、
    /// 現在のスレッドがパニックする.
    pub(crate) fn split_off(&mut self, size: u64, owner: OwnerId) -> Option<Block> {
        assert!(self.is_free(), "{:?}", self);
        assert!(0 < size && size <= self.size, "size={}, {:?}", size, self);
        let remainder = if size < self.size {
            Some(Block::free(self.start + size, self.size - size))
        } else {
            None
        };
        self.size = size;
        self.owner = Some(owner);
        remainder
    }

    /// 区画を解放して、所有者だったIDを返す.
    pub(crate) fn release(&mut self) -> Option<OwnerId> {
        self.owner.take()
    }

    /// 直後に隣接する空き区画`next`を吸収する.
    ///
    /// # Panics
    ///
    /// 両者が隣接する空き区画ではない場合には、現在のスレッドがパニックする.
    pub(crate) fn absorb(&mut self, next: Block) {
        assert!(self.is_free() && next.is_free(), "{:?}, {:?}", self, next);
        assert_eq!(self.end(), next.start);
        self.size += next.size;
    }
}
impl Serialize for Block {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Block", 4)?;
        s.serialize_field("start", &self.start)?;
        s.serialize_field("size", &self.size)?;
        s.serialize_field("allocated", &self.is_allocated())?;
        s.serialize_field("process_id", &self.owner)?;
        s.end()
    }
}
