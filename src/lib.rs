//! Partition Allocation Simulator.
//!
//! `partsim`は、区画ベースの動的メモリ割当を模擬するためのライブラリ.
//!
//! # 特徴
//!
//! - 固定サイズのアドレス空間を、アドレス順に並んだ区画([Block])の列として管理する
//! - 割当戦略として first-fit / best-fit / worst-fit の三つを提供([Strategy])
//!   - 要求サイズより大きい空き区画が選ばれた場合には、その先頭部分が割り当てられ、残りは空き区画として分割される
//!   - 解放時には、隣接する空き区画と即座に結合される
//! - 全ての状態変更操作は、人間が読める形式でイベントログに記録される
//! - 統計値(利用率、空き区画数、最大空き区画、等)の算出
//! - 一つのアロケータを複数の利用者で共有するための[simulator](管理スレッド)
//!   - 一つのアロケータに対する要求は、全てこの管理スレッド上で直列化されて処理される
//! - 割当要求列の自動生成([scenario])
//!
//! # モジュールの依存関係
//!
//! ```text
//! simulator => partition
//! scenario => partition, simulator
//! ```
//!
//! - [partition]モジュール:
//!   - 主に[PartitionAllocator]構造体を提供
//!   - 割当・解放・リセット・統計値算出といった、アロケータの中核部分
//!   - ロックは持たないので、共有したい場合には[simulator]を経由すること
//! - [simulator]モジュール:
//!   - 主に[Simulator]構造体を提供
//!   - [PartitionAllocator]を専有する管理スレッドを起動し、それに対するリクエスト群を直列に処理する
//! - [scenario]モジュール:
//!   - ランダムな割当要求列を生成する
//!
//! [Block]: ./partition/struct.Block.html
//! [Strategy]: ./partition/enum.Strategy.html
//! [partition]: ./partition/index.html
//! [PartitionAllocator]: ./partition/struct.PartitionAllocator.html
//! [simulator]: ./simulator/index.html
//! [Simulator]: ./simulator/struct.Simulator.html
//! [scenario]: ./scenario/index.html
#![warn(missing_docs)]
#[cfg(feature = "simulator")]
extern crate fibers;
#[cfg(all(test, feature = "simulator"))]
extern crate fibers_global;
#[cfg(feature = "simulator")]
extern crate futures;
extern crate prometrics;
extern crate rand;
extern crate serde;
#[cfg(test)]
extern crate serde_json;
#[macro_use]
extern crate trackable;
extern crate uuid;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};
pub use crate::owner::OwnerId;

pub mod metrics;
pub mod partition;
pub mod report;
pub mod scenario;
#[cfg(feature = "simulator")]
pub mod simulator;

mod error;
mod owner;

/// crate固有の`Result`型.
pub type Result<T> = std::result::Result<T, Error>;
