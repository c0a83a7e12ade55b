//! 割当要求列の自動生成.
//!
//! 戦略とサイズを候補の中から一様ランダムに選んだ割当要求を、指定された数だけ生成する.
//! 生成された[`Scenario`]は、アロケータに直接適用することも、
//! シミュレータに投入することもできる.
//!
//! [`Scenario`]: struct.Scenario.html
#[cfg(feature = "simulator")]
use futures::{future, Future};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::owner::OwnerId;
use crate::partition::{Block, PartitionAllocator, Strategy};
#[cfg(feature = "simulator")]
use crate::report::AllocationReport;
#[cfg(feature = "simulator")]
use crate::simulator::SimulatorHandle;
#[cfg(feature = "simulator")]
use crate::Error;
use crate::{ErrorKind, Result};

/// 一つの割当要求.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationRequest {
    /// 割当戦略.
    pub strategy: Strategy,

    /// 要求サイズ.
    pub size: u64,

    /// 所有者.
    pub owner: OwnerId,
}

/// `Scenario`のビルダ.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    steps: usize,
    sizes: Vec<u64>,
    strategies: Vec<Strategy>,
    first_owner: u64,
}
impl ScenarioBuilder {
    /// デフォルトの要求数.
    pub const DEFAULT_STEPS: usize = 5;

    /// デフォルトのサイズ候補.
    pub const DEFAULT_SIZES: [u64; 4] = [32, 64, 128, 256];

    /// デフォルト設定で`ScenarioBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        ScenarioBuilder {
            steps: Self::DEFAULT_STEPS,
            sizes: Self::DEFAULT_SIZES.to_vec(),
            strategies: Strategy::ALL.to_vec(),
            first_owner: 1,
        }
    }

    /// 生成する要求の数を設定する.
    ///
    /// デフォルト値は`5`.
    pub fn steps(&mut self, steps: usize) -> &mut Self {
        self.steps = steps;
        self
    }

    /// サイズの候補を設定する.
    ///
    /// デフォルト値は`[32, 64, 128, 256]`.
    pub fn sizes(&mut self, sizes: Vec<u64>) -> &mut Self {
        self.sizes = sizes;
        self
    }

    /// 戦略の候補を設定する.
    ///
    /// デフォルトは全ての戦略.
    pub fn strategies(&mut self, strategies: Vec<Strategy>) -> &mut Self {
        self.strategies = strategies;
        self
    }

    /// 最初の要求の所有者IDを設定する.
    ///
    /// 以降の要求には連番が振られる.
    ///
    /// デフォルト値は`1`.
    pub fn first_owner(&mut self, id: u64) -> &mut Self {
        self.first_owner = id;
        self
    }

    /// `rng`を使って要求列を生成する.
    ///
    /// # Errors
    ///
    /// 以下の場合には、種類が`ErrorKind::InvalidInput`のエラーが返される:
    ///
    /// - サイズないし戦略の候補が空、あるいは候補にゼロサイズが含まれている
    /// - 連番の所有者IDが`u64`の範囲に収まらない
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<Scenario> {
        track_assert!(!self.sizes.is_empty(), ErrorKind::InvalidInput, "empty size table");
        track_assert!(
            !self.strategies.is_empty(),
            ErrorKind::InvalidInput,
            "empty strategy table"
        );
        track_assert!(!self.sizes.contains(&0), ErrorKind::InvalidInput; self.sizes);

        let mut requests = Vec::with_capacity(self.steps);
        for i in 0..self.steps {
            let strategy = *track_assert_some!(self.strategies.choose(rng), ErrorKind::Other);
            let size = *track_assert_some!(self.sizes.choose(rng), ErrorKind::Other);
            let id = track_assert_some!(
                self.first_owner.checked_add(i as u64),
                ErrorKind::InvalidInput,
                "owner id overflows: first_owner={}, steps={}",
                self.first_owner,
                self.steps
            );
            let owner = OwnerId::new(id);
            requests.push(AllocationRequest {
                strategy,
                size,
                owner,
            });
        }
        Ok(Scenario { requests })
    }
}
impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 自動生成された割当要求列.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    requests: Vec<AllocationRequest>,
}
impl Scenario {
    /// 要求を直接指定して`Scenario`を生成する.
    pub fn new(requests: Vec<AllocationRequest>) -> Self {
        Scenario { requests }
    }

    /// 要求列を返す.
    pub fn requests(&self) -> &[AllocationRequest] {
        &self.requests
    }

    /// `allocator`に要求を順番に適用する.
    ///
    /// 途中で割当に失敗しても、残りの要求の適用は継続される.
    /// 結果は要求毎に一つずつ返される.
    pub fn run(&self, allocator: &mut PartitionAllocator) -> Vec<Result<Block>> {
        self.requests
            .iter()
            .map(|r| track!(allocator.allocate(r.strategy, r.size, r.owner)))
            .collect()
    }

    /// シミュレータに要求を投入する.
    ///
    /// 要求は順番に発行されるので、シミュレータ上でもこの順で処理される.
    #[cfg(feature = "simulator")]
    pub fn submit(
        &self,
        simulator: &SimulatorHandle,
    ) -> impl Future<Item = Vec<AllocationReport>, Error = Error> {
        let futures = self
            .requests
            .iter()
            .map(|r| {
                simulator
                    .request()
                    .allocate(r.strategy.as_str(), r.size, r.owner)
            })
            .collect::<Vec<_>>();
        track_err!(future::join_all(futures))
    }
}
