//! [Prometheus][prometheus]用のメトリクス.
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, Gauge, MetricBuilder};

use crate::partition::Strategy;
#[cfg(feature = "simulator")]
use crate::simulator::{Command, SimulatorStatus};

/// [`PartitionAllocator`]のメトリクス.
///
/// [`PartitionAllocator`]: ../partition/struct.PartitionAllocator.html
#[derive(Debug, Clone)]
pub struct AllocatorMetrics {
    pub(crate) capacity: Gauge,
    pub(crate) usage: Gauge,
    pub(crate) allocated_blocks: StrategyCounter,
    pub(crate) allocated_units: Counter,
    pub(crate) released_blocks: Counter,
    pub(crate) released_units: Counter,
    pub(crate) coalesced_blocks: Counter,
    pub(crate) nospace_failures: Counter,
    pub(crate) invalid_requests: Counter,
    pub(crate) resets: Counter,
}
impl AllocatorMetrics {
    /// アドレス空間全体のサイズ.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_capacity <GAUGE>
    /// ```
    pub fn capacity(&self) -> u64 {
        self.capacity.value() as u64
    }

    /// 現在割当中の領域のサイズ.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_usage <GAUGE>
    /// ```
    pub fn usage(&self) -> u64 {
        self.usage.value() as u64
    }

    /// 戦略毎の割当回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_allocated_blocks_total { strategy="first_fit|best_fit|worst_fit" } <COUNTER>
    /// ```
    pub fn allocated_blocks(&self) -> &StrategyCounter {
        &self.allocated_blocks
    }

    /// これまでに割り当てた領域のサイズの合計.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_allocated_units_total <COUNTER>
    /// ```
    pub fn allocated_units(&self) -> u64 {
        self.allocated_units.value() as u64
    }

    /// 区画の解放回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_released_blocks_total <COUNTER>
    /// ```
    pub fn released_blocks(&self) -> u64 {
        self.released_blocks.value() as u64
    }

    /// これまでに解放された領域のサイズの合計.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_released_units_total <COUNTER>
    /// ```
    pub fn released_units(&self) -> u64 {
        self.released_units.value() as u64
    }

    /// 隣接する空き区画の結合によって消滅した区画の数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_coalesced_blocks_total <COUNTER>
    /// ```
    pub fn coalesced_blocks(&self) -> u64 {
        self.coalesced_blocks.value() as u64
    }

    /// 空き領域不足による割当失敗回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_nospace_failures_total <COUNTER>
    /// ```
    pub fn nospace_failures(&self) -> u64 {
        self.nospace_failures.value() as u64
    }

    /// 不正な入力(E.g., サイズがゼロ、未知の所有者)により拒否された要求の数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_invalid_requests_total <COUNTER>
    /// ```
    pub fn invalid_requests(&self) -> u64 {
        self.invalid_requests.value() as u64
    }

    /// リセット回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_allocator_resets_total <COUNTER>
    /// ```
    pub fn resets(&self) -> u64 {
        self.resets.value() as u64
    }

    pub(crate) fn new(builder: &MetricBuilder, capacity: u64) -> Self {
        let mut builder = builder.clone();
        builder.namespace("partsim").subsystem("allocator");
        AllocatorMetrics {
            capacity: builder
                .gauge("capacity")
                .help("Size of the whole address space")
                .initial_value(capacity as f64)
                .finish()
                .expect("Never fails"),
            usage: builder
                .gauge("usage")
                .help("Size of the currently allocated space")
                .finish()
                .expect("Never fails"),
            allocated_blocks: StrategyCounter::new(
                &builder,
                "allocated_blocks_total",
                "Number of allocated blocks",
            ),
            allocated_units: builder
                .counter("allocated_units_total")
                .help("Total size of allocated blocks")
                .finish()
                .expect("Never fails"),
            released_blocks: builder
                .counter("released_blocks_total")
                .help("Number of released blocks")
                .finish()
                .expect("Never fails"),
            released_units: builder
                .counter("released_units_total")
                .help("Total size of released blocks")
                .finish()
                .expect("Never fails"),
            coalesced_blocks: builder
                .counter("coalesced_blocks_total")
                .help("Number of free blocks merged into their predecessor")
                .finish()
                .expect("Never fails"),
            nospace_failures: builder
                .counter("nospace_failures_total")
                .help("Number of allocation failures caused by no available space")
                .finish()
                .expect("Never fails"),
            invalid_requests: builder
                .counter("invalid_requests_total")
                .help("Number of rejected requests caused by invalid input")
                .finish()
                .expect("Never fails"),
            resets: builder
                .counter("resets_total")
                .help("Number of resets")
                .finish()
                .expect("Never fails"),
        }
    }

    pub(crate) fn count_allocation(&self, strategy: Strategy, size: u64) {
        self.allocated_blocks.increment(strategy);
        self.allocated_units.add_u64(size);
    }

    pub(crate) fn count_release(&self, size: u64) {
        self.released_blocks.increment();
        self.released_units.add_u64(size);
    }
}

/// 割当戦略毎のカウンタ.
#[derive(Debug, Clone)]
pub struct StrategyCounter {
    pub(crate) first_fit: Counter,
    pub(crate) best_fit: Counter,
    pub(crate) worst_fit: Counter,
}
impl StrategyCounter {
    /// first-fit戦略用のカウンタの値を返す.
    pub fn first_fit(&self) -> u64 {
        self.first_fit.value() as u64
    }

    /// best-fit戦略用のカウンタの値を返す.
    pub fn best_fit(&self) -> u64 {
        self.best_fit.value() as u64
    }

    /// worst-fit戦略用のカウンタの値を返す.
    pub fn worst_fit(&self) -> u64 {
        self.worst_fit.value() as u64
    }

    /// 全戦略の合計値を返す.
    pub fn sum(&self) -> u64 {
        self.first_fit() + self.best_fit() + self.worst_fit()
    }

    pub(crate) fn new(builder: &MetricBuilder, name: &str, help: &str) -> Self {
        let counter = |strategy: Strategy| {
            builder
                .counter(name)
                .help(help)
                .label("strategy", strategy.as_str())
                .finish()
                .expect("Never fails")
        };
        StrategyCounter {
            first_fit: counter(Strategy::FirstFit),
            best_fit: counter(Strategy::BestFit),
            worst_fit: counter(Strategy::WorstFit),
        }
    }

    pub(crate) fn increment(&self, strategy: Strategy) {
        match strategy {
            Strategy::FirstFit => self.first_fit.increment(),
            Strategy::BestFit => self.best_fit.increment(),
            Strategy::WorstFit => self.worst_fit.increment(),
        }
    }
}

/// [`Simulator`]のメトリクス.
///
/// [`Simulator`]: ../simulator/struct.Simulator.html
#[cfg(feature = "simulator")]
#[derive(Debug, Clone)]
pub struct SimulatorMetrics {
    pub(crate) status: Gauge,
    pub(crate) enqueued_commands: SimulatorCommandCounter,
    pub(crate) dequeued_commands: SimulatorCommandCounter,
    pub(crate) failed_commands: SimulatorCommandCounter,
    pub(crate) busy_commands: SimulatorCommandCounter,
}
#[cfg(feature = "simulator")]
impl SimulatorMetrics {
    /// シミュレータの稼働状態.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// # 0=stopped
    /// # 1=starting
    /// # 2=running
    /// partsim_simulator_status = 0|1|2
    /// ```
    pub fn status(&self) -> SimulatorStatus {
        match self.status.value() as u8 {
            1 => SimulatorStatus::Starting,
            2 => SimulatorStatus::Running,
            _ => SimulatorStatus::Stopped,
        }
    }

    /// シミュレータのキューに挿入されたコマンドの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_simulator_enqueued_commands_total { command="snapshot|allocate|deallocate|reset|stop" } <COUNTER>
    /// ```
    pub fn enqueued_commands(&self) -> &SimulatorCommandCounter {
        &self.enqueued_commands
    }

    /// シミュレータのキューから取り出されたコマンドの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_simulator_dequeued_commands_total { command="snapshot|allocate|deallocate|reset|stop" } <COUNTER>
    /// ```
    pub fn dequeued_commands(&self) -> &SimulatorCommandCounter {
        &self.dequeued_commands
    }

    /// 実行に失敗したコマンドの数.
    ///
    /// 割当・解放の失敗(E.g., 空き領域不足)も含まれる.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_simulator_failed_commands_total { command="snapshot|allocate|deallocate|reset|stop" } <COUNTER>
    /// ```
    pub fn failed_commands(&self) -> &SimulatorCommandCounter {
        &self.failed_commands
    }

    /// シミュレータが忙しくて実行を諦めたコマンドの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// partsim_simulator_busy_commands_total { command="snapshot|allocate|deallocate|reset|stop" } <COUNTER>
    /// ```
    pub fn busy_commands(&self) -> &SimulatorCommandCounter {
        &self.busy_commands
    }

    /// シミュレータキューの長さ(i.e., 実行待ちのコマンド数).
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// sum(partsim_simulator_enqueued_commands_total - partsim_simulator_dequeued_commands_total)
    /// ```
    pub fn queue_len(&self) -> usize {
        // NOTE: 以下の順番で値を取得しないとアンダーフローする可能性がある
        let dec = self.dequeued_commands.sum();
        let inc = self.enqueued_commands.sum();
        inc.saturating_sub(dec) as usize
    }

    pub(crate) fn new(builder: &MetricBuilder) -> Self {
        let mut builder = builder.clone();
        builder.namespace("partsim").subsystem("simulator");
        SimulatorMetrics {
            status: builder
                .gauge("status")
                .help("Status of the simulator (0=stopped, 1=starting, 2=running)")
                .finish()
                .expect("Never fails"),
            enqueued_commands: SimulatorCommandCounter::new(
                &builder,
                "enqueued_commands_total",
                "Number of enqueued commands",
            ),
            dequeued_commands: SimulatorCommandCounter::new(
                &builder,
                "dequeued_commands_total",
                "Number of dequeued commands",
            ),
            failed_commands: SimulatorCommandCounter::new(
                &builder,
                "failed_commands_total",
                "Number of commands failed to execute",
            ),
            busy_commands: SimulatorCommandCounter::new(
                &builder,
                "busy_commands_total",
                "Number of commands gave up to execute due to the simulator is busy",
            ),
        }
    }
}

/// シミュレータのコマンド毎のカウンタ.
#[cfg(feature = "simulator")]
#[derive(Debug, Clone)]
pub struct SimulatorCommandCounter {
    pub(crate) snapshot: Counter,
    pub(crate) allocate: Counter,
    pub(crate) deallocate: Counter,
    pub(crate) reset: Counter,
    pub(crate) stop: Counter,
}
#[cfg(feature = "simulator")]
impl SimulatorCommandCounter {
    /// SNAPSHOTコマンド用のカウンタの値を返す.
    pub fn snapshot(&self) -> u64 {
        self.snapshot.value() as u64
    }

    /// ALLOCATEコマンド用のカウンタの値を返す.
    pub fn allocate(&self) -> u64 {
        self.allocate.value() as u64
    }

    /// DEALLOCATEコマンド用のカウンタの値を返す.
    pub fn deallocate(&self) -> u64 {
        self.deallocate.value() as u64
    }

    /// RESETコマンド用のカウンタの値を返す.
    pub fn reset(&self) -> u64 {
        self.reset.value() as u64
    }

    /// STOPコマンド用のカウンタの値を返す.
    pub fn stop(&self) -> u64 {
        self.stop.value() as u64
    }

    pub(crate) fn new(builder: &MetricBuilder, name: &str, help: &str) -> Self {
        let counter = |command| {
            builder
                .counter(name)
                .help(help)
                .label("command", command)
                .finish()
                .expect("Never fails")
        };
        SimulatorCommandCounter {
            snapshot: counter("snapshot"),
            allocate: counter("allocate"),
            deallocate: counter("deallocate"),
            reset: counter("reset"),
            stop: counter("stop"),
        }
    }

    pub(crate) fn increment(&self, command: &Command) {
        match *command {
            Command::Snapshot { .. } => self.snapshot.increment(),
            Command::Allocate { .. } => self.allocate.increment(),
            Command::Deallocate { .. } => self.deallocate.increment(),
            Command::Reset { .. } => self.reset.increment(),
            Command::Stop { .. } => self.stop.increment(),
        }
    }

    fn sum(&self) -> u64 {
        self.snapshot() + self.allocate() + self.deallocate() + self.reset() + self.stop()
    }
}
