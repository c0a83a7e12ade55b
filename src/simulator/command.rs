//! シミュレータに発行されるコマンド群の定義.
use fibers::sync::oneshot;
use futures::{Future, Poll};
use std::sync::mpsc::{Receiver, Sender};
use trackable::error::ErrorKindExt;

use crate::owner::OwnerId;
use crate::partition::Snapshot;
use crate::report::{AllocationReport, DeallocationReport, ResetReport};
use crate::{Error, ErrorKind, Result};

pub type CommandSender = Sender<Command>;
pub type CommandReceiver = Receiver<Command>;

#[derive(Debug)]
pub enum Command {
    Snapshot(TakeSnapshot),
    Allocate(AllocateBlock),
    Deallocate(DeallocateBlock),
    Reset(ResetAllocator),
    Stop(StopSimulator),
}
impl Command {
    pub fn name(&self) -> &'static str {
        match *self {
            Command::Snapshot(_) => "snapshot",
            Command::Allocate(_) => "allocate",
            Command::Deallocate(_) => "deallocate",
            Command::Reset(_) => "reset",
            Command::Stop(_) => "stop",
        }
    }
    pub fn failed(self, error: Error) {
        match self {
            Command::Snapshot(c) => c.reply.send(Err(error)),
            Command::Allocate(c) => c.reply.send(Err(error)),
            Command::Deallocate(c) => c.reply.send(Err(error)),
            Command::Reset(c) => c.reply.send(Err(error)),
            Command::Stop(_) => {}
        }
    }
}

/// `Result`の非同期版.
#[derive(Debug)]
pub struct AsyncResult<T>(oneshot::Monitor<T, Error>);
impl<T> AsyncResult<T> {
    fn new() -> (AsyncReply<T>, Self) {
        let (tx, rx) = oneshot::monitor();
        (AsyncReply(tx), AsyncResult(rx))
    }
}
impl<T> Future for AsyncResult<T> {
    type Item = T;
    type Error = Error;
    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        track!(self.0.poll().map_err(|e| e.unwrap_or_else(|| {
            ErrorKind::SimulatorTerminated
                .cause("reply channel disconnected")
                .into()
        })))
    }
}

#[derive(Debug)]
struct AsyncReply<T>(oneshot::Monitored<T, Error>);
impl<T> AsyncReply<T> {
    fn send(self, result: Result<T>) {
        self.0.exit(result);
    }
}

#[derive(Debug)]
pub struct TakeSnapshot {
    reply: AsyncReply<Snapshot>,
}
impl TakeSnapshot {
    pub fn new() -> (Self, AsyncResult<Snapshot>) {
        let (reply, result) = AsyncResult::new();
        (TakeSnapshot { reply }, result)
    }
    pub fn reply(self, result: Result<Snapshot>) {
        self.reply.send(result);
    }
}

#[derive(Debug)]
pub struct AllocateBlock {
    strategy: String,
    size: u64,
    owner: OwnerId,
    reply: AsyncReply<AllocationReport>,
}
impl AllocateBlock {
    pub fn new(
        strategy: String,
        size: u64,
        owner: OwnerId,
    ) -> (Self, AsyncResult<AllocationReport>) {
        let (reply, result) = AsyncResult::new();
        let command = AllocateBlock {
            strategy,
            size,
            owner,
            reply,
        };
        (command, result)
    }
    pub fn strategy(&self) -> &str {
        &self.strategy
    }
    pub fn size(&self) -> u64 {
        self.size
    }
    pub fn owner(&self) -> OwnerId {
        self.owner
    }
    pub fn reply(self, result: Result<AllocationReport>) {
        self.reply.send(result);
    }
}

#[derive(Debug)]
pub struct DeallocateBlock {
    owner: OwnerId,
    reply: AsyncReply<DeallocationReport>,
}
impl DeallocateBlock {
    pub fn new(owner: OwnerId) -> (Self, AsyncResult<DeallocationReport>) {
        let (reply, result) = AsyncResult::new();
        (DeallocateBlock { owner, reply }, result)
    }
    pub fn owner(&self) -> OwnerId {
        self.owner
    }
    pub fn reply(self, result: Result<DeallocationReport>) {
        self.reply.send(result);
    }
}

#[derive(Debug)]
pub struct ResetAllocator {
    reply: AsyncReply<ResetReport>,
}
impl ResetAllocator {
    pub fn new() -> (Self, AsyncResult<ResetReport>) {
        let (reply, result) = AsyncResult::new();
        (ResetAllocator { reply }, result)
    }
    pub fn reply(self, result: Result<ResetReport>) {
        self.reply.send(result);
    }
}

#[derive(Debug)]
pub struct StopSimulator;
