// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A thread-safe queue of placement notifications.
//!
//! Placement sources may register, move or remove decals from any thread at
//! any time. Their notifications are queued here and applied by the owner of
//! the [`EntityStore`](crate::EntityStore) at the next frame boundary.

use crate::descriptor::DecalDescriptor;
use crossbeam_channel::{Receiver, Sender};
use mural_core::ecs::SourceId;

/// A notification from a placement source.
#[derive(Debug, Clone, PartialEq)]
pub enum DecalCommand {
    /// A new placement appeared.
    Register {
        /// The placement.
        source: SourceId,
        /// Its initial data.
        descriptor: DecalDescriptor,
    },
    /// A placement changed. Without a descriptor, the data is pulled from the
    /// placement source during the cache update.
    Update {
        /// The placement.
        source: SourceId,
        /// The new data, if the source pushed it.
        descriptor: Option<DecalDescriptor>,
    },
    /// A placement was removed.
    Unregister {
        /// The placement.
        source: SourceId,
    },
}

impl DecalCommand {
    /// The placement this command is about.
    pub fn source(&self) -> SourceId {
        match self {
            DecalCommand::Register { source, .. }
            | DecalCommand::Update { source, .. }
            | DecalCommand::Unregister { source } => *source,
        }
    }
}

/// The sending half of the command queue. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct DecalCommandSender {
    sender: Sender<DecalCommand>,
}

impl DecalCommandSender {
    /// Queues a command, logging an error if the receiving side is gone.
    pub fn send(&self, command: DecalCommand) {
        if let Err(e) = self.sender.send(command) {
            log::error!("Failed to queue decal command: {e}. Receiver likely dropped.");
        }
    }

    /// Queues a [`DecalCommand::Register`].
    pub fn register(&self, source: SourceId, descriptor: DecalDescriptor) {
        self.send(DecalCommand::Register { source, descriptor });
    }

    /// Queues a [`DecalCommand::Update`] that carries the new data.
    pub fn update(&self, source: SourceId, descriptor: DecalDescriptor) {
        self.send(DecalCommand::Update {
            source,
            descriptor: Some(descriptor),
        });
    }

    /// Queues a [`DecalCommand::Update`] without data.
    pub fn invalidate(&self, source: SourceId) {
        self.send(DecalCommand::Update {
            source,
            descriptor: None,
        });
    }

    /// Queues a [`DecalCommand::Unregister`].
    pub fn unregister(&self, source: SourceId) {
        self.send(DecalCommand::Unregister { source });
    }
}

/// The receiving half of the command queue, held by the frame owner.
#[derive(Debug)]
pub struct DecalCommandReceiver {
    receiver: Receiver<DecalCommand>,
}

impl DecalCommandReceiver {
    /// Takes the commands queued when the call starts, in send order, without
    /// blocking. Commands sent while draining wait for the next drain.
    pub fn drain(&self) -> Vec<DecalCommand> {
        self.drain_up_to(self.receiver.len())
    }

    fn drain_up_to(&self, limit: usize) -> Vec<DecalCommand> {
        let mut commands = Vec::with_capacity(limit);
        commands.extend(self.receiver.try_iter().take(limit));
        commands
    }

    /// Returns the number of queued commands.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no command is queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Creates an unbounded command queue.
pub fn command_queue() -> (DecalCommandSender, DecalCommandReceiver) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (DecalCommandSender { sender }, DecalCommandReceiver { receiver })
}
