/*!
 * Rendezvous Mailbox
 * One command slot and one reply slot between a stopped thread and the debugger
 */

use crate::core::errors::{DebugProtocolError, DebugResult};
use crate::core::limits::MAILBOX_CAPACITY;
use crate::core::types::ThreadId;
use crate::debug::DebugCommand;
use flume::{Receiver, Sender};
use parking_lot::Mutex;

/// Every command posted to a mailbox receives exactly one reply. The
/// mailbox owns both ends of both channels, so neither side ever observes
/// a disconnect while the other is alive.
pub struct Mailbox {
    owner: ThreadId,
    command_tx: Sender<DebugCommand>,
    command_rx: Receiver<DebugCommand>,
    reply_tx: Sender<DebugCommand>,
    reply_rx: Receiver<DebugCommand>,
    // Serializes request/reply pairs from concurrent debugger callers
    exchange: Mutex<()>,
}

impl Mailbox {
    pub fn new(owner: ThreadId) -> Self {
        let (command_tx, command_rx) = flume::bounded(MAILBOX_CAPACITY);
        let (reply_tx, reply_rx) = flume::bounded(MAILBOX_CAPACITY);
        Self {
            owner,
            command_tx,
            command_rx,
            reply_tx,
            reply_rx,
            exchange: Mutex::new(()),
        }
    }

    #[inline]
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Debugger side: post a command and block for its reply
    pub fn request(&self, command: DebugCommand) -> DebugResult<DebugCommand> {
        let _exchange = self.exchange.lock();
        self.command_tx
            .send(command)
            .map_err(|_| DebugProtocolError::Disconnected(self.owner))?;
        self.reply_rx
            .recv()
            .map_err(|_| DebugProtocolError::Disconnected(self.owner))
    }

    /// Thread side: block for the next command
    pub fn take(&self) -> DebugResult<DebugCommand> {
        self.command_rx
            .recv()
            .map_err(|_| DebugProtocolError::Disconnected(self.owner))
    }

    /// Thread side: answer the command last taken
    pub fn reply(&self, reply: DebugCommand) -> DebugResult<()> {
        self.reply_tx
            .send(reply)
            .map_err(|_| DebugProtocolError::Disconnected(self.owner))
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("owner", &self.owner)
            .field("pending_commands", &self.command_rx.len())
            .field("pending_replies", &self.reply_rx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_request_gets_one_reply() {
        let mailbox = Arc::new(Mailbox::new(ThreadId(1)));
        let worker = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                let command = mailbox.take().unwrap();
                assert_eq!(command, DebugCommand::Stack);
                mailbox.reply(DebugCommand::Result("frames".into())).unwrap();
            })
        };

        let reply = mailbox.request(DebugCommand::Stack).unwrap();
        assert_eq!(reply, DebugCommand::Result("frames".into()));
        worker.join().unwrap();
    }
}
