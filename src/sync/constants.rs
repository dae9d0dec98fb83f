//! Control bytes exchanged during a sync.

/// First byte written by the caller.
pub const SYNC_REQUEST: u8 = 0x10;
/// First byte written by a listener that accepts the sync.
pub const SYNC_ACK: u8 = 0x11;
/// Written by a listener that is too busy to sync.
pub const SYNC_NACK: u8 = 0x12;

/// An event follows.
pub const NEXT: u8 = 0x01;
/// No more events will be sent.
pub const DONE: u8 = 0x02;
/// The sender stopped early, the receiver must not count on a complete transfer.
pub const ABORT: u8 = 0x03;
/// Keepalive while the sender waits for the other side to finish reading.
pub const ONGOING: u8 = 0x04;
/// Last byte of a sync, written once the local side has read everything.
pub const SYNC_DONE: u8 = 0x05;

/// Count reported by the reader when the peer sent [ABORT].
pub const EVENTS_READ_ABORTED: i64 = -1;
