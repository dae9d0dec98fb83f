use super::constants::*;
use super::{Error, Result};
use crate::event::{AncientMode, Event, Hash};
use crate::event_window::EventWindow;
use crate::intake::{EventIntake, IntakeEventCounter, ReceivedEvent};
use crate::p2p::Connection;
use crate::shadowgraph::Shadow;

use tokio::sync::watch;
use tokio::time::{timeout, timeout_at, Duration, Instant};

use std::collections::HashSet;
use std::sync::Arc;

pub(super) async fn write_my_tips_and_window(
    connection: Arc<Connection>,
    window: EventWindow,
    tips: Vec<Hash>,
) -> Result<()> {
    let first = if connection.is_outbound() { SYNC_REQUEST } else { SYNC_ACK };
    connection.write_byte(first).await?;
    connection.write_window(window).await?;
    connection.write_hashes(tips).await?;
    connection.flush().await?;
    Ok(())
}

/// Reads the peer's opening. Returns `None` if the listener declined the sync.
pub(super) async fn read_their_tips_and_window(
    connection: &Connection,
) -> Result<Option<(EventWindow, Vec<Hash>)>> {
    let first = connection.read_byte().await?;
    if connection.is_outbound() {
        match first {
            SYNC_ACK => {}
            SYNC_NACK => return Ok(None),
            other => {
                return Err(Error::Protocol(format!(
                    "expected {:#04x} or {:#04x}, got {:#04x}",
                    SYNC_ACK, SYNC_NACK, other
                )))
            }
        }
    } else if first != SYNC_REQUEST {
        return Err(Error::Protocol(format!("expected {:#04x}, got {:#04x}", SYNC_REQUEST, first)));
    }
    let window = connection.read_window().await?;
    let tips = connection.read_hashes().await?;
    Ok(Some((window, tips)))
}

pub(super) async fn write_booleans(connection: Arc<Connection>, booleans: Vec<bool>) -> Result<()> {
    connection.write_booleans(booleans).await?;
    connection.flush().await?;
    Ok(())
}

/// Reads which of our tips the peer has, one flag per tip we sent.
pub(super) async fn read_their_knowledge_of_my_tips(
    connection: &Connection,
    num_tips: usize,
) -> Result<Vec<bool>> {
    let booleans = connection.read_booleans().await?;
    if booleans.len() != num_tips {
        return Err(Error::Protocol(format!(
            "peer sent {} booleans for the {} tips we sent",
            booleans.len(),
            num_tips
        )));
    }
    Ok(booleans)
}

/// True for events the peer does not know about and neither side considers ancient.
pub(super) fn unknown_non_ancient(
    known: &HashSet<Shadow>,
    shadow: &Shadow,
    mine: &EventWindow,
    theirs: &EventWindow,
) -> bool {
    !known.contains(shadow) && !mine.is_ancient(shadow.event()) && !theirs.is_ancient(shadow.event())
}

/// Oldest first, so the peer can link most events to their parents on arrival.
pub(super) fn sort_for_sending(events: &mut Vec<Arc<Event>>, mode: AncientMode) {
    events.sort_by_key(|e| (e.ancient_indicator(mode), e.generation(), e.hash()));
}

/// Writes the send list, then keeps the connection alive until the local reader is done.
///
/// Returns the number of events written and whether the transfer was aborted.
pub(super) async fn send_events(
    connection: Arc<Connection>,
    events: Vec<Arc<Event>>,
    keepalive: Duration,
    mut reading_done: watch::Receiver<bool>,
) -> Result<(usize, bool)> {
    let mut sent = 0;
    let mut aborted = false;
    for event in events.iter() {
        if event.is_from_signed_state() {
            connection.write_byte(ABORT).await?;
            aborted = true;
            break;
        }
        connection.write_byte(NEXT).await?;
        connection.write_event(event.base()).await?;
        sent += 1;
    }
    if !aborted {
        connection.write_byte(DONE).await?;
    }
    connection.flush().await?;

    loop {
        if *reading_done.borrow() {
            break;
        }
        match timeout(keepalive, reading_done.changed()).await {
            Ok(Ok(())) => {}
            // The reader went away, its error is reported on the reading side.
            Ok(Err(_)) => break,
            Err(_) => {
                connection.write_byte(ONGOING).await?;
                connection.flush().await?;
            }
        }
    }
    connection.write_byte(SYNC_DONE).await?;
    connection.flush().await?;
    Ok((sent, aborted))
}

/// Reads events until the peer is done sending, handing each to intake.
///
/// Returns the number of events read, or [EVENTS_READ_ABORTED] if the peer aborted.
pub(super) async fn read_events(
    connection: &Connection,
    intake: &dyn EventIntake,
    intake_counter: &IntakeEventCounter,
    deadline: Instant,
    max_sync_time: Duration,
    reading_done: watch::Sender<bool>,
) -> Result<i64> {
    let peer = connection.peer_id();
    let read = async {
        let mut events_read: i64 = 0;
        loop {
            match connection.read_byte().await? {
                NEXT => {
                    let event = connection.read_event().await?;
                    // Counted before the handoff, the consumer may finish with it right away.
                    intake_counter.event_entered(peer);
                    if let Err(err) = intake.handle_event(ReceivedEvent { sender: peer, event }).await {
                        intake_counter.event_exited(peer);
                        return Err(err.into());
                    }
                    events_read += 1;
                }
                DONE => break,
                ABORT => {
                    events_read = EVENTS_READ_ABORTED;
                    break;
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected byte {:#04x} while reading events",
                        other
                    )))
                }
            }
        }
        let _ = reading_done.send(true);

        loop {
            match connection.read_byte().await? {
                ONGOING => {}
                SYNC_DONE => break,
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected byte {:#04x} while waiting for the end of the sync",
                        other
                    )))
                }
            }
        }
        Ok(events_read)
    };
    match timeout_at(deadline, read).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { limit: max_sync_time }),
    }
}
