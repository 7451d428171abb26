//! Live reservation channel.
//!
//! A channel is a one-shot stream of lifecycle events. [`pump_channel`] feeds
//! them into the store one at a time, in arrival order, and stops at the
//! first close or failure. Reconnecting is left to the caller.

use crate::app::{SeatMapAction, SeatMapState, SeatMapStore};
use crate::sync::SyncAction;
use futures::stream::{self, BoxStream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Channel lifecycle event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Connected
    Opened,
    /// Text payload
    Message(String),
    /// Peer closed the channel
    Closed {
        /// Close reason, if given
        reason: Option<String>,
    },
    /// Transport failure
    Failed {
        /// Failure description
        error: String,
    },
}

impl ChannelEvent {
    /// Whether no event can follow this one
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Failed { .. })
    }
}

impl From<ChannelEvent> for SyncAction {
    fn from(event: ChannelEvent) -> Self {
        match event {
            ChannelEvent::Opened => Self::ChannelOpened,
            ChannelEvent::Message(text) => Self::MessageReceived(text),
            ChannelEvent::Closed { reason } => Self::ChannelClosed { reason },
            ChannelEvent::Failed { error } => Self::ChannelFailed { error },
        }
    }
}

/// Source of channel events
pub trait LiveChannel: Send {
    /// Connect and yield events until the channel ends
    fn into_events(self) -> BoxStream<'static, ChannelEvent>;
}

/// Feed every event of `channel` into `store`
///
/// Each event is reduced before the next one is read. `observe` sees the
/// state after every event. A stream that ends without a close event is
/// reported as closed. Returns the number of events handled.
pub async fn pump_channel<C, F>(store: &SeatMapStore, channel: C, mut observe: F) -> usize
where
    C: LiveChannel,
    F: FnMut(&SeatMapState),
{
    let mut events = channel.into_events();
    let mut handled = 0_usize;

    loop {
        let event = events.next().await.unwrap_or_else(|| ChannelEvent::Closed {
            reason: Some("stream ended".to_string()),
        });
        let terminal = event.is_terminal();

        tracing::trace!(?event, "Channel event");
        store
            .send(SeatMapAction::Sync(SyncAction::from(event)))
            .await;
        store.state(|state| observe(state)).await;
        handled += 1;

        if terminal {
            return handled;
        }
    }
}

/// Websocket connection to the reservation store
#[derive(Clone, Debug)]
pub struct WsChannel {
    url: String,
}

impl WsChannel {
    /// Channel that connects to `url` when its events are first polled
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl LiveChannel for WsChannel {
    fn into_events(self) -> BoxStream<'static, ChannelEvent> {
        let url = self.url;

        stream::once(async move {
            tracing::info!(%url, "Connecting to reservation channel");
            connect_async(url.as_str()).await
        })
        .flat_map(|connected| match connected {
            Ok((socket, _response)) => stream::once(async { ChannelEvent::Opened })
                .chain(socket.filter_map(|frame| async move { frame_event(frame) }))
                .boxed(),
            Err(error) => stream::once(async move {
                ChannelEvent::Failed {
                    error: error.to_string(),
                }
            })
            .boxed(),
        })
        .boxed()
    }
}

fn frame_event(frame: Result<Message, WsError>) -> Option<ChannelEvent> {
    match frame {
        Ok(Message::Text(text)) => Some(ChannelEvent::Message(text)),
        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => Some(ChannelEvent::Message(text)),
            Err(_) => {
                tracing::warn!("Ignoring non UTF-8 binary frame");
                None
            },
        },
        Ok(Message::Close(frame)) => Some(ChannelEvent::Closed {
            reason: frame
                .map(|f| f.reason.into_owned())
                .filter(|reason| !reason.is_empty()),
        }),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(WsError::ConnectionClosed) => Some(ChannelEvent::Closed { reason: None }),
        Err(error) => Some(ChannelEvent::Failed {
            error: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn test_frames_map_to_events() {
        assert_eq!(
            frame_event(Ok(Message::Text("{}".to_string()))),
            Some(ChannelEvent::Message("{}".to_string()))
        );
        assert_eq!(frame_event(Ok(Message::Ping(vec![1]))), None);
        assert_eq!(frame_event(Ok(Message::Binary(vec![0xff, 0xfe]))), None);
        assert_eq!(
            frame_event(Ok(Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "server restart".into(),
            })))),
            Some(ChannelEvent::Closed {
                reason: Some("server restart".to_string())
            })
        );
        assert_eq!(
            frame_event(Ok(Message::Close(None))),
            Some(ChannelEvent::Closed { reason: None })
        );
        assert!(matches!(
            frame_event(Err(WsError::AlreadyClosed)),
            Some(ChannelEvent::Failed { .. })
        ));
    }

    #[test]
    fn test_terminal_events() {
        assert!(!ChannelEvent::Opened.is_terminal());
        assert!(!ChannelEvent::Message(String::new()).is_terminal());
        assert!(ChannelEvent::Closed { reason: None }.is_terminal());
        assert!(
            ChannelEvent::Failed {
                error: "reset".to_string()
            }
            .is_terminal()
        );
    }
}
