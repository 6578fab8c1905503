//! In-process JSON transport between a [`PreviewSession`] and a [`PreviewHost`].
//!
//! Each client message is handled in its own local task, so a slow unpack for one version never
//! holds up answers that are already on disk. Everything runs on the current thread; callers must
//! be inside a [`tokio::task::LocalSet`].

use crate::host::PreviewHost;
use crate::protocol::ClientMessage;
use crate::session::PreviewSession;
use anyhow::{anyhow, Result};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinSet;

pub struct PreviewChannel {
    host: Rc<PreviewHost>,
    in_flight: JoinSet<Vec<String>>,
    delivered: usize,
}

impl PreviewChannel {
    pub fn new(host: Rc<PreviewHost>) -> Self {
        Self { host, in_flight: JoinSet::new(), delivered: 0 }
    }

    pub fn host(&self) -> &Rc<PreviewHost> {
        &self.host
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Total server messages handed back so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn send(&mut self, message: &ClientMessage) {
        self.send_raw(message.to_json());
    }

    pub fn send_raw(&mut self, raw: String) {
        let host = Rc::clone(&self.host);
        self.in_flight.spawn_local(async move { host.handle_raw(&raw).await });
    }

    /// Waits for the next request to finish and returns its raw replies, or `None` once idle.
    pub async fn next_replies(&mut self) -> Option<Vec<String>> {
        loop {
            match self.in_flight.join_next().await? {
                Ok(replies) => {
                    self.delivered += replies.len();
                    return Some(replies);
                }
                Err(err) => log::error!(target: "channel", "Request task failed: {err}"),
            }
        }
    }
}

/// Starts `session`, then shuttles messages both ways until nothing is left in flight.
pub async fn run_until_settled(
    session: &mut PreviewSession,
    channel: &mut PreviewChannel,
    timeout: Duration,
) -> Result<()> {
    for message in session.start() {
        channel.send(&message);
    }
    tokio::time::timeout(timeout, pump(session, channel))
        .await
        .map_err(|_| anyhow!("Preview did not settle within {timeout:?} ({} requests still open)", channel.in_flight()))
}

pub async fn pump(session: &mut PreviewSession, channel: &mut PreviewChannel) {
    while let Some(replies) = channel.next_replies().await {
        for raw in replies {
            for message in session.receive_raw(&raw) {
                channel.send(&message);
            }
        }
    }
    log::debug!(target: "channel", "Settled after {} replies", channel.delivered());
}
