//! Single-flight FIFO request queue for the device daemon.
//!
//! The daemon processes one command at a time; issuing a second command
//! before the first reply arrives corrupts device-side state. All device
//! traffic therefore flows through one queue task that dispatches requests
//! in submission order, waits out each expected reply, and paces commands at
//! the daemon's minimum inter-command interval.
//!
//! A request is an atomic group of frames: a binary write and its priming
//! control message are submitted together so no other request can interleave
//! between them.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, warn};

use crate::consts::device;
use crate::error::{Error, Result};
use crate::snes::wire::{ReplyEnvelope, Wire, WireFrame};

/// What the dispatcher should wait for after sending a request's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Fire-and-forget (Attach, PutAddress).
    None,
    /// A JSON `Results` envelope (DeviceList, Info).
    Json,
    /// Exactly this many raw bytes (GetAddress), possibly split over
    /// multiple binary frames.
    Bytes(usize),
}

/// Reply delivered back to the submitter.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    None,
    Results(Vec<serde_json::Value>),
    Bytes(Vec<u8>),
}

pub struct Request {
    frames: Vec<WireFrame>,
    expect: Expect,
    reply: oneshot::Sender<Result<Reply>>,
}

/// Cloneable submission side of the queue.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl QueueHandle {
    /// Enqueue a request and wait for its reply.
    ///
    /// Completes with `DeviceUnavailable` if the device is lost before the
    /// request is answered; the request is never retried.
    pub async fn submit(&self, frames: Vec<WireFrame>, expect: Expect) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request { frames, expect, reply: reply_tx })
            .map_err(|_| Error::DeviceUnavailable)?;
        reply_rx.await.map_err(|_| Error::DeviceUnavailable)?
    }
}

/// Create a queue channel pair. The receiver half is consumed by [`run`].
pub fn channel() -> (QueueHandle, mpsc::UnboundedReceiver<Request>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueHandle { tx }, rx)
}

/// Drive the queue until every handle is dropped or the device faults.
///
/// Returns `Ok(())` on orderly shutdown. On a fault the in-flight request
/// and everything still queued complete with `DeviceUnavailable`, and the
/// fault is returned so the session can tear down and rediscover.
pub async fn run(mut wire: Box<dyn Wire>, mut rx: mpsc::UnboundedReceiver<Request>) -> Result<()> {
    let mut cadence = interval(device::COMMAND_INTERVAL);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while let Some(request) = rx.recv().await {
        cadence.tick().await;

        let Request { frames, expect, reply } = request;

        match dispatch(wire.as_mut(), frames, expect).await {
            Ok(result) => {
                // A submitter that gave up waiting is not an error.
                let _ = reply.send(Ok(result));
            }
            Err(fault) => {
                warn!("Device request failed: {}", fault);
                drop(reply);
                drain(&mut rx);
                return Err(fault);
            }
        }
    }

    debug!("Request queue shut down");
    Ok(())
}

async fn dispatch(wire: &mut dyn Wire, frames: Vec<WireFrame>, expect: Expect) -> Result<Reply> {
    // All frames of one request go out back-to-back; the queue guarantees
    // nothing else is interleaved.
    for frame in frames {
        wire.send(frame).await?;
    }

    match expect {
        Expect::None => Ok(Reply::None),
        Expect::Json => match recv_within(wire).await? {
            WireFrame::Text(text) => {
                let envelope: ReplyEnvelope = serde_json::from_str(&text)
                    .map_err(|err| Error::Device(format!("malformed reply: {err}")))?;
                Ok(Reply::Results(envelope.results))
            }
            WireFrame::Binary(_) => {
                Err(Error::Device("binary frame where JSON reply expected".into()))
            }
        },
        Expect::Bytes(wanted) => {
            let mut bytes = Vec::with_capacity(wanted);
            while bytes.len() < wanted {
                match recv_within(wire).await? {
                    WireFrame::Binary(chunk) => bytes.extend_from_slice(&chunk),
                    WireFrame::Text(_) => {
                        return Err(Error::Device("text frame where binary reply expected".into()));
                    }
                }
            }
            bytes.truncate(wanted);
            Ok(Reply::Bytes(bytes))
        }
    }
}

async fn recv_within(wire: &mut dyn Wire) -> Result<WireFrame> {
    match timeout(device::REQUEST_TIMEOUT, wire.recv()).await {
        Ok(frame) => frame,
        // An unanswered request leaves unknown state on the device; the
        // session must be torn down, never resumed.
        Err(_) => Err(Error::DeviceTimeout(device::REQUEST_TIMEOUT)),
    }
}

/// Complete all still-queued requests with `DeviceUnavailable` by dropping
/// their reply channels.
fn drain(rx: &mut mpsc::UnboundedReceiver<Request>) {
    rx.close();
    let mut dropped = 0usize;
    while rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!("Dropped {} queued device requests", dropped);
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::error::{Error, Result};
    use crate::snes::wire::{Wire, WireFrame};

    /// Scripted wire: records sent frames interleaved with reply pickups,
    /// and answers each expected reply from a queue. An exhausted script
    /// hangs forever, which is what a dead daemon looks like.
    pub struct MockWire {
        pub log: Arc<Mutex<Vec<String>>>,
        replies: VecDeque<WireFrame>,
        fail_sends_after: Option<usize>,
        sends: usize,
    }

    impl MockWire {
        pub fn new(replies: Vec<WireFrame>) -> Self {
            Self {
                log: Arc::new(Mutex::new(Vec::new())),
                replies: replies.into(),
                fail_sends_after: None,
                sends: 0,
            }
        }

        pub fn failing_after(replies: Vec<WireFrame>, sends: usize) -> Self {
            Self {
                fail_sends_after: Some(sends),
                ..Self::new(replies)
            }
        }

        fn describe(frame: &WireFrame) -> String {
            match frame {
                WireFrame::Text(text) => {
                    let value: serde_json::Value = serde_json::from_str(text).unwrap_or_default();
                    match value.get("Opcode").and_then(|v| v.as_str()) {
                        Some(opcode) => format!("send:{opcode}"),
                        None => "send:text".to_string(),
                    }
                }
                WireFrame::Binary(bytes) => format!("send:binary[{}]", bytes.len()),
            }
        }
    }

    #[async_trait]
    impl Wire for MockWire {
        async fn send(&mut self, frame: WireFrame) -> Result<()> {
            if let Some(limit) = self.fail_sends_after {
                if self.sends >= limit {
                    return Err(Error::DeviceUnavailable);
                }
            }
            self.sends += 1;
            self.log.lock().unwrap().push(Self::describe(&frame));
            Ok(())
        }

        async fn recv(&mut self) -> Result<WireFrame> {
            match self.replies.pop_front() {
                Some(frame) => {
                    self.log.lock().unwrap().push("recv".to_string());
                    Ok(frame)
                }
                None => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockWire;
    use super::*;
    use crate::snes::wire::Command;

    fn json_reply(results: serde_json::Value) -> WireFrame {
        WireFrame::Text(format!("{{\"Results\": {results}}}"))
    }

    fn info_request() -> Vec<WireFrame> {
        vec![Command::info().into_frame().unwrap()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_order_and_single_flight() {
        let wire = MockWire::new(vec![
            json_reply(serde_json::json!(["a"])),
            json_reply(serde_json::json!(["b"])),
            json_reply(serde_json::json!(["c"])),
        ]);
        let log = wire.log.clone();
        let (handle, rx) = channel();
        let queue = tokio::spawn(run(Box::new(wire), rx));

        let (first, second, third) = tokio::join!(
            handle.submit(vec![Command::device_list().into_frame().unwrap()], Expect::Json),
            handle.submit(info_request(), Expect::Json),
            handle.submit(
                vec![Command::attach("SD2SNES COM3").into_frame().unwrap()],
                Expect::None
            ),
        );

        assert_eq!(first.unwrap(), Reply::Results(vec![serde_json::json!("a")]));
        assert_eq!(second.unwrap(), Reply::Results(vec![serde_json::json!("b")]));
        assert_eq!(third.unwrap(), Reply::None);

        // Strict alternation: no dispatch begins before the previous reply.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["send:DeviceList", "recv", "send:Info", "recv", "send:Attach"]
        );

        drop(handle);
        queue.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pair_never_separated() {
        let wire = MockWire::new(vec![json_reply(serde_json::json!([]))]);
        let log = wire.log.clone();
        let (handle, rx) = channel();
        let queue = tokio::spawn(run(Box::new(wire), rx));

        let write = vec![
            Command::put_address(0xF5_04D2, 1).into_frame().unwrap(),
            WireFrame::Binary(vec![0x42]),
        ];
        let (write_result, read_result) = tokio::join!(
            handle.submit(write, Expect::None),
            handle.submit(info_request(), Expect::Json),
        );
        write_result.unwrap();
        read_result.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["send:PutAddress", "send:binary[1]", "send:Info", "recv"]
        );

        drop(handle);
        queue.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_binary_reply_accumulates_split_frames() {
        let wire = MockWire::new(vec![
            WireFrame::Binary(vec![1, 2, 3]),
            WireFrame::Binary(vec![4, 5]),
        ]);
        let (handle, rx) = channel();
        let queue = tokio::spawn(run(Box::new(wire), rx));

        let reply = handle
            .submit(
                vec![Command::get_address(0xF5_F000, 5).into_frame().unwrap()],
                Expect::Bytes(5),
            )
            .await
            .unwrap();
        assert_eq!(reply, Reply::Bytes(vec![1, 2, 3, 4, 5]));

        drop(handle);
        queue.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_fatal() {
        // No scripted replies: the daemon never answers.
        let wire = MockWire::new(Vec::new());
        let (handle, rx) = channel();
        let queue = tokio::spawn(run(Box::new(wire), rx));

        let result = handle.submit(info_request(), Expect::Json).await;
        assert!(matches!(result, Err(Error::DeviceUnavailable)));

        let fault = queue.await.unwrap();
        assert!(matches!(fault, Err(Error::DeviceTimeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_drains_queue() {
        let wire = MockWire::failing_after(Vec::new(), 0);
        let (handle, rx) = channel();
        let queue = tokio::spawn(run(Box::new(wire), rx));

        let (first, second) = tokio::join!(
            handle.submit(info_request(), Expect::Json),
            handle.submit(info_request(), Expect::Json),
        );
        assert!(matches!(first, Err(Error::DeviceUnavailable)));
        assert!(matches!(second, Err(Error::DeviceUnavailable)));

        assert!(queue.await.unwrap().is_err());

        // Submissions after the fault also fail fast.
        let late = handle.submit(info_request(), Expect::Json).await;
        assert!(matches!(late, Err(Error::DeviceUnavailable)));
    }
}
