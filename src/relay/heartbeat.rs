use std::{
    sync::{
        mpsc::{self, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, warn};

use crate::{
    relay::packet::{heartbeat_message, unix_now},
    transport::{Attachment, MessageLogo, Transport},
};

/// Periodic liveness task. Stops and joins when dropped.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Starts beating on this [Attachment], every period.
    pub fn start<T: Transport>(
        attachment: Arc<Attachment<T>>,
        logo: MessageLogo,
        pid: u32,
        period: Duration,
    ) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("relay-heartbeat".to_string())
            .spawn(move || {
                debug!("heartbeat started: period={:?}", period);
                loop {
                    match stopped.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            let msg = heartbeat_message(unix_now(), pid);
                            if let Err(e) = attachment.put(&logo, &msg) {
                                warn!("failed to send heartbeat: {}", e);
                            }
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("heartbeat stopped");
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stops beating and waits for the task to complete
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("heartbeat thread panicked");
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
