use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::transport::{MessageLogo, Transport, TransportError};

#[derive(Debug, Default)]
struct RingState {
    attached: Option<i64>,
    messages: Vec<(MessageLogo, Vec<u8>)>,
    capacity: Option<usize>,
    refuse_attach: bool,
    fail_after: Option<usize>,
    puts: usize,
}

/// In-memory [Transport]: a loopback ring that retains every message.
/// Clones share the same ring, so one handle can be given to the
/// producer while another one inspects the traffic.
#[derive(Debug, Clone, Default)]
pub struct MemoryRing {
    inner: Arc<Mutex<RingState>>,
}

impl MemoryRing {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies and returns [MemoryRing] that will hold at most this many messages
    pub fn with_capacity(self, capacity: usize) -> Self {
        self.state().capacity = Some(capacity);
        self
    }

    /// Copies and returns [MemoryRing] that refuses any attachment
    pub fn refusing_attach(self) -> Self {
        self.state().refuse_attach = true;
        self
    }

    /// Every put beyond the first `count` ones will be rejected
    pub fn fail_puts_after(&self, count: usize) {
        self.state().fail_after = Some(count);
    }

    /// Currently attached ring key
    pub fn attached(&self) -> Option<i64> {
        self.state().attached
    }

    /// Copy of all messages submitted so far
    pub fn messages(&self) -> Vec<(MessageLogo, Vec<u8>)> {
        self.state().messages.clone()
    }

    /// Messages of this type
    pub fn messages_of_type(&self, msg_type: u8) -> Vec<Vec<u8>> {
        self.state()
            .messages
            .iter()
            .filter(|(logo, _)| logo.msg_type == msg_type)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Drops all retained messages
    pub fn clear(&self) {
        self.state().messages.clear();
    }
}

impl Transport for MemoryRing {
    fn attach(&mut self, ring_key: i64) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.refuse_attach {
            return Err(TransportError::Attach(ring_key));
        }
        state.attached = Some(ring_key);
        Ok(())
    }

    fn put(&mut self, logo: &MessageLogo, message: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state();

        let ring_key = state.attached.ok_or(TransportError::NotAttached)?;

        if let Some(count) = state.fail_after {
            if state.puts >= count {
                return Err(TransportError::Rejected(format!(
                    "injected failure on ring {}",
                    ring_key
                )));
            }
        }

        if let Some(capacity) = state.capacity {
            if state.messages.len() >= capacity {
                return Err(TransportError::RingFull(ring_key));
            }
        }

        state.puts += 1;
        state.messages.push((*logo, message.to_vec()));
        Ok(())
    }

    fn detach(&mut self) {
        self.state().attached = None;
    }
}

#[cfg(test)]
mod test {
    use super::MemoryRing;
    use crate::transport::{MessageLogo, Transport, TransportError};

    #[test]
    fn loopback() {
        let ring = MemoryRing::new().with_capacity(2);
        let mut producer = ring.clone();
        let logo = MessageLogo::default();

        assert_eq!(producer.put(&logo, b"a"), Err(TransportError::NotAttached));

        producer.attach(1000).unwrap();
        producer.put(&logo, b"a").unwrap();
        producer.put(&logo, b"b").unwrap();
        assert_eq!(producer.put(&logo, b"c"), Err(TransportError::RingFull(1000)));

        assert_eq!(ring.messages().len(), 2);
        assert_eq!(ring.messages_of_type(0), vec![b"a".to_vec(), b"b".to_vec()]);

        producer.detach();
        assert_eq!(ring.attached(), None);
    }

    #[test]
    fn injected_failures() {
        let ring = MemoryRing::new();
        let mut producer = ring.clone();
        let logo = MessageLogo::default();

        producer.attach(1).unwrap();
        ring.fail_puts_after(1);

        assert!(producer.put(&logo, b"a").is_ok());
        assert!(matches!(
            producer.put(&logo, b"b"),
            Err(TransportError::Rejected(_))
        ));
        assert_eq!(ring.messages().len(), 1);
    }
}
