//! Raw byte stream → 16-bit PCM samples.
//!
//! The device sends bare sample bytes with no framing, and a serial read can
//! end between the two bytes of a sample.  [`PcmDecoder`] holds such a
//! trailing odd byte back and pairs it with the first byte of the next read,
//! so sample alignment survives arbitrary read boundaries.

use crate::config::ByteOrder;

/// Stateful decoder for a continuous interleaving-free `i16` stream.
#[derive(Debug, Clone)]
pub struct PcmDecoder {
    order: ByteOrder,
    /// Low-address byte of a sample whose second byte has not arrived yet.
    pending: Option<u8>,
}

impl PcmDecoder {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            pending: None,
        }
    }

    /// Decode `bytes`, prefixed by any byte held from the previous call.
    ///
    /// ```rust
    /// use pitch_relay::audio::PcmDecoder;
    /// use pitch_relay::config::ByteOrder;
    ///
    /// let mut dec = PcmDecoder::new(ByteOrder::Little);
    /// assert_eq!(dec.decode(&[0x00, 0x7F, 0x01]), vec![0x7F00]);
    /// assert!(dec.has_pending());
    /// assert_eq!(dec.decode(&[0x00]), vec![0x0001]);
    /// ```
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<i16> {
        let mut out = Vec::with_capacity((bytes.len() + 1) / 2);
        let mut rest = bytes;

        if let Some(lo) = self.pending {
            match rest.split_first() {
                Some((&hi, tail)) => {
                    out.push(self.sample([lo, hi]));
                    self.pending = None;
                    rest = tail;
                }
                None => return out,
            }
        }

        let mut pairs = rest.chunks_exact(2);
        out.extend(pairs.by_ref().map(|p| self.sample([p[0], p[1]])));
        if let [odd] = pairs.remainder() {
            self.pending = Some(*odd);
        }
        out
    }

    /// Whether a half sample is waiting for its second byte.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any held byte.  Called when the byte stream restarts, e.g. after
    /// a reconnect, so bytes from two connections never pair up.
    pub fn reset(&mut self) {
        if self.pending.take().is_some() {
            log::debug!("decoder: discarded held byte on stream reset");
        }
    }

    fn sample(&self, bytes: [u8; 2]) -> i16 {
        match self.order {
            ByteOrder::Little => i16::from_le_bytes(bytes),
            ByteOrder::Big => i16::from_be_bytes(bytes),
        }
    }
}

impl Default for PcmDecoder {
    fn default() -> Self {
        Self::new(ByteOrder::default())
    }
}
