//! Interrupt-to-loop byte queue.
//!
//! The receive interrupt owns the producer and only moves bytes off the port; the
//! cooperative loop owns the consumer and is the only caller into the parser.

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use crate::transport::ByteSource;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Interrupt side.
pub struct InboundProducer {
    producer: HeapProd<u8>,
    overflowed: usize,
}

impl InboundProducer {
    /// Returns `false` if the queue is full.
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        self.producer.try_push(byte).is_ok()
    }

    /// Move every readable byte from `source` into the queue.
    ///
    /// Bytes that do not fit are read and discarded so the port's FIFO empties.
    /// Returns how many bytes were queued.
    pub fn service<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> usize {
        let mut queued = 0;
        while source.is_readable() {
            let byte = source.receive_byte();
            if self.push(byte) {
                queued += 1;
            } else {
                self.overflowed += 1;
            }
        }
        queued
    }

    /// Bytes lost to a full queue so far.
    #[inline]
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }
}

/// Loop side.
pub struct InboundConsumer {
    consumer: HeapCons<u8>,
}

impl InboundConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        self.consumer.try_pop()
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

pub fn inbound_queue(capacity: usize) -> (InboundProducer, InboundConsumer) {
    let rb = HeapRb::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (
        InboundProducer {
            producer,
            overflowed: 0,
        },
        InboundConsumer { consumer },
    )
}
