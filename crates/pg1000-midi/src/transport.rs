//! Serial byte transport collaborators.
//!
//! Calls are synchronous; a sink accepts every byte it is given.

pub trait ByteSink {
    fn send_byte(&mut self, byte: u8);

    fn send_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.send_byte(byte);
        }
    }
}

pub trait ByteSource {
    fn is_readable(&mut self) -> bool;

    /// Only called after `is_readable` returned true.
    fn receive_byte(&mut self) -> u8;
}

/// Full-duplex port.
pub trait ByteTransport: ByteSink + ByteSource {}

impl<T: ByteSink + ByteSource + ?Sized> ByteTransport for T {}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn send_byte(&mut self, byte: u8) {
        (**self).send_byte(byte)
    }

    fn send_bytes(&mut self, bytes: &[u8]) {
        (**self).send_bytes(bytes)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn is_readable(&mut self) -> bool {
        (**self).is_readable()
    }

    fn receive_byte(&mut self) -> u8 {
        (**self).receive_byte()
    }
}

impl ByteSink for Vec<u8> {
    fn send_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    fn send_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl ByteSource for std::collections::VecDeque<u8> {
    fn is_readable(&mut self) -> bool {
        !self.is_empty()
    }

    fn receive_byte(&mut self) -> u8 {
        self.pop_front().unwrap_or(0)
    }
}
