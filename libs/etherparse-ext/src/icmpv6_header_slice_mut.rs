use crate::slice_utils::write_to_offset_unchecked;
use etherparse::Icmpv6Slice;

/// A mutable view onto an ICMPv6 header.
///
/// Named `Echo` because the identifier setter only makes sense for echo request/reply
/// messages; callers must check the message type before calling it.
pub struct Icmpv6EchoHeaderSliceMut<'a> {
    slice: &'a mut [u8],
}

impl<'a> Icmpv6EchoHeaderSliceMut<'a> {
    /// Creates a new [`Icmpv6EchoHeaderSliceMut`].
    pub fn from_slice(slice: &'a mut [u8]) -> Result<Self, etherparse::err::icmpv6::HeaderError> {
        Icmpv6Slice::from_slice(slice)?;

        Ok(Self { slice })
    }

    pub fn get_type(&self) -> u8 {
        self.slice[0]
    }

    pub fn get_code(&self) -> u8 {
        self.slice[1]
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        // Safety: Slice is at least 8 bytes as checked in the ctor.
        unsafe { write_to_offset_unchecked(self.slice, 2, checksum.to_be_bytes()) };
    }

    pub fn set_identifier(&mut self, id: u16) {
        // Safety: Slice is at least 8 bytes as checked in the ctor.
        unsafe { write_to_offset_unchecked(self.slice, 4, id.to_be_bytes()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::{Icmpv6Type, PacketBuilder};

    #[test]
    fn smoke() {
        let mut buf = Vec::new();

        PacketBuilder::ipv6([0u8; 16], [0u8; 16], 64)
            .icmpv6(Icmpv6Type::EchoRequest(etherparse::IcmpEchoHeader {
                id: 1,
                seq: 2,
            }))
            .write(&mut buf, &[])
            .unwrap();

        let mut slice = Icmpv6EchoHeaderSliceMut::from_slice(&mut buf[40..]).unwrap();

        slice.set_checksum(0xdead);
        slice.set_identifier(99);

        let slice = Icmpv6Slice::from_slice(&buf[40..]).unwrap();
        assert_eq!(slice.checksum(), 0xdead);
    }
}
