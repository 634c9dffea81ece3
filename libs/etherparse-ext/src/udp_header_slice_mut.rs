use crate::slice_utils::write_to_offset_unchecked;
use etherparse::UdpHeaderSlice;

pub struct UdpHeaderSliceMut<'a> {
    slice: &'a mut [u8],
}

impl<'a> UdpHeaderSliceMut<'a> {
    /// Creates a new [`UdpHeaderSliceMut`].
    pub fn from_slice(slice: &'a mut [u8]) -> Result<Self, etherparse::err::LenError> {
        UdpHeaderSlice::from_slice(slice)?;

        Ok(Self { slice })
    }

    pub fn get_checksum(&self) -> u16 {
        u16::from_be_bytes([self.slice[6], self.slice[7]])
    }

    pub fn set_source_port(&mut self, src: u16) {
        // Safety: Slice is at least 8 bytes as checked in the ctor.
        unsafe { write_to_offset_unchecked(self.slice, 0, src.to_be_bytes()) };
    }

    pub fn set_destination_port(&mut self, dst: u16) {
        // Safety: Slice is at least 8 bytes as checked in the ctor.
        unsafe { write_to_offset_unchecked(self.slice, 2, dst.to_be_bytes()) };
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        // Safety: Slice is at least 8 bytes as checked in the ctor.
        unsafe { write_to_offset_unchecked(self.slice, 6, checksum.to_be_bytes()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;

    #[test]
    fn smoke() {
        let mut buf = Vec::new();

        PacketBuilder::ipv6([0u8; 16], [0u8; 16], 64)
            .udp(10, 20)
            .write(&mut buf, &[])
            .unwrap();

        let mut slice = UdpHeaderSliceMut::from_slice(&mut buf[40..]).unwrap();

        slice.set_source_port(30);
        slice.set_destination_port(40);
        slice.set_checksum(50);

        let slice = UdpHeaderSlice::from_slice(&buf[40..]).unwrap();

        assert_eq!(slice.source_port(), 30);
        assert_eq!(slice.destination_port(), 40);
        assert_eq!(slice.checksum(), 50);
    }
}
