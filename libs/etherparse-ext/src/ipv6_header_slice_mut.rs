use crate::slice_utils::write_to_offset_unchecked;
use etherparse::Ipv6HeaderSlice;

pub struct Ipv6HeaderSliceMut<'a> {
    slice: &'a mut [u8],
}

impl<'a> Ipv6HeaderSliceMut<'a> {
    /// Creates a new [`Ipv6HeaderSliceMut`].
    pub fn from_slice(
        slice: &'a mut [u8],
    ) -> Result<Self, etherparse::err::ipv6::HeaderSliceError> {
        Ipv6HeaderSlice::from_slice(slice)?;

        Ok(Self { slice })
    }

    pub fn get_source(&self) -> [u8; 16] {
        // Safety: constructor validated at least 40 bytes.
        #[allow(clippy::unwrap_used, reason = "Length checked in the ctor.")]
        self.slice[8..24].try_into().unwrap()
    }

    pub fn get_destination(&self) -> [u8; 16] {
        #[allow(clippy::unwrap_used, reason = "Length checked in the ctor.")]
        self.slice[24..40].try_into().unwrap()
    }

    pub fn set_source(&mut self, src: [u8; 16]) {
        // Safety: Slice is at least 40 bytes as checked in the ctor.
        unsafe { write_to_offset_unchecked(self.slice, 8, src) };
    }

    pub fn set_destination(&mut self, dst: [u8; 16]) {
        // Safety: Slice is at least 40 bytes as checked in the ctor.
        unsafe { write_to_offset_unchecked(self.slice, 24, dst) };
    }

    pub fn hop_limit(&self) -> u8 {
        self.slice[7]
    }

    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.slice[7] = hop_limit;
    }

    pub fn next_header(&self) -> u8 {
        self.slice[6]
    }
}
