use crate::dot11::{dot11_frame_type, frame_control_byte};
use crate::err::{DissectError, SerializeError};
use crate::*;

/// Subtypes of 802.11 data frames.
pub mod dot11_data_subtype {
    pub const DATA: u8 = 0;
    pub const NULL_DATA: u8 = 4;
    pub const QOS_DATA: u8 = 8;
    pub const QOS_NULL: u8 = 12;
}

/// 802.11 data frame.
///
/// The header is 24 bytes, +6 for the fourth address when both DS flags
/// are set, +2 for the QoS control field of QoS subtypes. Unprotected
/// payloads starting with an LLC/SNAP prefix are dissected further,
/// protected payloads stay raw.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dot11Data {
    /// Protocol version (2 bit), 0 on the wire.
    pub version: u8,

    /// Frame subtype (`dot11_data_subtype` constants). Subtypes with
    /// bit 3 set carry a QoS control field.
    pub subtype: u8,

    pub flags: Dot11Flags,

    pub duration: u16,

    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,

    /// Fragment number (4 bit) and sequence number (12 bit).
    pub sequence_control: u16,

    /// Fourth address, present when both to-DS and from-DS are set.
    pub addr4: Option<MacAddr>,

    /// QoS control field of QoS subtypes.
    pub qos_control: Option<u16>,

    pub inner: Option<Box<Layer>>,
}

impl Dot11Data {
    /// Length of the common data header in bytes.
    pub const BASE_LEN: usize = 24;

    pub fn new(destination: MacAddr, source: MacAddr) -> Dot11Data {
        Dot11Data {
            version: 0,
            subtype: dot11_data_subtype::DATA,
            flags: Dot11Flags::default(),
            duration: 0,
            addr1: destination,
            addr2: source,
            addr3: destination,
            sequence_control: 0,
            addr4: None,
            qos_control: None,
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Dot11Data, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Dot11Data, bytes);
        let fc0 = cursor.read_u8()?;
        let flags = Dot11Flags::from_byte(cursor.read_u8()?);
        let duration = cursor.read_u16_le()?;
        let addr1 = cursor.read_mac()?;
        let addr2 = cursor.read_mac()?;
        let addr3 = cursor.read_mac()?;
        let sequence_control = cursor.read_u16_le()?;
        let addr4 = if flags.to_ds && flags.from_ds {
            Some(cursor.read_mac()?)
        } else {
            None
        };
        let subtype = fc0 >> 4;
        let qos_control = if 0 != subtype & 0b1000 {
            Some(cursor.read_u16_le()?)
        } else {
            None
        };

        let payload = cursor.rest();
        let inner = if payload.is_empty() {
            None
        } else if !flags.protected
            && payload.starts_with(&[Snap::DSAP, Snap::SSAP, Snap::CONTROL])
        {
            Some(Box::new(Layer::Snap(Snap::dissect(payload)?)))
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(payload.to_vec()))))
        };

        Ok(Dot11Data {
            version: fc0 & 0b11,
            subtype,
            flags,
            duration,
            addr1,
            addr2,
            addr3,
            sequence_control,
            addr4,
            qos_control,
            inner,
        })
    }

    pub fn header_size(&self) -> usize {
        Dot11Data::BASE_LEN
            + if self.addr4.is_some() { 6 } else { 0 }
            + if self.qos_control.is_some() { 2 } else { 0 }
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Dot11Data, buf);
        cursor.write_u8(frame_control_byte(
            self.version,
            dot11_frame_type::DATA,
            self.subtype,
        ))?;
        cursor.write_u8(self.flags.to_byte())?;
        cursor.write_u16_le(self.duration)?;
        cursor.write_mac(self.addr1)?;
        cursor.write_mac(self.addr2)?;
        cursor.write_mac(self.addr3)?;
        cursor.write_u16_le(self.sequence_control)?;
        if let Some(addr4) = self.addr4 {
            cursor.write_mac(addr4)?;
        }
        if let Some(qos_control) = self.qos_control {
            cursor.write_u16_le(qos_control)?;
        }
        Ok(())
    }
}
