use crate::dot11::{dot11_frame_type, frame_control_byte};
use crate::err::{DissectError, SerializeError};
use crate::*;

/// Subtypes of 802.11 control frames.
pub mod dot11_control_subtype {
    pub const BLOCK_ACK_REQ: u8 = 8;
    pub const BLOCK_ACK: u8 = 9;
    pub const PS_POLL: u8 = 10;
    pub const RTS: u8 = 11;
    pub const CTS: u8 = 12;
    pub const ACK: u8 = 13;
    pub const CF_END: u8 = 14;
    pub const CF_END_ACK: u8 = 15;
}

/// Subtype specific tail of a control frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Dot11ControlBody {
    None,

    BlockAckRequest {
        bar_control: u16,
        /// Starting sequence number field (fragment + sequence).
        start_sequence: u16,
    },

    BlockAck {
        bar_control: u16,
        start_sequence: u16,
        bitmap: [u8; 8],
    },
}

/// 802.11 control frame (ACK, RTS/CTS, PS-Poll, CF-End, BlockAck...).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dot11Control {
    /// Protocol version (2 bit), 0 on the wire.
    pub version: u8,

    /// Frame subtype (`dot11_control_subtype` constants).
    pub subtype: u8,

    pub flags: Dot11Flags,

    /// Duration / association id field.
    pub duration: u16,

    /// Receiver address.
    pub addr1: MacAddr,

    /// Transmitter address, absent for ACK & CTS frames.
    pub addr2: Option<MacAddr>,

    pub body: Dot11ControlBody,

    pub inner: Option<Box<Layer>>,
}

impl Dot11Control {
    /// Build an acknowledgement for the given receiver.
    pub fn ack(receiver: MacAddr) -> Dot11Control {
        Dot11Control {
            version: 0,
            subtype: dot11_control_subtype::ACK,
            flags: Dot11Flags::default(),
            duration: 0,
            addr1: receiver,
            addr2: None,
            body: Dot11ControlBody::None,
            inner: None,
        }
    }

    /// Build a request-to-send frame.
    pub fn rts(receiver: MacAddr, transmitter: MacAddr) -> Dot11Control {
        Dot11Control {
            subtype: dot11_control_subtype::RTS,
            addr2: Some(transmitter),
            ..Dot11Control::ack(receiver)
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Dot11Control, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Dot11Control, bytes);
        let fc0 = cursor.read_u8()?;
        let flags = Dot11Flags::from_byte(cursor.read_u8()?);
        let duration = cursor.read_u16_le()?;
        let addr1 = cursor.read_mac()?;

        let subtype = fc0 >> 4;
        use self::dot11_control_subtype::*;
        let addr2 = match subtype {
            ACK | CTS => None,
            _ => Some(cursor.read_mac()?),
        };
        let body = match subtype {
            BLOCK_ACK_REQ => Dot11ControlBody::BlockAckRequest {
                bar_control: cursor.read_u16_le()?,
                start_sequence: cursor.read_u16_le()?,
            },
            BLOCK_ACK => Dot11ControlBody::BlockAck {
                bar_control: cursor.read_u16_le()?,
                start_sequence: cursor.read_u16_le()?,
                bitmap: cursor.read_array::<8>()?,
            },
            _ => Dot11ControlBody::None,
        };

        Ok(Dot11Control {
            version: fc0 & 0b11,
            subtype,
            flags,
            duration,
            addr1,
            addr2,
            body,
            inner: None,
        })
    }

    pub fn header_size(&self) -> usize {
        let body_len = match &self.body {
            Dot11ControlBody::None => 0,
            Dot11ControlBody::BlockAckRequest { .. } => 4,
            Dot11ControlBody::BlockAck { .. } => 12,
        };
        10 + if self.addr2.is_some() { 6 } else { 0 } + body_len
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Dot11Control, buf);
        cursor.write_u8(frame_control_byte(
            self.version,
            dot11_frame_type::CONTROL,
            self.subtype,
        ))?;
        cursor.write_u8(self.flags.to_byte())?;
        cursor.write_u16_le(self.duration)?;
        cursor.write_mac(self.addr1)?;
        if let Some(addr2) = self.addr2 {
            cursor.write_mac(addr2)?;
        }
        match &self.body {
            Dot11ControlBody::None => Ok(()),
            Dot11ControlBody::BlockAckRequest {
                bar_control,
                start_sequence,
            } => {
                cursor.write_u16_le(*bar_control)?;
                cursor.write_u16_le(*start_sequence)
            }
            Dot11ControlBody::BlockAck {
                bar_control,
                start_sequence,
                bitmap,
            } => {
                cursor.write_u16_le(*bar_control)?;
                cursor.write_u16_le(*start_sequence)?;
                cursor.write_slice(bitmap)
            }
        }
    }
}
