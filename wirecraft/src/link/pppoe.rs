use crate::err::{DissectError, MalformedError, OptionError, SerializeError};
use crate::*;

/// Codes of PPPoE discovery packets (session packets use code 0).
pub mod pppoe_code {
    pub const SESSION: u8 = 0x00;
    pub const PADO: u8 = 0x07;
    pub const PADI: u8 = 0x09;
    pub const PADR: u8 = 0x19;
    pub const PADS: u8 = 0x65;
    pub const PADT: u8 = 0xa7;
}

/// Tag types of PPPoE discovery packets.
pub mod pppoe_tag {
    pub const END_OF_LIST: u16 = 0x0000;
    pub const SERVICE_NAME: u16 = 0x0101;
    pub const AC_NAME: u16 = 0x0102;
    pub const HOST_UNIQ: u16 = 0x0103;
    pub const AC_COOKIE: u16 = 0x0104;
    pub const VENDOR_SPECIFIC: u16 = 0x0105;
    pub const RELAY_SESSION_ID: u16 = 0x0110;
    pub const SERVICE_NAME_ERROR: u16 = 0x0201;
    pub const AC_SYSTEM_ERROR: u16 = 0x0202;
    pub const GENERIC_ERROR: u16 = 0x0203;
}

/// PPPoE header (RFC 2516).
///
/// Discovery packets (nonzero code) carry a list of TLV tags; session
/// packets (code 0) carry the PPP encapsulated payload as raw bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pppoe {
    /// Protocol version (4 bit), 1 on the wire.
    pub version: u8,

    /// Header type (4 bit), 1 on the wire.
    pub header_type: u8,

    /// Packet code (`pppoe_code` constants).
    pub code: u8,

    /// Session identifier assigned in the PADS packet.
    pub session_id: u16,

    /// Discovery tags (empty for session packets).
    pub tags: Vec<TlvOption<u16>>,

    pub inner: Option<Box<Layer>>,
}

impl Pppoe {
    /// Length of the fixed header in bytes.
    pub const MIN_LEN: usize = 6;

    pub fn new(code: u8, session_id: u16) -> Pppoe {
        Pppoe {
            version: 1,
            header_type: 1,
            code,
            session_id,
            tags: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Pppoe, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Pppoe, bytes);
        let version_type = cursor.read_u8()?;
        let code = cursor.read_u8()?;
        let session_id = cursor.read_u16()?;
        let payload_length = cursor.read_u16()?;
        if usize::from(payload_length) > cursor.remaining() {
            return Err(MalformedError {
                layer: LayerKind::Pppoe,
                reason: "payload length exceeds available data",
            }
            .into());
        }
        let payload = cursor.read_slice(payload_length.into())?;

        let mut tags = Vec::new();
        let mut inner = None;
        if code == pppoe_code::SESSION {
            if !payload.is_empty() {
                inner = Some(Box::new(Layer::Raw(RawPayload::new(payload.to_vec()))));
            }
        } else {
            let mut tag_cursor = ReadCursor::new(LayerKind::Pppoe, payload);
            while !tag_cursor.is_empty() {
                let tag_type = tag_cursor.read_u16()?;
                let tag_len = tag_cursor.read_u16()?;
                if usize::from(tag_len) > tag_cursor.remaining() {
                    return Err(MalformedError {
                        layer: LayerKind::Pppoe,
                        reason: "tag length exceeds the payload",
                    }
                    .into());
                }
                let data = tag_cursor.read_slice(tag_len.into())?.to_vec();
                tags.push(TlvOption::new(tag_type, data));
                if tag_type == pppoe_tag::END_OF_LIST {
                    break;
                }
            }
        }

        Ok(Pppoe {
            version: version_type >> 4,
            header_type: version_type & 0x0f,
            code,
            session_id,
            tags,
            inner,
        })
    }

    fn tags_len(&self) -> usize {
        self.tags.iter().map(|tag| 4 + tag.data.len()).sum()
    }

    pub fn header_size(&self) -> usize {
        Pppoe::MIN_LEN + self.tags_len()
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let payload_len = self.tags_len() + self.inner.as_deref().map_or(0, Layer::size);
        if payload_len > usize::from(u16::MAX) {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Pppoe,
                field: "payload_length",
                actual: payload_len,
                max: u16::MAX.into(),
            });
        }
        let mut cursor = WriteCursor::new(LayerKind::Pppoe, buf);
        cursor.write_u8((self.version << 4) | (self.header_type & 0x0f))?;
        cursor.write_u8(self.code)?;
        cursor.write_u16(self.session_id)?;
        cursor.write_u16(payload_len as u16)?;
        for tag in &self.tags {
            cursor.write_u16(tag.id)?;
            cursor.write_u16(tag.data.len() as u16)?;
            cursor.write_slice(&tag.data)?;
        }
        Ok(())
    }

    /// Find a discovery tag by its type.
    pub fn tag(&self, tag_type: u16) -> Result<&TlvOption<u16>, OptionError> {
        crate::options::find_option(&self.tags, tag_type, LayerKind::Pppoe)
    }

    /// Append a discovery tag.
    pub fn push_tag(&mut self, tag_type: u16, data: Vec<u8>) {
        self.tags.push(TlvOption::new(tag_type, data));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn discovery_round_trip() {
        let mut padi = Pppoe::new(pppoe_code::PADI, 0);
        padi.push_tag(pppoe_tag::SERVICE_NAME, b"my-service".to_vec());
        padi.push_tag(pppoe_tag::HOST_UNIQ, vec![1, 2, 3, 4]);

        let bytes = Layer::from(padi.clone()).serialize().unwrap();
        assert_eq!(6 + 14 + 8, bytes.len());

        let dissected = Pppoe::dissect(&bytes).unwrap();
        assert_eq!(padi, dissected);
        assert_eq!(
            b"my-service".to_vec(),
            dissected.tag(pppoe_tag::SERVICE_NAME).unwrap().data
        );
        assert!(matches!(
            dissected.tag(pppoe_tag::AC_COOKIE),
            Err(OptionError::NotFound { .. })
        ));
    }

    #[test]
    fn session_payload_is_raw() {
        let session =
            Pppoe::new(pppoe_code::SESSION, 0x1234) / RawPayload::new(vec![0xc0, 0x21, 1, 2]);
        let bytes = session.serialize().unwrap();
        // payload length covers the ppp payload
        assert_eq!([0x00, 0x04], [bytes[4], bytes[5]]);
        let dissected = Pppoe::dissect(&bytes).unwrap();
        assert_eq!(0x1234, dissected.session_id);
        assert_eq!(
            vec![0xc0, 0x21, 1, 2],
            dissected.inner.as_deref().unwrap().as_raw().unwrap().data
        );
    }

    #[test]
    fn truncated_tag_is_malformed() {
        let bytes = [
            0x11, 0x09, 0x00, 0x00, 0x00, 0x04, // header, payload length 4
            0x01, 0x01, 0x00, 0x08, // tag claims 8 data bytes
        ];
        assert!(matches!(
            Pppoe::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }
}
