use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;

/// Channel information of a RadioTap header.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RadioTapChannel {
    /// Channel frequency in MHz.
    pub frequency: u16,
    /// Channel flags (turbo, CCK, OFDM, 2GHz/5GHz, ...).
    pub flags: u16,
}

/// RadioTap capture header preceding an 802.11 frame.
///
/// The header is little endian and consists of a bitmap-indexed list of
/// radio level fields, each aligned to its natural size. The commonly
/// used fields (bits 0 to 14) are decoded; fields indicated by unknown
/// or vendor namespace bits are kept as an opaque tail so dissected
/// headers still round trip.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RadioTap {
    pub version: u8,

    /// TSF timer of the radio when the first bit of the frame arrived.
    pub tsft: Option<u64>,

    /// Frame flags (during-CFP, short preamble, FCS-at-end, ...).
    pub flags: Option<u8>,

    /// TX/RX rate in 500 kbps units.
    pub rate: Option<u8>,

    pub channel: Option<RadioTapChannel>,

    /// Frequency hopping set & pattern.
    pub fhss: Option<[u8; 2]>,

    /// Antenna signal in dBm.
    pub dbm_signal: Option<i8>,

    /// Antenna noise in dBm.
    pub dbm_noise: Option<i8>,

    /// Barker code lock quality.
    pub lock_quality: Option<u16>,

    /// TX attenuation in unitless distance from max power.
    pub tx_attenuation: Option<u16>,

    /// TX attenuation in dB from max power.
    pub db_tx_attenuation: Option<u16>,

    /// Transmit power in dBm.
    pub dbm_tx_power: Option<i8>,

    /// Antenna index.
    pub antenna: Option<u8>,

    /// Antenna signal in dB.
    pub db_signal: Option<u8>,

    /// Antenna noise in dB.
    pub db_noise: Option<u8>,

    /// RX flags.
    pub rx_flags: Option<u16>,

    /// Present words as captured. Empty for crafted headers (a single
    /// word is derived from the set fields while serializing).
    pub present_words: Vec<u32>,

    /// Field bytes indicated by present bits this codec does not decode.
    pub opaque_tail: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

/// Field bits of the first present word.
mod bit {
    pub const TSFT: u32 = 1 << 0;
    pub const FLAGS: u32 = 1 << 1;
    pub const RATE: u32 = 1 << 2;
    pub const CHANNEL: u32 = 1 << 3;
    pub const FHSS: u32 = 1 << 4;
    pub const DBM_SIGNAL: u32 = 1 << 5;
    pub const DBM_NOISE: u32 = 1 << 6;
    pub const LOCK_QUALITY: u32 = 1 << 7;
    pub const TX_ATTENUATION: u32 = 1 << 8;
    pub const DB_TX_ATTENUATION: u32 = 1 << 9;
    pub const DBM_TX_POWER: u32 = 1 << 10;
    pub const ANTENNA: u32 = 1 << 11;
    pub const DB_SIGNAL: u32 = 1 << 12;
    pub const DB_NOISE: u32 = 1 << 13;
    pub const RX_FLAGS: u32 = 1 << 14;
    pub const EXT: u32 = 1 << 31;

    /// Bits above RX_FLAGS (except EXT) are not decoded.
    pub const KNOWN: u32 = 0x7fff;
}

/// Walks the aligned field layout. `offset` is relative to the start of
/// the RadioTap header as required by the alignment rules.
struct FieldLayout {
    offset: usize,
}

impl FieldLayout {
    fn new(present_word_count: usize) -> FieldLayout {
        FieldLayout {
            offset: 4 + 4 * present_word_count,
        }
    }

    /// Advance to the next field of the given alignment & size and
    /// return the amount of padding that precedes it.
    fn advance(&mut self, align: usize, size: usize) -> usize {
        let padding = (align - self.offset % align) % align;
        self.offset += padding + size;
        padding
    }
}

impl RadioTap {
    /// Length of the fixed part of the header (before the fields) with a
    /// single present word.
    pub const MIN_LEN: usize = 8;

    pub fn new() -> RadioTap {
        RadioTap::default()
    }

    /// The present word derived from the populated fields (used when the
    /// header was not dissected).
    fn derived_present_word(&self) -> u32 {
        use self::bit::*;
        let mut word = 0;
        if self.tsft.is_some() {
            word |= TSFT;
        }
        if self.flags.is_some() {
            word |= FLAGS;
        }
        if self.rate.is_some() {
            word |= RATE;
        }
        if self.channel.is_some() {
            word |= CHANNEL;
        }
        if self.fhss.is_some() {
            word |= FHSS;
        }
        if self.dbm_signal.is_some() {
            word |= DBM_SIGNAL;
        }
        if self.dbm_noise.is_some() {
            word |= DBM_NOISE;
        }
        if self.lock_quality.is_some() {
            word |= LOCK_QUALITY;
        }
        if self.tx_attenuation.is_some() {
            word |= TX_ATTENUATION;
        }
        if self.db_tx_attenuation.is_some() {
            word |= DB_TX_ATTENUATION;
        }
        if self.dbm_tx_power.is_some() {
            word |= DBM_TX_POWER;
        }
        if self.antenna.is_some() {
            word |= ANTENNA;
        }
        if self.db_signal.is_some() {
            word |= DB_SIGNAL;
        }
        if self.db_noise.is_some() {
            word |= DB_NOISE;
        }
        if self.rx_flags.is_some() {
            word |= RX_FLAGS;
        }
        word
    }

    fn present_word_count(&self) -> usize {
        if self.present_words.is_empty() {
            1
        } else {
            self.present_words.len()
        }
    }

    pub fn header_size(&self) -> usize {
        let mut layout = FieldLayout::new(self.present_word_count());
        if self.tsft.is_some() {
            layout.advance(8, 8);
        }
        if self.flags.is_some() {
            layout.advance(1, 1);
        }
        if self.rate.is_some() {
            layout.advance(1, 1);
        }
        if self.channel.is_some() {
            layout.advance(2, 4);
        }
        if self.fhss.is_some() {
            layout.advance(1, 2);
        }
        if self.dbm_signal.is_some() {
            layout.advance(1, 1);
        }
        if self.dbm_noise.is_some() {
            layout.advance(1, 1);
        }
        if self.lock_quality.is_some() {
            layout.advance(2, 2);
        }
        if self.tx_attenuation.is_some() {
            layout.advance(2, 2);
        }
        if self.db_tx_attenuation.is_some() {
            layout.advance(2, 2);
        }
        if self.dbm_tx_power.is_some() {
            layout.advance(1, 1);
        }
        if self.antenna.is_some() {
            layout.advance(1, 1);
        }
        if self.db_signal.is_some() {
            layout.advance(1, 1);
        }
        if self.db_noise.is_some() {
            layout.advance(1, 1);
        }
        if self.rx_flags.is_some() {
            layout.advance(2, 2);
        }
        layout.offset + self.opaque_tail.len()
    }

    pub fn dissect(bytes: &[u8]) -> Result<RadioTap, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::RadioTap, bytes);
        let version = cursor.read_u8()?;
        cursor.skip(1)?; // pad
        let length = cursor.read_u16_le()?;
        if usize::from(length) > bytes.len() || usize::from(length) < RadioTap::MIN_LEN {
            return Err(MalformedError {
                layer: LayerKind::RadioTap,
                reason: "declared header length inconsistent with the data",
            }
            .into());
        }

        let mut present_words = vec![cursor.read_u32_le()?];
        while 0 != present_words.last().unwrap() & bit::EXT {
            present_words.push(cursor.read_u32_le()?);
        }
        let present = present_words[0];
        // anything beyond the known bits (or extra namespaces) makes the
        // tail opaque
        let fully_decodable =
            present_words.len() == 1 && 0 == present & !(bit::KNOWN | bit::EXT);

        let header = &bytes[..length.into()];
        let mut layout = FieldLayout::new(present_words.len());
        let mut fields = ReadCursor::new(LayerKind::RadioTap, header);
        fields.skip(layout.offset)?;

        let mut result = RadioTap {
            version,
            present_words: present_words.clone(),
            ..Default::default()
        };

        macro_rules! get {
            ($present_bit:expr, $align:expr, $size:expr, |$data:ident| $body:expr) => {
                if 0 != present & $present_bit {
                    let padding = layout.advance($align, $size);
                    fields.skip(padding)?;
                    let $data = fields.read_slice($size)?;
                    $body;
                }
            };
        }

        get!(bit::TSFT, 8, 8, |data| {
            result.tsft = Some(u64::from_le_bytes(data.try_into().unwrap()))
        });
        get!(bit::FLAGS, 1, 1, |data| result.flags = Some(data[0]));
        get!(bit::RATE, 1, 1, |data| result.rate = Some(data[0]));
        get!(bit::CHANNEL, 2, 4, |data| {
            result.channel = Some(RadioTapChannel {
                frequency: u16::from_le_bytes([data[0], data[1]]),
                flags: u16::from_le_bytes([data[2], data[3]]),
            })
        });
        get!(bit::FHSS, 1, 2, |data| result.fhss = Some([data[0], data[1]]));
        get!(bit::DBM_SIGNAL, 1, 1, |data| {
            result.dbm_signal = Some(data[0] as i8)
        });
        get!(bit::DBM_NOISE, 1, 1, |data| {
            result.dbm_noise = Some(data[0] as i8)
        });
        get!(bit::LOCK_QUALITY, 2, 2, |data| {
            result.lock_quality = Some(u16::from_le_bytes([data[0], data[1]]))
        });
        get!(bit::TX_ATTENUATION, 2, 2, |data| {
            result.tx_attenuation = Some(u16::from_le_bytes([data[0], data[1]]))
        });
        get!(bit::DB_TX_ATTENUATION, 2, 2, |data| {
            result.db_tx_attenuation = Some(u16::from_le_bytes([data[0], data[1]]))
        });
        get!(bit::DBM_TX_POWER, 1, 1, |data| {
            result.dbm_tx_power = Some(data[0] as i8)
        });
        get!(bit::ANTENNA, 1, 1, |data| result.antenna = Some(data[0]));
        get!(bit::DB_SIGNAL, 1, 1, |data| result.db_signal = Some(data[0]));
        get!(bit::DB_NOISE, 1, 1, |data| result.db_noise = Some(data[0]));
        get!(bit::RX_FLAGS, 2, 2, |data| {
            result.rx_flags = Some(u16::from_le_bytes([data[0], data[1]]))
        });

        // opaque remainder of the header (vendor namespaces, newer bits)
        if !fully_decodable || !fields.is_empty() {
            result.opaque_tail = fields.rest().to_vec();
        }

        result.inner = if bytes.len() > usize::from(length) {
            Some(Box::new(dissect_dot11(&bytes[usize::from(length)..])?))
        } else {
            None
        };
        Ok(result)
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let header_size = self.header_size();
        if header_size > usize::from(u16::MAX) {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::RadioTap,
                field: "length",
                actual: header_size,
                max: u16::MAX.into(),
            });
        }
        let mut cursor = WriteCursor::new(LayerKind::RadioTap, buf);
        cursor.write_u8(self.version)?;
        cursor.write_u8(0)?;
        cursor.write_u16_le(header_size as u16)?;
        if self.present_words.is_empty() {
            cursor.write_u32_le(self.derived_present_word())?;
        } else {
            for word in &self.present_words {
                cursor.write_u32_le(*word)?;
            }
        }

        let mut layout = FieldLayout::new(self.present_word_count());
        macro_rules! put {
            ($field:expr, $align:expr, $size:expr, |$data:ident| $write:expr) => {
                if let Some($data) = $field {
                    let padding = layout.advance($align, $size);
                    cursor.fill(padding, 0)?;
                    $write;
                }
            };
        }

        put!(self.tsft, 8, 8, |value| cursor.write_u64_le(value)?);
        put!(self.flags, 1, 1, |value| cursor.write_u8(value)?);
        put!(self.rate, 1, 1, |value| cursor.write_u8(value)?);
        put!(self.channel, 2, 4, |value| {
            cursor.write_u16_le(value.frequency)?;
            cursor.write_u16_le(value.flags)?;
        });
        put!(self.fhss, 1, 2, |value| cursor.write_slice(&value)?);
        put!(self.dbm_signal, 1, 1, |value| cursor.write_u8(value as u8)?);
        put!(self.dbm_noise, 1, 1, |value| cursor.write_u8(value as u8)?);
        put!(self.lock_quality, 2, 2, |value| cursor.write_u16_le(value)?);
        put!(self.tx_attenuation, 2, 2, |value| cursor
            .write_u16_le(value)?);
        put!(self.db_tx_attenuation, 2, 2, |value| cursor
            .write_u16_le(value)?);
        put!(self.dbm_tx_power, 1, 1, |value| cursor.write_u8(value as u8)?);
        put!(self.antenna, 1, 1, |value| cursor.write_u8(value)?);
        put!(self.db_signal, 1, 1, |value| cursor.write_u8(value)?);
        put!(self.db_noise, 1, 1, |value| cursor.write_u8(value)?);
        put!(self.rx_flags, 2, 2, |value| cursor.write_u16_le(value)?);

        cursor.write_slice(&self.opaque_tail)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crafted_round_trip() {
        let header = RadioTap {
            tsft: Some(0x0102_0304_0506_0708),
            flags: Some(0x10),
            rate: Some(12),
            channel: Some(RadioTapChannel {
                frequency: 2437,
                flags: 0x00a0,
            }),
            dbm_signal: Some(-40),
            antenna: Some(1),
            rx_flags: Some(0),
            ..Default::default()
        };
        let bytes = Layer::from(header.clone()).serialize().unwrap();
        let mut dissected = RadioTap::dissect(&bytes).unwrap();
        // dissection stores the present words it saw; mask them out for
        // the field comparison
        assert_eq!(vec![header.derived_present_word()], dissected.present_words);
        dissected.present_words.clear();
        assert_eq!(header, dissected);
    }

    #[test]
    fn alignment_padding() {
        // flags (1 byte) followed by channel (align 2) leaves a pad byte
        let header = RadioTap {
            flags: Some(0),
            channel: Some(RadioTapChannel {
                frequency: 5180,
                flags: 0x0140,
            }),
            ..Default::default()
        };
        // 8 fixed + 1 flags + 1 pad + 4 channel
        assert_eq!(14, header.header_size());
        let bytes = Layer::from(header.clone()).serialize().unwrap();
        assert_eq!(header, {
            let mut dissected = RadioTap::dissect(&bytes).unwrap();
            dissected.present_words.clear();
            dissected
        });
    }

    #[test]
    fn unknown_bits_kept_opaque() {
        let bytes = [
            0x00, 0x00, 0x0e, 0x00, // version, pad, length 14
            0x00, 0x00, 0x01, 0x00, // present: bit 16 (unknown)
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, // opaque field bytes
        ];
        let dissected = RadioTap::dissect(&bytes).unwrap();
        assert_eq!(
            vec![0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff],
            dissected.opaque_tail
        );
        // round trips through the stored present words
        let layer: Layer = dissected.into();
        assert_eq!(bytes.to_vec(), layer.serialize().unwrap());
    }
}
