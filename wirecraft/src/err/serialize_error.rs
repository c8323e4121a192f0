use crate::LayerKind;

/// Errors that can occur while serializing a layer chain into a buffer.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SerializeError {
    /// The target buffer is too small for the serialized layer.
    BufferTooSmall {
        /// Layer that was being written.
        layer: LayerKind,
        /// Number of bytes the layer required.
        required: usize,
        /// Number of bytes available in the buffer.
        actual: usize,
    },

    /// A derived field cannot represent the value the chain requires
    /// (e.g. a payload bigger than a 16 bit length field can express).
    ValueTooBig {
        /// Layer the field belongs to.
        layer: LayerKind,
        /// Name of the field.
        field: &'static str,
        /// Value that was requested.
        actual: usize,
        /// Maximum value the field can represent.
        max: usize,
    },

    /// The layer kind does not support serialization (currently only
    /// PPI, which carries capture metadata that does not round-trip).
    NotSerializable(LayerKind),
}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SerializeError::BufferTooSmall {
                layer,
                required,
                actual,
            } => write!(
                f,
                "{:?}: serialization buffer too small ({} bytes required, {} available)",
                layer, required, actual
            ),
            SerializeError::ValueTooBig {
                layer,
                field,
                actual,
                max,
            } => write!(
                f,
                "{:?}: value {} does not fit into field '{}' (max {})",
                layer, actual, field, max
            ),
            SerializeError::NotSerializable(layer) => {
                write!(f, "{:?}: layer can not be serialized", layer)
            }
        }
    }
}

impl std::error::Error for SerializeError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            "Udp: serialization buffer too small (8 bytes required, 2 available)",
            format!(
                "{}",
                SerializeError::BufferTooSmall {
                    layer: LayerKind::Udp,
                    required: 8,
                    actual: 2,
                }
            )
        );
        assert_eq!(
            "Ipv4: value 70000 does not fit into field 'total_len' (max 65535)",
            format!(
                "{}",
                SerializeError::ValueTooBig {
                    layer: LayerKind::Ipv4,
                    field: "total_len",
                    actual: 70000,
                    max: 65535,
                }
            )
        );
        assert_eq!(
            "Ppi: layer can not be serialized",
            format!("{}", SerializeError::NotSerializable(LayerKind::Ppi))
        );
    }

    #[test]
    fn clone_eq() {
        let err = SerializeError::NotSerializable(LayerKind::Ppi);
        assert_eq!(err, err.clone());
    }
}
