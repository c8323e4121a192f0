use crate::LayerKind;

/// Error when not enough data is available in a slice to decode a layer.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct UnexpectedEndOfSliceError {
    /// Layer that could not be decoded.
    pub layer: LayerKind,

    /// Minimum number of bytes the layer needed.
    pub minimum_size: usize,

    /// Number of bytes that were actually available.
    pub actual_size: usize,
}

impl core::fmt::Display for UnexpectedEndOfSliceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:?}: unexpected end of slice (at least {} bytes required, {} available)",
            self.layer, self.minimum_size, self.actual_size
        )
    }
}

impl std::error::Error for UnexpectedEndOfSliceError {}

/// Error when the bytes of a layer do not conform to its protocol's
/// structure (e.g. a declared length that disagrees with the data that
/// is actually present).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MalformedError {
    /// Layer in which the structure violation was encountered.
    pub layer: LayerKind,

    /// Short description of the violated constraint.
    pub reason: &'static str,
}

impl core::fmt::Display for MalformedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}: malformed packet ({})", self.layer, self.reason)
    }
}

impl std::error::Error for MalformedError {}

/// Errors that can occur while dissecting a byte buffer into a layer chain.
///
/// A dissection error always refers to a single packet. The partially
/// constructed chain is discarded, the caller decides how to continue.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum DissectError {
    /// Not enough bytes available to decode the layer.
    UnexpectedEndOfSlice(UnexpectedEndOfSliceError),

    /// The bytes violate the protocol's structure.
    Malformed(MalformedError),
}

impl DissectError {
    /// Returns the layer in which the error occurred.
    pub fn layer(&self) -> LayerKind {
        match self {
            DissectError::UnexpectedEndOfSlice(err) => err.layer,
            DissectError::Malformed(err) => err.layer,
        }
    }
}

impl core::fmt::Display for DissectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DissectError::UnexpectedEndOfSlice(err) => err.fmt(f),
            DissectError::Malformed(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for DissectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DissectError::UnexpectedEndOfSlice(err) => Some(err),
            DissectError::Malformed(err) => Some(err),
        }
    }
}

impl From<UnexpectedEndOfSliceError> for DissectError {
    fn from(err: UnexpectedEndOfSliceError) -> DissectError {
        DissectError::UnexpectedEndOfSlice(err)
    }
}

impl From<MalformedError> for DissectError {
    fn from(err: MalformedError) -> DissectError {
        DissectError::Malformed(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        let eos = UnexpectedEndOfSliceError {
            layer: LayerKind::Ipv4,
            minimum_size: 20,
            actual_size: 12,
        };
        assert_eq!(
            "Ipv4: unexpected end of slice (at least 20 bytes required, 12 available)",
            format!("{}", eos)
        );

        let malformed = MalformedError {
            layer: LayerKind::Tcp,
            reason: "data offset smaller than minimum header",
        };
        assert_eq!(
            "Tcp: malformed packet (data offset smaller than minimum header)",
            format!("{}", malformed)
        );

        assert_eq!(
            format!("{}", DissectError::from(eos.clone())),
            format!("{}", eos)
        );
        assert_eq!(
            format!("{}", DissectError::from(malformed.clone())),
            format!("{}", malformed)
        );
    }

    #[test]
    fn layer() {
        let err: DissectError = MalformedError {
            layer: LayerKind::Arp,
            reason: "bad hardware length",
        }
        .into();
        assert_eq!(LayerKind::Arp, err.layer());
    }

    #[test]
    fn clone_eq() {
        let err: DissectError = UnexpectedEndOfSliceError {
            layer: LayerKind::Udp,
            minimum_size: 8,
            actual_size: 0,
        }
        .into();
        assert_eq!(err, err.clone());
    }
}
