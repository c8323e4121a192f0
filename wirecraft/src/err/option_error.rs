use crate::LayerKind;

/// Errors of the typed option accessors.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum OptionError {
    /// A typed option accessor was invoked for an option that is not
    /// present in the layer.
    NotFound {
        /// Layer that was searched.
        layer: LayerKind,
        /// Identifier of the option that was searched for.
        id: u32,
    },

    /// An option's declared length disagrees with its payload.
    Malformed {
        /// Layer the option belongs to.
        layer: LayerKind,
        /// Short description of the violated constraint.
        reason: &'static str,
    },
}

impl core::fmt::Display for OptionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OptionError::NotFound { layer, id } => {
                write!(f, "{:?}: option {} not found", layer, id)
            }
            OptionError::Malformed { layer, reason } => {
                write!(f, "{:?}: malformed option ({})", layer, reason)
            }
        }
    }
}

impl std::error::Error for OptionError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            "Tcp: option 2 not found",
            format!(
                "{}",
                OptionError::NotFound {
                    layer: LayerKind::Tcp,
                    id: 2,
                }
            )
        );
        assert_eq!(
            "Dhcp: malformed option (payload shorter than 2 bytes)",
            format!(
                "{}",
                OptionError::Malformed {
                    layer: LayerKind::Dhcp,
                    reason: "payload shorter than 2 bytes",
                }
            )
        );
    }
}
