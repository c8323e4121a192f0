//! Error types of the reassembly & stream following engines.

/// Errors of the TCP stream following API.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StreamError {
    /// A stream or flow operation was attempted on a packet that does
    /// not carry the required TCP/IP layers.
    InvalidPacket,

    /// `find_stream` was called with an identifier no active stream
    /// matches.
    StreamNotFound,

    /// The follower saw a new stream but no new-stream callback was
    /// installed.
    CallbackNotSet,

    /// The requested operation needs a subsystem that was compiled out
    /// (e.g. ACK tracking without the `ack-tracker` feature).
    FeatureDisabled,
}

impl core::fmt::Display for StreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StreamError::InvalidPacket => {
                write!(f, "packet does not contain the required TCP/IP layers")
            }
            StreamError::StreamNotFound => write!(f, "no stream matches the given identifier"),
            StreamError::CallbackNotSet => {
                write!(f, "a new stream appeared but no new-stream callback is set")
            }
            StreamError::FeatureDisabled => {
                write!(f, "the required subsystem was disabled at compile time")
            }
        }
    }
}

impl std::error::Error for StreamError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            "no stream matches the given identifier",
            format!("{}", StreamError::StreamNotFound)
        );
        assert_eq!(StreamError::InvalidPacket, StreamError::InvalidPacket.clone());
    }
}
