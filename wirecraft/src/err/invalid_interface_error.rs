/// Error when a send operation is requested without a usable network
/// interface.
///
/// The send path itself is provided by collaborating crates; this kind is
/// part of the shared error surface so that the whole family of operations
/// reports failures uniformly.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct InvalidInterfaceError;

impl core::fmt::Display for InvalidInterfaceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "no valid network interface was specified")
    }
}

impl std::error::Error for InvalidInterfaceError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            "no valid network interface was specified",
            format!("{}", InvalidInterfaceError)
        );
    }
}
