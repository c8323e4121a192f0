use crate::err::SerializeError;
use crate::*;

mod layer_kind;
pub use layer_kind::*;

mod raw_payload;
pub use raw_payload::*;

mod registry;
pub use registry::*;

mod dissect;
pub use dissect::*;

/// Generates the [`Layer`] enum plus the conversion & chaining impls of
/// every concrete layer struct.
macro_rules! layers {
    ($( $variant:ident ),* $(,)?) => {
        /// One protocol layer owning an optional inner layer.
        ///
        /// A `Layer` is either constructed from bytes (see [`dissect`])
        /// or assembled programmatically and chained with the `/`
        /// operator:
        ///
        /// ```
        /// use wirecraft::{Ethernet2, Ipv4, Udp, RawPayload, MacAddr};
        ///
        /// let frame = Ethernet2::new(MacAddr::BROADCAST, MacAddr::NIL)
        ///     / Ipv4::new([10,0,0,1].into(), [10,0,0,2].into(), 64)
        ///     / Udp::new(4000, 53)
        ///     / RawPayload::new(vec![1,2,3]);
        ///
        /// assert_eq!(frame.size(), frame.serialize().unwrap().len());
        /// ```
        #[derive(Clone, Debug, Eq, PartialEq)]
        pub enum Layer {
            $( $variant($variant), )*
            Raw(RawPayload),
        }

        $(
            impl From<$variant> for Layer {
                fn from(layer: $variant) -> Layer {
                    Layer::$variant(layer)
                }
            }

            impl<R: Into<Layer>> core::ops::Div<R> for $variant {
                type Output = Layer;

                /// Append `rhs` at the innermost end of the chain.
                fn div(self, rhs: R) -> Layer {
                    let mut layer: Layer = self.into();
                    layer.push_inner(rhs.into());
                    layer
                }
            }
        )*
    };
}

layers! {
    Ethernet2,
    Dot3,
    Llc,
    Snap,
    Loopback,
    LinuxSll,
    Ppi,
    RadioTap,
    Dot11Mgmt,
    Dot11Control,
    Dot11Data,
    Dot1Q,
    Mpls,
    Pppoe,
    Eapol,
    Arp,
    Ipv4,
    Ipv6,
    IpsecAh,
    IpsecEsp,
    Icmpv4,
    Icmpv6,
    Tcp,
    Udp,
    Dhcp,
    Dhcpv6,
}

impl From<RawPayload> for Layer {
    fn from(layer: RawPayload) -> Layer {
        Layer::Raw(layer)
    }
}

impl From<Vec<u8>> for Layer {
    fn from(data: Vec<u8>) -> Layer {
        Layer::Raw(RawPayload::new(data))
    }
}

impl<R: Into<Layer>> core::ops::Div<R> for RawPayload {
    type Output = Layer;

    fn div(self, rhs: R) -> Layer {
        let mut layer: Layer = self.into();
        layer.push_inner(rhs.into());
        layer
    }
}

impl<R: Into<Layer>> core::ops::Div<R> for Layer {
    type Output = Layer;

    /// Append `rhs` at the innermost end of the chain.
    fn div(mut self, rhs: R) -> Layer {
        self.push_inner(rhs.into());
        self
    }
}

/// Forwards a call to the struct contained in each enum variant.
macro_rules! for_each_layer {
    ($value:expr, $l:ident => $body:expr) => {
        match $value {
            Layer::Ethernet2($l) => $body,
            Layer::Dot3($l) => $body,
            Layer::Llc($l) => $body,
            Layer::Snap($l) => $body,
            Layer::Loopback($l) => $body,
            Layer::LinuxSll($l) => $body,
            Layer::Ppi($l) => $body,
            Layer::RadioTap($l) => $body,
            Layer::Dot11Mgmt($l) => $body,
            Layer::Dot11Control($l) => $body,
            Layer::Dot11Data($l) => $body,
            Layer::Dot1Q($l) => $body,
            Layer::Mpls($l) => $body,
            Layer::Pppoe($l) => $body,
            Layer::Eapol($l) => $body,
            Layer::Arp($l) => $body,
            Layer::Ipv4($l) => $body,
            Layer::Ipv6($l) => $body,
            Layer::IpsecAh($l) => $body,
            Layer::IpsecEsp($l) => $body,
            Layer::Icmpv4($l) => $body,
            Layer::Icmpv6($l) => $body,
            Layer::Tcp($l) => $body,
            Layer::Udp($l) => $body,
            Layer::Dhcp($l) => $body,
            Layer::Dhcpv6($l) => $body,
            Layer::Raw($l) => $body,
        }
    };
}

impl Layer {
    /// The protocol of this layer.
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Ethernet2(_) => LayerKind::Ethernet2,
            Layer::Dot3(_) => LayerKind::Dot3,
            Layer::Llc(_) => LayerKind::Llc,
            Layer::Snap(_) => LayerKind::Snap,
            Layer::Loopback(_) => LayerKind::Loopback,
            Layer::LinuxSll(_) => LayerKind::LinuxSll,
            Layer::Ppi(_) => LayerKind::Ppi,
            Layer::RadioTap(_) => LayerKind::RadioTap,
            Layer::Dot11Mgmt(_) => LayerKind::Dot11Mgmt,
            Layer::Dot11Control(_) => LayerKind::Dot11Control,
            Layer::Dot11Data(_) => LayerKind::Dot11Data,
            Layer::Dot1Q(_) => LayerKind::Dot1Q,
            Layer::Mpls(_) => LayerKind::Mpls,
            Layer::Pppoe(_) => LayerKind::Pppoe,
            Layer::Eapol(_) => LayerKind::Eapol,
            Layer::Arp(_) => LayerKind::Arp,
            Layer::Ipv4(_) => LayerKind::Ipv4,
            Layer::Ipv6(_) => LayerKind::Ipv6,
            Layer::IpsecAh(_) => LayerKind::IpsecAh,
            Layer::IpsecEsp(_) => LayerKind::IpsecEsp,
            Layer::Icmpv4(_) => LayerKind::Icmpv4,
            Layer::Icmpv6(_) => LayerKind::Icmpv6,
            Layer::Tcp(_) => LayerKind::Tcp,
            Layer::Udp(_) => LayerKind::Udp,
            Layer::Dhcp(_) => LayerKind::Dhcp,
            Layer::Dhcpv6(_) => LayerKind::Dhcpv6,
            Layer::Raw(_) => LayerKind::Raw,
        }
    }

    /// Number of bytes this layer contributes at the front of the frame.
    pub fn header_size(&self) -> usize {
        for_each_layer!(self, l => l.header_size())
    }

    /// Number of bytes this layer contributes at the back of the frame
    /// (0 for most layers).
    pub fn trailer_size(&self) -> usize {
        match self {
            Layer::Dot3(l) => l.trailer_size(),
            Layer::Arp(l) => l.trailer_size(),
            Layer::Dot1Q(l) => l.trailer_size(),
            Layer::Ipv4(l) => l.trailer_size(),
            Layer::Icmpv4(l) => l.trailer_size(),
            Layer::Icmpv6(l) => l.trailer_size(),
            Layer::Eapol(l) => l.trailer_size(),
            _ => 0,
        }
    }

    /// Total size of this layer including all inner layers and trailers.
    pub fn size(&self) -> usize {
        self.header_size() + self.inner().map_or(0, Layer::size) + self.trailer_size()
    }

    /// The layer enclosed by this one, if any.
    pub fn inner(&self) -> Option<&Layer> {
        for_each_layer!(self, l => l.inner.as_deref())
    }

    /// Mutable access to the enclosed layer.
    pub fn inner_mut(&mut self) -> Option<&mut Layer> {
        for_each_layer!(self, l => l.inner.as_deref_mut())
    }

    /// Replace the enclosed layer, taking ownership of `layer`.
    pub fn set_inner(&mut self, mut layer: Layer) {
        // only the outermost of consecutive 802.1Q tags appends the
        // minimum-frame trailer
        if let (Layer::Dot1Q(_), Layer::Dot1Q(inner_tag)) = (&*self, &mut layer) {
            inner_tag.append_padding = false;
        }
        for_each_layer!(self, l => l.inner = Some(Box::new(layer)))
    }

    /// Remove and return the enclosed layer.
    pub fn take_inner(&mut self) -> Option<Layer> {
        for_each_layer!(self, l => l.inner.take().map(|boxed| *boxed))
    }

    /// Append `layer` at the innermost end of the chain.
    pub fn push_inner(&mut self, layer: Layer) {
        match self.inner_mut() {
            Some(inner) => inner.push_inner(layer),
            None => self.set_inner(layer),
        }
    }

    /// True if this layer is of the given kind, also accepting the
    /// abstract family kinds (e.g. [`LayerKind::Dot11`] matches
    /// management, control and data frames).
    pub fn matches_kind(&self, kind: LayerKind) -> bool {
        let own = self.kind();
        own == kind
            || (kind == LayerKind::Dot11
                && matches!(
                    own,
                    LayerKind::Dot11Mgmt | LayerKind::Dot11Control | LayerKind::Dot11Data
                ))
    }

    /// Find the outermost layer of the given kind, starting at this one.
    pub fn find(&self, kind: LayerKind) -> Option<&Layer> {
        if self.matches_kind(kind) {
            Some(self)
        } else {
            self.inner()?.find(kind)
        }
    }

    /// Find the innermost layer of the given kind.
    pub fn rfind(&self, kind: LayerKind) -> Option<&Layer> {
        let deeper = self.inner().and_then(|inner| inner.rfind(kind));
        if deeper.is_some() {
            deeper
        } else if self.matches_kind(kind) {
            Some(self)
        } else {
            None
        }
    }

    /// Mutable variant of [`Layer::find`].
    pub fn find_mut(&mut self, kind: LayerKind) -> Option<&mut Layer> {
        if self.matches_kind(kind) {
            Some(self)
        } else {
            self.inner_mut()?.find_mut(kind)
        }
    }

    /// Serialize the whole chain into a freshly allocated buffer.
    ///
    /// Inner layers are written before outer headers, so every layer can
    /// derive dependent fields (lengths, next-protocol tags, checksums)
    /// from its already emitted payload and from its parent.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let mut buf = vec![0u8; self.size()];
        self.write_layer(&mut buf, None)?;
        Ok(buf)
    }

    /// Serialize the whole chain into the front of `buf` and return the
    /// number of bytes written.
    pub fn serialize_into(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        let size = self.size();
        if buf.len() < size {
            return Err(SerializeError::BufferTooSmall {
                layer: self.kind(),
                required: size,
                actual: buf.len(),
            });
        }
        self.write_layer(&mut buf[..size], None)?;
        Ok(size)
    }

    /// Write this layer into its exactly-sized region. The inner chain is
    /// written first, then the own header & trailer.
    fn write_layer(&self, buf: &mut [u8], parent: Option<&Layer>) -> Result<(), SerializeError> {
        let header_size = self.header_size();
        let trailer_size = self.trailer_size();
        if let Some(inner) = self.inner() {
            let inner_end = buf.len() - trailer_size;
            inner.write_layer(&mut buf[header_size..inner_end], Some(self))?;
        }
        for_each_layer!(self, l => l.write(buf, parent))
    }

    /// True if the given dissectable bytes look like a response to this
    /// layer chain (addresses and ports mirrored, matching identifiers).
    pub fn matches_response(&self, bytes: &[u8]) -> bool {
        match self {
            Layer::Ethernet2(l) => l.matches_response(bytes),
            Layer::Dot1Q(l) => l.matches_response(bytes),
            Layer::Arp(l) => l.matches_response(bytes),
            Layer::Ipv4(l) => l.matches_response(bytes),
            Layer::Ipv6(l) => l.matches_response(bytes),
            Layer::Tcp(l) => l.matches_response(bytes),
            Layer::Udp(l) => l.matches_response(bytes),
            Layer::Icmpv4(l) => l.matches_response(bytes),
            Layer::Raw(l) => l.matches_response(bytes),
            _ => false,
        }
    }

    /// Reference to the contained [`Ipv4`] layer if this layer is one.
    pub fn as_ipv4(&self) -> Option<&Ipv4> {
        match self {
            Layer::Ipv4(l) => Some(l),
            _ => None,
        }
    }

    /// Mutable reference to the contained [`Ipv4`] layer.
    pub fn as_ipv4_mut(&mut self) -> Option<&mut Ipv4> {
        match self {
            Layer::Ipv4(l) => Some(l),
            _ => None,
        }
    }

    /// Reference to the contained [`Ipv6`] layer if this layer is one.
    pub fn as_ipv6(&self) -> Option<&Ipv6> {
        match self {
            Layer::Ipv6(l) => Some(l),
            _ => None,
        }
    }

    /// Reference to the contained [`Tcp`] layer if this layer is one.
    pub fn as_tcp(&self) -> Option<&Tcp> {
        match self {
            Layer::Tcp(l) => Some(l),
            _ => None,
        }
    }

    /// Reference to the contained [`Ethernet2`] layer if this layer is one.
    pub fn as_ethernet2(&self) -> Option<&Ethernet2> {
        match self {
            Layer::Ethernet2(l) => Some(l),
            _ => None,
        }
    }

    /// Reference to the contained [`RawPayload`] if this layer is one.
    pub fn as_raw(&self) -> Option<&RawPayload> {
        match self {
            Layer::Raw(l) => Some(l),
            _ => None,
        }
    }
}
