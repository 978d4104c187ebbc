//! Object identifier type.
//!
//! OIDs are short sequences of unsigned 32-bit arcs. They are stored inline
//! (no heap allocation up to [`INLINE_ARCS`] arcs) because the agent hot path
//! creates and compares one or more OIDs per varbind.

use smallvec::SmallVec;

use crate::error::{Error, OidErrorKind, Result};

/// Maximum number of arcs an OID may carry.
pub const MAX_OID_LEN: usize = 64;

/// Number of arcs stored inline before spilling to the heap.
pub const INLINE_ARCS: usize = 12;

/// An SNMP object identifier.
///
/// Ordering is lexicographic arc-by-arc; a strict prefix sorts before any
/// of its extensions. This is exactly the MIB ordering GETNEXT walks.
///
/// # Example
///
/// ```rust
/// use smithsnmp::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert!(oid!(1, 3, 6, 1, 2, 1, 1) < sys_descr);
/// assert!(sys_descr.starts_with(&oid!(1, 3, 6, 1, 2, 1)));
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Oid {
    arcs: SmallVec<[u32; INLINE_ARCS]>,
}

impl Oid {
    /// Create an empty OID (the root prefix).
    ///
    /// Empty OIDs never appear on the wire; they exist so the MIB tree root
    /// and instance suffixes have a uniform representation.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from a slice of arcs.
    ///
    /// # Panics
    ///
    /// Panics if the slice has more than [`MAX_OID_LEN`] arcs. Use
    /// [`Oid::try_from_arcs`] for untrusted input.
    pub fn from_slice(arcs: &[u32]) -> Self {
        assert!(
            arcs.len() <= MAX_OID_LEN,
            "OID has {} arcs, exceeds maximum {}",
            arcs.len(),
            MAX_OID_LEN
        );
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Create an OID from untrusted input, checking the arc-count bound.
    pub fn try_from_arcs(arcs: impl IntoIterator<Item = u32>) -> Result<Self> {
        let arcs: SmallVec<[u32; INLINE_ARCS]> = arcs.into_iter().collect();
        if arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                count: arcs.len(),
                max: MAX_OID_LEN,
            }));
        }
        Ok(Self { arcs })
    }

    /// The arcs as a slice.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Whether the OID has no arcs.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Whether `self` starts with `prefix` (prefix cover).
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.len() >= prefix.arcs.len() && self.arcs[..prefix.arcs.len()] == prefix.arcs[..]
    }

    /// The arcs after `prefix`, if `self` starts with it.
    pub fn strip_prefix(&self, prefix: &Oid) -> Option<&[u32]> {
        if self.starts_with(prefix) {
            Some(&self.arcs[prefix.arcs.len()..])
        } else {
            None
        }
    }

    /// A new OID of `self` extended by `suffix`.
    ///
    /// # Panics
    ///
    /// Panics if the result would exceed [`MAX_OID_LEN`] arcs.
    pub fn join(&self, suffix: &[u32]) -> Self {
        assert!(
            self.arcs.len() + suffix.len() <= MAX_OID_LEN,
            "joined OID exceeds maximum {} arcs",
            MAX_OID_LEN
        );
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(suffix);
        Self { arcs }
    }

    /// Append a single arc in place.
    pub fn push(&mut self, arc: u32) {
        assert!(self.arcs.len() < MAX_OID_LEN);
        self.arcs.push(arc);
    }

    /// BER content octets for this OID.
    ///
    /// The first two arcs pack into `40*a + b`; every later arc is base-128
    /// with the continuation bit set on all but the final octet. A root or
    /// single-arc OID encodes as if padded with zero arcs, which never occurs
    /// on the request/response path (wire OIDs always carry two or more arcs).
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 32]> {
        let mut out = SmallVec::new();
        let first = self.arcs.first().copied().unwrap_or(0);
        let second = self.arcs.get(1).copied().unwrap_or(0);
        push_base128(&mut out, first * 40 + second);
        for &arc in self.arcs.iter().skip(2) {
            push_base128(&mut out, arc);
        }
        out
    }
}

fn push_base128(out: &mut SmallVec<[u8; 32]>, value: u32) {
    if value == 0 {
        out.push(0);
        return;
    }
    let mut shift = (31 - value.leading_zeros()) / 7 * 7;
    while shift > 0 {
        out.push(0x80 | ((value >> shift) & 0x7F) as u8);
        shift -= 7;
    }
    out.push((value & 0x7F) as u8);
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Slice ordering is arc-wise with shorter-prefix-first, which is
        // exactly the lexicographic MIB order.
        self.arcs[..].cmp(&other.arcs[..])
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix('.').unwrap_or(s);
        if s.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }

        let mut arcs: SmallVec<[u32; INLINE_ARCS]> = SmallVec::new();
        for part in s.split('.') {
            let arc: u32 = part
                .parse()
                .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
            arcs.push(arc);
        }

        if arcs.len() < 2 {
            return Err(Error::invalid_oid_with_input(OidErrorKind::TooShort, s));
        }
        if arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid_with_input(
                OidErrorKind::TooManyArcs {
                    count: arcs.len(),
                    max: MAX_OID_LEN,
                },
                s,
            ));
        }
        if arcs[0] > 2 {
            return Err(Error::invalid_oid_with_input(
                OidErrorKind::InvalidFirstArc(arcs[0]),
                s,
            ));
        }
        if arcs[0] < 2 && arcs[1] >= 40 {
            return Err(Error::invalid_oid_with_input(
                OidErrorKind::InvalidSecondArc {
                    first: arcs[0],
                    second: arcs[1],
                },
                s,
            ));
        }

        Ok(Self { arcs })
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

/// Construct an [`Oid`] from arc literals.
///
/// ```rust
/// use smithsnmp::oid;
///
/// let uptime = oid!(1, 3, 6, 1, 2, 1, 1, 3, 0);
/// assert_eq!(uptime.len(), 9);
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),+ $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_ordering_prefix_is_lesser() {
        assert!(oid!(1, 3, 6, 1, 2) < oid!(1, 3, 6, 1, 2, 1));
        assert!(oid!(1, 3, 6, 1, 2, 1) < oid!(1, 3, 6, 1, 3));
        assert!(oid!(1, 3, 6, 1, 2, 1) == oid!(1, 3, 6, 1, 2, 1));
    }

    #[test]
    fn test_ordering_unsigned_arcs() {
        // Arcs compare as unsigned, so large arcs sort after small ones.
        assert!(oid!(1, 3, 6, 1, 2) < oid!(1, 3, 6, 1, 0x8000_0000));
    }

    #[test]
    fn test_starts_with() {
        let oid = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
        assert!(oid.starts_with(&oid!(1, 3, 6, 1)));
        assert!(oid.starts_with(&oid));
        assert!(!oid.starts_with(&oid!(1, 3, 6, 1, 4)));
        assert!(!oid!(1, 3).starts_with(&oid));
    }

    #[test]
    fn test_strip_prefix() {
        let oid = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 3);
        let prefix = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1);
        assert_eq!(oid.strip_prefix(&prefix), Some(&[3][..]));
        assert_eq!(oid.strip_prefix(&oid!(1, 4)), None);
    }

    #[test]
    fn test_join() {
        let prefix = oid!(1, 3, 6, 1, 2, 1, 1, 1);
        assert_eq!(prefix.join(&[0]), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        assert_eq!(prefix.join(&[]), prefix);
    }

    #[test]
    fn test_display_and_parse() {
        let oid: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");

        // Leading dot tolerated
        let oid: Oid = ".1.3.6.1".parse().unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("".parse::<Oid>().is_err());
        assert!("1".parse::<Oid>().is_err());
        assert!("3.1".parse::<Oid>().is_err());
        assert!("1.40".parse::<Oid>().is_err());
        assert!("2.40".parse::<Oid>().is_ok());
        assert!("1.3.x".parse::<Oid>().is_err());
    }

    #[test]
    fn test_try_from_arcs_bound() {
        assert!(Oid::try_from_arcs(0..=63).is_ok());
        assert!(Oid::try_from_arcs(0..=64).is_err());
    }

    #[test]
    fn test_ber_arc_packing() {
        // 1.3 packs to 0x2B; 8072 spans two base-128 octets
        let oid = oid!(1, 3, 6, 1, 4, 1, 8072);
        let ber = oid.to_ber_smallvec();
        assert_eq!(&ber[..], &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xBF, 0x08]);
    }

    #[test]
    fn test_ber_large_arc() {
        let oid = oid!(1, 3, 0xFFFF_FFFF);
        let ber = oid.to_ber_smallvec();
        assert_eq!(&ber[..], &[0x2B, 0x8F, 0xFF, 0xFF, 0xFF, 0x7F]);
    }
}
