//! Element codecs: how a logical element maps onto primitive storage.
//!
//! Every element type implements [`Codec`] and reports exactly one
//! [`Encoding`]. The encoding is a tagged union resolved once, when storage is
//! allocated, into the matching backing store:
//!
//! ```text
//! Encoding
//!   ├── F64 / F32 / I64 / I32 / I16 / Bool / BigInt / Str / Char / I8
//!   │     └── Packing<T, P>   (count primitives of type P per element)
//!   ├── Bits                  (w-bit field, packed into u64 words)
//!   └── Boxed                 (no primitive form, one arena slot per element)
//! ```
//!
//! Variants are listed in the factory's preference order.

use core::fmt;

use num_bigint::BigInt;
use num_complex::Complex;

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// The primitive slot types an [`Encoding`] can pack into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    F64,
    F32,
    I64,
    I32,
    I16,
    Bool,
    BigInt,
    Str,
    Char,
    I8,
}

impl PrimitiveKind {
    /// Short lowercase name, used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::I16 => "i16",
            Self::Bool => "bool",
            Self::BigInt => "bigint",
            Self::Str => "string",
            Self::Char => "char",
            Self::I8 => "i8",
        }
    }
}

/// A value that can occupy one slot of a primitive array store.
pub trait Primitive: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: PrimitiveKind;
}

/// A primitive with a fixed little-endian byte form, which makes it pageable.
pub trait FixedWidth: Primitive {
    /// Bytes per primitive on disk.
    const BYTES: usize;

    /// Write `self` into `out[..Self::BYTES]`.
    fn write_le(&self, out: &mut [u8]);

    /// Read a primitive back from `src[..Self::BYTES]`.
    fn read_le(src: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($ty:ty, $kind:ident) => {
        impl Primitive for $ty {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;
        }

        impl FixedWidth for $ty {
            const BYTES: usize = core::mem::size_of::<$ty>();

            #[inline]
            fn write_le(&self, out: &mut [u8]) {
                out[..Self::BYTES].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(src: &[u8]) -> Self {
                let mut raw = [0u8; core::mem::size_of::<$ty>()];
                raw.copy_from_slice(&src[..Self::BYTES]);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

impl_fixed_width!(f64, F64);
impl_fixed_width!(f32, F32);
impl_fixed_width!(i64, I64);
impl_fixed_width!(i32, I32);
impl_fixed_width!(i16, I16);
impl_fixed_width!(i8, I8);

impl Primitive for bool {
    const KIND: PrimitiveKind = PrimitiveKind::Bool;
}

impl FixedWidth for bool {
    const BYTES: usize = 1;

    #[inline]
    fn write_le(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    #[inline]
    fn read_le(src: &[u8]) -> Self {
        src[0] != 0
    }
}

impl Primitive for char {
    const KIND: PrimitiveKind = PrimitiveKind::Char;
}

impl FixedWidth for char {
    const BYTES: usize = 4;

    #[inline]
    fn write_le(&self, out: &mut [u8]) {
        out[..4].copy_from_slice(&u32::from(*self).to_le_bytes());
    }

    #[inline]
    fn read_le(src: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&src[..4]);
        char::from_u32(u32::from_le_bytes(raw)).unwrap_or_default()
    }
}

impl Primitive for BigInt {
    const KIND: PrimitiveKind = PrimitiveKind::BigInt;
}

impl Primitive for String {
    const KIND: PrimitiveKind = PrimitiveKind::Str;
}

// ---------------------------------------------------------------------------
// Packing routines
// ---------------------------------------------------------------------------

/// Marshalling routines for an element occupying `count` primitives of `P`.
pub struct Packing<T, P> {
    count: usize,
    encode: fn(&T, &mut [P]),
    decode: fn(&[P], &mut T),
}

impl<T, P> Packing<T, P> {
    /// `encode` writes exactly `count` primitives; `decode` reads them back.
    pub const fn new(count: usize, encode: fn(&T, &mut [P]), decode: fn(&[P], &mut T)) -> Self {
        Self {
            count,
            encode,
            decode,
        }
    }

    /// Primitives per element.
    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn encode(&self, value: &T, out: &mut [P]) {
        (self.encode)(value, out);
    }

    #[inline]
    pub fn decode(&self, src: &[P], out: &mut T) {
        (self.decode)(src, out);
    }
}

impl<T, P> Clone for Packing<T, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, P> Copy for Packing<T, P> {}

impl<T, P> fmt::Debug for Packing<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packing").field("count", &self.count).finish()
    }
}

/// Marshalling routines for an element stored as a `width`-bit field.
pub struct BitPacking<T> {
    width: u32,
    encode: fn(&T) -> u64,
    decode: fn(u64, &mut T),
}

impl<T> BitPacking<T> {
    /// `encode` must return a value below `2^width`.
    pub const fn new(width: u32, encode: fn(&T) -> u64, decode: fn(u64, &mut T)) -> Self {
        Self {
            width,
            encode,
            decode,
        }
    }

    /// Bits per element.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn encode(&self, value: &T) -> u64 {
        (self.encode)(value)
    }

    #[inline]
    pub fn decode(&self, bits: u64, out: &mut T) {
        (self.decode)(bits, out);
    }
}

impl<T> Clone for BitPacking<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BitPacking<T> {}

impl<T> fmt::Debug for BitPacking<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitPacking")
            .field("width", &self.width)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Encoding + Codec
// ---------------------------------------------------------------------------

/// The storage representation an element type prefers.
pub enum Encoding<T> {
    F64(Packing<T, f64>),
    F32(Packing<T, f32>),
    I64(Packing<T, i64>),
    I32(Packing<T, i32>),
    I16(Packing<T, i16>),
    Bool(Packing<T, bool>),
    /// Arbitrary-precision integers; decimal types ride this slot too.
    BigInt(Packing<T, BigInt>),
    Str(Packing<T, String>),
    Char(Packing<T, char>),
    I8(Packing<T, i8>),
    /// Sub-byte bit fields. The slowest representation.
    Bits(BitPacking<T>),
    /// No primitive form; elements are kept whole and copied in and out.
    Boxed,
}

impl<T> Encoding<T> {
    /// Short lowercase name, used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::F64(_) => PrimitiveKind::F64.name(),
            Self::F32(_) => PrimitiveKind::F32.name(),
            Self::I64(_) => PrimitiveKind::I64.name(),
            Self::I32(_) => PrimitiveKind::I32.name(),
            Self::I16(_) => PrimitiveKind::I16.name(),
            Self::Bool(_) => PrimitiveKind::Bool.name(),
            Self::BigInt(_) => PrimitiveKind::BigInt.name(),
            Self::Str(_) => PrimitiveKind::Str.name(),
            Self::Char(_) => PrimitiveKind::Char.name(),
            Self::I8(_) => PrimitiveKind::I8.name(),
            Self::Bits(_) => "bits",
            Self::Boxed => "boxed",
        }
    }

    /// Primitives per element, for the fixed-granularity encodings.
    pub const fn primitive_count(&self) -> Option<usize> {
        match self {
            Self::F64(p) => Some(p.count()),
            Self::F32(p) => Some(p.count()),
            Self::I64(p) => Some(p.count()),
            Self::I32(p) => Some(p.count()),
            Self::I16(p) => Some(p.count()),
            Self::Bool(p) => Some(p.count()),
            Self::BigInt(p) => Some(p.count()),
            Self::Str(p) => Some(p.count()),
            Self::Char(p) => Some(p.count()),
            Self::I8(p) => Some(p.count()),
            Self::Bits(_) | Self::Boxed => None,
        }
    }

    /// In-memory bits one element occupies in its store's slots.
    pub fn slot_bits(&self) -> usize {
        use core::mem::size_of;
        let bytes = match self {
            Self::F64(p) => p.count() * size_of::<f64>(),
            Self::F32(p) => p.count() * size_of::<f32>(),
            Self::I64(p) => p.count() * size_of::<i64>(),
            Self::I32(p) => p.count() * size_of::<i32>(),
            Self::I16(p) => p.count() * size_of::<i16>(),
            Self::Bool(p) => p.count() * size_of::<bool>(),
            Self::BigInt(p) => p.count() * size_of::<BigInt>(),
            Self::Str(p) => p.count() * size_of::<String>(),
            Self::Char(p) => p.count() * size_of::<char>(),
            Self::I8(p) => p.count() * size_of::<i8>(),
            Self::Bits(b) => return b.width() as usize,
            Self::Boxed => size_of::<T>(),
        };
        bytes * 8
    }
}

impl<T> Clone for Encoding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Encoding<T> {}

impl<T> fmt::Debug for Encoding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.primitive_count()) {
            (Self::Bits(b), _) => write!(f, "Encoding::Bits({})", b.width()),
            (_, Some(count)) => write!(f, "Encoding::{}x{count}", self.name()),
            (_, None) => write!(f, "Encoding::{}", self.name()),
        }
    }
}

/// Per-type marshalling contract consumed by the storage layer.
///
/// `Default` is the element's zero: freshly allocated storage reads back as
/// `T::default()` for every encoding.
pub trait Codec: Clone + Default + PartialEq + Send + Sync + 'static {
    /// The single preferred representation of this element type.
    fn encoding(&self) -> Encoding<Self>;
}

// ===========================================================================
// Stock codecs
// ===========================================================================

macro_rules! impl_codec_primitive {
    ($ty:ty, $variant:ident) => {
        impl Codec for $ty {
            #[inline]
            fn encoding(&self) -> Encoding<Self> {
                Encoding::$variant(Packing::new(
                    1,
                    |v, out| out[0].clone_from(v),
                    |src, v| v.clone_from(&src[0]),
                ))
            }
        }
    };
}

impl_codec_primitive!(f64, F64);
impl_codec_primitive!(f32, F32);
impl_codec_primitive!(i64, I64);
impl_codec_primitive!(i32, I32);
impl_codec_primitive!(i16, I16);
impl_codec_primitive!(bool, Bool);
impl_codec_primitive!(BigInt, BigInt);
impl_codec_primitive!(String, Str);
impl_codec_primitive!(char, Char);
impl_codec_primitive!(i8, I8);

// Unsigned integers reuse the signed slot of the same width, bit for bit.
macro_rules! impl_codec_unsigned {
    ($ty:ty, $signed:ty, $variant:ident) => {
        impl Codec for $ty {
            #[inline]
            #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
            fn encoding(&self) -> Encoding<Self> {
                Encoding::$variant(Packing::new(
                    1,
                    |v, out| out[0] = *v as $signed,
                    |src, v| *v = src[0] as $ty,
                ))
            }
        }
    };
}

impl_codec_unsigned!(u64, i64, I64);
impl_codec_unsigned!(u32, i32, I32);
impl_codec_unsigned!(u16, i16, I16);
impl_codec_unsigned!(u8, i8, I8);

macro_rules! impl_codec_complex {
    ($ty:ty, $variant:ident) => {
        impl Codec for Complex<$ty> {
            #[inline]
            fn encoding(&self) -> Encoding<Self> {
                Encoding::$variant(Packing::new(
                    2,
                    |v, out| {
                        out[0] = v.re;
                        out[1] = v.im;
                    },
                    |src, v| {
                        v.re = src[0];
                        v.im = src[1];
                    },
                ))
            }
        }
    };
}

impl_codec_complex!(f64, F64);
impl_codec_complex!(f32, F32);

/// An unsigned integer of `W` bits (`1 <= W < 8`), stored bit-packed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnsignedBits<const W: u32>(u8);

impl<const W: u32> UnsignedBits<W> {
    const VALID: () = assert!(W >= 1 && W < 8, "UnsignedBits width must be in 1..8");

    /// Largest representable value.
    pub const MAX: u8 = ((1u16 << W) - 1) as u8;

    /// Build a value, keeping only the low `W` bits.
    pub const fn new(v: u8) -> Self {
        let () = Self::VALID;
        Self(v & Self::MAX)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl<const W: u32> Codec for UnsignedBits<W> {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn encoding(&self) -> Encoding<Self> {
        Encoding::Bits(BitPacking::new(
            W,
            |v| u64::from(v.0),
            |bits, v| v.0 = (bits as u8) & Self::MAX,
        ))
    }
}

/// Arbitrary-precision decimal `mantissa * 10^-scale`.
///
/// Packs as two big-integer slots: the mantissa and the scale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decimal {
    pub mantissa: BigInt,
    pub scale: i32,
}

impl Decimal {
    pub fn new(mantissa: impl Into<BigInt>, scale: i32) -> Self {
        Self {
            mantissa: mantissa.into(),
            scale,
        }
    }
}

impl Codec for Decimal {
    fn encoding(&self) -> Encoding<Self> {
        Encoding::BigInt(Packing::new(
            2,
            |v, out| {
                out[0].clone_from(&v.mantissa);
                out[1] = BigInt::from(v.scale);
            },
            |src, v| {
                v.mantissa.clone_from(&src[0]);
                v.scale = i32::try_from(&src[1]).unwrap_or_default();
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_fixed<P: FixedWidth>(v: P) -> P {
        let mut buf = vec![0u8; P::BYTES];
        v.write_le(&mut buf);
        P::read_le(&buf)
    }

    #[test]
    fn test_fixed_width_bytes() {
        assert_eq!(roundtrip_fixed(-2.5_f64), -2.5);
        assert_eq!(roundtrip_fixed(i16::MIN), i16::MIN);
        assert!(roundtrip_fixed(true));
        assert_eq!(roundtrip_fixed('ß'), 'ß');
        assert_eq!(<char as FixedWidth>::read_le(&[0, 0, 0, 0]), '\0');
    }

    #[test]
    fn test_unsigned_reuses_signed_slot() {
        let Encoding::I8(p) = 200u8.encoding() else {
            panic!("u8 should pack into an i8 slot");
        };
        let mut slot = [0i8];
        p.encode(&200u8, &mut slot);
        let mut back = 0u8;
        p.decode(&slot, &mut back);
        assert_eq!(back, 200);
    }

    #[test]
    fn test_complex_packs_two_slots() {
        let z = Complex::new(1.5_f64, -3.0);
        let enc = z.encoding();
        assert_eq!(enc.primitive_count(), Some(2));
        let Encoding::F64(p) = enc else {
            panic!("complex f64 should pack into f64 slots");
        };
        let mut slots = [0.0; 2];
        p.encode(&z, &mut slots);
        assert_eq!(slots, [1.5, -3.0]);
    }

    #[test]
    fn test_unsigned_bits_masks() {
        let v = UnsignedBits::<3>::new(0b1111_1101);
        assert_eq!(v.value(), 0b101);
        assert_eq!(UnsignedBits::<3>::MAX, 7);
        let Encoding::Bits(b) = v.encoding() else {
            panic!("expected bit packing");
        };
        assert_eq!(b.width(), 3);
        assert_eq!(b.encode(&v), 5);
    }

    #[test]
    fn test_decimal_rides_bigint_slot() {
        let d = Decimal::new(-12345, 3);
        let Encoding::BigInt(p) = d.encoding() else {
            panic!("decimal should pack into bigint slots");
        };
        let mut slots = vec![BigInt::default(); p.count()];
        p.encode(&d, &mut slots);
        let mut back = Decimal::default();
        p.decode(&slots, &mut back);
        assert_eq!(back, d);
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(1.0_f32.encoding().name(), "f32");
        assert_eq!(String::new().encoding().name(), "string");
        assert_eq!(UnsignedBits::<1>::default().encoding().name(), "bits");
        assert_eq!(format!("{:?}", 0i32.encoding()), "Encoding::i32x1");
    }

    #[test]
    fn test_slot_bits() {
        assert_eq!(0.0_f64.encoding().slot_bits(), 64);
        assert_eq!(Complex::new(0.0_f32, 0.0).encoding().slot_bits(), 64);
        assert_eq!(0u8.encoding().slot_bits(), 8);
        assert_eq!(UnsignedBits::<3>::default().encoding().slot_bits(), 3);
    }
}
