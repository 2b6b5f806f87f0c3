use strum::{EnumIter, IntoStaticStr};

/// Closed enumeration of field types.
///
/// Every registered field carries exactly one of these, and every [`crate::Value`]
/// is tagged with the type it was parsed for. The capability predicates below
/// decide which relations a type may participate in; the semantic checker
/// consults them before any code is generated, so the evaluator can assume
/// every comparison it executes is well-typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FType {
    #[strum(serialize = "FT_NONE")]
    None,
    #[strum(serialize = "FT_PROTOCOL")]
    Protocol,
    #[strum(serialize = "FT_BOOLEAN")]
    Boolean,
    #[strum(serialize = "FT_CHAR")]
    Char,
    #[strum(serialize = "FT_UINT8")]
    Uint8,
    #[strum(serialize = "FT_UINT16")]
    Uint16,
    #[strum(serialize = "FT_UINT24")]
    Uint24,
    #[strum(serialize = "FT_UINT32")]
    Uint32,
    #[strum(serialize = "FT_UINT40")]
    Uint40,
    #[strum(serialize = "FT_UINT48")]
    Uint48,
    #[strum(serialize = "FT_UINT56")]
    Uint56,
    #[strum(serialize = "FT_UINT64")]
    Uint64,
    #[strum(serialize = "FT_INT8")]
    Int8,
    #[strum(serialize = "FT_INT16")]
    Int16,
    #[strum(serialize = "FT_INT24")]
    Int24,
    #[strum(serialize = "FT_INT32")]
    Int32,
    #[strum(serialize = "FT_INT40")]
    Int40,
    #[strum(serialize = "FT_INT48")]
    Int48,
    #[strum(serialize = "FT_INT56")]
    Int56,
    #[strum(serialize = "FT_INT64")]
    Int64,
    #[strum(serialize = "FT_FLOAT")]
    Float,
    #[strum(serialize = "FT_DOUBLE")]
    Double,
    #[strum(serialize = "FT_IEEE_11073_SFLOAT")]
    Ieee11073SFloat,
    #[strum(serialize = "FT_IEEE_11073_FLOAT")]
    Ieee11073Float,
    #[strum(serialize = "FT_ABSOLUTE_TIME")]
    AbsoluteTime,
    #[strum(serialize = "FT_RELATIVE_TIME")]
    RelativeTime,
    #[strum(serialize = "FT_IPv4")]
    Ipv4,
    #[strum(serialize = "FT_IPv6")]
    Ipv6,
    #[strum(serialize = "FT_IPXNET")]
    IpxNet,
    #[strum(serialize = "FT_ETHER")]
    Ether,
    #[strum(serialize = "FT_BYTES")]
    Bytes,
    #[strum(serialize = "FT_UINT_BYTES")]
    UintBytes,
    #[strum(serialize = "FT_GUID")]
    Guid,
    #[strum(serialize = "FT_OID")]
    Oid,
    #[strum(serialize = "FT_REL_OID")]
    RelOid,
    #[strum(serialize = "FT_AX25")]
    Ax25,
    #[strum(serialize = "FT_VINES")]
    Vines,
    #[strum(serialize = "FT_FCWWN")]
    FcWwn,
    #[strum(serialize = "FT_SYSTEM_ID")]
    SystemId,
    #[strum(serialize = "FT_EUI64")]
    Eui64,
    #[strum(serialize = "FT_FRAMENUM")]
    FrameNum,
    #[strum(serialize = "FT_STRING")]
    String,
    #[strum(serialize = "FT_STRINGZ")]
    Stringz,
    #[strum(serialize = "FT_UINT_STRING")]
    UintString,
    #[strum(serialize = "FT_STRINGZPAD")]
    StringzPad,
    #[strum(serialize = "FT_STRINGZTRUNC")]
    StringzTrunc,
}

impl FType {
    /// Registered name, e.g. `FT_UINT16`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Human-oriented name used in error messages.
    pub fn pretty_name(self) -> &'static str {
        match self {
            FType::None => "Label",
            FType::Protocol => "Protocol",
            FType::Boolean => "Boolean",
            FType::Char => "Character, 1 byte",
            FType::Uint8 => "Unsigned integer, 1 byte",
            FType::Uint16 => "Unsigned integer, 2 bytes",
            FType::Uint24 => "Unsigned integer, 3 bytes",
            FType::Uint32 => "Unsigned integer, 4 bytes",
            FType::Uint40 => "Unsigned integer, 5 bytes",
            FType::Uint48 => "Unsigned integer, 6 bytes",
            FType::Uint56 => "Unsigned integer, 7 bytes",
            FType::Uint64 => "Unsigned integer, 8 bytes",
            FType::Int8 => "Signed integer, 1 byte",
            FType::Int16 => "Signed integer, 2 bytes",
            FType::Int24 => "Signed integer, 3 bytes",
            FType::Int32 => "Signed integer, 4 bytes",
            FType::Int40 => "Signed integer, 5 bytes",
            FType::Int48 => "Signed integer, 6 bytes",
            FType::Int56 => "Signed integer, 7 bytes",
            FType::Int64 => "Signed integer, 8 bytes",
            FType::Float => "Floating point, single precision",
            FType::Double => "Floating point, double precision",
            FType::Ieee11073SFloat => "IEEE-11073 floating point, 16 bits",
            FType::Ieee11073Float => "IEEE-11073 floating point, 32 bits",
            FType::AbsoluteTime => "Date and time",
            FType::RelativeTime => "Time offset",
            FType::Ipv4 => "IPv4 address",
            FType::Ipv6 => "IPv6 address",
            FType::IpxNet => "IPX network number",
            FType::Ether => "Ethernet or other MAC address",
            FType::Bytes => "Sequence of bytes",
            FType::UintBytes => "Counted sequence of bytes",
            FType::Guid => "Globally Unique Identifier",
            FType::Oid => "ASN.1 object identifier",
            FType::RelOid => "ASN.1 relative object identifier",
            FType::Ax25 => "AX.25 address",
            FType::Vines => "VINES address",
            FType::FcWwn => "Fibre Channel WWN",
            FType::SystemId => "OSI System-ID",
            FType::Eui64 => "EUI64 address",
            FType::FrameNum => "Frame number",
            FType::String => "Character string",
            FType::Stringz => "Character string",
            FType::UintString => "Character string",
            FType::StringzPad => "Character string",
            FType::StringzTrunc => "Character string",
        }
    }

    /// True for the mutually comparable integer-like group: booleans, frame
    /// numbers, characters and integers up to 32 bits.
    pub fn is_integer_family(self) -> bool {
        matches!(
            self,
            FType::Boolean
                | FType::FrameNum
                | FType::Char
                | FType::Uint8
                | FType::Uint16
                | FType::Uint24
                | FType::Uint32
                | FType::Int8
                | FType::Int16
                | FType::Int24
                | FType::Int32
        )
    }

    /// True for the mutually comparable string group.
    pub fn is_string_family(self) -> bool {
        matches!(
            self,
            FType::String
                | FType::Stringz
                | FType::UintString
                | FType::StringzPad
                | FType::StringzTrunc
        )
    }

    /// True for the mutually comparable byte-sequence group.
    ///
    /// Note that IPv6 addresses are sliceable into bytes but are not part of
    /// this group; two fields compare as byte sequences only if both are in it.
    pub fn is_bytes_family(self) -> bool {
        matches!(
            self,
            FType::Ether
                | FType::Bytes
                | FType::UintBytes
                | FType::Guid
                | FType::Oid
                | FType::RelOid
                | FType::Ax25
                | FType::Vines
                | FType::FcWwn
                | FType::SystemId
        )
    }

    /// True for any integer representation, regardless of width.
    pub fn is_integral(self) -> bool {
        self.is_integer_family()
            || matches!(
                self,
                FType::Uint40
                    | FType::Uint48
                    | FType::Uint56
                    | FType::Uint64
                    | FType::Int40
                    | FType::Int48
                    | FType::Int56
                    | FType::Int64
            )
    }

    fn is_ordered(self) -> bool {
        !matches!(self, FType::None | FType::Protocol | FType::Boolean | FType::IpxNet)
    }

    pub fn can_eq(self) -> bool {
        !matches!(self, FType::None)
    }

    pub fn can_ne(self) -> bool {
        self.can_eq()
    }

    pub fn can_gt(self) -> bool {
        self.is_ordered()
    }

    pub fn can_ge(self) -> bool {
        self.is_ordered()
    }

    pub fn can_lt(self) -> bool {
        self.is_ordered()
    }

    pub fn can_le(self) -> bool {
        self.is_ordered()
    }

    pub fn can_bitwise_and(self) -> bool {
        (self.is_integral() && self != FType::Boolean && self != FType::FrameNum)
            || self.is_bytes_family()
            || matches!(self, FType::Ipv4 | FType::Ipv6 | FType::Eui64)
    }

    pub fn can_contains(self) -> bool {
        self.is_string_family()
            || self.is_bytes_family()
            || matches!(self, FType::Protocol | FType::Ipv4 | FType::Ipv6)
    }

    pub fn can_matches(self) -> bool {
        self.is_string_family() || self.is_bytes_family() || self == FType::Protocol
    }

    /// Whether values of this type expose a byte view that `[a:b]` slices
    /// apply to.
    pub fn can_slice(self) -> bool {
        self.is_string_family()
            || self.is_bytes_family()
            || matches!(self, FType::Protocol | FType::Ipv4 | FType::Ipv6)
    }
}
