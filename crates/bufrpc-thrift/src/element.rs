/// Thrift wire type tag (spec §3 "Element kinds").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl ElementType {
    pub fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::Stop,
            1 => Self::Void,
            2 => Self::Bool,
            3 => Self::Byte,
            4 => Self::Double,
            6 => Self::I16,
            8 => Self::I32,
            10 => Self::I64,
            11 => Self::String,
            12 => Self::Struct,
            13 => Self::Map,
            14 => Self::Set,
            15 => Self::List,
            _ => return None,
        })
    }

    /// On-wire size in bytes, or `0` if the type is variable-length.
    #[must_use]
    pub fn fixed_size(self) -> usize {
        match self {
            Self::Stop | Self::Void => 0,
            Self::Bool | Self::Byte => 1,
            Self::I16 => 2,
            Self::I32 => 4,
            Self::Double | Self::I64 => 8,
            Self::String | Self::Struct | Self::Map | Self::Set | Self::List => 0,
        }
    }
}

/// Thrift message kind carried in the message header (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    pub fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            1 => Self::Call,
            2 => Self::Reply,
            3 => Self::Exception,
            4 => Self::Oneway,
            _ => return None,
        })
    }
}

/// `0x8001` in the upper 16 bits of the message-begin word (spec §6).
pub const VERSION_1: u32 = 0x8001_0000;
pub const VERSION_MASK: u32 = 0xFFFF_0000;
