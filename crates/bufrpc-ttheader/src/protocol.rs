use crate::error::TTHeaderError;

/// Transport protocol id carried in the header-info block (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProtocolId {
    ThriftBinary = 0x00,
    ThriftCompactV2 = 0x03,
    KitexProtobuf = 0x04,
    ThriftStruct = 0x10,
    ProtobufStruct = 0x11,
}

impl ProtocolId {
    pub fn from_u8(b: u8) -> Result<Self, TTHeaderError> {
        Ok(match b {
            0x00 => Self::ThriftBinary,
            0x03 => Self::ThriftCompactV2,
            0x04 => Self::KitexProtobuf,
            0x10 => Self::ThriftStruct,
            0x11 => Self::ProtobufStruct,
            other => return Err(TTHeaderError::UnsupportedProtocolId(other)),
        })
    }
}
