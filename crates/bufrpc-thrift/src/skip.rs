use crate::binary::BinaryProtocol;
use crate::element::ElementType;
use crate::error::ThriftError;

/// Default recursion bound for [`skip`] (spec §4.3).
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// Tunable recursion bound for [`skip_with_config`].
#[derive(Debug, Clone, Copy)]
pub struct SkipConfig {
    pub max_depth: u32,
}

impl SkipConfig {
    #[must_use]
    pub const fn new(max_depth: u32) -> Self {
        assert!(max_depth > 0, "max_depth must be non-zero");
        Self { max_depth }
    }
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

fn need(buf_len: usize, needed: usize) -> Result<(), ThriftError> {
    if buf_len < needed {
        return Err(ThriftError::ShortBuffer { needed, available: buf_len });
    }
    Ok(())
}

/// Advances past one encoded value of type `ty` in `buf`, returning the
/// number of bytes consumed, without interpreting the value's contents.
pub fn skip(ty: ElementType, buf: &[u8]) -> Result<usize, ThriftError> {
    skip_depth(ty, buf, 0, DEFAULT_MAX_DEPTH)
}

/// As [`skip`], but with a caller-supplied recursion bound.
pub fn skip_with_config(ty: ElementType, buf: &[u8], config: SkipConfig) -> Result<usize, ThriftError> {
    skip_depth(ty, buf, 0, config.max_depth)
}

fn skip_depth(ty: ElementType, buf: &[u8], depth: u32, max_depth: u32) -> Result<usize, ThriftError> {
    if depth > max_depth {
        return Err(ThriftError::DepthLimit(max_depth));
    }

    let fixed = ty.fixed_size();
    if fixed > 0 {
        need(buf.len(), fixed)?;
        return Ok(fixed);
    }

    match ty {
        ElementType::Stop | ElementType::Void => Ok(0),

        ElementType::String => {
            let (len, prefix) = BinaryProtocol::read_length(buf)?;
            need(buf.len(), prefix + len)?;
            Ok(prefix + len)
        }

        ElementType::Map => {
            need(buf.len(), 6)?;
            let key_ty = ElementType::from_u8(buf[0]).ok_or_else(|| unknown_type(buf[0]))?;
            let val_ty = ElementType::from_u8(buf[1]).ok_or_else(|| unknown_type(buf[1]))?;
            let (count, _) = BinaryProtocol::read_i32(&buf[2..6])?;
            let count = nonneg(count)?;
            let mut n = 6;
            let ksz = key_ty.fixed_size();
            let vsz = val_ty.fixed_size();
            if ksz > 0 && vsz > 0 {
                let total = count * (ksz + vsz);
                need(buf.len(), n + total)?;
                n += total;
            } else {
                for _ in 0..count {
                    n += skip_depth(key_ty, &buf[n..], depth + 1, max_depth)?;
                    n += skip_depth(val_ty, &buf[n..], depth + 1, max_depth)?;
                }
            }
            Ok(n)
        }

        ElementType::List | ElementType::Set => {
            need(buf.len(), 5)?;
            let elem_ty = ElementType::from_u8(buf[0]).ok_or_else(|| unknown_type(buf[0]))?;
            let (count, _) = BinaryProtocol::read_i32(&buf[1..5])?;
            let count = nonneg(count)?;
            let mut n = 5;
            let esz = elem_ty.fixed_size();
            if esz > 0 {
                let total = count * esz;
                need(buf.len(), n + total)?;
                n += total;
            } else {
                for _ in 0..count {
                    n += skip_depth(elem_ty, &buf[n..], depth + 1, max_depth)?;
                }
            }
            Ok(n)
        }

        ElementType::Struct => {
            let mut n = 0;
            loop {
                need(buf.len(), n + 1)?;
                let field_ty_byte = buf[n];
                n += 1;
                if field_ty_byte == ElementType::Stop as u8 {
                    break;
                }
                let field_ty = ElementType::from_u8(field_ty_byte).ok_or_else(|| unknown_type(field_ty_byte))?;
                need(buf.len(), n + 2)?;
                n += 2; // field id
                n += skip_depth(field_ty, &buf[n..], depth + 1, max_depth)?;
            }
            Ok(n)
        }

        // fixed-size kinds are handled above.
        _ => unreachable!("fixed_size() covers all remaining variants"),
    }
}

fn unknown_type(b: u8) -> ThriftError {
    ThriftError::invalid_data(
        crate::error::InvalidDataCode::InvalidData,
        format!("unknown thrift type byte {b}"),
    )
}

fn nonneg(v: i32) -> Result<usize, ThriftError> {
    if v < 0 {
        return Err(ThriftError::invalid_data(
            crate::error::InvalidDataCode::NegativeSize,
            format!("negative count {v}"),
        ));
    }
    Ok(v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;

    #[test]
    fn skips_fixed_size_primitives() {
        let buf = [0u8; 8];
        assert_eq!(skip(ElementType::Bool, &buf).unwrap(), 1);
        assert_eq!(skip(ElementType::I16, &buf).unwrap(), 2);
        assert_eq!(skip(ElementType::I64, &buf).unwrap(), 8);
    }

    #[test]
    fn skips_string() {
        let mut buf = Vec::new();
        BinaryProtocol::append_string(&mut buf, "hello");
        assert_eq!(skip(ElementType::String, &buf).unwrap(), buf.len());
    }

    #[test]
    fn skips_struct_with_nested_list() {
        let mut buf = Vec::new();
        // field 1: list<i32>[1, 2]
        buf.push(ElementType::List as u8);
        BinaryProtocol::append_i16(&mut buf, 1);
        buf.push(ElementType::I32 as u8);
        BinaryProtocol::append_i32(&mut buf, 2);
        BinaryProtocol::append_i32(&mut buf, 1);
        BinaryProtocol::append_i32(&mut buf, 2);
        buf.push(ElementType::Stop as u8);
        assert_eq!(skip(ElementType::Struct, &buf).unwrap(), buf.len());
    }

    #[test]
    fn depth_limit_rejects_deeply_nested_struct() {
        // A struct field whose value is itself a struct, nested 100 deep,
        // each only ever containing a STOP, must hit the depth limit.
        let mut buf = Vec::new();
        for _ in 0..100 {
            buf.push(ElementType::Struct as u8);
            BinaryProtocol::append_i16(&mut buf, 1);
        }
        buf.push(ElementType::Stop as u8);
        for _ in 0..100 {
            buf.push(ElementType::Stop as u8);
        }
        assert!(matches!(skip(ElementType::Struct, &buf), Err(ThriftError::DepthLimit(_))));
    }

    #[test]
    fn skip_with_config_honors_tighter_depth_bound() {
        let mut buf = Vec::new();
        buf.push(ElementType::Struct as u8);
        BinaryProtocol::append_i16(&mut buf, 1);
        buf.push(ElementType::Stop as u8);
        buf.push(ElementType::Stop as u8);
        let tight = SkipConfig::new(1);
        assert!(matches!(
            skip_with_config(ElementType::Struct, &buf, tight),
            Err(ThriftError::DepthLimit(1))
        ));
    }
}
