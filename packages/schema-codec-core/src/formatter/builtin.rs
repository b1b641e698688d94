use super::{FieldFormatter, FormatterRegistry};
use crate::error::{CodecError, Result};
use crate::wire::{WireReader, WireWriter};

// Fixed-width numbers are big-endian; variable-width payloads (string,
// bytes) take the whole frame, so they carry no inner length.

macro_rules! numeric_formatter {
    ($registry:expr, $type_id:literal, $ty:ty, $write:ident, $read:ident) => {
        $registry.register(FieldFormatter::typed::<$ty>(
            $type_id,
            |w: &mut WireWriter<'_>, v: &$ty| {
                w.$write(*v);
                Ok(())
            },
            |r: &mut WireReader<'_>, v: &mut $ty| {
                *v = r.$read()?;
                Ok(())
            },
        ))?
    };
}

/// Encodes bool as one byte (0=false, 1=true).
fn encode_bool(writer: &mut WireWriter<'_>, value: &bool) -> Result<()> {
    writer.write_u8(u8::from(*value));
    Ok(())
}

fn decode_bool(reader: &mut WireReader<'_>, value: &mut bool) -> Result<()> {
    *value = match reader.read_u8()? {
        0 => false,
        1 => true,
        other => {
            return Err(CodecError::InvalidData(format!(
                "bool byte must be 0 or 1, got {}",
                other
            )))
        }
    };
    Ok(())
}

/// Encodes a string as raw UTF-8; the frame length is the byte length.
fn encode_string(writer: &mut WireWriter<'_>, value: &String) -> Result<()> {
    writer.write_bytes(value.as_bytes());
    Ok(())
}

fn decode_string(reader: &mut WireReader<'_>, value: &mut String) -> Result<()> {
    let bytes = reader.read_to_end();
    let s = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::InvalidData(format!("string payload is not UTF-8: {}", e)))?;
    value.clear();
    value.push_str(s);
    Ok(())
}

fn encode_bytes(writer: &mut WireWriter<'_>, value: &Vec<u8>) -> Result<()> {
    writer.write_bytes(value);
    Ok(())
}

fn decode_bytes(reader: &mut WireReader<'_>, value: &mut Vec<u8>) -> Result<()> {
    value.clear();
    value.extend_from_slice(reader.read_to_end());
    Ok(())
}

/// Registers all builtin formatters in the registry.
///
/// # Returns
/// `Ok(())` if all formatters registered successfully.
pub fn register_builtin_formatters(registry: &FormatterRegistry) -> Result<()> {
    numeric_formatter!(registry, "u8", u8, write_u8, read_u8);
    numeric_formatter!(registry, "i8", i8, write_i8, read_i8);
    numeric_formatter!(registry, "u16", u16, write_u16, read_u16);
    numeric_formatter!(registry, "i16", i16, write_i16, read_i16);
    numeric_formatter!(registry, "u32", u32, write_u32, read_u32);
    numeric_formatter!(registry, "i32", i32, write_i32, read_i32);
    numeric_formatter!(registry, "u64", u64, write_u64, read_u64);
    numeric_formatter!(registry, "i64", i64, write_i64, read_i64);
    numeric_formatter!(registry, "f32", f32, write_f32, read_f32);
    numeric_formatter!(registry, "f64", f64, write_f64, read_f64);

    registry.register(FieldFormatter::typed::<bool>(
        "bool",
        encode_bool,
        decode_bool,
    ))?;
    registry.register(FieldFormatter::typed::<String>(
        "string",
        encode_string,
        decode_string,
    ))?;
    registry.register(FieldFormatter::typed::<Vec<u8>>(
        "bytes",
        encode_bytes,
        decode_bytes,
    ))?;

    Ok(())
}
