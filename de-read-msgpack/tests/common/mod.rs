//! A minimal MessagePack writer producing the smallest representation of
//! every value, used to feed the decoder in integration tests.
#![allow(dead_code)]
use de_read_msgpack::magick::*;
use de_read_msgpack::Value;

pub fn encode(value: &Value) -> Vec<u8> {
    let mut output = Vec::new();
    write_value(&mut output, value);
    output
}

pub fn write_value(output: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Nil => output.push(NIL),
        Value::Bool(false) => output.push(FALSE),
        Value::Bool(true) => output.push(TRUE),
        Value::Int(v) => write_i64(output, *v),
        Value::UInt(v) => write_u64(output, *v),
        Value::F32(v) => {
            output.push(FLOAT_32);
            output.extend_from_slice(&v.to_be_bytes());
        }
        Value::F64(v) => {
            output.push(FLOAT_64);
            output.extend_from_slice(&v.to_be_bytes());
        }
        Value::Str(s) => write_str(output, s),
        Value::Bin(b) => write_bin(output, b),
        Value::Array(items) => {
            write_array_len(output, items.len());
            for item in items {
                write_value(output, item);
            }
        }
        Value::Map(entries) => {
            write_map_len(output, entries.len());
            for (key, value) in entries {
                write_value(output, key);
                write_value(output, value);
            }
        }
    }
}

pub fn write_i64(output: &mut Vec<u8>, v: i64) {
    if FIXINT_I64.contains(&v) {
        output.push(v as u8);
    }
    else if let Ok(v) = i8::try_from(v) {
        output.push(INT_8);
        output.push(v as u8);
    }
    else if let Ok(v) = u8::try_from(v) {
        output.push(UINT_8);
        output.push(v);
    }
    else if let Ok(v) = i16::try_from(v) {
        output.push(INT_16);
        output.extend_from_slice(&v.to_be_bytes());
    }
    else if let Ok(v) = u16::try_from(v) {
        output.push(UINT_16);
        output.extend_from_slice(&v.to_be_bytes());
    }
    else if let Ok(v) = i32::try_from(v) {
        output.push(INT_32);
        output.extend_from_slice(&v.to_be_bytes());
    }
    else if let Ok(v) = u32::try_from(v) {
        output.push(UINT_32);
        output.extend_from_slice(&v.to_be_bytes());
    }
    else {
        output.push(INT_64);
        output.extend_from_slice(&v.to_be_bytes());
    }
}

pub fn write_u64(output: &mut Vec<u8>, v: u64) {
    match i64::try_from(v) {
        Ok(v) => write_i64(output, v),
        Err(_) => {
            output.push(UINT_64);
            output.extend_from_slice(&v.to_be_bytes());
        }
    }
}

pub fn write_str(output: &mut Vec<u8>, s: &str) {
    let len = s.len();
    if len <= MAX_FIXSTR_SIZE {
        output.push(FIXSTR | len as u8);
    }
    else if let Ok(len) = u8::try_from(len) {
        output.push(STR_8);
        output.push(len);
    }
    else if let Ok(len) = u16::try_from(len) {
        output.push(STR_16);
        output.extend_from_slice(&len.to_be_bytes());
    }
    else {
        output.push(STR_32);
        output.extend_from_slice(&(len as u32).to_be_bytes());
    }
    output.extend_from_slice(s.as_bytes());
}

pub fn write_bin(output: &mut Vec<u8>, b: &[u8]) {
    let len = b.len();
    if let Ok(len) = u8::try_from(len) {
        output.push(BIN_8);
        output.push(len);
    }
    else if let Ok(len) = u16::try_from(len) {
        output.push(BIN_16);
        output.extend_from_slice(&len.to_be_bytes());
    }
    else {
        output.push(BIN_32);
        output.extend_from_slice(&(len as u32).to_be_bytes());
    }
    output.extend_from_slice(b);
}

pub fn write_array_len(output: &mut Vec<u8>, len: usize) {
    if len <= MAX_FIXARRAY_SIZE {
        output.push(FIXARRAY | len as u8);
    }
    else if let Ok(len) = u16::try_from(len) {
        output.push(ARRAY_16);
        output.extend_from_slice(&len.to_be_bytes());
    }
    else {
        output.push(ARRAY_32);
        output.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

pub fn write_map_len(output: &mut Vec<u8>, len: usize) {
    if len <= MAX_FIXMAP_SIZE {
        output.push(FIXMAP | len as u8);
    }
    else if let Ok(len) = u16::try_from(len) {
        output.push(MAP_16);
        output.extend_from_slice(&len.to_be_bytes());
    }
    else {
        output.push(MAP_32);
        output.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

/// Build a map with string keys in the given order.
pub fn str_map<'a, I>(entries: I) -> Value
    where I: IntoIterator<Item=(&'a str, Value)>
{
    Value::Map(entries.into_iter().map(|(k, v)| (Value::from(k), v)).collect())
}
