use std::collections::{BTreeMap, HashMap};
use serde::Deserialize;
use de_read_msgpack::*;

mod common;
use common::*;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Reading<'a> {
    sensor: &'a str,
    values: Vec<f64>,
    flags: [bool; 3],
    at: Option<Timestamp>,
}

#[test]
fn decode_fixint() {
    assert_eq!(from_slice::<u8>(&[0x05]), Ok(5));
    assert_eq!(from_slice::<i64>(&[0x05]), Ok(5));
    assert_eq!(from_slice::<f32>(&[0x05]), Ok(5.0));
    assert_eq!(from_slice::<Value>(&[0x05]), Ok(Value::Int(5)));
}

#[test]
fn decode_small_map() {
    let input = encode(&str_map([("a", 1.into())]));
    assert_eq!(input, b"\x81\xA1a\x01");
    let map: HashMap<String, i32> = from_slice(&input).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map["a"], 1);
    let map: BTreeMap<&str, u8> = from_slice(&input).unwrap();
    assert_eq!(map, BTreeMap::from([("a", 1)]));
}

#[test]
fn decode_array() {
    let input = b"\x93\x01\x02\x03";
    assert_eq!(from_slice::<Vec<i32>>(input), Ok(vec![1, 2, 3]));
    assert_eq!(from_slice::<[u16; 3]>(input), Ok([1, 2, 3]));
    assert_eq!(from_slice::<[u16; 5]>(input), Ok([1, 2, 3, 0, 0]));
    assert_eq!(from_slice::<(u8, i8, f64)>(input), Ok((1, 2, 3.0)));
    assert_eq!(from_slice::<[u16; 2]>(input),
               Err(Error::CapacityExceeded { capacity: 2, len: 3 }));
    assert_eq!(from_slice::<(u8, u8)>(input),
               Err(Error::CapacityExceeded { capacity: 2, len: 3 }));
}

#[test]
fn decode_nil_option() {
    assert_eq!(from_slice::<Option<i32>>(b"\xC0"), Ok(None));
    let (value, tail) = from_slice_split_tail::<Option<i32>>(b"\xC0\x05").unwrap();
    assert_eq!(value, None);
    assert_eq!(tail, b"\x05");
    assert_eq!(from_slice::<Option<i32>>(b"\x05"), Ok(Some(5)));
}

#[test]
fn nil_is_zero() {
    assert_eq!(from_slice::<u32>(b"\xC0"), Ok(0));
    assert_eq!(from_slice::<f64>(b"\xC0"), Ok(0.0));
    assert_eq!(from_slice::<bool>(b"\xC0"), Ok(false));
    assert_eq!(from_slice::<&str>(b"\xC0"), Ok(""));
    assert_eq!(from_slice::<String>(b"\xC0"), Ok(String::new()));
    assert_eq!(from_slice::<Vec<u8>>(b"\xC0"), Ok(Vec::new()));
    assert_eq!(from_slice::<[i8; 4]>(b"\xC0"), Ok([0; 4]));
    assert_eq!(from_slice::<HashMap<String, u8>>(b"\xC0"), Ok(HashMap::new()));
    assert_eq!(from_slice::<Value>(b"\xC0"), Ok(Value::Nil));
    // nil elements inside containers
    assert_eq!(from_slice::<Vec<u8>>(b"\x93\x01\xC0\x03"), Ok(vec![1, 0, 3]));
    assert_eq!(from_slice::<Vec<Option<u8>>>(b"\x92\x01\xC0"), Ok(vec![Some(1), None]));
}

#[test]
fn decode_records() {
    let positional = encode(&Value::Array(vec![1.into(), (-2).into()]));
    assert_eq!(from_slice_positional::<Point>(&positional), Ok(Point { x: 1, y: -2 }));
    assert_eq!(from_slice::<Point>(&positional),
               Err(Error::InvalidCode { code: 0x92, expected: Expected::Map }));

    let named = encode(&str_map([("y", (-2).into()), ("x", 1.into())]));
    assert_eq!(from_slice::<Point>(&named), Ok(Point { x: 1, y: -2 }));
    assert_eq!(from_slice_positional::<Point>(&named),
               Err(Error::InvalidCode { code: 0x82, expected: Expected::Array }));

    assert_eq!(from_slice::<Point>(b"\xC0"),
               Err(Error::InvalidCode { code: 0xc0, expected: Expected::Map }));

    // surplus and missing positional fields
    assert_eq!(from_slice_positional::<Point>(b"\x93\x01\x02\x03"), Ok(Point { x: 1, y: 2 }));
    assert_eq!(from_slice_positional::<Point>(b"\x91\x01"), Ok(Point { x: 1, y: 0 }));
    assert_eq!(from_slice_positional::<Point>(b"\x90"), Ok(Point::default()));
    // unknown and absent named fields
    let named = encode(&str_map([("z", Value::Array(vec![1.into()])), ("x", 7.into())]));
    assert_eq!(from_slice::<Point>(&named), Ok(Point { x: 7, y: 0 }));
}

#[test]
fn decode_nested_record() {
    let message = str_map([
        ("sensor", "t1".into()),
        ("values", Value::Array(vec![1.5f64.into(), 2.into(), Value::Nil])),
        ("flags", Value::Array(vec![true.into()])),
    ]);
    let input = encode(&message);
    let reading: Reading = from_slice(&input).unwrap();
    assert_eq!(reading, Reading {
        sensor: "t1",
        values: vec![1.5, 2.0, 0.0],
        flags: [true, false, false],
        at: None
    });
    assert_eq!(from_slice::<Value>(&input), Ok(message));

    let mut input = Vec::new();
    write_array_len(&mut input, 4);
    write_str(&mut input, "t2");
    write_array_len(&mut input, 0);
    input.push(magick::NIL);
    input.extend_from_slice(b"\xD6\xFF\x00\x00\x00\x2A");
    let decoder = Decoder::new().positional().extension(TimestampDecoder);
    let reading: Reading = decoder.decode(&input).unwrap();
    assert_eq!(reading, Reading {
        sensor: "t2",
        values: vec![],
        flags: [false; 3],
        at: Some(Timestamp { secs: 42, nanos: 0 })
    });
    // without the registry the extension has no counterpart
    assert_eq!(from_slice_positional::<Reading>(&input),
               Err(Error::InvalidCode { code: 0xd6, expected: Expected::Array }));
}

#[test]
fn decode_exact_length() {
    assert_eq!(from_slice::<u8>(b"\x01\x02"), Err(Error::SizeMismatch { len: 2, consumed: 1 }));
    assert_eq!(from_slice::<u8>(b""), Err(Error::UnexpectedEof { offset: 0, needed: 1 }));
    assert_eq!(from_slice::<u16>(b"\xCD\x01"), Err(Error::UnexpectedEof { offset: 1, needed: 2 }));
    assert_eq!(from_slice::<&str>(b"\xA3ab"), Err(Error::UnexpectedEof { offset: 1, needed: 3 }));
}

#[test]
fn decode_checked_integers() {
    assert_eq!(from_slice::<u8>(b"\xCD\x01\x00"), Err(Error::InvalidInteger));
    assert_eq!(from_slice::<u32>(b"\xFF"), Err(Error::InvalidInteger));
    assert_eq!(from_slice::<i8>(b"\xCC\x80"), Err(Error::InvalidInteger));
    assert_eq!(from_slice::<i16>(b"\xCC\x80"), Ok(128));
    let mut input = Vec::new();
    write_u64(&mut input, u64::MAX);
    assert_eq!(from_slice::<u64>(&input), Ok(u64::MAX));
    assert_eq!(from_slice::<i64>(&input), Err(Error::InvalidInteger));
    assert_eq!(from_slice::<Value>(&input), Ok(Value::UInt(u64::MAX)));
}

#[test]
fn decode_depth_limit() {
    let mut input = vec![0x91; 10];
    input.push(0x90);
    let value: Value = from_slice(&input).unwrap();
    let mut expected = Value::Array(vec![]);
    for _ in 0..10 {
        expected = Value::Array(vec![expected]);
    }
    assert_eq!(value, expected);
    assert_eq!(Decoder::new().max_depth(11).decode::<Value>(&input), Ok(expected));
    assert_eq!(Decoder::new().max_depth(10).decode::<Value>(&input),
               Err(Error::DepthExceeded { max_depth: 10 }));
    let input = vec![0x91; 1000];
    assert_eq!(from_slice::<Value>(&input),
               Err(Error::DepthExceeded { max_depth: options::DEFAULT_MAX_DEPTH }));
}

#[test]
fn decode_into_destination() {
    let mut point = Point { x: 9, y: 9 };
    decode_into(b"\x92\x01\x02", &mut point, StructMode::Positional).unwrap();
    assert_eq!(point, Point { x: 1, y: 2 });
    decode_into(b"\x81\xA1y\x05", &mut point, StructMode::Named).unwrap();
    assert_eq!(point, Point { x: 0, y: 5 });
    // failures leave the destination alone
    assert!(decode_into(b"\x92\x01", &mut point, StructMode::Positional).is_err());
    assert!(decode_into(b"\x92\x01\x02\x03", &mut point, StructMode::Positional).is_err());
    assert_eq!(point, Point { x: 0, y: 5 });
}

#[test]
fn decode_unsupported_ext() {
    assert_eq!(from_slice::<Value>(b"\xD4\x01\x00"), Err(Error::UnsupportedExt { code: 0xd4 }));
    assert_eq!(from_slice::<Value>(b"\xC1"), Err(Error::ReservedCode));
    let decoder = Decoder::new().extension(TimestampDecoder);
    assert_eq!(decoder.decode::<Value>(b"\x92\xD6\xFF\x00\x00\x00\x01\xC0"),
               Ok(Value::Array(vec![Value::Array(vec![1.into(), 0.into()]), Value::Nil])));
}

#[test]
fn errors_display() {
    assert_eq!(Error::CapacityExceeded { capacity: 2, len: 3 }.to_string(),
               "Too many elements: capacity is 2, MessagePack has 3");
    assert_eq!(Error::UnexpectedEof { offset: 4, needed: 2 }.to_string(),
               "Unexpected end of MessagePack input: 2 byte(s) needed at offset 4");
}
