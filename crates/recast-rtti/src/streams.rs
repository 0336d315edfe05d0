// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Byte buffers and serialization streams.
//!
//! `MemoryBuffer` keeps small payloads inline (SmallVec) so binary
//! serialization of scalar-sized values never touches the heap, and can
//! also be a borrowed view over external storage for zero-copy wrapping.
//! Binary streams are little-endian fixed-width; the string writer honors
//! a bitset of format options mirroring C-style stream manipulators.

use smallvec::SmallVec;
use std::fmt;

/// Inline capacity of owned memory buffers; payloads up to this size stay
/// on the stack of the frame owning the buffer.
pub const STACK_BUFFER_SIZE: usize = 512;

/// Errors raised by stream reads and unsupported stream dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Input ended before the value was complete.
    UnexpectedEof,
    /// Input bytes or text could not be parsed as the requested value.
    Malformed(String),
    /// The type does not support the requested stream kind.
    Unsupported(&'static str),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of stream"),
            Self::Malformed(msg) => write!(f, "malformed stream data: {}", msg),
            Self::Unsupported(what) => write!(f, "type does not support {}", what),
        }
    }
}

impl std::error::Error for StreamError {}

enum Storage {
    Owned(SmallVec<[u8; STACK_BUFFER_SIZE]>),
    /// Borrowed view over external storage. Validity is governed by the
    /// conversion engine's aliasing flags: a view is only read while the
    /// object it was taken from is alive.
    Borrowed {
        ptr: *const u8,
        len: usize,
    },
}

/// Byte buffer used as the unit of binary serialization.
pub struct MemoryBuffer {
    storage: Storage,
}

impl MemoryBuffer {
    /// New empty owned buffer.
    pub fn new() -> Self {
        Self {
            storage: Storage::Owned(SmallVec::new()),
        }
    }

    /// Owned buffer holding a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            storage: Storage::Owned(SmallVec::from_slice(data)),
        }
    }

    /// Borrowed zero-copy view over `data`. The view must not be read
    /// after the viewed storage is dropped or mutated; the conversion
    /// engine tracks this through its result-aliasing flags.
    pub fn view(data: &[u8]) -> Self {
        Self {
            storage: Storage::Borrowed {
                ptr: data.as_ptr(),
                len: data.len(),
            },
        }
    }

    /// Buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(data) => data,
            Storage::Borrowed { ptr, len } => unsafe { std::slice::from_raw_parts(*ptr, *len) },
        }
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Owned(data) => data.len(),
            Storage::Borrowed { len, .. } => *len,
        }
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Is this a borrowed view rather than owned storage?
    pub fn is_view(&self) -> bool {
        matches!(self.storage, Storage::Borrowed { .. })
    }

    /// Reset to empty owned storage (severing any view).
    pub fn clear(&mut self) {
        self.storage = Storage::Owned(SmallVec::new());
    }

    fn owned_mut(&mut self) -> &mut SmallVec<[u8; STACK_BUFFER_SIZE]> {
        if let Storage::Borrowed { .. } = self.storage {
            self.clear();
        }
        match &mut self.storage {
            Storage::Owned(data) => data,
            Storage::Borrowed { .. } => unreachable!(),
        }
    }
}

impl Default for MemoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryBuffer {
    /// Cloning always produces owned storage, severing any alias.
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl PartialEq for MemoryBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for MemoryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryBuffer({} bytes{})",
            self.len(),
            if self.is_view() { ", view" } else { "" }
        )
    }
}

// A borrowed view carries a raw pointer into storage the engine guarantees
// outlives the view (result-aliasing contract); the bytes are never
// mutated through the view.
unsafe impl Send for MemoryBuffer {}
unsafe impl Sync for MemoryBuffer {}

/// Little-endian binary writer over a [`MemoryBuffer`].
pub struct BinaryWriter<'a> {
    buffer: &'a mut MemoryBuffer,
}

impl<'a> BinaryWriter<'a> {
    /// Create a writer; the buffer is reset to empty owned storage.
    pub fn new(buffer: &'a mut MemoryBuffer) -> Self {
        buffer.clear();
        Self { buffer }
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.owned_mut().extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    /// Length-prefixed (u32) string.
    pub fn write_str(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.write_bytes(value.as_bytes());
    }
}

/// Little-endian binary reader over a byte slice.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Consume `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], StreamError> {
        if self.remaining() < count {
            return Err(StreamError::UnexpectedEof);
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        Ok(u16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        Ok(u32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, StreamError> {
        Ok(u64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_i8(&mut self) -> Result<i8, StreamError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, StreamError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, StreamError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, StreamError> {
        Ok(f32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64, StreamError> {
        Ok(f64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_u8()? != 0)
    }

    /// Length-prefixed (u32) string.
    pub fn read_str(&mut self) -> Result<String, StreamError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| StreamError::Malformed("invalid utf-8 in string".into()))
    }
}

/// Format option bits honored by [`StringWriter`].
pub mod format {
    pub const BOOL_ALPHA: u32 = 1 << 0;
    pub const SHOW_BASE: u32 = 1 << 1;
    pub const SHOW_POINT: u32 = 1 << 2;
    pub const SHOW_POS: u32 = 1 << 3;
    pub const UPPER_CASE: u32 = 1 << 4;
    pub const DEC: u32 = 1 << 5;
    pub const HEX: u32 = 1 << 6;
    pub const OCT: u32 = 1 << 7;
    pub const FIXED: u32 = 1 << 8;
    pub const SCIENTIFIC: u32 = 1 << 9;
}

/// Formatting sink for string serialization.
pub struct StringWriter {
    out: String,
    options: u32,
}

impl StringWriter {
    pub fn new() -> Self {
        Self::with_options(0)
    }

    pub fn with_options(options: u32) -> Self {
        Self {
            out: String::new(),
            options,
        }
    }

    /// Active format option bits.
    pub fn options(&self) -> u32 {
        self.options
    }

    fn has(&self, flag: u32) -> bool {
        self.options & flag != 0
    }

    /// Raw string append; no options applied.
    pub fn write_str(&mut self, value: &str) {
        self.out.push_str(value);
    }

    pub fn write_char(&mut self, value: char) {
        self.out.push(value);
    }

    pub fn write_unsigned(&mut self, value: u64) {
        let mut text = if self.has(format::HEX) {
            let digits = format!("{:x}", value);
            if self.has(format::SHOW_BASE) {
                format!("0x{}", digits)
            } else {
                digits
            }
        } else if self.has(format::OCT) {
            let digits = format!("{:o}", value);
            if self.has(format::SHOW_BASE) {
                format!("0{}", digits)
            } else {
                digits
            }
        } else {
            if self.has(format::SHOW_POS) {
                format!("+{}", value)
            } else {
                value.to_string()
            }
        };
        if self.has(format::UPPER_CASE) {
            text = text.to_uppercase();
        }
        self.out.push_str(&text);
    }

    pub fn write_signed(&mut self, value: i64) {
        if self.has(format::HEX) || self.has(format::OCT) {
            // Non-decimal radix prints the two's complement bit pattern.
            self.write_unsigned(value as u64);
        } else if value < 0 {
            self.out.push('-');
            let magnitude = value.unsigned_abs().to_string();
            self.out.push_str(&magnitude);
        } else {
            self.write_unsigned(value as u64);
        }
    }

    pub fn write_f64(&mut self, value: f64) {
        let mut text = if self.has(format::FIXED) {
            format!("{:.6}", value)
        } else if self.has(format::SCIENTIFIC) {
            format!("{:.6e}", value)
        } else {
            value.to_string()
        };
        if self.has(format::SHOW_POINT) && !text.contains('.') && !text.contains('e') {
            text.push_str(".0");
        }
        if self.has(format::SHOW_POS) && !text.starts_with('-') {
            text.insert(0, '+');
        }
        if self.has(format::UPPER_CASE) {
            text = text.to_uppercase();
        }
        self.out.push_str(&text);
    }

    pub fn write_f32(&mut self, value: f32) {
        // Format at f32 precision, then apply the shared option handling.
        let mut text = if self.has(format::FIXED) {
            format!("{:.6}", value)
        } else if self.has(format::SCIENTIFIC) {
            format!("{:.6e}", value)
        } else {
            value.to_string()
        };
        if self.has(format::SHOW_POINT) && !text.contains('.') && !text.contains('e') {
            text.push_str(".0");
        }
        if self.has(format::SHOW_POS) && !text.starts_with('-') {
            text.insert(0, '+');
        }
        if self.has(format::UPPER_CASE) {
            text = text.to_uppercase();
        }
        self.out.push_str(&text);
    }

    pub fn write_bool(&mut self, value: bool) {
        if self.has(format::BOOL_ALPHA) {
            let text = if value { "true" } else { "false" };
            if self.has(format::UPPER_CASE) {
                self.out.push_str(&text.to_uppercase());
            } else {
                self.out.push_str(text);
            }
        } else {
            self.write_unsigned(value as u64);
        }
    }

    /// Finish writing and take the formatted text.
    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for StringWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Token-based parsing source for string deserialization.
pub struct StringReader<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> StringReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Everything not yet consumed, consuming it.
    pub fn read_all(&mut self) -> &'a str {
        let rest = &self.input[self.position..];
        self.position = self.input.len();
        rest
    }

    /// Next whitespace-delimited token; empty input is an error.
    pub fn read_token(&mut self) -> Result<&'a str, StreamError> {
        let rest = &self.input[self.position..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            return Err(StreamError::UnexpectedEof);
        }
        let start = rest.len() - trimmed.len();
        let end = trimmed
            .find(|c: char| c.is_whitespace() || c == ',')
            .unwrap_or(trimmed.len());
        self.position += start + end;
        Ok(&trimmed[..end])
    }

    /// Parse the next token with `FromStr`.
    pub fn parse_token<T: std::str::FromStr>(&mut self) -> Result<T, StreamError> {
        let token = self.read_token()?;
        token
            .parse()
            .map_err(|_| StreamError::Malformed(format!("cannot parse {:?}", token)))
    }
}

/// Values that can pass through the binary streams.
pub trait BinarySerializable: Sized {
    fn encode(&self, writer: &mut BinaryWriter<'_>);
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError>;
}

/// Values that can pass through the string streams.
pub trait StringSerializable: Sized {
    fn format(&self, writer: &mut StringWriter);
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError>;
}

macro_rules! unsigned_serializable {
    ($($ty:ty => $write:ident / $read:ident);* $(;)?) => {$(
        impl BinarySerializable for $ty {
            fn encode(&self, writer: &mut BinaryWriter<'_>) {
                writer.$write(*self);
            }
            fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
                reader.$read()
            }
        }
        impl StringSerializable for $ty {
            fn format(&self, writer: &mut StringWriter) {
                writer.write_unsigned(*self as u64);
            }
            fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
                reader.parse_token()
            }
        }
    )*};
}

macro_rules! signed_serializable {
    ($($ty:ty => $write:ident / $read:ident);* $(;)?) => {$(
        impl BinarySerializable for $ty {
            fn encode(&self, writer: &mut BinaryWriter<'_>) {
                writer.$write(*self);
            }
            fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
                reader.$read()
            }
        }
        impl StringSerializable for $ty {
            fn format(&self, writer: &mut StringWriter) {
                writer.write_signed(*self as i64);
            }
            fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
                reader.parse_token()
            }
        }
    )*};
}

unsigned_serializable! {
    u8 => write_u8 / read_u8;
    u16 => write_u16 / read_u16;
    u32 => write_u32 / read_u32;
    u64 => write_u64 / read_u64;
}

signed_serializable! {
    i8 => write_i8 / read_i8;
    i16 => write_i16 / read_i16;
    i32 => write_i32 / read_i32;
    i64 => write_i64 / read_i64;
}

impl BinarySerializable for usize {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_u64(*self as u64);
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        Ok(reader.read_u64()? as usize)
    }
}

impl StringSerializable for usize {
    fn format(&self, writer: &mut StringWriter) {
        writer.write_unsigned(*self as u64);
    }
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
        reader.parse_token()
    }
}

impl BinarySerializable for f32 {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_f32(*self);
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        reader.read_f32()
    }
}

impl StringSerializable for f32 {
    fn format(&self, writer: &mut StringWriter) {
        writer.write_f32(*self);
    }
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
        reader.parse_token()
    }
}

impl BinarySerializable for f64 {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_f64(*self);
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        reader.read_f64()
    }
}

impl StringSerializable for f64 {
    fn format(&self, writer: &mut StringWriter) {
        writer.write_f64(*self);
    }
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
        reader.parse_token()
    }
}

impl BinarySerializable for bool {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_bool(*self);
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        reader.read_bool()
    }
}

impl StringSerializable for bool {
    fn format(&self, writer: &mut StringWriter) {
        writer.write_bool(*self);
    }
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
        match reader.read_token()? {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(StreamError::Malformed(format!("not a bool: {:?}", other))),
        }
    }
}

impl BinarySerializable for char {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_u32(*self as u32);
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        char::from_u32(reader.read_u32()?)
            .ok_or_else(|| StreamError::Malformed("invalid char scalar".into()))
    }
}

impl StringSerializable for char {
    fn format(&self, writer: &mut StringWriter) {
        writer.write_char(*self);
    }
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
        let token = reader.read_token()?;
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(StreamError::Malformed(format!("not a char: {:?}", token))),
        }
    }
}

impl BinarySerializable for String {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_str(self);
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        reader.read_str()
    }
}

impl StringSerializable for String {
    fn format(&self, writer: &mut StringWriter) {
        writer.write_str(self);
    }
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
        Ok(reader.read_all().to_string())
    }
}

impl BinarySerializable for MemoryBuffer {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        let data = self.as_slice();
        writer.write_u32(data.len() as u32);
        writer.write_bytes(data);
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        let len = reader.read_u32()? as usize;
        Ok(MemoryBuffer::from_slice(reader.read_bytes(len)?))
    }
}

impl<T: BinarySerializable> BinarySerializable for Vec<T> {
    fn encode(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_u32(self.len() as u32);
        for element in self {
            element.encode(writer);
        }
    }
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, StreamError> {
        let len = reader.read_u32()? as usize;
        let mut result = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            result.push(T::decode(reader)?);
        }
        Ok(result)
    }
}

impl<T: StringSerializable> StringSerializable for Vec<T> {
    fn format(&self, writer: &mut StringWriter) {
        writer.write_char('[');
        for (i, element) in self.iter().enumerate() {
            if i > 0 {
                writer.write_str(", ");
            }
            element.format(writer);
        }
        writer.write_char(']');
    }
    fn parse(reader: &mut StringReader<'_>) -> Result<Self, StreamError> {
        let text = reader.read_all().trim();
        let inner = text
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| StreamError::Malformed("list must be bracketed".into()))?;
        let mut result = Vec::new();
        if inner.trim().is_empty() {
            return Ok(result);
        }
        for part in inner.split(',') {
            let mut part_reader = StringReader::new(part.trim());
            result.push(T::parse(&mut part_reader)?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_roundtrip_scalars() {
        let mut buffer = MemoryBuffer::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_u32(0xDEAD_BEEF);
        writer.write_i16(-7);
        writer.write_f64(2.5);
        writer.write_str("hello");

        let mut reader = BinaryReader::new(buffer.as_slice());
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_i16().unwrap(), -7);
        assert_eq!(reader.read_f64().unwrap(), 2.5);
        assert_eq!(reader.read_str().unwrap(), "hello");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_binary_reader_eof() {
        let mut reader = BinaryReader::new(&[1, 2]);
        assert_eq!(reader.read_u32(), Err(StreamError::UnexpectedEof));
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buffer = MemoryBuffer::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_u32(42);
        assert_eq!(buffer.as_slice(), &[42, 0, 0, 0]);
    }

    #[test]
    fn test_buffer_view_and_clone_severs_alias() {
        let data = vec![1u8, 2, 3];
        let view = MemoryBuffer::view(&data);
        assert!(view.is_view());
        assert_eq!(view.as_slice(), &[1, 2, 3]);

        let cloned = view.clone();
        assert!(!cloned.is_view());
        assert_eq!(cloned, view);
    }

    #[test]
    fn test_format_hex() {
        let mut writer = StringWriter::with_options(format::HEX);
        writer.write_unsigned(255);
        assert_eq!(writer.finish(), "ff");
    }

    #[test]
    fn test_format_hex_showbase_uppercase() {
        let mut writer =
            StringWriter::with_options(format::HEX | format::SHOW_BASE | format::UPPER_CASE);
        writer.write_unsigned(255);
        assert_eq!(writer.finish(), "0XFF");
    }

    #[test]
    fn test_format_oct_and_showpos() {
        let mut writer = StringWriter::with_options(format::OCT);
        writer.write_unsigned(8);
        assert_eq!(writer.finish(), "10");

        let mut writer = StringWriter::with_options(format::SHOW_POS);
        writer.write_signed(3);
        assert_eq!(writer.finish(), "+3");
    }

    #[test]
    fn test_format_bool_alpha() {
        let mut writer = StringWriter::with_options(format::BOOL_ALPHA);
        writer.write_bool(true);
        assert_eq!(writer.finish(), "true");

        let mut writer = StringWriter::new();
        writer.write_bool(true);
        assert_eq!(writer.finish(), "1");
    }

    #[test]
    fn test_format_float_options() {
        let mut writer = StringWriter::with_options(format::FIXED);
        writer.write_f64(1.5);
        assert_eq!(writer.finish(), "1.500000");

        let mut writer = StringWriter::with_options(format::SHOW_POINT);
        writer.write_f64(3.0);
        assert_eq!(writer.finish(), "3.0");
    }

    #[test]
    fn test_string_reader_tokens() {
        let mut reader = StringReader::new("  42 hello");
        assert_eq!(reader.read_token().unwrap(), "42");
        assert_eq!(reader.read_token().unwrap(), "hello");
        assert!(reader.read_token().is_err());
    }

    #[test]
    fn test_vec_string_serialization() {
        let values = vec![1i32, 2, 3];
        let mut writer = StringWriter::new();
        values.format(&mut writer);
        let text = writer.finish();
        assert_eq!(text, "[1, 2, 3]");

        let mut reader = StringReader::new(&text);
        let parsed: Vec<i32> = Vec::parse(&mut reader).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_vec_binary_roundtrip() {
        let values = vec!["a".to_string(), "bc".to_string()];
        let mut buffer = MemoryBuffer::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        values.encode(&mut writer);

        let mut reader = BinaryReader::new(buffer.as_slice());
        let decoded: Vec<String> = Vec::decode(&mut reader).unwrap();
        assert_eq!(decoded, values);
    }
}
