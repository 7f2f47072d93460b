//! Plutus data in its CBOR wire form.
//!
//! Only the closed set of shapes the ledger accepts is modelled. Anything else
//! (floats, text, simple values, non-constructor tags) is rejected at the decode boundary.

use ciborium::value::Value;

/// CBOR tag used for constructors whose alternative does not fit the compact ranges.
const GENERAL_CONSTR_TAG: u64 = 102;
const COMPACT_CONSTR_BASE: u64 = 121;
const EXTENDED_CONSTR_BASE: u64 = 1280;
const MAX_BYTES_CHUNK: usize = 64;

const MAJOR_UINT: u8 = 0;
const MAJOR_NEGINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlutusData {
    Constr {
        alternative: u64,
        fields: Vec<PlutusData>,
    },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Int(i128),
    Bytes(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum PlutusError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid cbor: {0}")]
    Cbor(String),
    #[error("trailing bytes after plutus data item")]
    TrailingBytes,
    #[error("unsupported cbor item in plutus data: {0}")]
    Unsupported(&'static str),
    #[error("unsupported cbor tag in plutus data: {0}")]
    UnsupportedTag(u64),
    #[error("integer out of range")]
    IntegerRange,
}

impl PlutusData {
    pub fn constr(alternative: u64, fields: Vec<PlutusData>) -> Self {
        Self::Constr {
            alternative,
            fields,
        }
    }

    /// Ledger booleans: `False` is `Constr 0 []`, `True` is `Constr 1 []`.
    pub fn bool(v: bool) -> Self {
        Self::constr(u64::from(v), Vec::new())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Constr {
                alternative: 0,
                fields,
            } if fields.is_empty() => Some(false),
            Self::Constr {
                alternative: 1,
                fields,
            } if fields.is_empty() => Some(true),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, PlutusError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    pub fn to_cbor_hex(&self) -> Result<String, PlutusError> {
        Ok(hex::encode(self.to_cbor()?))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, PlutusError> {
        let mut rest = bytes;
        let value: Value =
            ciborium::from_reader(&mut rest).map_err(|e| PlutusError::Cbor(e.to_string()))?;
        if !rest.is_empty() {
            return Err(PlutusError::TrailingBytes);
        }
        Self::from_value(value)
    }

    pub fn from_cbor_hex(s: &str) -> Result<Self, PlutusError> {
        let trimmed = s.trim();
        let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))?;
        Self::from_cbor(&bytes)
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), PlutusError> {
        match self {
            Self::Constr {
                alternative,
                fields,
            } => match compact_constr_tag(*alternative) {
                Some(tag) => {
                    write_head(out, MAJOR_TAG, tag);
                    encode_array(fields, out)?;
                }
                None => {
                    write_head(out, MAJOR_TAG, GENERAL_CONSTR_TAG);
                    write_head(out, MAJOR_ARRAY, 2);
                    write_head(out, MAJOR_UINT, *alternative);
                    encode_array(fields, out)?;
                }
            },
            Self::Map(entries) => {
                write_head(out, MAJOR_MAP, entries.len() as u64);
                for (k, v) in entries {
                    k.encode_into(out)?;
                    v.encode_into(out)?;
                }
            }
            Self::List(items) => encode_array(items, out)?,
            Self::Int(v) if *v >= 0 => {
                let n = u64::try_from(*v).map_err(|_| PlutusError::IntegerRange)?;
                write_head(out, MAJOR_UINT, n);
            }
            Self::Int(v) => {
                let n = u64::try_from(-1 - *v).map_err(|_| PlutusError::IntegerRange)?;
                write_head(out, MAJOR_NEGINT, n);
            }
            Self::Bytes(b) if b.len() <= MAX_BYTES_CHUNK => {
                write_head(out, MAJOR_BYTES, b.len() as u64);
                out.extend_from_slice(b);
            }
            // The ledger only accepts long byte strings as indefinite-length chunks.
            Self::Bytes(b) => {
                out.push((MAJOR_BYTES << 5) | INDEFINITE);
                for chunk in b.chunks(MAX_BYTES_CHUNK) {
                    write_head(out, MAJOR_BYTES, chunk.len() as u64);
                    out.extend_from_slice(chunk);
                }
                out.push(BREAK);
            }
        }
        Ok(())
    }

    fn from_value(value: Value) -> Result<Self, PlutusError> {
        match value {
            Value::Integer(i) => Ok(Self::Int(i128::from(i))),
            Value::Bytes(b) => Ok(Self::Bytes(b)),
            Value::Array(items) => Ok(Self::List(
                items
                    .into_iter()
                    .map(Self::from_value)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Value::Map(entries) => Ok(Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((Self::from_value(k)?, Self::from_value(v)?)))
                    .collect::<Result<Vec<_>, PlutusError>>()?,
            )),
            Value::Tag(tag, inner) => decode_constr(tag, *inner),
            Value::Text(_) => Err(PlutusError::Unsupported("text")),
            Value::Float(_) => Err(PlutusError::Unsupported("float")),
            Value::Bool(_) => Err(PlutusError::Unsupported("bool")),
            Value::Null => Err(PlutusError::Unsupported("null")),
            _ => Err(PlutusError::Unsupported("unknown")),
        }
    }
}

fn encode_array(items: &[PlutusData], out: &mut Vec<u8>) -> Result<(), PlutusError> {
    write_head(out, MAJOR_ARRAY, items.len() as u64);
    items.iter().try_for_each(|item| item.encode_into(out))
}

/// Writes a CBOR item head using the shortest argument encoding.
fn write_head(out: &mut Vec<u8>, major: u8, arg: u64) {
    let major = major << 5;
    match arg {
        0..=23 => out.push(major | arg as u8),
        24..=0xff => out.extend_from_slice(&[major | 24, arg as u8]),
        0x100..=0xffff => {
            out.push(major | 25);
            out.extend_from_slice(&(arg as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(major | 26);
            out.extend_from_slice(&(arg as u32).to_be_bytes());
        }
        _ => {
            out.push(major | 27);
            out.extend_from_slice(&arg.to_be_bytes());
        }
    }
}

fn compact_constr_tag(alternative: u64) -> Option<u64> {
    match alternative {
        0..=6 => Some(COMPACT_CONSTR_BASE + alternative),
        7..=127 => Some(EXTENDED_CONSTR_BASE + alternative - 7),
        _ => None,
    }
}

fn decode_constr(tag: u64, inner: Value) -> Result<PlutusData, PlutusError> {
    let alternative = match tag {
        121..=127 => tag - COMPACT_CONSTR_BASE,
        1280..=1400 => tag - EXTENDED_CONSTR_BASE + 7,
        GENERAL_CONSTR_TAG => {
            let Value::Array(mut parts) = inner else {
                return Err(PlutusError::Unsupported("general constructor without array"));
            };
            if parts.len() != 2 {
                return Err(PlutusError::Unsupported("general constructor arity"));
            }
            let fields = parts.pop().unwrap_or(Value::Null);
            let alt = match parts.pop() {
                Some(Value::Integer(i)) => {
                    u64::try_from(i128::from(i)).map_err(|_| PlutusError::IntegerRange)?
                }
                _ => return Err(PlutusError::Unsupported("general constructor alternative")),
            };
            return Ok(PlutusData::Constr {
                alternative: alt,
                fields: decode_fields(fields)?,
            });
        }
        other => return Err(PlutusError::UnsupportedTag(other)),
    };
    Ok(PlutusData::Constr {
        alternative,
        fields: decode_fields(inner)?,
    })
}

fn decode_fields(value: Value) -> Result<Vec<PlutusData>, PlutusError> {
    let Value::Array(items) = value else {
        return Err(PlutusError::Unsupported("constructor fields must be an array"));
    };
    items.into_iter().map(PlutusData::from_value).collect()
}
