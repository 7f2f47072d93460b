//! Escrow contract datum and redeemer.
//!
//! The datum is `Constr 0` with nine positional fields:
//! buyer, seller, identifier, result hash, submit-result time, unlock time,
//! refund time, refund-requested flag, refund-denied flag.

use cardano::{PlutusData, PlutusError};

const DATUM_ALTERNATIVE: u64 = 0;
const DATUM_ARITY: usize = 9;
/// Escrow validator branch that records a seller's result.
const SUBMIT_RESULT_REDEEMER: u64 = 5;

const FIELD_NAMES: [&str; DATUM_ARITY] = [
    "buyer",
    "seller",
    "identifier",
    "result_hash",
    "submit_result_time",
    "unlock_time",
    "refund_time",
    "refund_requested",
    "refund_denied",
];

#[derive(Debug, thiserror::Error)]
pub enum DatumError {
    #[error("escrow output carries no inline datum")]
    Missing,
    #[error(transparent)]
    Plutus(#[from] PlutusError),
    #[error("expected constructor 0 with 9 fields")]
    Shape,
    #[error("field {name} must be {expected}")]
    Field {
        name: &'static str,
        expected: &'static str,
    },
    #[error("field {name} does not fit in a 64-bit timestamp")]
    OutOfRange { name: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatumTiming {
    pub submit_result_time: i64,
    pub unlock_time: i64,
    pub refund_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowDatum {
    pub buyer: Vec<u8>,
    pub seller: Vec<u8>,
    pub identifier: Vec<u8>,
    pub result_hash: Vec<u8>,
    pub timing: DatumTiming,
    pub refund_requested: bool,
    pub refund_denied: bool,
}

/// Decodes the inline datum of an escrow output.
pub fn decode_datum(hex_cbor: Option<&str>) -> Result<EscrowDatum, DatumError> {
    let raw = hex_cbor
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(DatumError::Missing)?;
    EscrowDatum::from_plutus_data(&PlutusData::from_cbor_hex(raw)?)
}

pub fn submit_result_redeemer() -> PlutusData {
    PlutusData::constr(SUBMIT_RESULT_REDEEMER, Vec::new())
}

/// Hex strings become their bytes, anything else its UTF-8 encoding.
pub fn string_to_bytes(s: &str) -> Vec<u8> {
    if !s.is_empty() && s.len() % 2 == 0 {
        if let Ok(bytes) = hex::decode(s) {
            return bytes;
        }
    }
    s.as_bytes().to_vec()
}

impl EscrowDatum {
    pub fn timing(&self) -> DatumTiming {
        self.timing
    }

    /// Successor state after a result is submitted: the refund request is
    /// cleared and marked denied; every other field is carried forward.
    pub fn submit_result_successor(
        &self,
        buyer_vkey: Option<&str>,
        seller_vkey: &str,
        identifier: &str,
        result_hash: &str,
    ) -> EscrowDatum {
        EscrowDatum {
            buyer: buyer_vkey
                .map(string_to_bytes)
                .unwrap_or_else(|| self.buyer.clone()),
            seller: string_to_bytes(seller_vkey),
            identifier: string_to_bytes(identifier),
            result_hash: string_to_bytes(result_hash),
            timing: self.timing,
            refund_requested: false,
            refund_denied: true,
        }
    }

    pub fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            DATUM_ALTERNATIVE,
            vec![
                PlutusData::Bytes(self.buyer.clone()),
                PlutusData::Bytes(self.seller.clone()),
                PlutusData::Bytes(self.identifier.clone()),
                PlutusData::Bytes(self.result_hash.clone()),
                PlutusData::Int(i128::from(self.timing.submit_result_time)),
                PlutusData::Int(i128::from(self.timing.unlock_time)),
                PlutusData::Int(i128::from(self.timing.refund_time)),
                PlutusData::bool(self.refund_requested),
                PlutusData::bool(self.refund_denied),
            ],
        )
    }

    /// Hex CBOR with definite-length arrays. Byte strings over 64 bytes are chunked.
    pub fn encode(&self) -> Result<String, DatumError> {
        Ok(self.to_plutus_data().to_cbor_hex()?)
    }

    pub fn from_plutus_data(data: &PlutusData) -> Result<Self, DatumError> {
        let PlutusData::Constr {
            alternative: DATUM_ALTERNATIVE,
            fields,
        } = data
        else {
            return Err(DatumError::Shape);
        };
        let [
            buyer,
            seller,
            identifier,
            result_hash,
            submit_result_time,
            unlock_time,
            refund_time,
            refund_requested,
            refund_denied,
        ] = fields.as_slice()
        else {
            return Err(DatumError::Shape);
        };

        Ok(Self {
            buyer: bytes_field(buyer, 0)?,
            seller: bytes_field(seller, 1)?,
            identifier: bytes_field(identifier, 2)?,
            result_hash: bytes_field(result_hash, 3)?,
            timing: DatumTiming {
                submit_result_time: time_field(submit_result_time, 4)?,
                unlock_time: time_field(unlock_time, 5)?,
                refund_time: time_field(refund_time, 6)?,
            },
            refund_requested: bool_field(refund_requested, 7)?,
            refund_denied: bool_field(refund_denied, 8)?,
        })
    }
}

fn bytes_field(d: &PlutusData, idx: usize) -> Result<Vec<u8>, DatumError> {
    d.as_bytes().map(<[u8]>::to_vec).ok_or(DatumError::Field {
        name: FIELD_NAMES[idx],
        expected: "bytes",
    })
}

fn time_field(d: &PlutusData, idx: usize) -> Result<i64, DatumError> {
    let name = FIELD_NAMES[idx];
    let v = d.as_int().ok_or(DatumError::Field {
        name,
        expected: "an integer",
    })?;
    i64::try_from(v).map_err(|_| DatumError::OutOfRange { name })
}

fn bool_field(d: &PlutusData, idx: usize) -> Result<bool, DatumError> {
    d.as_bool().ok_or(DatumError::Field {
        name: FIELD_NAMES[idx],
        expected: "a boolean constructor",
    })
}
