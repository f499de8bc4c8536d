//! NumPy `.npy` encoding of one-dimensional identifier arrays.
//!
//! Unicode (`U`) and byte string (`S`) arrays read as-is, integer arrays
//! as decimal strings, and an empty array of any dtype (what
//! `np.array([])` saves) as no identifiers. Writing produces a
//! little-endian unicode array sized to the longest identifier, which is
//! what `np.save(path, np.array(ids))` produces for string ids.

use std::fmt::Display;
use std::io::{Read, Write};

use npyz::{DType, NpyFile, NpyHeader, Order, TypeChar, TypeStr, WriteOptions, WriterBuilder};

use crate::error::VectorError;

fn malformed(e: impl Display) -> VectorError {
    VectorError::Npy(e.to_string())
}

fn decimal<T, R>(npy: NpyFile<R>) -> Result<Vec<String>, VectorError>
where
    T: npyz::Deserialize + ToString,
    R: Read,
{
    let values = npy.into_vec::<T>().map_err(malformed)?;
    Ok(values.iter().map(ToString::to_string).collect())
}

/// Read a one-dimensional array of identifiers.
pub fn read_identifiers<R: Read>(mut reader: R) -> Result<Vec<String>, VectorError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut payload = bytes.as_slice();
    let header = NpyHeader::from_reader(&mut payload).map_err(malformed)?;

    let len = match header.shape() {
        [len] => *len,
        shape => return Err(malformed(format!("expected a 1-D array, got shape {:?}", shape))),
    };
    if header.order() == Order::Fortran {
        return Err(malformed("fortran order is not supported"));
    }

    let dtype = header.dtype();
    let type_str = match &dtype {
        DType::Plain(type_str) => type_str.clone(),
        other => return Err(malformed(format!("unsupported dtype {}", other.descr()))),
    };

    // Shape and dtype are untrusted until checked against the payload size
    let needed = type_str
        .num_bytes()
        .and_then(|item| usize::try_from(len).ok()?.checked_mul(item));
    match needed {
        Some(needed) if needed <= payload.len() => {}
        _ => {
            return Err(malformed(format!(
                "{} items of '{}' do not fit in {} payload bytes",
                len,
                type_str,
                payload.len()
            )))
        }
    }

    let npy = NpyFile::with_header(header, payload);
    match (type_str.type_char(), type_str.size_field()) {
        (TypeChar::UnicodeStr | TypeChar::ByteStr, _) => {
            npy.into_vec::<String>().map_err(malformed)
        }
        (TypeChar::Int, 1) => decimal::<i8, _>(npy),
        (TypeChar::Int, 2) => decimal::<i16, _>(npy),
        (TypeChar::Int, 4) => decimal::<i32, _>(npy),
        (TypeChar::Int, 8) => decimal::<i64, _>(npy),
        (TypeChar::Uint, 1) => decimal::<u8, _>(npy),
        (TypeChar::Uint, 2) => decimal::<u16, _>(npy),
        (TypeChar::Uint, 4) => decimal::<u32, _>(npy),
        (TypeChar::Uint, 8) => decimal::<u64, _>(npy),
        _ if len == 0 => Ok(Vec::new()),
        _ => Err(malformed(format!("unsupported dtype '{}'", type_str))),
    }
}

/// Write identifiers as a `<U{n}` array.
pub fn write_identifiers<W, S>(writer: W, ids: &[S]) -> Result<(), VectorError>
where
    W: Write,
    S: AsRef<str>,
{
    let width = ids
        .iter()
        .map(|id| id.as_ref().chars().count())
        .max()
        .unwrap_or(0)
        .max(1);
    let type_str: TypeStr = format!("<U{}", width).parse().map_err(malformed)?;

    let mut npy = WriteOptions::<str>::new()
        .dtype(DType::Plain(type_str))
        .shape(&[ids.len() as u64])
        .writer(writer)
        .begin_nd()?;
    for id in ids {
        npy.push(id.as_ref())?;
    }
    npy.finish()?;
    Ok(())
}
