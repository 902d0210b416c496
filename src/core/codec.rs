//! Purpose: Convert between build XML and Path of Building import codes.
//! Exports: `encode`, `encode_xml`, `decode`, `DecodedBuild`.
//! Role: zlib (level 9) + URL-safe base64 envelope around `xml::build_xml` output.
//! Invariants: `decode(&encode(b)?)` yields exactly `build_xml(b)` as raw text.
//! Invariants: Decode failures (base64, truncated/corrupt stream, UTF-8) are errors, never partial text.
//! Notes: Decode does not interpret the XML; callers receive `DecodedBuild::RawUnparsed`.
use std::io::Write;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::core::build::Build;
use crate::core::error::{Error, ErrorKind};
use crate::core::xml::build_xml;

const INFLATE_CHUNK: usize = 16 * 1024;

// Decodes with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodedBuild {
    /// Decompressed document text; structural parsing is not performed.
    RawUnparsed(String),
}

impl DecodedBuild {
    pub fn raw_xml(&self) -> &str {
        match self {
            DecodedBuild::RawUnparsed(xml) => xml,
        }
    }

    pub fn is_parsed(&self) -> bool {
        match self {
            DecodedBuild::RawUnparsed(_) => false,
        }
    }
}

pub fn encode(build: &Build) -> Result<String, Error> {
    encode_xml(&build_xml(build))
}

pub fn encode_xml(xml: &str) -> Result<String, Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(xml.as_bytes()).map_err(|err| {
        Error::new(ErrorKind::Encode)
            .with_message("failed to compress build xml")
            .with_source(err)
    })?;
    let compressed = encoder.finish().map_err(|err| {
        Error::new(ErrorKind::Encode)
            .with_message("failed to finish compressed stream")
            .with_source(err)
    })?;
    Ok(URL_SAFE.encode(compressed))
}

pub fn decode(code: &str) -> Result<DecodedBuild, Error> {
    let normalized: String = code
        .trim()
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let compressed = URL_SAFE_LENIENT.decode(normalized).map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("invalid base64 in import code")
            .with_source(err)
    })?;
    let bytes = inflate(&compressed)?;
    let xml = String::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("import code is not valid UTF-8")
            .with_source(err)
    })?;
    Ok(DecodedBuild::RawUnparsed(xml))
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>, Error> {
    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(compressed.len().saturating_mul(4).max(INFLATE_CHUNK));

    loop {
        if output.len() == output.capacity() {
            output.reserve(INFLATE_CHUNK);
        }
        let consumed_before = inflater.total_in();
        let produced_before = inflater.total_out();
        let remaining = &compressed[consumed_before as usize..];

        let status = inflater
            .decompress_vec(remaining, &mut output, FlushDecompress::None)
            .map_err(|err| {
                Error::new(ErrorKind::Decode)
                    .with_message("corrupt compressed stream")
                    .with_source(err)
            })?;
        if matches!(status, Status::StreamEnd) {
            return Ok(output);
        }

        let stalled = inflater.total_in() == consumed_before
            && inflater.total_out() == produced_before;
        let input_exhausted = inflater.total_in() as usize == compressed.len();
        if stalled || (input_exhausted && output.len() < output.capacity()) {
            return Err(Error::new(ErrorKind::Decode)
                .with_message("incomplete or truncated compressed stream"));
        }
    }
}
