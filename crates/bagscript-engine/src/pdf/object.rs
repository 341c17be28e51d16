use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::{serialize_dict, Dict, Name, ObjectNumber, PdfValue, PdfWriter};
use crate::error::{EngineError, Result};

/// An indirect object built by hand and written with [`PdfObject::save`].
///
/// Depending on its fields the object is written as a stream (data present
/// or `force_stream`), as raw bytes (`raw`), as an array, or as a plain
/// dictionary.
#[derive(Debug, Clone)]
pub struct PdfObject {
    pub number: ObjectNumber,
    pub dictionary: Dict,
    pub array: Vec<PdfValue>,
    pub data: Vec<u8>,
    pub force_stream: bool,
    pub raw: bool,
    compress_level: u32,
    saved: bool,
}

impl PdfObject {
    pub fn new(number: ObjectNumber) -> Self {
        PdfObject {
            number,
            dictionary: Dict::new(),
            array: Vec::new(),
            data: Vec::new(),
            force_stream: false,
            raw: false,
            compress_level: 0,
            saved: false,
        }
    }

    /// Set the zlib level used for stream data, 0 disables compression
    pub fn set_compression(&mut self, level: u32) {
        self.compress_level = level.min(9);
    }

    pub fn compression(&self) -> u32 {
        self.compress_level
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Serialize the object body, without `obj`/`endobj`
    fn body(&self) -> Result<Vec<u8>> {
        if self.raw {
            return Ok(self.data.clone());
        }
        if !self.data.is_empty() || self.force_stream {
            let mut dict = self.dictionary.clone();
            let payload = if self.compress_level > 0 {
                let mut encoder =
                    ZlibEncoder::new(Vec::new(), Compression::new(self.compress_level));
                encoder
                    .write_all(&self.data)
                    .map_err(|e| EngineError::Pdf(e.to_string()))?;
                dict.insert(Name::new("Filter"), PdfValue::Name(Name::new("FlateDecode")));
                encoder.finish().map_err(|e| EngineError::Pdf(e.to_string()))?
            } else {
                self.data.clone()
            };
            dict.insert(Name::new("Length"), PdfValue::Int(payload.len() as i64));
            let mut out = serialize_dict(&dict).into_bytes();
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&payload);
            out.extend_from_slice(b"\nendstream");
            return Ok(out);
        }
        if !self.array.is_empty() {
            return Ok(PdfValue::Array(self.array.clone()).to_string().into_bytes());
        }
        Ok(serialize_dict(&self.dictionary).into_bytes())
    }

    /// Write the object into the writer. An object can be saved once.
    pub fn save(&mut self, writer: &mut PdfWriter) -> Result<()> {
        if self.saved {
            return Err(EngineError::Pdf(format!(
                "object {} already saved",
                self.number
            )));
        }
        let body = self.body()?;
        writer.write_object(self.number, &body)?;
        self.saved = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(obj: &mut PdfObject) -> String {
        let mut writer = PdfWriter::in_memory();
        obj.number = writer.next_object_number();
        obj.save(&mut writer).unwrap();
        String::from_utf8_lossy(writer.bytes()).into_owned()
    }

    #[test]
    fn test_save_dictionary() {
        let mut obj = PdfObject::new(ObjectNumber(0));
        obj.dictionary
            .insert("Type".into(), PdfValue::Name("Example".into()));
        let out = written(&mut obj);
        assert!(out.contains("obj\n<<\n/Type /Example\n>>\nendobj"));
    }

    #[test]
    fn test_save_stream_uncompressed() {
        let mut obj = PdfObject::new(ObjectNumber(0));
        obj.data = b"BT ET".to_vec();
        let out = written(&mut obj);
        assert!(out.contains("/Length 5"));
        assert!(out.contains("stream\nBT ET\nendstream"));
        assert!(!out.contains("FlateDecode"));
    }

    #[test]
    fn test_save_stream_compressed() {
        let mut obj = PdfObject::new(ObjectNumber(0));
        obj.data = vec![b'x'; 200];
        obj.set_compression(9);
        let out = written(&mut obj);
        assert!(out.contains("/Filter /FlateDecode"));
    }

    #[test]
    fn test_save_twice_fails() {
        let mut writer = PdfWriter::in_memory();
        let mut obj = writer.new_object();
        obj.save(&mut writer).unwrap();
        assert!(obj.save(&mut writer).is_err());
    }
}
