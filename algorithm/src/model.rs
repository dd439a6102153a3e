//! Trained model files.
//!
//! Layout of the decompressed stream, all integers little-endian:
//!
//! ```text
//! +----------+--------------+-------------------+-----+--------------------+
//! | name_len | name (utf-8) | transform state   | has | distance state     |
//! | u32      | name_len B   | stage-defined     | u8  | stage-defined, iff |
//! |          |              |                   |     | has == 1           |
//! +----------+--------------+-------------------+-----+--------------------+
//! ```
//!
//! The whole stream is zlib-compressed on disk. Stage state is opaque to
//! this module; stages use the `read_*`/`write_*` helpers below so their
//! encodings stay consistent.

use std::io::{Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::core::{AlgorithmCore, Stages};
use crate::engine::Engine;
use crate::error::{AlgorithmError, Result};
use crate::resolver;

fn model_err(what: &str, e: std::io::Error) -> AlgorithmError {
    AlgorithmError::Model(format!("{what}: {e}"))
}

pub fn write_u32(w: &mut dyn Write, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())
        .map_err(|e| model_err("write u32", e))
}

pub fn read_u32(r: &mut dyn Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|e| model_err("read u32", e))?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_bool(w: &mut dyn Write, v: bool) -> Result<()> {
    w.write_all(&[v as u8])
        .map_err(|e| model_err("write bool", e))
}

pub fn read_bool(r: &mut dyn Read) -> Result<bool> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)
        .map_err(|e| model_err("read bool", e))?;
    match buf[0] {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(AlgorithmError::Model(format!("invalid bool byte {b}"))),
    }
}

pub fn write_str(w: &mut dyn Write, s: &str) -> Result<()> {
    write_u32(w, s.len() as u32)?;
    w.write_all(s.as_bytes())
        .map_err(|e| model_err("write string", e))
}

pub fn read_str(r: &mut dyn Read) -> Result<String> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .map_err(|e| model_err("read string", e))?;
    String::from_utf8(buf).map_err(|e| AlgorithmError::Model(e.to_string()))
}

/// Writes a length-prefixed f32 vector.
pub fn write_f32s(w: &mut dyn Write, v: &[f32]) -> Result<()> {
    write_u32(w, v.len() as u32)?;
    for x in v {
        w.write_all(&x.to_le_bytes())
            .map_err(|e| model_err("write f32", e))?;
    }
    Ok(())
}

pub fn read_f32s(r: &mut dyn Read) -> Result<Vec<f32>> {
    let len = read_u32(r)? as usize;
    let mut out = Vec::with_capacity(len.min(1 << 20));
    let mut buf = [0u8; 4];
    for _ in 0..len {
        r.read_exact(&mut buf)
            .map_err(|e| model_err("read f32", e))?;
        out.push(f32::from_le_bytes(buf));
    }
    Ok(out)
}

/// Serializes `core` and writes it, compressed, to `path`.
pub fn store(core: &AlgorithmCore, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    write_str(&mut buf, core.name())?;
    core.transform().store(&mut buf)?;
    write_bool(&mut buf, core.distance().is_some())?;
    if let Some(d) = core.distance() {
        d.store(&mut buf)?;
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&buf)
        .map_err(|e| model_err("compress", e))?;
    let compressed = encoder.finish().map_err(|e| model_err("compress", e))?;
    std::fs::write(path, compressed)?;
    debug!(path = %path.display(), bytes = buf.len(), "stored model");
    Ok(())
}

/// Reads a model file, re-resolving its stages from the stored name and
/// restoring their state. Returns the stored name and the stages.
pub(crate) fn load(path: &Path, engine: &Engine) -> Result<(String, Stages)> {
    let compressed = std::fs::read(path)
        .map_err(|e| AlgorithmError::Model(format!("{}: {e}", path.display())))?;
    let mut data = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut data)
        .map_err(|e| model_err("decompress", e))?;
    let mut r: &[u8] = &data;

    let name = read_str(&mut r)?;
    let expanded = engine
        .config()
        .abbreviations
        .get(&name)
        .cloned()
        .unwrap_or_else(|| name.clone());
    debug!(path = %path.display(), %name, "loading model");

    let stages = resolver::resolve_expression(&expanded, engine)?;
    stages.transform.load(&mut r)?;
    if read_bool(&mut r)? {
        match &stages.distance {
            Some(d) => d.load(&mut r)?,
            None => {
                return Err(AlgorithmError::Model(format!(
                    "{name:?} stores a distance but resolves to a classifier"
                )));
            }
        }
    }
    Ok((name, stages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_round_trip() {
        let mut buf = Vec::new();
        write_str(&mut buf, "Center:L2").unwrap();
        write_bool(&mut buf, true).unwrap();
        write_f32s(&mut buf, &[1.5, -2.0]).unwrap();

        let mut r: &[u8] = &buf;
        assert_eq!(read_str(&mut r).unwrap(), "Center:L2");
        assert!(read_bool(&mut r).unwrap());
        assert_eq!(read_f32s(&mut r).unwrap(), vec![1.5, -2.0]);
        assert!(read_u32(&mut r).is_err());
    }

    #[test]
    fn invalid_bool_byte_is_model_error() {
        let mut r: &[u8] = &[7];
        assert!(matches!(read_bool(&mut r), Err(AlgorithmError::Model(_))));
    }

    #[test]
    fn garbage_file_is_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.model");
        std::fs::write(&path, b"not zlib").unwrap();
        let engine = Engine::new(crate::Config::default());
        assert!(matches!(load(&path, &engine), Err(AlgorithmError::Model(_))));
    }
}
