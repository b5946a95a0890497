use crate::error::DecodeError;
use std::path::Path;

/// Magic bytes at the start of a camera frame container
pub const FRAMES_MAGIC: &[u8; 4] = b"FRM1";

/// Frames of one camera stream for one segment
///
/// Frames are kept as opaque buffers; decoding pixels is left to whoever
/// consumes the frame sink.
#[derive(Debug, Clone, Default)]
pub struct FrameReader {
    pub width: u32,
    pub height: u32,
    frames: Vec<Vec<u8>>,
}

impl FrameReader {
    pub fn from_frames(width: u32, height: u32, frames: Vec<Vec<u8>>) -> Self {
        Self { width, height, frames }
    }

    /// Read a frame container: `FRM1 | width u32 | height u32 | (len u32 | bytes)*`
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let data = std::fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data)
    }

    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let body = data
            .strip_prefix(FRAMES_MAGIC.as_slice())
            .ok_or(DecodeError::BadMagic("frames"))?;
        let width = read_u32(body, 0).ok_or(DecodeError::BadMagic("frames"))?;
        let height = read_u32(body, 4).ok_or(DecodeError::BadMagic("frames"))?;

        let mut frames = Vec::new();
        let mut pos = 8;
        // A partial trailing frame is dropped
        while let Some(len) = read_u32(body, pos) {
            let start = pos + 4;
            let Some(frame) = body.get(start..start + len as usize) else { break };
            frames.push(frame.to_vec());
            pos = start + len as usize;
        }

        Ok(Self { width, height, frames })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = FRAMES_MAGIC.to_vec();
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        for frame in &self.frames {
            out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            out.extend_from_slice(frame);
        }
        out
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, offset: u32) -> Option<&[u8]> {
        self.frames.get(offset as usize).map(Vec::as_slice)
    }
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
