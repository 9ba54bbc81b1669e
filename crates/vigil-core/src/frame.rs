//! Frame source seam
//!
//! The capture layer is an external collaborator; the core only ever
//! asks for the next frame. Frames are packed RGB24.

use std::path::Path;
use vigil_util::{VigilError, VigilResult};

/// A single fixed-size color frame (packed RGB, 3 bytes per pixel)
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> VigilResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(VigilError::device(format!(
                "frame size mismatch: got {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Encode as JPEG at the given path
    pub fn save_jpeg(&self, path: &Path) -> VigilResult<()> {
        let img = image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| VigilError::internal("frame buffer did not match dimensions"))?;
        img.save(path)
            .map_err(|e| VigilError::internal(format!("failed to write frame: {e}")))
    }
}

/// A lazy, infinite, non-restartable sequence of frames.
///
/// `read_frame` blocks until the next frame is available and may fail;
/// the detection loop decides whether a failure is transient.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> VigilResult<Frame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_buffer_size() {
        assert!(Frame::new(10, 10, vec![0; 300]).is_ok());
        let result = Frame::new(10, 10, vec![0; 299]);
        assert!(matches!(result, Err(VigilError::DeviceFailure(_))));
    }

    #[test]
    fn frame_saves_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");

        let frame = Frame::new(16, 16, vec![128; 16 * 16 * 3]).unwrap();
        frame.save_jpeg(&path).unwrap();

        assert!(path.metadata().unwrap().len() > 0);
    }
}
