//! External capture-command frame source
//!
//! Frames come from a long-running child process writing packed RGB24 to
//! stdout (typically ffmpeg against a v4l2 device). `read_frame` runs on
//! the blocking detection worker, so plain `std::process` and blocking
//! reads are the right tools here.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use vigil_core::{Frame, FrameSource};
use vigil_util::{VigilError, VigilResult};

pub struct CaptureSource {
    child: Child,
    width: u32,
    height: u32,
}

impl CaptureSource {
    /// Spawn the capture command. The first element is the program, the
    /// rest its arguments; the process must write raw RGB24 frames of
    /// exactly `width` x `height` to stdout until killed.
    pub fn spawn(command: &[String], width: u32, height: u32) -> VigilResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| VigilError::device("no capture command configured"))?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VigilError::device(format!("failed to spawn '{program}': {e}")))?;

        Ok(Self {
            child,
            width,
            height,
        })
    }
}

impl FrameSource for CaptureSource {
    fn read_frame(&mut self) -> VigilResult<Frame> {
        let stdout = self
            .child
            .stdout
            .as_mut()
            .ok_or_else(|| VigilError::device("capture process has no stdout"))?;

        let mut data = vec![0u8; self.width as usize * self.height as usize * 3];
        stdout
            .read_exact(&mut data)
            .map_err(|e| VigilError::device(format!("capture read failed: {e}")))?;

        Frame::new(self.width, self.height, data)
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_fixed_size_frames_from_child_stdout() {
        // Emits exactly two 4x4 RGB frames (96 bytes) then exits
        let mut source = CaptureSource::spawn(
            &cmd(&["sh", "-c", "head -c 96 /dev/zero"]),
            4,
            4,
        )
        .unwrap();

        let frame = source.read_frame().unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 4);
        assert!(frame.data().iter().all(|&b| b == 0));

        let frame = source.read_frame().unwrap();
        assert_eq!(frame.data().len(), 48);

        // Stream exhausted: the source reports a device failure
        let result = source.read_frame();
        assert!(matches!(result, Err(VigilError::DeviceFailure(_))));
    }

    #[test]
    fn missing_program_is_a_device_failure() {
        let result = CaptureSource::spawn(&cmd(&["/nonexistent/capture-tool"]), 4, 4);
        assert!(matches!(result, Err(VigilError::DeviceFailure(_))));
    }

    #[test]
    fn empty_command_is_rejected() {
        let result = CaptureSource::spawn(&[], 4, 4);
        assert!(matches!(result, Err(VigilError::DeviceFailure(_))));
    }
}
