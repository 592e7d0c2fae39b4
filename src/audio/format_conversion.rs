// Sample format conversion for cpal output buffers
// Clicks are rendered in f32 and converted when written to the device buffer

use cpal::{FromSample, Sample};

/// Write one mono sample to every channel of an interleaved frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(internal_sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    let sample = internal_sample.clamp(-1.0, 1.0);
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = Sample::from_sample::<f32>(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_to_stereo_f32() {
        let mut frame = [0.0f32; 2];
        write_mono_to_interleaved_frame(0.25, &mut frame);
        assert_eq!(frame, [0.25, 0.25]);
    }

    #[test]
    fn test_mono_to_i16_clamps() {
        let mut frame = [0i16; 2];
        write_mono_to_interleaved_frame(2.0, &mut frame);
        assert_eq!(frame, [i16::MAX, i16::MAX]);

        write_mono_to_interleaved_frame(0.0, &mut frame);
        assert_eq!(frame, [0, 0]);
    }
}
