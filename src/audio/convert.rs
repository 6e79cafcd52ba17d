//! Sample-rate and channel conversion applied to captured frames

use super::backend::AudioFrame;

/// Bring a frame to the target rate and channel count where possible
pub fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.sample_rate != target_sample_rate {
        processed = downsample_frame(processed, target_sample_rate);
    }

    if processed.channels != target_channels && target_channels == 1 {
        processed = to_mono(processed);
    }

    processed
}

/// Downsample by decimation. Upsampling is not attempted.
pub fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if frame.sample_rate == target_rate || target_rate == 0 {
        return frame;
    }

    let ratio = (frame.sample_rate / target_rate) as usize;
    if ratio <= 1 {
        return frame;
    }

    let channels = frame.channels.max(1) as usize;
    let downsampled: Vec<i16> = frame
        .samples
        .chunks_exact(channels)
        .step_by(ratio)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples: downsampled,
        sample_rate: frame.sample_rate / ratio as u32,
        ..frame
    }
}

/// Average interleaved channels into one
pub fn to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels <= 1 {
        return frame;
    }

    let channels = frame.channels as usize;
    let mono: Vec<i16> = frame
        .samples
        .chunks_exact(channels)
        .map(|c| (c.iter().map(|&s| s as i32).sum::<i32>() / channels as i32) as i16)
        .collect();

    AudioFrame {
        samples: mono,
        channels: 1,
        ..frame
    }
}
