// Integration tests for chunked audio recording
//
// These tests verify that audio frames are split into fixed-interval chunks
// and that each chunk is a complete WAV clip ready for a binary frame.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use voice_chat::audio::{AudioChunk, AudioFile, AudioFrame, ChunkConfig, ChunkedRecorder};

fn frame(index: u64, value: i16) -> AudioFrame {
    AudioFrame {
        samples: vec![value; 1600], // 100ms at 16kHz
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: index * 100,
    }
}

async fn record(
    config: ChunkConfig,
    frames: Vec<AudioFrame>,
) -> Result<(Vec<voice_chat::ChunkMetadata>, Vec<AudioChunk>)> {
    let mut recorder = ChunkedRecorder::new(config);
    let (tx, rx) = mpsc::channel(100);
    let (chunk_tx, mut chunk_rx) = mpsc::channel(100);

    let handle = tokio::spawn(async move { recorder.record(rx, chunk_tx).await });

    for frame in frames {
        tx.send(frame).await?;
    }
    drop(tx);

    let metadata = handle.await??;

    let mut chunks = Vec::new();
    while let Some(chunk) = chunk_rx.recv().await {
        chunks.push(chunk);
    }
    Ok((metadata, chunks))
}

#[tokio::test]
async fn test_chunked_recording_creates_single_chunk() -> Result<()> {
    let config = ChunkConfig {
        chunk_duration: Duration::from_secs(10),
    };
    // 5 seconds of audio
    let frames = (0..50).map(|i| frame(i, 0)).collect();

    let (metadata, chunks) = record(config, frames).await?;

    assert_eq!(metadata.len(), 1, "Should create exactly 1 chunk");
    let chunk = &metadata[0];
    assert_eq!(chunk.chunk_index, 0);
    assert_eq!(chunk.start_ms, 0);
    assert_eq!(chunk.end_ms, 4900);
    assert_eq!(chunk.sample_count, 1600 * 50);

    assert_eq!(chunks.len(), 1);
    let clip = AudioFile::from_bytes(&chunks[0].wav)?;
    assert_eq!(clip.samples.len(), 1600 * 50);
    assert_eq!(clip.sample_rate, 16000);

    Ok(())
}

#[tokio::test]
async fn test_default_interval_is_seven_seconds() -> Result<()> {
    // 15 seconds of audio -> [0-7s], [7-14s], [14-15s]
    let frames = (0..150).map(|i| frame(i, (i % 100) as i16)).collect();

    let (metadata, chunks) = record(ChunkConfig::default(), frames).await?;

    assert_eq!(metadata.len(), 3);
    assert_eq!(metadata[0].start_ms, 0);
    assert_eq!(metadata[0].end_ms, 6900);
    assert_eq!(metadata[1].start_ms, 7000);
    assert_eq!(metadata[1].end_ms, 13900);
    assert_eq!(metadata[2].start_ms, 14000);
    assert_eq!(metadata[2].end_ms, 14900);
    assert_eq!(metadata[2].sample_count, 1600 * 10);

    // Chunks arrive in capture order
    let indices: Vec<usize> = chunks.iter().map(|c| c.metadata.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    Ok(())
}

#[tokio::test]
async fn test_chunked_recording_handles_empty_input() -> Result<()> {
    let (metadata, chunks) = record(ChunkConfig::default(), Vec::new()).await?;

    assert!(metadata.is_empty(), "Should create 0 chunks for empty input");
    assert!(chunks.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_frames_without_samples_produce_no_chunk() -> Result<()> {
    let frames = (0..3)
        .map(|i| AudioFrame {
            samples: Vec::new(),
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: i * 100,
        })
        .collect();

    let (metadata, chunks) = record(ChunkConfig::default(), frames).await?;

    assert!(metadata.is_empty());
    assert!(chunks.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_chunked_recording_preserves_audio_format() -> Result<()> {
    let frames = (0..10)
        .map(|i| AudioFrame {
            samples: vec![100i16; 4800],
            sample_rate: 24000,
            channels: 2,
            timestamp_ms: i * 100,
        })
        .collect();

    let (metadata, chunks) = record(ChunkConfig::default(), frames).await?;

    assert_eq!(metadata[0].sample_rate, 24000, "Sample rate should be preserved");
    assert_eq!(metadata[0].channels, 2, "Channel count should be preserved");

    let clip = AudioFile::from_bytes(&chunks[0].wav)?;
    assert_eq!(clip.channels, 2);
    assert_eq!(clip.sample_rate, 24000);
    Ok(())
}

#[tokio::test]
async fn test_dropped_receiver_fails_recording() -> Result<()> {
    let mut recorder = ChunkedRecorder::new(ChunkConfig {
        chunk_duration: Duration::from_secs(1),
    });
    let (tx, rx) = mpsc::channel(100);
    let (chunk_tx, chunk_rx) = mpsc::channel(1);
    drop(chunk_rx);

    for i in 0..20 {
        tx.send(frame(i, 1)).await?;
    }
    drop(tx);

    assert!(recorder.record(rx, chunk_tx).await.is_err());
    Ok(())
}
