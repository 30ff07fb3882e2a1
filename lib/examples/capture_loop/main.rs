//! Simulated capture loop: a test pattern producer fills a ring of buffers
//! while a consumer locks each frame, inspects it and releases it.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{Arg, Command};
use log::{info, warn};

use tcambuf::{
    memory::{BufferMemory, MmapMemory, UserPtrMemory},
    MemoryBuffer, PixelFormat, VideoFormat,
};
use tcambuf_utils::framegen::{FrameGenerator, GenerateFrameError};

fn parse_frame_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (width, height) = s
        .split_once('x')
        .with_context(|| format!("Invalid frame size {:?}", s))?;

    Ok((width.parse()?, height.parse()?))
}

/// Consumer is done with the frame: release it and clear it before reuse.
fn release(buffer: &mut MemoryBuffer) {
    buffer.unlock();
    buffer.clear();
}

fn run<M: BufferMemory>(
    mut memories: Vec<M>,
    mut generator: FrameGenerator,
    stop_after: Option<usize>,
    lets_quit: &AtomicBool,
) -> anyhow::Result<()> {
    let format = generator.format();
    let pitch = generator.pitch();
    let mut buffers = memories
        .iter_mut()
        .map(|m| MemoryBuffer::new(m.image_buffer(format, pitch)))
        .collect::<Vec<_>>();
    let num_buffers = buffers.len();

    // Index of the buffer the consumer is still holding on to.
    let mut held: Option<usize> = None;
    let mut cpt = 0usize;

    while !lets_quit.load(Ordering::SeqCst) {
        if let Some(max) = stop_after {
            if cpt >= max {
                break;
            }
        }

        let index = cpt % num_buffers;
        cpt += 1;

        match generator.next_frame(&mut buffers[index]) {
            Ok(()) => (),
            Err(GenerateFrameError::BufferLocked) => {
                warn!("Buffer {} still in use, dropping frame", index);
                generator.drop_frame();
                if let Some(prev) = held.take() {
                    release(&mut buffers[prev]);
                }
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(prev) = held.take() {
            release(&mut buffers[prev]);
        }

        let buffer = &mut buffers[index];
        buffer.lock();
        // Safe because the producer only writes into unlocked buffers.
        let checksum = unsafe { buffer.as_slice() }
            .iter()
            .fold(0u32, |acc, &b| acc.wrapping_add(b as u32));
        let stats = buffer.statistics();
        info!(
            "Frame {} in buffer {}: checksum {:08x}, {} dropped, captured at {} ns",
            stats.frame_count, index, checksum, stats.frames_dropped, stats.capture_time_ns
        );
        held = Some(index);
    }

    if let Some(prev) = held {
        release(&mut buffers[prev]);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("Frame buffer capture loop")
        .arg(
            Arg::new("num_frames")
                .long("stop_after")
                .takes_value(true)
                .help("Stop after producing a given number of frames"),
        )
        .arg(
            Arg::new("num_buffers")
                .long("buffers")
                .takes_value(true)
                .default_value("4")
                .help("Number of buffers in the ring"),
        )
        .arg(
            Arg::new("frame_size")
                .long("frame_size")
                .takes_value(true)
                .default_value("640x480")
                .help("Size of the frames to produce (e.g. \"640x480\")"),
        )
        .arg(
            Arg::new("framerate")
                .long("framerate")
                .takes_value(true)
                .default_value("30")
                .help("Nominal framerate reported in the frame statistics"),
        )
        .arg(
            Arg::new("memory")
                .long("memory")
                .takes_value(true)
                .default_value("mmap")
                .help("Type of memory backing the buffers (mmap or user)"),
        )
        .get_matches();

    let stop_after = matches
        .value_of("num_frames")
        .map(str::parse::<usize>)
        .transpose()
        .context("Invalid value for stop_after")?;
    let num_buffers: usize = matches
        .value_of("num_buffers")
        .unwrap_or("4")
        .parse()
        .context("Invalid value for buffers")?;
    anyhow::ensure!(num_buffers > 0, "At least one buffer is required");
    let (width, height) = parse_frame_size(matches.value_of("frame_size").unwrap_or("640x480"))?;
    let framerate: f64 = matches
        .value_of("framerate")
        .unwrap_or("30")
        .parse()
        .context("Invalid value for framerate")?;

    let format = VideoFormat {
        framerate,
        ..VideoFormat::from((PixelFormat::RGB3, (width as usize, height as usize)))
    };
    let pitch = (width as usize)
        .checked_mul(3)
        .context("Frame width is too large")?;
    let generator = FrameGenerator::new(format, pitch)?;
    let frame_size = generator.frame_size();
    info!("Producing {} frames of {} bytes", format, frame_size);

    let lets_quit = Arc::new(AtomicBool::new(false));
    // Setup the Ctrl+c handler.
    {
        let lets_quit_handler = lets_quit.clone();
        ctrlc::set_handler(move || {
            lets_quit_handler.store(true, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl-C handler")?;
    }

    match matches.value_of("memory") {
        Some("mmap") => {
            let memories = (0..num_buffers)
                .map(|_| MmapMemory::new(frame_size))
                .collect::<Result<Vec<_>, _>>()?;
            run(memories, generator, stop_after, &lets_quit)
        }
        Some("user") => {
            let memories = (0..num_buffers)
                .map(|_| UserPtrMemory::new(frame_size))
                .collect::<Vec<_>>();
            run(memories, generator, stop_after, &lets_quit)
        }
        _ => anyhow::bail!("Invalid value for memory"),
    }
}
