use face_liveness_capture::flow::{request_final_frame, FinalImageSlot};
use face_liveness_capture::recording::Mp4Writer;
use face_liveness_capture::testing::{synthetic_pixel_buffer, SyntheticCamera};
use face_liveness_capture::{
    ChunkerHandle, Frame, LivenessConfig, MediaWriter, PixelFormat, SampleCapturer, VideoChunker,
};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    face_liveness_capture::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: liveness-cli <command> [args]");
        eprintln!("Commands: record, default-config, info");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "record" => cmd_record(&args),
        "default-config" => cmd_default_config(&args),
        "info" => cmd_info(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_info(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let info = face_liveness_capture::get_info();
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&info)?);
    } else {
        println!("{} {} (recording: {})", info.name, info.version, info.recording);
    }
    Ok(())
}

fn cmd_default_config(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(LivenessConfig::default_path);
    LivenessConfig::default().save_to_file(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn cmd_record(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    // record [output.mp4] [--frames <n>] [--fps <f>] [--width <w>] [--height <h>]
    //        [--format rgb24|bgra32|nv12] [--still <path>] [--config <path>] [--json]
    let mut output = None;
    let mut frames: u64 = 90;
    let mut fps = None;
    let mut width = None;
    let mut height = None;
    let mut format = PixelFormat::Nv12;
    let mut still_path = None;
    let mut config_path = None;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" => {
                i += 1;
                frames = value(args, i)?.parse::<u64>()?.max(1);
            }
            "--fps" => {
                i += 1;
                fps = Some(value(args, i)?.parse::<f64>()?);
            }
            "--width" => {
                i += 1;
                width = Some(value(args, i)?.parse::<u32>()?);
            }
            "--height" => {
                i += 1;
                height = Some(value(args, i)?.parse::<u32>()?);
            }
            "--format" => {
                i += 1;
                format = parse_format(value(args, i)?)?;
            }
            "--still" => {
                i += 1;
                still_path = Some(PathBuf::from(value(args, i)?));
            }
            "--config" => {
                i += 1;
                config_path = Some(PathBuf::from(value(args, i)?));
            }
            "--json" => json = true,
            other => {
                if output.is_none() {
                    output = Some(PathBuf::from(other));
                } else {
                    return Err(format!("Unexpected argument: {}", other).into());
                }
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => LivenessConfig::load_from_file(path)?,
        None => LivenessConfig::load_or_default(),
    };
    if let Some(fps) = fps {
        config.recording.fps = fps;
    }
    if let Some(width) = width {
        config.recording.width = width;
    }
    if let Some(height) = height {
        config.recording.height = height;
    }
    config.validate()?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let output = match output {
        Some(path) => path,
        None => {
            let dir = PathBuf::from(&config.storage.output_directory);
            std::fs::create_dir_all(&dir)?;
            dir.join(format!(
                "liveness_{}_{}.mp4",
                chrono::Utc::now().format("%Y%m%dT%H%M%S"),
                &session_id[..8]
            ))
        }
    };
    let still_path = still_path.unwrap_or_else(|| output.with_extension("jpg"));

    let (w, h, rate) = (
        config.recording.width,
        config.recording.height,
        config.recording.fps,
    );
    let initial_frame = FinalImageSlot::new();
    let writer = Mp4Writer::new(&output, config.recording_config());
    let chunker = VideoChunker::new(writer)
        .with_preview_source(Box::new(move || Some(synthetic_pixel_buffer(0, w, h, format))))
        .with_initial_frame_callback(initial_frame.callback());
    let handle = ChunkerHandle::new(chunker);

    let observed = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&observed);
    let capturer = Arc::new(SampleCapturer::new(
        move |_frame: &Frame| {
            counter.fetch_add(1, Ordering::Relaxed);
        },
        handle.clone(),
    ));

    handle.start();

    // Producer: keeps delivering frames until told to stop, like a camera.
    let stop = Arc::new(AtomicBool::new(false));
    let (recorded_tx, recorded_rx) = std::sync::mpsc::channel();
    let producer = {
        let capturer = Arc::clone(&capturer);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut camera = SyntheticCamera::new(w, h, rate, format);
            while !stop.load(Ordering::Relaxed) {
                capturer.capture(&camera.next_frame());
                if camera.frames_produced() == frames {
                    let _ = recorded_tx.send(());
                }
                // Let the encoder keep up; frames arriving while it is busy are dropped.
                std::thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let _ = recorded_rx.recv();
    let runtime = tokio::runtime::Runtime::new()?;
    let still = runtime.block_on(request_final_frame(&handle, config.final_frame_timeout()));
    stop.store(true, Ordering::Relaxed);
    let _ = producer.join();

    if let Some(ref still) = still {
        still.save(&still_path, config.still.jpeg_quality)?;
    }

    let (appended, dropped, state) = handle.with_chunker(|c| {
        (c.appended_frames(), c.dropped_frames(), c.state())
    });
    let stats = handle.with_chunker(|c| c.writer().wait_for_completion(Duration::from_secs(30)));
    let status = handle.with_chunker(|c| c.writer().status());

    if json {
        let report = serde_json::json!({
            "session_id": session_id,
            "output": output.display().to_string(),
            "still": still.as_ref().map(|_| still_path.display().to_string()),
            "initial_frame_captured": initial_frame.get().is_some(),
            "frames_observed": observed.load(Ordering::Relaxed),
            "frames_appended": appended,
            "frames_dropped": dropped,
            "chunker_state": state,
            "writer_status": status,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Session {}", session_id);
        println!(
            "Observed {} frames, appended {}, dropped {}",
            observed.load(Ordering::Relaxed),
            appended,
            dropped
        );
        match stats {
            Some(stats) => println!(
                "Wrote {} ({} frames, {:.2}s, {:.0} kbps)",
                output.display(),
                stats.video_frames,
                stats.duration_secs,
                stats.avg_bitrate() / 1000.0
            ),
            None => println!("Recording did not finalize (writer status: {})", status),
        }
        match still {
            Some(_) => println!("Final frame: {}", still_path.display()),
            None => println!("Final frame: none"),
        }
    }

    Ok(())
}

fn value(args: &[String], i: usize) -> Result<&str, Box<dyn std::error::Error>> {
    args.get(i)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("Missing value for {}", args[i - 1]).into())
}

fn parse_format(s: &str) -> Result<PixelFormat, Box<dyn std::error::Error>> {
    match s.to_ascii_lowercase().as_str() {
        "rgb24" | "rgb" => Ok(PixelFormat::Rgb24),
        "bgra32" | "bgra" => Ok(PixelFormat::Bgra32),
        "nv12" => Ok(PixelFormat::Nv12),
        _ => Err(format!("Unknown pixel format: {}", s).into()),
    }
}
