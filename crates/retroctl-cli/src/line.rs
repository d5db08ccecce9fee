//! Line-command fallback for terminals without raw-mode support.
//!
//! A minimal prompt loop covering the common commands. Bad input is
//! reported and the loop continues; EOF or `quit` exits.

use anyhow::Result;
use retroctl_core::LooperClient;
use std::io::{BufRead, Write};

pub fn run(client: &LooperClient) -> Result<()> {
    println!("Interactive mode not available. Line commands (loops are numbered 1-8):");
    println!("  capture <loop>   record <loop>   stop <loop>   mute <loop>");
    println!("  clear <loop>     bpm <value>     status        quit");

    let stdin = std::io::stdin();
    let dispatcher = client.dispatcher();
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // end of input
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = parts.first() else {
            continue;
        };

        match cmd.to_ascii_lowercase().as_str() {
            "quit" | "exit" => break,
            "capture" => {
                if let Some(idx) = loop_arg(&parts) {
                    dispatcher.capture(idx, None, 0);
                }
            }
            "record" => {
                if let Some(idx) = loop_arg(&parts) {
                    dispatcher.record(idx, None);
                }
            }
            "stop" => {
                if let Some(idx) = loop_arg(&parts) {
                    dispatcher.stop_record(idx, None);
                }
            }
            "mute" => {
                if let Some(idx) = loop_arg(&parts) {
                    dispatcher.toggle_mute(idx, None);
                }
            }
            "clear" => {
                if let Some(idx) = loop_arg(&parts) {
                    dispatcher.clear(idx);
                }
            }
            "bpm" => match parts.get(1).map(|raw| raw.parse::<f32>()) {
                Some(Ok(bpm)) if bpm > 0.0 => dispatcher.set_bpm(bpm),
                Some(Ok(bpm)) => println!("BPM must be positive, got {bpm}"),
                Some(Err(_)) => println!("Not a number: {}", parts[1]),
                None => println!("Usage: bpm <value>"),
            },
            "status" => print_status(client),
            other => println!("Unknown command: {other}"),
        }
    }

    Ok(())
}

/// Parse the 1-based loop argument, reporting problems to the user.
fn loop_arg(parts: &[&str]) -> Option<i32> {
    let Some(raw) = parts.get(1) else {
        println!("Usage: {} <loop>", parts[0]);
        return None;
    };
    match raw.parse::<i32>() {
        Ok(n) if n >= 1 => Some(n - 1),
        Ok(n) => {
            println!("Invalid loop number: {n}");
            None
        }
        Err(_) => {
            println!("Not a number: {raw}");
            None
        }
    }
}

fn print_status(client: &LooperClient) {
    let snap = client.mirror().snapshot();
    let met = &snap.metronome;
    println!(
        "{:.1} BPM  {}/4  Bar {}  Beat {}  Q={}  Lookback={}  Click={}",
        met.bpm,
        met.beats_per_bar,
        met.bar + 1,
        met.beat + 1,
        snap.settings.default_quantize.name(),
        snap.settings.lookback_bars,
        if snap.settings.click_enabled { "ON" } else { "OFF" },
    );
    for (i, lp) in snap.loops.iter().enumerate() {
        if lp.is_empty() {
            continue;
        }
        println!(
            "  loop {}: {:?}  {:.1} bars  {}/{} layers  {:.2}x{}  {:.1}%",
            i + 1,
            lp.state,
            lp.length_in_bars,
            lp.active_layers,
            lp.layers,
            lp.speed,
            if lp.reversed { " reversed" } else { "" },
            lp.play_position_pct * 100.0,
        );
    }
    if snap.recording.active {
        println!("  RECORDING loop {}", snap.recording.loop_index + 1);
    }
    for op in &snap.pending_ops {
        println!(
            "  pending: loop {} - {} ({})",
            op.loop_index + 1,
            op.description,
            op.quantize.name()
        );
    }
    for msg in snap.messages.iter().rev().take(4).rev() {
        println!("  {msg}");
    }
}
