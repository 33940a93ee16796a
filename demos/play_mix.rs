//! Audition a trimmed backing track, then export a mixdown with a take.
//!
//! Usage: cargo run --example play_mix -- <backing.wav> [take.wav]
//!
//! Plays the first 10 seconds of the backing track while printing position
//! and output level. With a take file, also exports `mix.wav` combining the
//! trimmed backing (gain 0.8) and the take (gain 1.0).

use std::time::Duration;

use omotiv_audio::{export_mix, PlaybackSession, Track};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let backing_path = args.next().ok_or("usage: play_mix <backing.wav> [take.wav]")?;
    let take_path = args.next();

    let mut session = PlaybackSession::new();
    session.load(&backing_path)?;
    println!(
        "Loaded {} ({:.1}s)",
        backing_path,
        session.duration().as_secs_f64()
    );

    let end = session.duration().as_secs_f64().min(10.0);
    session.trim(0.0, Some(end))?;
    session.set_volume(0.8);
    session.play()?;

    while session.is_playing() {
        std::thread::sleep(Duration::from_millis(250));
        println!(
            "position {:6.2}s  level {:.2}",
            session.position(),
            session.output_level()
        );
    }
    session.stop();

    if let Some(take_path) = take_path {
        let take = Track::load(&take_path)?;
        let path = export_mix(&session.trimmed_track()?, &take, 0.8, 1.0, "mix.wav")?;
        println!("Mix exported to {}", path.display());
    }

    Ok(())
}
