use std::{error::Error, io, sync::Arc, thread};

use clap::{Parser, Subcommand};
use log::{error, info};
use roosty_alarm::{
    config::Config,
    notify::{DesktopNotifier, NotificationSink, SoundPlayer},
    shell::Shell,
    AlarmClock, AlarmSpec, SystemClock,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
    /// seconds between checks of each alarm (1-60), overrides the config file
    #[clap(long, short)]
    poll_interval: Option<u64>,
    /// alarm to set at start up, e.g. "07:30 daily Wake up", can be repeated
    #[clap(long = "alarm", short)]
    alarms: Vec<AlarmSpec>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// play the alarm sound and exit
    TestSound,
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    if let Err(e) = simple_file_logger::init_logger!("roosty_alarm") {
        eprintln!("couldn't initialize logger: {e:?}");
    }

    let args = Args::parse();
    let config_path = Config::config_path()?;
    match args.command {
        Some(Command::Init { force }) => {
            if force || !Config::is_config_present() {
                Config::new().save(&config_path)?;
                println!("wrote default config to {}", config_path.display());
            } else {
                println!(
                    "config already exists at {}, use --force to overwrite it",
                    config_path.display()
                );
            }
            return Ok(());
        }
        Some(Command::TestSound) => {
            let config = Config::load_or_default(&config_path)?;
            let notifier = DesktopNotifier::new(SoundPlayer::spawn()?);
            notifier.play(None, &config.sound)?;
            // the sound plays on its own thread, stay around until it's done
            thread::sleep(config.sound.length());
            return Ok(());
        }
        None => {}
    }

    let mut config = Config::load_or_default(&config_path)?;
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = secs;
    }
    let sink = Arc::new(DesktopNotifier::new(SoundPlayer::spawn()?));
    let clock = Arc::new(SystemClock);
    let (alarms, events) = AlarmClock::new(&config, clock.clone(), sink)?;
    for spec in &args.alarms {
        match alarms.add(spec) {
            Ok(id) => info!("preloaded alarm {id}"),
            Err(e) => {
                error!("couldn't add alarm {spec:?}: {e}");
                eprintln!("couldn't add alarm: {e}");
            }
        }
    }

    let mut shell = Shell::new(&alarms, clock.as_ref(), &config.time_format, io::stdout());
    shell.run(io::BufReader::new(io::stdin()), &events)?;
    alarms.stop_all();
    Ok(())
}
