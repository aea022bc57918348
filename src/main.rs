use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use avtool::commands;
use avtool::core::download::SUPPORTED_BROWSERS;
use avtool::core::extract::AudioFormat;

fn yes_arg() -> Arg {
    Arg::new("yes")
        .short('y')
        .long("yes")
        .help("Never prompt, use defaults")
        .action(ArgAction::SetTrue)
}

fn dir_arg() -> Arg {
    Arg::new("dir")
        .short('d')
        .long("dir")
        .value_name("DIR")
        .help("Download directory (defaults to the configured one, then ./download)")
}

fn rounds_args() -> [Arg; 2] {
    [
        Arg::new("rounds")
            .long("rounds")
            .value_name("N")
            .help("Maximum number of rounds")
            .value_parser(clap::value_parser!(u32).range(1..)),
        Arg::new("retries")
            .long("retries")
            .value_name("N")
            .help("Attempts per round")
            .value_parser(clap::value_parser!(u32).range(1..)),
    ]
}

fn build_cli() -> Command {
    let audio_formats: Vec<&'static str> = AudioFormat::ALL.iter().map(|f| f.extension()).collect();

    Command::new("avtool")
        .about("Download online videos and convert audio/video files")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show debug logs")
                .action(ArgAction::SetTrue)
                .global(true)
        )
        .subcommand(
            Command::new("download")
                .about("Download a video with yt-dlp, choosing the resolution interactively")
                .arg(Arg::new("url").help("Video URL").required(true).index(1))
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("File name without extension (the resolution is appended)")
                )
                .arg(dir_arg())
                .arg(
                    Arg::new("resolution")
                        .short('r')
                        .long("resolution")
                        .value_name("HEIGHT")
                        .help("Resolution height, e.g. 720")
                        .value_parser(clap::value_parser!(u32))
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("EXPR")
                        .help("yt-dlp format id or expression, skips format selection")
                )
                .arg(
                    Arg::new("audio")
                        .long("audio")
                        .value_name("INDEX")
                        .help("Audio track number when audio has to be merged (1 = best)")
                        .value_parser(clap::value_parser!(usize))
                )
                .arg(
                    Arg::new("cookies")
                        .long("cookies")
                        .value_name("FILE")
                        .help("Netscape cookie file")
                        .conflicts_with("browser")
                )
                .arg(
                    Arg::new("browser")
                        .long("browser")
                        .value_name("BROWSER")
                        .help("Read cookies from a browser")
                        .value_parser(SUPPORTED_BROWSERS)
                )
                .arg(
                    Arg::new("auth")
                        .long("auth")
                        .help("Choose the authentication method interactively")
                        .action(ArgAction::SetTrue)
                )
                .args(rounds_args())
                .arg(
                    Arg::new("no-tune")
                        .long("no-tune")
                        .help("Do not pass the network tuning options to yt-dlp")
                        .action(ArgAction::SetTrue)
                )
                .arg(yes_arg())
        )
        .subcommand(
            Command::new("direct")
                .about("Stream a direct MP4 link over HTTP")
                .arg(Arg::new("url").help("Video URL").required(true).index(1))
                .arg(dir_arg())
                .arg(
                    Arg::new("resolution")
                        .short('r')
                        .long("resolution")
                        .value_name("LABEL")
                        .help("Resolution such as 720p")
                )
                .args(rounds_args())
                .arg(yes_arg())
        )
        .subcommand(
            Command::new("formats")
                .about("Show the formats of a video grouped by resolution")
                .arg(Arg::new("url").help("Video URL").required(true).index(1))
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .help("Print yt-dlp's own format table")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("convert")
                .about("Convert an audio or video file, optionally changing its speed")
                .arg(Arg::new("input").help("File to convert").index(1))
                .arg(
                    Arg::new("to")
                        .short('t')
                        .long("to")
                        .value_name("FORMAT")
                        .help("Output format, e.g. mp3 or mkv")
                )
                .arg(
                    Arg::new("speed")
                        .short('s')
                        .long("speed")
                        .value_name("FACTOR")
                        .help("Playback speed, e.g. 1.5")
                        .allow_hyphen_values(true)
                )
                .arg(yes_arg())
        )
        .subcommand(
            Command::new("extract-audio")
                .about("Extract the audio track of a video")
                .arg(Arg::new("video").help("Video file").index(1))
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .help("Audio format")
                        .value_parser(audio_formats)
                )
                .arg(yes_arg())
        )
        .subcommand(
            Command::new("info")
                .about("Show stream details of a media file")
                .arg(Arg::new("file").help("Media file").required(true).index(1))
                .arg(
                    Arg::new("levels")
                        .short('l')
                        .long("levels")
                        .help("Also measure peak and mean loudness")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("config")
                .about("Show or change saved settings")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the current configuration"))
                .subcommand(
                    Command::new("set")
                        .about("Set a configuration value")
                        .arg(
                            Arg::new("key")
                                .help("Setting name")
                                .required(true)
                                .index(1)
                                .value_parser(avtool::core::config::CONFIG_KEYS)
                        )
                        .arg(Arg::new("value").help("New value").required(true).index(2))
                )
                .subcommand(Command::new("reset").about("Restore the default configuration"))
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .help("bash, zsh, fish, powershell or elvish")
                        .required(true)
                        .index(1)
                )
        )
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    avtool::init_logging(matches.get_flag("verbose"));

    if matches.get_flag("version") {
        println!("avtool version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    match matches.subcommand() {
        Some(("download", sub_matches)) => commands::download::execute(sub_matches)?,
        Some(("direct", sub_matches)) => commands::direct::execute(sub_matches)?,
        Some(("formats", sub_matches)) => commands::formats::execute(sub_matches)?,
        Some(("convert", sub_matches)) => commands::convert::execute(sub_matches)?,
        Some(("extract-audio", sub_matches)) => commands::extract_audio::execute(sub_matches)?,
        Some(("info", sub_matches)) => commands::info::execute(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        Some(("completions", sub_matches)) => {
            commands::completions::execute(sub_matches, &mut build_cli())?
        }
        _ => {
            println!("Welcome to avtool!");
            println!("Use 'avtool --help' for more information.");
        }
    }

    Ok(())
}
